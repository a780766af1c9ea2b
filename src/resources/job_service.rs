use async_trait::async_trait;

use crate::{
    error::{ProviderError, Result},
    provider::{
        Capabilities, ManagedResource, ReadOutcome,
        attributes::{create_builder, handle_external_changes_in_show},
        data::{DESCRIBE_OUTPUT, FULLY_QUALIFIED_NAME, ResourceData, SHOW_OUTPUT},
        schema::Schema,
    },
    resources::{
        common::{
            COMMENT, found, import_schema_object, schema_object_id, schema_object_id_from_config, set_identifiers,
            set_output,
        },
        service::{COMPUTE_POOL, FROM_SPECIFICATION, QUERY_WAREHOUSE, base_schema, integrations, shared_mappings},
    },
    sdk::{
        client::{Client, RequestContext},
        identifier::{AccountObjectIdentifier, ObjectIdentifier},
        services::ExecuteJobService,
    },
};

/// A service that runs its specification once. Any change replaces it.
pub struct JobServiceResource;

#[async_trait]
impl ManagedResource for JobServiceResource {
    fn name(&self) -> &'static str {
        "snowflake_job_service"
    }

    fn schema(&self) -> Schema {
        base_schema()
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            has_describe: true,
            has_alter: false,
            supports_update: false,
            ..Default::default()
        }
    }

    async fn create(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<()> {
        let id = schema_object_id_from_config(d);
        let pool = AccountObjectIdentifier::parse(&d.get_str(COMPUTE_POOL))?;
        let mut request = ExecuteJobService::new(id.clone(), pool, d.get_str(FROM_SPECIFICATION));
        request.external_access_integrations = integrations(d)?;
        create_builder(d, QUERY_WAREHOUSE, |v| request.query_warehouse = Some(v))?;
        create_builder(d, COMMENT, |v| request.comment = Some(v))?;

        client.services().execute_job(ctx, &request).await?;
        set_identifiers(d, &id);
        Ok(())
    }

    async fn read(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<ReadOutcome> {
        let id = schema_object_id(d)?;
        let services = client.services();
        let Some(job) = found(services.show_job_by_id_safely(ctx, &id).await)? else {
            return Ok(ReadOutcome::Gone);
        };
        let Some(details) = found(services.describe(ctx, &id).await)? else {
            return Ok(ReadOutcome::Gone);
        };

        handle_external_changes_in_show(d, &shared_mappings(&job));
        if d.get_raw(FROM_SPECIFICATION).is_none() {
            d.set(FROM_SPECIFICATION, details.spec.clone());
        }
        d.set(FULLY_QUALIFIED_NAME, id.fully_qualified_name());
        set_output(d, SHOW_OUTPUT, &job)?;
        set_output(d, DESCRIBE_OUTPUT, &details)?;
        Ok(ReadOutcome::Found)
    }

    async fn update(&self, _client: &Client, _ctx: &RequestContext, d: &mut ResourceData) -> Result<()> {
        Err(ProviderError::Validation(format!(
            "job service {} cannot be updated in place",
            d.id().unwrap_or_default()
        )))
    }

    async fn delete(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<()> {
        let id = schema_object_id(d)?;
        client.services().drop_safely(ctx, &id).await?;
        d.clear();
        Ok(())
    }

    fn import(&self, id: &str, d: &mut ResourceData) -> Result<()> {
        import_schema_object(id, d)
    }
}
