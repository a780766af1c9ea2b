use async_trait::async_trait;
use serde_json::{Value, json};

use crate::{
    error::Result,
    provider::{
        Capabilities, ManagedResource, ReadOutcome,
        attributes::{
            ShowMapping, Tristate, computed_if_any_attribute_changed, create_builder, get_tristate,
            handle_external_changes_in_show, ignore_change_to_current_value_in_show, read_set, update_set_unset,
        },
        data::{DESCRIBE_OUTPUT, FULLY_QUALIFIED_NAME, ResourceData, SHOW_OUTPUT},
        diff::CustomDiff,
        lifecycle::LifecycleState,
        schema::{Attribute, AttributeType, Schema},
    },
    resources::common::{
        COMMENT, DATABASE, NAME, SCHEMA, comment, found, fully_qualified_name, import_schema_object, name_part,
        persist_all, schema_object_id, schema_object_id_from_config, set_identifiers, set_output,
        validate_yaml_mapping, warn_on_external_transition,
    },
    sdk::{
        client::{Client, RequestContext},
        identifier::{AccountObjectIdentifier, ObjectIdentifier, quote_part},
        services::{
            AlterService, CreateService, DEFAULT_AUTO_RESUME, DEFAULT_AUTO_SUSPEND_SECS, DEFAULT_INSTANCES, Service,
            ServiceAction, ServiceSet, ServiceUnset,
        },
    },
};

pub(crate) const COMPUTE_POOL: &str = "compute_pool";
pub(crate) const FROM_SPECIFICATION: &str = "from_specification";
pub(crate) const EXTERNAL_ACCESS_INTEGRATIONS: &str = "external_access_integrations";
pub(crate) const QUERY_WAREHOUSE: &str = "query_warehouse";
const AUTO_SUSPEND_SECS: &str = "auto_suspend_secs";
const AUTO_RESUME: &str = "auto_resume";
const INITIALLY_SUSPENDED: &str = "initially_suspended";
const MIN_INSTANCES: &str = "min_instances";
const MAX_INSTANCES: &str = "max_instances";
const MIN_READY_INSTANCES: &str = "min_ready_instances";

/// The attributes services and job services share.
pub(crate) fn base_schema() -> Schema {
    Schema::new(0)
        .with_attribute(DATABASE, name_part().with_force_new())
        .with_attribute(SCHEMA, name_part().with_force_new())
        .with_attribute(NAME, name_part().with_force_new())
        .with_attribute(
            COMPUTE_POOL,
            Attribute::required(AttributeType::String)
                .with_force_new()
                .with_validator(|v| match v.as_str() {
                    Some(s) => AccountObjectIdentifier::parse(s).map(|_| ()).map_err(|e| e.to_string()),
                    None => Ok(()),
                }),
        )
        .with_attribute(
            FROM_SPECIFICATION,
            Attribute::required(AttributeType::String)
                .with_description("Inline service specification, YAML.")
                .with_validator(validate_yaml_mapping)
                .with_diff_suppress(std::sync::Arc::new(|_, old, new, _| {
                    old.as_str().map(str::trim_end) == new.as_str().map(str::trim_end)
                })),
        )
        .with_attribute(
            EXTERNAL_ACCESS_INTEGRATIONS,
            Attribute::optional(AttributeType::set(AttributeType::String)),
        )
        .with_attribute(QUERY_WAREHOUSE, Attribute::optional(AttributeType::String))
        .with_attribute(COMMENT, comment())
        .with_attribute(FULLY_QUALIFIED_NAME, fully_qualified_name())
        .with_attribute(SHOW_OUTPUT, Attribute::output())
        .with_attribute(DESCRIBE_OUTPUT, Attribute::output())
}

pub(crate) fn integrations(d: &ResourceData) -> Result<Vec<AccountObjectIdentifier>> {
    Ok(get_tristate::<Vec<String>>(d, EXTERNAL_ACCESS_INTEGRATIONS)?
        .value()
        .unwrap_or_default()
        .iter()
        .map(|s| AccountObjectIdentifier::parse(s))
        .collect::<std::result::Result<Vec<_>, _>>()?)
}

/// SHOW reports bare names; state holds them the way config writes identifiers.
fn as_identifier(name: &str) -> String {
    if name.is_empty() { String::new() } else { quote_part(name) }
}

/// Drift on the columns services and job services share.
pub(crate) fn shared_mappings(service: &Service) -> Vec<ShowMapping> {
    let integrations: Vec<Value> = service
        .external_access_integrations
        .iter()
        .map(|name| Value::String(as_identifier(name)))
        .collect();
    vec![
        ShowMapping::new(
            COMPUTE_POOL,
            COMPUTE_POOL,
            service.compute_pool.clone(),
            as_identifier(&service.compute_pool),
        ),
        ShowMapping::new(
            QUERY_WAREHOUSE,
            QUERY_WAREHOUSE,
            service.query_warehouse.clone(),
            as_identifier(&service.query_warehouse),
        ),
        ShowMapping::new(
            EXTERNAL_ACCESS_INTEGRATIONS,
            EXTERNAL_ACCESS_INTEGRATIONS,
            json!(service.external_access_integrations),
            Value::Array(integrations),
        ),
        ShowMapping::new(COMMENT, COMMENT, service.comment.clone(), service.comment.clone()),
    ]
}

pub struct ServiceResource;

#[async_trait]
impl ManagedResource for ServiceResource {
    fn name(&self) -> &'static str {
        "snowflake_service"
    }

    fn schema(&self) -> Schema {
        base_schema()
            .with_attribute(
                AUTO_SUSPEND_SECS,
                Attribute::int_with_sentinel().with_diff_suppress(ignore_change_to_current_value_in_show(
                    AUTO_SUSPEND_SECS,
                    json!(DEFAULT_AUTO_SUSPEND_SECS),
                )),
            )
            .with_attribute(
                AUTO_RESUME,
                Attribute::bool_tristate().with_diff_suppress(ignore_change_to_current_value_in_show(
                    AUTO_RESUME,
                    json!(DEFAULT_AUTO_RESUME),
                )),
            )
            .with_attribute(
                INITIALLY_SUSPENDED,
                Attribute::bool_tristate().with_ignore_after_creation().with_force_new(),
            )
            .with_attribute(
                MIN_INSTANCES,
                Attribute::int_with_sentinel().with_diff_suppress(ignore_change_to_current_value_in_show(
                    MIN_INSTANCES,
                    json!(DEFAULT_INSTANCES),
                )),
            )
            .with_attribute(
                MIN_READY_INSTANCES,
                Attribute::int_with_sentinel().with_diff_suppress(ignore_change_to_current_value_in_show(
                    MIN_READY_INSTANCES,
                    json!(DEFAULT_INSTANCES),
                )),
            )
            .with_attribute(
                MAX_INSTANCES,
                Attribute::int_with_sentinel().with_diff_suppress(ignore_change_to_current_value_in_show(
                    MAX_INSTANCES,
                    json!(DEFAULT_INSTANCES),
                )),
            )
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            has_describe: true,
            ..Default::default()
        }
    }

    fn custom_diff(&self, d: &ResourceData) -> Result<CustomDiff> {
        let mut diff = CustomDiff::default();
        let watched = [
            FROM_SPECIFICATION,
            AUTO_SUSPEND_SECS,
            AUTO_RESUME,
            MIN_INSTANCES,
            MIN_READY_INSTANCES,
            MAX_INSTANCES,
            QUERY_WAREHOUSE,
            EXTERNAL_ACCESS_INTEGRATIONS,
            COMMENT,
        ];
        computed_if_any_attribute_changed(d, &mut diff, SHOW_OUTPUT, &watched);
        computed_if_any_attribute_changed(d, &mut diff, DESCRIBE_OUTPUT, &watched);
        Ok(diff)
    }

    async fn create(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<()> {
        let id = schema_object_id_from_config(d);
        let pool = AccountObjectIdentifier::parse(&d.get_str(COMPUTE_POOL))?;
        let mut request = CreateService::new(id.clone(), pool, d.get_str(FROM_SPECIFICATION));
        request.external_access_integrations = integrations(d)?;
        create_builder(d, AUTO_SUSPEND_SECS, |v| request.auto_suspend_secs = Some(v))?;
        create_builder(d, AUTO_RESUME, |v| request.auto_resume = Some(v))?;
        create_builder(d, INITIALLY_SUSPENDED, |v| request.initially_suspended = Some(v))?;
        create_builder(d, MIN_INSTANCES, |v| request.min_instances = Some(v))?;
        create_builder(d, MIN_READY_INSTANCES, |v| request.min_ready_instances = Some(v))?;
        create_builder(d, MAX_INSTANCES, |v| request.max_instances = Some(v))?;
        create_builder(d, QUERY_WAREHOUSE, |v| request.query_warehouse = Some(v))?;
        create_builder(d, COMMENT, |v| request.comment = Some(v))?;

        client.services().create(ctx, &request).await?;

        let suspended = matches!(get_tristate::<bool>(d, INITIALLY_SUSPENDED)?, Tristate::Value(true));
        tracing::debug!("service {id} created, {}", LifecycleState::after_create(suspended));
        set_identifiers(d, &id);
        Ok(())
    }

    async fn read(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<ReadOutcome> {
        let id = schema_object_id(d)?;
        let services = client.services();
        let Some(service) = found(services.show_by_id_safely(ctx, &id).await)? else {
            return Ok(ReadOutcome::Gone);
        };
        let Some(details) = found(services.describe(ctx, &id).await)? else {
            return Ok(ReadOutcome::Gone);
        };

        warn_on_external_transition(d, "status", &service.status);
        handle_external_changes_in_show(d, &shared_mappings(&service));
        if d.get_raw(FROM_SPECIFICATION).is_none() {
            d.set(FROM_SPECIFICATION, details.spec.clone());
        }

        read_set(d, AUTO_SUSPEND_SECS, service.auto_suspend_secs, &DEFAULT_AUTO_SUSPEND_SECS)?;
        read_set(d, AUTO_RESUME, service.auto_resume, &DEFAULT_AUTO_RESUME)?;
        read_set(d, MIN_INSTANCES, service.min_instances, &DEFAULT_INSTANCES)?;
        read_set(d, MIN_READY_INSTANCES, service.min_ready_instances, &DEFAULT_INSTANCES)?;
        read_set(d, MAX_INSTANCES, service.max_instances, &DEFAULT_INSTANCES)?;
        d.set(FULLY_QUALIFIED_NAME, id.fully_qualified_name());
        set_output(d, SHOW_OUTPUT, &service)?;
        set_output(d, DESCRIBE_OUTPUT, &details)?;
        Ok(ReadOutcome::Found)
    }

    async fn update(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<()> {
        let id = schema_object_id(d)?;
        let services = client.services();

        if d.has_change(FROM_SPECIFICATION) {
            let action = ServiceAction::FromSpecification(d.get_str(FROM_SPECIFICATION));
            services.alter(ctx, &AlterService::new(id.clone(), action)).await?;
            d.persist(FROM_SPECIFICATION);
        }

        let mut set = ServiceSet::default();
        let mut unset = ServiceUnset::default();
        let mut set_attrs = Vec::new();
        let mut unset_attrs = Vec::new();

        macro_rules! set_or_unset {
            ($attr:expr, $field:ident) => {
                update_set_unset(
                    d,
                    $attr,
                    |v| {
                        set.$field = Some(v);
                        set_attrs.push($attr);
                    },
                    || {
                        unset.$field = true;
                        unset_attrs.push($attr);
                    },
                )?
            };
        }
        set_or_unset!(MIN_INSTANCES, min_instances);
        set_or_unset!(MAX_INSTANCES, max_instances);
        set_or_unset!(AUTO_SUSPEND_SECS, auto_suspend_secs);
        set_or_unset!(MIN_READY_INSTANCES, min_ready_instances);
        set_or_unset!(QUERY_WAREHOUSE, query_warehouse);
        set_or_unset!(AUTO_RESUME, auto_resume);
        set_or_unset!(COMMENT, comment);

        if d.has_change(EXTERNAL_ACCESS_INTEGRATIONS) {
            let integrations = integrations(d)?;
            if integrations.is_empty() {
                unset.external_access_integrations = true;
                unset_attrs.push(EXTERNAL_ACCESS_INTEGRATIONS);
            } else {
                set.external_access_integrations = Some(integrations);
                set_attrs.push(EXTERNAL_ACCESS_INTEGRATIONS);
            }
        }

        if !set.is_empty() {
            services
                .alter(ctx, &AlterService::new(id.clone(), ServiceAction::Set(set)))
                .await?;
            persist_all(d, &set_attrs);
        }
        if !unset.is_empty() {
            services
                .alter(ctx, &AlterService::new(id, ServiceAction::Unset(unset)))
                .await?;
            persist_all(d, &unset_attrs);
        }
        Ok(())
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
