use async_trait::async_trait;
use serde_json::Value;

use crate::{
    error::Result,
    provider::{
        Capabilities, ManagedResource, ReadOutcome,
        attributes::{
            ShowMapping, computed_if_any_attribute_changed, create_builder, handle_external_changes_in_show,
            update_set_unset,
        },
        data::{DESCRIBE_OUTPUT, FULLY_QUALIFIED_NAME, ResourceData, SHOW_OUTPUT},
        diff::CustomDiff,
        schema::{Attribute, Schema},
        upgrade::StateUpgrader,
    },
    resources::{
        common::{
            COMMENT, DATABASE, NAME, SCHEMA, comment, found, fully_qualified_name, import_schema_object, name_part,
            persist_all, schema_object_id, schema_object_id_from_config, set_identifiers, set_output,
        },
        policy::{
            ARGUMENT, BODY, argument, body, log_body_change, policy_arguments, reconciled_arguments, reconciled_body,
            upgrade_row_access_policy_v0,
        },
    },
    sdk::{
        client::{Client, RequestContext},
        identifier::ObjectIdentifier,
        row_access_policies::{AlterRowAccessPolicy, CreateRowAccessPolicy, RowAccessPolicyAction},
    },
};

pub struct RowAccessPolicyResource;

#[async_trait]
impl ManagedResource for RowAccessPolicyResource {
    fn name(&self) -> &'static str {
        "snowflake_row_access_policy"
    }

    fn schema(&self) -> Schema {
        Schema::new(1)
            .with_attribute(DATABASE, name_part().with_force_new())
            .with_attribute(SCHEMA, name_part().with_force_new())
            .with_attribute(NAME, name_part())
            .with_attribute(ARGUMENT, argument())
            .with_attribute(BODY, body())
            .with_attribute(COMMENT, comment())
            .with_attribute(FULLY_QUALIFIED_NAME, fully_qualified_name())
            .with_attribute(SHOW_OUTPUT, Attribute::output())
            .with_attribute(DESCRIBE_OUTPUT, Attribute::output())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            has_describe: true,
            has_rename: true,
            has_state_upgrader: true,
            ..Default::default()
        }
    }

    fn state_upgraders(&self) -> Vec<StateUpgrader> {
        vec![StateUpgrader {
            version: 0,
            upgrade: upgrade_row_access_policy_v0,
        }]
    }

    fn custom_diff(&self, d: &ResourceData) -> Result<CustomDiff> {
        let mut diff = CustomDiff::default();
        computed_if_any_attribute_changed(d, &mut diff, SHOW_OUTPUT, &[NAME, COMMENT]);
        computed_if_any_attribute_changed(d, &mut diff, DESCRIBE_OUTPUT, &[NAME, BODY]);
        Ok(diff)
    }

    async fn create(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<()> {
        let id = schema_object_id_from_config(d);
        let mut request = CreateRowAccessPolicy::new(id.clone(), policy_arguments(d)?, d.get_str(BODY));
        create_builder(d, COMMENT, |v| request.comment = Some(v))?;

        client.row_access_policies().create(ctx, &request).await?;
        set_identifiers(d, &id);
        Ok(())
    }

    async fn read(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<ReadOutcome> {
        let id = schema_object_id(d)?;
        let policies = client.row_access_policies();
        let Some(policy) = found(policies.show_by_id_safely(ctx, &id).await)? else {
            return Ok(ReadOutcome::Gone);
        };
        let Some(details) = found(policies.describe(ctx, &id).await)? else {
            return Ok(ReadOutcome::Gone);
        };

        handle_external_changes_in_show(
            d,
            &[ShowMapping::new(COMMENT, COMMENT, policy.comment.clone(), policy.comment.clone())],
        );

        d.set(DATABASE, policy.database_name.clone());
        d.set(SCHEMA, policy.schema_name.clone());
        d.set(NAME, policy.name.clone());
        let state_arguments = d.get_list(ARGUMENT);
        d.set(ARGUMENT, reconciled_arguments(&state_arguments, &details.arguments()?));
        let state_body = d.get_raw(BODY).and_then(Value::as_str).map(str::to_string);
        d.set(BODY, reconciled_body(state_body.as_deref(), &details.body));
        d.set(FULLY_QUALIFIED_NAME, id.fully_qualified_name());
        set_output(d, SHOW_OUTPUT, &policy)?;
        set_output(d, DESCRIBE_OUTPUT, &details)?;
        Ok(ReadOutcome::Found)
    }

    async fn update(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<()> {
        let mut id = schema_object_id(d)?;
        let policies = client.row_access_policies();

        if d.has_change(NAME) {
            let new_id = id.with_name(d.get_str(NAME));
            policies
                .alter(ctx, &AlterRowAccessPolicy::new(id, RowAccessPolicyAction::RenameTo(new_id.clone())))
                .await?;
            set_identifiers(d, &new_id);
            persist_all(d, &[NAME, FULLY_QUALIFIED_NAME]);
            id = new_id;
        }

        if d.has_change(BODY) {
            let (old, new) = (d.get_old_str(BODY), d.get_str(BODY));
            log_body_change(&id.fully_qualified_name(), &old, &new);
            policies
                .alter(ctx, &AlterRowAccessPolicy::new(id.clone(), RowAccessPolicyAction::SetBody(new)))
                .await?;
            d.persist(BODY);
        }

        let mut set_comment: Option<String> = None;
        let mut unset_comment = false;
        update_set_unset(d, COMMENT, |v| set_comment = Some(v), || unset_comment = true)?;
        let action = match (set_comment, unset_comment) {
            (Some(comment), _) => Some(RowAccessPolicyAction::SetComment(comment)),
            (None, true) => Some(RowAccessPolicyAction::UnsetComment),
            (None, false) => None,
        };
        if let Some(action) = action {
            policies.alter(ctx, &AlterRowAccessPolicy::new(id, action)).await?;
            d.persist(COMMENT);
        }
        Ok(())
    }

    async fn delete(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<()> {
        let id = schema_object_id(d)?;
        client.row_access_policies().drop_safely(ctx, &id).await?;
        d.clear();
        Ok(())
    }

    fn import(&self, id: &str, d: &mut ResourceData) -> Result<()> {
        import_schema_object(id, d)
    }
}
