use async_trait::async_trait;

use crate::{
    error::Result,
    provider::{
        Capabilities, ManagedResource, ReadOutcome,
        attributes::{
            ShowMapping, computed_if_any_attribute_changed, create_builder, handle_external_changes_in_show,
            update_set_unset,
        },
        data::{FULLY_QUALIFIED_NAME, ResourceData, SHOW_OUTPUT},
        diff::CustomDiff,
        schema::{Attribute, Schema},
    },
    resources::common::{
        COMMENT, NAME, account_object_id, account_object_id_from_config, comment, found, fully_qualified_name,
        import_account_object, name_part, persist_all, set_identifiers, set_output,
    },
    sdk::{
        client::{Client, RequestContext},
        identifier::{AccountObjectIdentifier, ObjectIdentifier},
        roles::{AlterRole, CreateRole, RoleAction},
    },
};

pub struct AccountRoleResource;

#[async_trait]
impl ManagedResource for AccountRoleResource {
    fn name(&self) -> &'static str {
        "snowflake_account_role"
    }

    fn schema(&self) -> Schema {
        Schema::new(0)
            .with_attribute(NAME, name_part())
            .with_attribute(COMMENT, comment())
            .with_attribute(FULLY_QUALIFIED_NAME, fully_qualified_name())
            .with_attribute(SHOW_OUTPUT, Attribute::output())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            has_rename: true,
            ..Default::default()
        }
    }

    fn custom_diff(&self, d: &ResourceData) -> Result<CustomDiff> {
        let mut diff = CustomDiff::default();
        computed_if_any_attribute_changed(d, &mut diff, SHOW_OUTPUT, &[NAME, COMMENT]);
        Ok(diff)
    }

    async fn create(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<()> {
        let id = account_object_id_from_config(d);
        let mut request = CreateRole::new(id.clone());
        create_builder(d, COMMENT, |v| request.comment = Some(v))?;

        client.roles().create(ctx, &request).await?;
        set_identifiers(d, &id);
        Ok(())
    }

    async fn read(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<ReadOutcome> {
        let id = account_object_id(d)?;
        let Some(role) = found(client.roles().show_by_id_safely(ctx, &id).await)? else {
            return Ok(ReadOutcome::Gone);
        };

        handle_external_changes_in_show(
            d,
            &[ShowMapping::new(COMMENT, COMMENT, role.comment.clone(), role.comment.clone())],
        );

        d.set(NAME, role.name.clone());
        d.set(FULLY_QUALIFIED_NAME, id.fully_qualified_name());
        set_output(d, SHOW_OUTPUT, &role)?;
        Ok(ReadOutcome::Found)
    }

    async fn update(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<()> {
        let mut id = account_object_id(d)?;
        let roles = client.roles();

        if d.has_change(NAME) {
            let new_id = AccountObjectIdentifier::new(d.get_str(NAME));
            roles
                .alter(ctx, &AlterRole::new(id, RoleAction::RenameTo(new_id.clone())))
                .await?;
            set_identifiers(d, &new_id);
            persist_all(d, &[NAME, FULLY_QUALIFIED_NAME]);
            id = new_id;
        }

        let mut set_comment: Option<String> = None;
        let mut unset_comment = false;
        update_set_unset(d, COMMENT, |v| set_comment = Some(v), || unset_comment = true)?;
        let action = match (set_comment, unset_comment) {
            (Some(comment), _) => Some(RoleAction::SetComment(comment)),
            (None, true) => Some(RoleAction::UnsetComment),
            (None, false) => None,
        };
        if let Some(action) = action {
            roles.alter(ctx, &AlterRole::new(id, action)).await?;
            d.persist(COMMENT);
        }
        Ok(())
    }

    async fn delete(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<()> {
        let id = account_object_id(d)?;
        client.roles().drop_safely(ctx, &id).await?;
        d.clear();
        Ok(())
    }

    fn import(&self, id: &str, d: &mut ResourceData) -> Result<()> {
        import_account_object(id, d)
    }
}
