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
        schema::{Attribute, AttributeType, Schema},
    },
    resources::common::{
        COMMENT, DATABASE, NAME, SCHEMA, comment, found, fully_qualified_name, import_schema_object, name_part,
        schema_object_id, schema_object_id_from_config, set_identifiers, set_output,
    },
    sdk::{
        client::{Client, RequestContext},
        identifier::ObjectIdentifier,
        image_repositories::{
            AlterImageRepository, CreateImageRepository, ImageRepositoryAction, ImageRepositorySet,
            ImageRepositoryUnset,
        },
    },
};

const REPOSITORY_URL: &str = "repository_url";

pub struct ImageRepositoryResource;

#[async_trait]
impl ManagedResource for ImageRepositoryResource {
    fn name(&self) -> &'static str {
        "snowflake_image_repository"
    }

    fn schema(&self) -> Schema {
        Schema::new(0)
            .with_attribute(DATABASE, name_part().with_force_new())
            .with_attribute(SCHEMA, name_part().with_force_new())
            .with_attribute(NAME, name_part().with_force_new())
            .with_attribute(COMMENT, comment())
            .with_attribute(
                REPOSITORY_URL,
                Attribute::computed(AttributeType::String)
                    .with_description("Registry URL images are pushed to, e.g. with docker push."),
            )
            .with_attribute(FULLY_QUALIFIED_NAME, fully_qualified_name())
            .with_attribute(SHOW_OUTPUT, Attribute::output())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    fn custom_diff(&self, d: &ResourceData) -> Result<CustomDiff> {
        let mut diff = CustomDiff::default();
        computed_if_any_attribute_changed(d, &mut diff, SHOW_OUTPUT, &[COMMENT]);
        Ok(diff)
    }

    async fn create(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<()> {
        let id = schema_object_id_from_config(d);
        let mut request = CreateImageRepository::new(id.clone());
        create_builder(d, COMMENT, |v| request.comment = Some(v))?;

        client.image_repositories().create(ctx, &request).await?;
        set_identifiers(d, &id);
        Ok(())
    }

    async fn read(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<ReadOutcome> {
        let id = schema_object_id(d)?;
        let Some(repository) = found(client.image_repositories().show_by_id_safely(ctx, &id).await)? else {
            return Ok(ReadOutcome::Gone);
        };

        handle_external_changes_in_show(
            d,
            &[ShowMapping::new(
                COMMENT,
                COMMENT,
                repository.comment.clone(),
                repository.comment.clone(),
            )],
        );

        d.set(DATABASE, repository.database_name.clone());
        d.set(SCHEMA, repository.schema_name.clone());
        d.set(NAME, repository.name.clone());
        d.set(REPOSITORY_URL, repository.repository_url.clone());
        d.set(FULLY_QUALIFIED_NAME, id.fully_qualified_name());
        set_output(d, SHOW_OUTPUT, &repository)?;
        Ok(ReadOutcome::Found)
    }

    async fn update(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<()> {
        let id = schema_object_id(d)?;
        let mut set = ImageRepositorySet::default();
        let mut unset = ImageRepositoryUnset::default();
        update_set_unset(d, COMMENT, |v| set.comment = Some(v), || unset.comment = true)?;

        let repositories = client.image_repositories();
        if !set.is_empty() {
            repositories
                .alter(ctx, &AlterImageRepository::new(id.clone(), ImageRepositoryAction::Set(set)))
                .await?;
            d.persist(COMMENT);
        }
        if !unset.is_empty() {
            repositories
                .alter(ctx, &AlterImageRepository::new(id, ImageRepositoryAction::Unset(unset)))
                .await?;
            d.persist(COMMENT);
        }
        Ok(())
    }

    async fn delete(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<()> {
        let id = schema_object_id(d)?;
        client.image_repositories().drop_safely(ctx, &id).await?;
        d.clear();
        Ok(())
    }

    fn import(&self, id: &str, d: &mut ResourceData) -> Result<()> {
        import_schema_object(id, d)
    }
}
