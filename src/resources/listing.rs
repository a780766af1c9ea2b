//! Marketplace listings. The manifest comes inline or from a stage; staged
//! manifests are versioned, so changing one adds a version instead of
//! rewriting the listing.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::{
    error::{ProviderError, Result},
    provider::{
        Capabilities, ManagedResource, ReadOutcome,
        attributes::{
            ShowMapping, computed_if_any_attribute_changed, create_builder, handle_external_changes_in_show, read_set,
            update_set_unset,
        },
        data::{DESCRIBE_OUTPUT, FULLY_QUALIFIED_NAME, ResourceData, SHOW_OUTPUT},
        diff::CustomDiff,
        schema::{Attribute, AttributeType, Schema},
    },
    resources::common::{
        COMMENT, NAME, account_object_id, account_object_id_from_config, comment, found, fully_qualified_name,
        import_account_object, name_part, optional_reference, persist_all, set_identifiers, set_output,
        validate_yaml_mapping,
    },
    sdk::{
        client::{Client, RequestContext},
        identifier::{AccountObjectIdentifier, IdentifierKind, ObjectIdentifier},
        listings::{AddListingVersion, AlterListing, CreateListing, ListingAction, ListingManifest, ListingSubject},
    },
};

const SHARE: &str = "share";
const APPLICATION_PACKAGE: &str = "application_package";
const MANIFEST: &str = "manifest";
const PUBLISH: &str = "publish";

const FROM_STRING: &str = "from_string";
const FROM_STAGE: &str = "from_stage";
const STAGE: &str = "stage";
const LOCATION: &str = "location";
const VERSION_NAME: &str = "version_name";
const VERSION_COMMENT: &str = "version_comment";

const DEFAULT_PUBLISH: bool = true;

#[derive(Debug, Clone, PartialEq, Eq)]
enum ManifestSource {
    Inline(String),
    Stage {
        stage: String,
        location: String,
        version_name: Option<String>,
        version_comment: Option<String>,
    },
}

impl ManifestSource {
    fn from_value(value: &Value) -> Option<Self> {
        let text = |v: &Value, key: &str| {
            v.get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        if let Some(manifest) = text(value, FROM_STRING) {
            return Some(ManifestSource::Inline(manifest));
        }
        let stage = value.get(FROM_STAGE).filter(|v| v.is_object())?;
        Some(ManifestSource::Stage {
            stage: text(stage, STAGE)?,
            location: text(stage, LOCATION).unwrap_or_default(),
            version_name: text(stage, VERSION_NAME),
            version_comment: text(stage, VERSION_COMMENT),
        })
    }

    fn is_inline(&self) -> bool {
        matches!(self, ManifestSource::Inline(_))
    }

    /// `@stage/location` without the `@`; the statement builder adds it.
    fn stage_path(stage: &str, location: &str) -> String {
        let location = location.trim_matches('/');
        if location.is_empty() {
            stage.to_string()
        } else {
            format!("{stage}/{location}")
        }
    }

    fn to_manifest(&self) -> ListingManifest {
        match self {
            ManifestSource::Inline(manifest) => ListingManifest::Inline(manifest.clone()),
            ManifestSource::Stage { stage, location, .. } => {
                ListingManifest::FromStage(ManifestSource::stage_path(stage, location))
            }
        }
    }
}

fn manifests_equivalent(old: &Value, new: &Value) -> bool {
    match (ManifestSource::from_value(old), ManifestSource::from_value(new)) {
        (Some(ManifestSource::Inline(a)), Some(ManifestSource::Inline(b))) => a.trim_end() == b.trim_end(),
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn validate_manifest(v: &Value) -> std::result::Result<(), String> {
    if v.is_null() {
        return Ok(());
    }
    let inline = v.get(FROM_STRING).filter(|s| s.as_str().is_some_and(|s| !s.is_empty()));
    let staged = v.get(FROM_STAGE).filter(|s| s.is_object());
    match (inline, staged) {
        (Some(_), Some(_)) => Err(format!("only one of {FROM_STRING} and {FROM_STAGE} can be set")),
        (None, None) => Err(format!("one of {FROM_STRING} and {FROM_STAGE} must be set")),
        (Some(manifest), None) => validate_yaml_mapping(manifest),
        (None, Some(stage)) => match stage.get(STAGE).and_then(Value::as_str) {
            Some(s) if !s.is_empty() => Ok(()),
            _ => Err(format!("{FROM_STAGE}.{STAGE} must be set")),
        },
    }
}

fn identifier_or_empty(d: &ResourceData, attr: &str) -> Result<Option<AccountObjectIdentifier>> {
    match d.get_str(attr) {
        s if s.is_empty() => Ok(None),
        s => Ok(Some(AccountObjectIdentifier::parse(&s)?)),
    }
}

pub struct ListingResource;

#[async_trait]
impl ManagedResource for ListingResource {
    fn name(&self) -> &'static str {
        "snowflake_listing"
    }

    fn schema(&self) -> Schema {
        Schema::new(0)
            .with_attribute(NAME, name_part())
            .with_attribute(
                SHARE,
                optional_reference(IdentifierKind::Account).with_force_new(),
            )
            .with_attribute(
                APPLICATION_PACKAGE,
                optional_reference(IdentifierKind::Account).with_force_new(),
            )
            .with_attribute(
                MANIFEST,
                Attribute::required(AttributeType::object([
                    (FROM_STRING, AttributeType::String),
                    (
                        FROM_STAGE,
                        AttributeType::object([
                            (STAGE, AttributeType::String),
                            (LOCATION, AttributeType::String),
                            (VERSION_NAME, AttributeType::String),
                            (VERSION_COMMENT, AttributeType::String),
                        ]),
                    ),
                ]))
                .with_validator(validate_manifest)
                .with_diff_suppress(Arc::new(|_, old, new, _| manifests_equivalent(old, new))),
            )
            .with_attribute(PUBLISH, Attribute::bool_tristate())
            .with_attribute(COMMENT, comment())
            .with_attribute(FULLY_QUALIFIED_NAME, fully_qualified_name())
            .with_attribute(SHOW_OUTPUT, Attribute::output())
            .with_attribute(DESCRIBE_OUTPUT, Attribute::output())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            has_describe: true,
            has_rename: true,
            ..Default::default()
        }
    }

    fn custom_diff(&self, d: &ResourceData) -> Result<CustomDiff> {
        let mut diff = CustomDiff::default();
        // An inline listing cannot take a staged version, nor the other way around.
        if d.has_change(MANIFEST) {
            let old = ManifestSource::from_value(&d.get_old(MANIFEST));
            let new = ManifestSource::from_value(&d.get(MANIFEST));
            if let (Some(old), Some(new)) = (old, new)
                && old.is_inline() != new.is_inline()
            {
                diff.force_new(MANIFEST);
            }
        }
        let watched = [NAME, MANIFEST, PUBLISH, COMMENT];
        computed_if_any_attribute_changed(d, &mut diff, SHOW_OUTPUT, &watched);
        computed_if_any_attribute_changed(d, &mut diff, DESCRIBE_OUTPUT, &watched);
        Ok(diff)
    }

    async fn create(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<()> {
        let id = account_object_id_from_config(d);
        let source = ManifestSource::from_value(&d.get(MANIFEST))
            .ok_or_else(|| ProviderError::Validation(format!("{MANIFEST}: no manifest source given")))?;

        let mut request = CreateListing::new(id.clone(), source.to_manifest());
        request.subject = match (identifier_or_empty(d, SHARE)?, identifier_or_empty(d, APPLICATION_PACKAGE)?) {
            (Some(_), Some(_)) => {
                return Err(ProviderError::Validation(format!(
                    "only one of {SHARE} and {APPLICATION_PACKAGE} can be set"
                )));
            }
            (Some(share), None) => Some(ListingSubject::Share(share)),
            (None, Some(package)) => Some(ListingSubject::ApplicationPackage(package)),
            (None, None) => None,
        };
        create_builder(d, PUBLISH, |v| request.publish = Some(v))?;
        create_builder(d, COMMENT, |v| request.comment = Some(v))?;

        client.listings().create(ctx, &request).await?;
        set_identifiers(d, &id);
        Ok(())
    }

    async fn read(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<ReadOutcome> {
        let id = account_object_id(d)?;
        let listings = client.listings();
        let Some(listing) = found(listings.show_by_id_safely(ctx, &id).await)? else {
            return Ok(ReadOutcome::Gone);
        };
        let Some(details) = found(listings.describe(ctx, &id).await)? else {
            return Ok(ReadOutcome::Gone);
        };

        handle_external_changes_in_show(
            d,
            &[ShowMapping::new(COMMENT, COMMENT, listing.comment.clone(), listing.comment.clone())],
        );

        d.set(NAME, listing.name.clone());
        if d.get_raw(SHARE).is_none() && !details.share.is_empty() {
            d.set(SHARE, details.share.clone());
        }
        if d.get_raw(APPLICATION_PACKAGE).is_none() && !details.application_package.is_empty() {
            d.set(APPLICATION_PACKAGE, details.application_package.clone());
        }
        // Staged manifests are tracked by their source; inline ones by content.
        match ManifestSource::from_value(&d.get(MANIFEST)) {
            Some(ManifestSource::Inline(manifest)) if manifest.trim_end() == details.manifest_yaml.trim_end() => {}
            Some(ManifestSource::Stage { .. }) => {}
            _ if !details.manifest_yaml.is_empty() => {
                d.set(MANIFEST, json!({FROM_STRING: details.manifest_yaml}));
            }
            _ => {}
        }
        read_set(d, PUBLISH, listing.is_published(), &DEFAULT_PUBLISH)?;
        d.set(FULLY_QUALIFIED_NAME, id.fully_qualified_name());
        set_output(d, SHOW_OUTPUT, &listing)?;
        set_output(d, DESCRIBE_OUTPUT, &details)?;
        Ok(ReadOutcome::Found)
    }

    async fn update(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<()> {
        let mut id = account_object_id(d)?;
        let listings = client.listings();

        if d.has_change(NAME) {
            let new_id = AccountObjectIdentifier::new(d.get_str(NAME));
            listings
                .alter(ctx, &AlterListing::new(id, ListingAction::RenameTo(new_id.clone())))
                .await?;
            set_identifiers(d, &new_id);
            persist_all(d, &[NAME, FULLY_QUALIFIED_NAME]);
            id = new_id;
        }

        if d.has_change(MANIFEST) {
            let action = match ManifestSource::from_value(&d.get(MANIFEST)) {
                Some(ManifestSource::Inline(manifest)) => ListingAction::AlterManifest {
                    manifest,
                    publish: None,
                    review: None,
                },
                Some(ManifestSource::Stage {
                    stage,
                    location,
                    version_name,
                    version_comment,
                }) => ListingAction::AddVersion(AddListingVersion {
                    version_name,
                    if_not_exists: true,
                    from: ManifestSource::stage_path(&stage, &location),
                    comment: version_comment,
                }),
                None => return Err(ProviderError::Validation(format!("{MANIFEST}: no manifest source given"))),
            };
            listings.alter(ctx, &AlterListing::new(id.clone(), action)).await?;
            d.persist(MANIFEST);
        }

        let mut publish: Option<bool> = None;
        let mut reset_publish = false;
        update_set_unset(d, PUBLISH, |v| publish = Some(v), || reset_publish = true)?;
        if let Some(publish) = publish.or(reset_publish.then_some(DEFAULT_PUBLISH)) {
            let action = if publish {
                ListingAction::Publish
            } else {
                ListingAction::Unpublish
            };
            listings.alter(ctx, &AlterListing::new(id.clone(), action)).await?;
            d.persist(PUBLISH);
        }

        let mut set_comment: Option<String> = None;
        let mut unset_comment = false;
        update_set_unset(d, COMMENT, |v| set_comment = Some(v), || unset_comment = true)?;
        let action = match (set_comment, unset_comment) {
            (Some(comment), _) => Some(ListingAction::SetComment(comment)),
            (None, true) => Some(ListingAction::UnsetComment),
            (None, false) => None,
        };
        if let Some(action) = action {
            listings.alter(ctx, &AlterListing::new(id, action)).await?;
            d.persist(COMMENT);
        }
        Ok(())
    }

    async fn delete(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<()> {
        let id = account_object_id(d)?;
        let listings = client.listings();
        // A published listing has to be unpublished before it can be dropped.
        if let Some(listing) = found(listings.show_by_id_safely(ctx, &id).await)?
            && listing.is_published()
        {
            listings
                .alter(ctx, &AlterListing::new(id.clone(), ListingAction::Unpublish))
                .await?;
        }
        listings.drop_safely(ctx, &id).await?;
        d.clear();
        Ok(())
    }

    fn import(&self, id: &str, d: &mut ResourceData) -> Result<()> {
        import_account_object(id, d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_source() {
        let inline = json!({"from_string": "title: t\n"});
        assert_eq!(
            ManifestSource::from_value(&inline),
            Some(ManifestSource::Inline("title: t\n".into()))
        );

        let staged = json!({"from_stage": {"stage": "DB.SCH.ST", "location": "/v1/", "version_name": "V1"}});
        let source = ManifestSource::from_value(&staged).unwrap();
        assert_eq!(source.to_manifest(), ListingManifest::FromStage("DB.SCH.ST/v1".into()));
        assert!(!source.is_inline());
    }

    #[test]
    fn test_validate_manifest() {
        assert!(validate_manifest(&json!({"from_string": "title: t"})).is_ok());
        assert!(validate_manifest(&json!({"from_stage": {"stage": "DB.SCH.ST"}})).is_ok());
        assert!(validate_manifest(&json!({})).is_err());
        assert!(validate_manifest(&json!({"from_string": "- not a mapping"})).is_err());
        assert!(validate_manifest(&json!({"from_string": "title: t", "from_stage": {"stage": "S"}})).is_err());
        assert!(validate_manifest(&json!({"from_stage": {"location": "v1"}})).is_err());
    }

    #[test]
    fn test_manifests_equivalent() {
        assert!(manifests_equivalent(
            &json!({"from_string": "title: t\n\n"}),
            &json!({"from_string": "title: t"})
        ));
        assert!(!manifests_equivalent(
            &json!({"from_string": "title: t"}),
            &json!({"from_string": "title: u"})
        ));
    }
}
