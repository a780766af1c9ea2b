//! Marketplace listings: account-level objects that publish a share or application package.

use serde::Serialize;

use crate::{
    error::{ProviderError, Result},
    sdk::{
        client::{Client, FromRecord, RequestContext, ignore_not_found},
        identifier::{AccountObjectIdentifier, ObjectIdentifier},
        record::{RecordError, RecordRef},
        sql::{Like, Options, ToSql, alter_prefix, dollar_quote, drop_statement, quote_string, show_statement},
    },
};

/// What the listing makes available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingSubject {
    Share(AccountObjectIdentifier),
    ApplicationPackage(AccountObjectIdentifier),
}

/// Where the manifest comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingManifest {
    Inline(String),
    /// A stage location holding `manifest.yml`, e.g. `@db.sch.stage/v1`.
    FromStage(String),
}

fn stage_sql(location: &str) -> String {
    if location.starts_with('@') {
        location.to_string()
    } else {
        format!("@{location}")
    }
}

impl ToSql for ListingManifest {
    fn to_sql(&self) -> String {
        match self {
            ListingManifest::Inline(manifest) => format!("AS {}", dollar_quote(manifest)),
            ListingManifest::FromStage(location) => format!("FROM {}", stage_sql(location)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateListing {
    pub name: AccountObjectIdentifier,
    pub if_not_exists: bool,
    pub subject: Option<ListingSubject>,
    pub manifest: ListingManifest,
    pub publish: Option<bool>,
    pub review: Option<bool>,
    pub comment: Option<String>,
}

impl CreateListing {
    pub fn new(name: AccountObjectIdentifier, manifest: ListingManifest) -> Self {
        CreateListing {
            name,
            if_not_exists: false,
            subject: None,
            manifest,
            publish: None,
            review: None,
            comment: None,
        }
    }
}

impl ToSql for CreateListing {
    fn to_sql(&self) -> String {
        let if_not_exists = if self.if_not_exists { " IF NOT EXISTS" } else { "" };
        let mut sql = format!("CREATE EXTERNAL LISTING{if_not_exists} {}", self.name);
        match &self.subject {
            Some(ListingSubject::Share(share)) => sql.push_str(&format!(" SHARE {share}")),
            Some(ListingSubject::ApplicationPackage(package)) => {
                sql.push_str(&format!(" APPLICATION PACKAGE {package}"))
            }
            None => {}
        }
        sql.push(' ');
        sql.push_str(&self.manifest.to_sql());

        let mut options = Options::new();
        options
            .bool("PUBLISH", self.publish)
            .bool("REVIEW", self.review)
            .text("COMMENT", self.comment.as_deref());
        sql.push_str(&options.to_create_clause());
        sql
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddListingVersion {
    pub version_name: Option<String>,
    pub if_not_exists: bool,
    pub from: String,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingAction {
    RenameTo(AccountObjectIdentifier),
    /// Replaces the inline manifest.
    AlterManifest {
        manifest: String,
        publish: Option<bool>,
        review: Option<bool>,
    },
    AddVersion(AddListingVersion),
    Publish,
    Unpublish,
    Review,
    SetComment(String),
    UnsetComment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterListing {
    pub name: AccountObjectIdentifier,
    pub if_exists: bool,
    pub action: ListingAction,
}

impl AlterListing {
    pub fn new(name: AccountObjectIdentifier, action: ListingAction) -> Self {
        AlterListing {
            name,
            if_exists: false,
            action,
        }
    }
}

impl ToSql for AlterListing {
    fn to_sql(&self) -> String {
        let prefix = alter_prefix("LISTING", &self.name, self.if_exists);
        match &self.action {
            ListingAction::RenameTo(new_name) => format!("{prefix} RENAME TO {new_name}"),
            ListingAction::AlterManifest {
                manifest,
                publish,
                review,
            } => {
                let mut options = Options::new();
                options.bool("PUBLISH", *publish).bool("REVIEW", *review);
                format!("{prefix} AS {}{}", dollar_quote(manifest), options.to_create_clause())
            }
            ListingAction::AddVersion(version) => {
                let mut sql = format!("{prefix} ADD VERSION");
                if version.if_not_exists {
                    sql.push_str(" IF NOT EXISTS");
                }
                if let Some(ref name) = version.version_name {
                    sql.push_str(&format!(" {name}"));
                }
                sql.push_str(&format!(" FROM {}", stage_sql(&version.from)));
                if let Some(ref comment) = version.comment {
                    sql.push_str(&format!(" COMMENT = {}", quote_string(comment)));
                }
                sql
            }
            ListingAction::Publish => format!("{prefix} PUBLISH"),
            ListingAction::Unpublish => format!("{prefix} UNPUBLISH"),
            ListingAction::Review => format!("{prefix} REVIEW"),
            ListingAction::SetComment(comment) => format!("{prefix} SET COMMENT = {}", quote_string(comment)),
            ListingAction::UnsetComment => format!("{prefix} UNSET COMMENT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropListing {
    pub name: AccountObjectIdentifier,
    pub if_exists: bool,
}

impl ToSql for DropListing {
    fn to_sql(&self) -> String {
        drop_statement("LISTING", &self.name, self.if_exists)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShowListings {
    pub like: Option<Like>,
    pub limit: Option<u64>,
}

impl ToSql for ShowListings {
    fn to_sql(&self) -> String {
        show_statement("LISTINGS", self.like.as_ref(), None, self.limit)
    }
}

/// One row of `SHOW LISTINGS`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub global_name: String,
    pub name: String,
    pub title: String,
    pub subtitle: String,
    pub profile: String,
    pub created_on: String,
    pub updated_on: String,
    pub published_on: String,
    pub state: String,
    pub review_state: String,
    pub comment: String,
    pub owner: String,
    pub owner_role_type: String,
    pub regions: String,
    pub target_accounts: String,
    pub is_monetized: bool,
    pub is_application: bool,
    pub is_targeted: bool,
}

impl Listing {
    pub fn id(&self) -> AccountObjectIdentifier {
        AccountObjectIdentifier::new(self.name.clone())
    }

    pub fn is_published(&self) -> bool {
        self.state.eq_ignore_ascii_case("PUBLISHED")
    }
}

impl FromRecord for Listing {
    fn from_record(r: &RecordRef<'_>) -> Result<Self, RecordError> {
        Ok(Listing {
            global_name: r.get_string("global_name").unwrap_or_default(),
            name: r.require_string("name")?,
            title: r.get_string("title").unwrap_or_default(),
            subtitle: r.get_string("subtitle").unwrap_or_default(),
            profile: r.get_string("profile").unwrap_or_default(),
            created_on: r.get_string("created_on").unwrap_or_default(),
            updated_on: r.get_string("updated_on").unwrap_or_default(),
            published_on: r.get_string("published_on").unwrap_or_default(),
            state: r.get_string("state").unwrap_or_default(),
            review_state: r.get_string("review_state").unwrap_or_default(),
            comment: r.get_string("comment").unwrap_or_default(),
            owner: r.get_string("owner").unwrap_or_default(),
            owner_role_type: r.get_string("owner_role_type").unwrap_or_default(),
            regions: r.get_string("regions").unwrap_or_default(),
            target_accounts: r.get_string("target_accounts").unwrap_or_default(),
            is_monetized: r.get_bool("is_monetized")?.unwrap_or_default(),
            is_application: r.get_bool("is_application")?.unwrap_or_default(),
            is_targeted: r.get_bool("is_targeted")?.unwrap_or_default(),
        })
    }
}

/// `DESCRIBE LISTING`: the SHOW columns plus the manifest and what it is attached to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListingDetails {
    #[serde(flatten)]
    pub listing: Listing,
    pub description: String,
    pub manifest_yaml: String,
    pub share: String,
    pub application_package: String,
    pub live_version_uri: String,
}

impl FromRecord for ListingDetails {
    fn from_record(r: &RecordRef<'_>) -> Result<Self, RecordError> {
        Ok(ListingDetails {
            listing: Listing::from_record(r)?,
            description: r.get_string("description").unwrap_or_default(),
            manifest_yaml: r.get_string("manifest_yaml").unwrap_or_default(),
            share: r.get_string("share").unwrap_or_default(),
            application_package: r.get_string("application_package").unwrap_or_default(),
            live_version_uri: r.get_string("live_version_uri").unwrap_or_default(),
        })
    }
}

pub struct Listings<'a> {
    client: &'a Client,
}

impl<'a> Listings<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Listings { client }
    }

    pub async fn create(&self, ctx: &RequestContext, request: &CreateListing) -> Result<()> {
        self.client.exec(ctx, &request.to_sql()).await
    }

    pub async fn alter(&self, ctx: &RequestContext, request: &AlterListing) -> Result<()> {
        self.client.exec(ctx, &request.to_sql()).await
    }

    pub async fn drop(&self, ctx: &RequestContext, request: &DropListing) -> Result<()> {
        self.client
            .drop_object(ctx, &request.to_sql(), &request.name.fully_qualified_name())
            .await
    }

    pub async fn drop_safely(&self, ctx: &RequestContext, id: &AccountObjectIdentifier) -> Result<()> {
        let request = DropListing {
            name: id.clone(),
            if_exists: true,
        };
        ignore_not_found(self.drop(ctx, &request).await)
    }

    pub async fn show(&self, ctx: &RequestContext, request: &ShowListings) -> Result<Vec<Listing>> {
        self.client.query_as(ctx, &request.to_sql()).await
    }

    pub async fn show_by_id(&self, ctx: &RequestContext, id: &AccountObjectIdentifier) -> Result<Listing> {
        let request = ShowListings {
            like: Some(Like::new(id.name())),
            limit: None,
        };
        self.client
            .show_one(ctx, &request.to_sql(), &id.fully_qualified_name(), |l: &Listing| {
                l.name == id.name()
            })
            .await
    }

    pub async fn show_by_id_safely(&self, ctx: &RequestContext, id: &AccountObjectIdentifier) -> Result<Listing> {
        self.show_by_id(ctx, id)
            .await
            .map_err(|e| e.classify_not_found(&id.fully_qualified_name()))
    }

    pub async fn describe(&self, ctx: &RequestContext, id: &AccountObjectIdentifier) -> Result<ListingDetails> {
        let object = id.fully_qualified_name();
        self.client
            .describe_as::<ListingDetails>(ctx, &format!("DESCRIBE LISTING {object}"), &object)
            .await?
            .into_iter()
            .next()
            .ok_or(ProviderError::ObjectNotFound(object))
    }
}
