use serde::Serialize;

use crate::{
    error::Result,
    sdk::{
        client::{Client, FromRecord, RequestContext, ignore_not_found},
        identifier::{ObjectIdentifier, SchemaObjectIdentifier},
        record::{RecordError, RecordRef},
        sql::{In, Like, Options, ToSql, alter_prefix, create_prefix, drop_statement, show_statement},
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateImageRepository {
    pub name: SchemaObjectIdentifier,
    pub or_replace: bool,
    pub if_not_exists: bool,
    pub comment: Option<String>,
}

impl CreateImageRepository {
    pub fn new(name: SchemaObjectIdentifier) -> Self {
        CreateImageRepository {
            name,
            or_replace: false,
            if_not_exists: false,
            comment: None,
        }
    }
}

impl ToSql for CreateImageRepository {
    fn to_sql(&self) -> String {
        let mut sql = create_prefix("IMAGE REPOSITORY", &self.name, self.or_replace, self.if_not_exists);
        let mut options = Options::new();
        options.text("COMMENT", self.comment.as_deref());
        sql.push_str(&options.to_create_clause());
        sql
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageRepositorySet {
    pub comment: Option<String>,
}

impl ImageRepositorySet {
    pub fn is_empty(&self) -> bool {
        self == &ImageRepositorySet::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageRepositoryUnset {
    pub comment: bool,
}

impl ImageRepositoryUnset {
    pub fn is_empty(&self) -> bool {
        self == &ImageRepositoryUnset::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRepositoryAction {
    Set(ImageRepositorySet),
    Unset(ImageRepositoryUnset),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterImageRepository {
    pub name: SchemaObjectIdentifier,
    pub if_exists: bool,
    pub action: ImageRepositoryAction,
}

impl AlterImageRepository {
    pub fn new(name: SchemaObjectIdentifier, action: ImageRepositoryAction) -> Self {
        AlterImageRepository {
            name,
            if_exists: false,
            action,
        }
    }
}

impl ToSql for AlterImageRepository {
    fn to_sql(&self) -> String {
        let prefix = alter_prefix("IMAGE REPOSITORY", &self.name, self.if_exists);
        match &self.action {
            ImageRepositoryAction::Set(set) => {
                let mut options = Options::new();
                options.text("COMMENT", set.comment.as_deref());
                format!("{prefix} SET {}", options.to_set_list())
            }
            ImageRepositoryAction::Unset(_) => format!("{prefix} UNSET COMMENT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropImageRepository {
    pub name: SchemaObjectIdentifier,
    pub if_exists: bool,
}

impl ToSql for DropImageRepository {
    fn to_sql(&self) -> String {
        drop_statement("IMAGE REPOSITORY", &self.name, self.if_exists)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShowImageRepositories {
    pub like: Option<Like>,
    pub scope: Option<In>,
}

impl ToSql for ShowImageRepositories {
    fn to_sql(&self) -> String {
        show_statement("IMAGE REPOSITORIES", self.like.as_ref(), self.scope.as_ref(), None)
    }
}

/// One row of `SHOW IMAGE REPOSITORIES`. There is no DESCRIBE for this kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImageRepository {
    pub created_on: String,
    pub name: String,
    pub database_name: String,
    pub schema_name: String,
    pub repository_url: String,
    pub owner: String,
    pub owner_role_type: String,
    pub comment: String,
    pub privatelink_repository_url: String,
}

impl ImageRepository {
    pub fn id(&self) -> SchemaObjectIdentifier {
        SchemaObjectIdentifier::new(self.database_name.clone(), self.schema_name.clone(), self.name.clone())
    }
}

impl FromRecord for ImageRepository {
    fn from_record(r: &RecordRef<'_>) -> Result<Self, RecordError> {
        Ok(ImageRepository {
            created_on: r.get_string("created_on").unwrap_or_default(),
            name: r.require_string("name")?,
            database_name: r.require_string("database_name")?,
            schema_name: r.require_string("schema_name")?,
            repository_url: r.get_string("repository_url").unwrap_or_default(),
            owner: r.get_string("owner").unwrap_or_default(),
            owner_role_type: r.get_string("owner_role_type").unwrap_or_default(),
            comment: r.get_string("comment").unwrap_or_default(),
            privatelink_repository_url: r.get_string("privatelink_repository_url").unwrap_or_default(),
        })
    }
}

pub struct ImageRepositories<'a> {
    client: &'a Client,
}

impl<'a> ImageRepositories<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        ImageRepositories { client }
    }

    pub async fn create(&self, ctx: &RequestContext, request: &CreateImageRepository) -> Result<()> {
        self.client.exec(ctx, &request.to_sql()).await
    }

    pub async fn alter(&self, ctx: &RequestContext, request: &AlterImageRepository) -> Result<()> {
        self.client.exec(ctx, &request.to_sql()).await
    }

    pub async fn drop(&self, ctx: &RequestContext, request: &DropImageRepository) -> Result<()> {
        self.client
            .drop_object(ctx, &request.to_sql(), &request.name.fully_qualified_name())
            .await
    }

    pub async fn drop_safely(&self, ctx: &RequestContext, id: &SchemaObjectIdentifier) -> Result<()> {
        let request = DropImageRepository {
            name: id.clone(),
            if_exists: true,
        };
        ignore_not_found(self.drop(ctx, &request).await)
    }

    pub async fn show(&self, ctx: &RequestContext, request: &ShowImageRepositories) -> Result<Vec<ImageRepository>> {
        self.client.query_as(ctx, &request.to_sql()).await
    }

    pub async fn show_by_id(&self, ctx: &RequestContext, id: &SchemaObjectIdentifier) -> Result<ImageRepository> {
        let request = ShowImageRepositories {
            like: Some(Like::new(id.name())),
            scope: Some(In::Schema(id.schema_id())),
        };
        self.client
            .show_one(ctx, &request.to_sql(), &id.fully_qualified_name(), |r: &ImageRepository| {
                r.name == id.name()
            })
            .await
    }

    pub async fn show_by_id_safely(&self, ctx: &RequestContext, id: &SchemaObjectIdentifier) -> Result<ImageRepository> {
        self.show_by_id(ctx, id)
            .await
            .map_err(|e| e.classify_not_found(&id.fully_qualified_name()))
    }
}
