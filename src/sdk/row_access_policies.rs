use crate::{
    error::{ProviderError, Result},
    sdk::{
        client::{Client, RequestContext, ignore_not_found},
        identifier::{ObjectIdentifier, SchemaObjectIdentifier},
        policies::{Policy, PolicyArgument, PolicyDetails, arguments_sql},
        sql::{In, Like, Options, ToSql, alter_prefix, create_prefix, drop_statement, quote_string, show_statement},
    },
};

/// Row access policies always return BOOLEAN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRowAccessPolicy {
    pub name: SchemaObjectIdentifier,
    pub or_replace: bool,
    pub if_not_exists: bool,
    pub arguments: Vec<PolicyArgument>,
    pub body: String,
    pub comment: Option<String>,
}

impl CreateRowAccessPolicy {
    pub fn new(name: SchemaObjectIdentifier, arguments: Vec<PolicyArgument>, body: impl Into<String>) -> Self {
        CreateRowAccessPolicy {
            name,
            or_replace: false,
            if_not_exists: false,
            arguments,
            body: body.into(),
            comment: None,
        }
    }
}

impl ToSql for CreateRowAccessPolicy {
    fn to_sql(&self) -> String {
        let mut sql = create_prefix("ROW ACCESS POLICY", &self.name, self.or_replace, self.if_not_exists);
        sql.push_str(&format!(" AS {} RETURNS BOOLEAN -> {}", arguments_sql(&self.arguments), self.body));
        let mut options = Options::new();
        options.text("COMMENT", self.comment.as_deref());
        sql.push_str(&options.to_create_clause());
        sql
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowAccessPolicyAction {
    RenameTo(SchemaObjectIdentifier),
    SetBody(String),
    SetComment(String),
    UnsetComment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterRowAccessPolicy {
    pub name: SchemaObjectIdentifier,
    pub if_exists: bool,
    pub action: RowAccessPolicyAction,
}

impl AlterRowAccessPolicy {
    pub fn new(name: SchemaObjectIdentifier, action: RowAccessPolicyAction) -> Self {
        AlterRowAccessPolicy {
            name,
            if_exists: false,
            action,
        }
    }
}

impl ToSql for AlterRowAccessPolicy {
    fn to_sql(&self) -> String {
        let prefix = alter_prefix("ROW ACCESS POLICY", &self.name, self.if_exists);
        match &self.action {
            RowAccessPolicyAction::RenameTo(new_name) => format!("{prefix} RENAME TO {new_name}"),
            RowAccessPolicyAction::SetBody(body) => format!("{prefix} SET BODY -> {body}"),
            RowAccessPolicyAction::SetComment(comment) => format!("{prefix} SET COMMENT = {}", quote_string(comment)),
            RowAccessPolicyAction::UnsetComment => format!("{prefix} UNSET COMMENT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropRowAccessPolicy {
    pub name: SchemaObjectIdentifier,
    pub if_exists: bool,
}

impl ToSql for DropRowAccessPolicy {
    fn to_sql(&self) -> String {
        drop_statement("ROW ACCESS POLICY", &self.name, self.if_exists)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShowRowAccessPolicies {
    pub like: Option<Like>,
    pub scope: Option<In>,
    pub limit: Option<u64>,
}

impl ToSql for ShowRowAccessPolicies {
    fn to_sql(&self) -> String {
        show_statement("ROW ACCESS POLICIES", self.like.as_ref(), self.scope.as_ref(), self.limit)
    }
}

pub struct RowAccessPolicies<'a> {
    client: &'a Client,
}

impl<'a> RowAccessPolicies<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        RowAccessPolicies { client }
    }

    pub async fn create(&self, ctx: &RequestContext, request: &CreateRowAccessPolicy) -> Result<()> {
        self.client.exec(ctx, &request.to_sql()).await
    }

    pub async fn alter(&self, ctx: &RequestContext, request: &AlterRowAccessPolicy) -> Result<()> {
        self.client.exec(ctx, &request.to_sql()).await
    }

    pub async fn drop(&self, ctx: &RequestContext, request: &DropRowAccessPolicy) -> Result<()> {
        self.client
            .drop_object(ctx, &request.to_sql(), &request.name.fully_qualified_name())
            .await
    }

    pub async fn drop_safely(&self, ctx: &RequestContext, id: &SchemaObjectIdentifier) -> Result<()> {
        let request = DropRowAccessPolicy {
            name: id.clone(),
            if_exists: true,
        };
        ignore_not_found(self.drop(ctx, &request).await)
    }

    pub async fn show(&self, ctx: &RequestContext, request: &ShowRowAccessPolicies) -> Result<Vec<Policy>> {
        self.client.query_as(ctx, &request.to_sql()).await
    }

    pub async fn show_by_id(&self, ctx: &RequestContext, id: &SchemaObjectIdentifier) -> Result<Policy> {
        let request = ShowRowAccessPolicies {
            like: Some(Like::new(id.name())),
            scope: Some(In::Schema(id.schema_id())),
            limit: None,
        };
        self.client
            .show_one(ctx, &request.to_sql(), &id.fully_qualified_name(), |p: &Policy| {
                p.name == id.name()
            })
            .await
    }

    pub async fn show_by_id_safely(&self, ctx: &RequestContext, id: &SchemaObjectIdentifier) -> Result<Policy> {
        self.show_by_id(ctx, id)
            .await
            .map_err(|e| e.classify_not_found(&id.fully_qualified_name()))
    }

    pub async fn describe(&self, ctx: &RequestContext, id: &SchemaObjectIdentifier) -> Result<PolicyDetails> {
        let object = id.fully_qualified_name();
        self.client
            .describe_as::<PolicyDetails>(ctx, &format!("DESCRIBE ROW ACCESS POLICY {object}"), &object)
            .await?
            .into_iter()
            .next()
            .ok_or(ProviderError::ObjectNotFound(object))
    }
}
