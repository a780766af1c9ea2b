use crate::{
    error::{ProviderError, Result},
    sdk::{
        client::{Client, RequestContext, ignore_not_found},
        datatypes::DataType,
        identifier::{ObjectIdentifier, SchemaObjectIdentifier},
        policies::{Policy, PolicyArgument, PolicyDetails, arguments_sql},
        sql::{In, Like, Options, ToSql, alter_prefix, create_prefix, drop_statement, quote_string, show_statement},
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateMaskingPolicy {
    pub name: SchemaObjectIdentifier,
    pub or_replace: bool,
    pub if_not_exists: bool,
    pub arguments: Vec<PolicyArgument>,
    pub returns: DataType,
    pub body: String,
    pub comment: Option<String>,
    pub exempt_other_policies: Option<bool>,
}

impl CreateMaskingPolicy {
    pub fn new(name: SchemaObjectIdentifier, arguments: Vec<PolicyArgument>, returns: DataType, body: impl Into<String>) -> Self {
        CreateMaskingPolicy {
            name,
            or_replace: false,
            if_not_exists: false,
            arguments,
            returns,
            body: body.into(),
            comment: None,
            exempt_other_policies: None,
        }
    }
}

impl ToSql for CreateMaskingPolicy {
    fn to_sql(&self) -> String {
        let mut sql = create_prefix("MASKING POLICY", &self.name, self.or_replace, self.if_not_exists);
        sql.push_str(&format!(
            " AS {} RETURNS {} -> {}",
            arguments_sql(&self.arguments),
            self.returns.to_sql(),
            self.body
        ));

        let mut options = Options::new();
        options
            .text("COMMENT", self.comment.as_deref())
            .bool("EXEMPT_OTHER_POLICIES", self.exempt_other_policies);
        sql.push_str(&options.to_create_clause());
        sql
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaskingPolicyAction {
    RenameTo(SchemaObjectIdentifier),
    SetBody(String),
    SetComment(String),
    UnsetComment,
    SetExemptOtherPolicies(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterMaskingPolicy {
    pub name: SchemaObjectIdentifier,
    pub if_exists: bool,
    pub action: MaskingPolicyAction,
}

impl AlterMaskingPolicy {
    pub fn new(name: SchemaObjectIdentifier, action: MaskingPolicyAction) -> Self {
        AlterMaskingPolicy {
            name,
            if_exists: false,
            action,
        }
    }
}

impl ToSql for AlterMaskingPolicy {
    fn to_sql(&self) -> String {
        let prefix = alter_prefix("MASKING POLICY", &self.name, self.if_exists);
        match &self.action {
            MaskingPolicyAction::RenameTo(new_name) => format!("{prefix} RENAME TO {new_name}"),
            MaskingPolicyAction::SetBody(body) => format!("{prefix} SET BODY -> {body}"),
            MaskingPolicyAction::SetComment(comment) => format!("{prefix} SET COMMENT = {}", quote_string(comment)),
            MaskingPolicyAction::UnsetComment => format!("{prefix} UNSET COMMENT"),
            MaskingPolicyAction::SetExemptOtherPolicies(exempt) => {
                let mut options = Options::new();
                options.bool("EXEMPT_OTHER_POLICIES", Some(*exempt));
                format!("{prefix} SET {}", options.to_set_list())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropMaskingPolicy {
    pub name: SchemaObjectIdentifier,
    pub if_exists: bool,
}

impl ToSql for DropMaskingPolicy {
    fn to_sql(&self) -> String {
        drop_statement("MASKING POLICY", &self.name, self.if_exists)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShowMaskingPolicies {
    pub like: Option<Like>,
    pub scope: Option<In>,
    pub limit: Option<u64>,
}

impl ToSql for ShowMaskingPolicies {
    fn to_sql(&self) -> String {
        show_statement("MASKING POLICIES", self.like.as_ref(), self.scope.as_ref(), self.limit)
    }
}

pub struct MaskingPolicies<'a> {
    client: &'a Client,
}

impl<'a> MaskingPolicies<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        MaskingPolicies { client }
    }

    pub async fn create(&self, ctx: &RequestContext, request: &CreateMaskingPolicy) -> Result<()> {
        self.client.exec(ctx, &request.to_sql()).await
    }

    pub async fn alter(&self, ctx: &RequestContext, request: &AlterMaskingPolicy) -> Result<()> {
        self.client.exec(ctx, &request.to_sql()).await
    }

    pub async fn drop(&self, ctx: &RequestContext, request: &DropMaskingPolicy) -> Result<()> {
        self.client
            .drop_object(ctx, &request.to_sql(), &request.name.fully_qualified_name())
            .await
    }

    pub async fn drop_safely(&self, ctx: &RequestContext, id: &SchemaObjectIdentifier) -> Result<()> {
        let request = DropMaskingPolicy {
            name: id.clone(),
            if_exists: true,
        };
        ignore_not_found(self.drop(ctx, &request).await)
    }

    pub async fn show(&self, ctx: &RequestContext, request: &ShowMaskingPolicies) -> Result<Vec<Policy>> {
        self.client.query_as(ctx, &request.to_sql()).await
    }

    pub async fn show_by_id(&self, ctx: &RequestContext, id: &SchemaObjectIdentifier) -> Result<Policy> {
        let request = ShowMaskingPolicies {
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
            .describe_as::<PolicyDetails>(ctx, &format!("DESCRIBE MASKING POLICY {object}"), &object)
            .await?
            .into_iter()
            .next()
            .ok_or(ProviderError::ObjectNotFound(object))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::sdk::datatypes::parse_data_type;

    fn id() -> SchemaObjectIdentifier {
        SchemaObjectIdentifier::new("DB", "SCH", "MP")
    }

    #[test]
    fn test_create() {
        let mut request = CreateMaskingPolicy::new(
            id(),
            vec![PolicyArgument::new("A", parse_data_type("VARCHAR").unwrap())],
            parse_data_type("VARCHAR").unwrap(),
            "case when current_role() in ('ANALYST') then A else '*****' end",
        );
        assert_eq!(
            request.to_sql(),
            "CREATE MASKING POLICY DB.SCH.MP AS (A VARCHAR(16777216)) RETURNS VARCHAR(16777216) -> \
             case when current_role() in ('ANALYST') then A else '*****' end"
        );

        request.or_replace = true;
        request.comment = Some("masks A".into());
        request.exempt_other_policies = Some(true);
        assert_eq!(
            request.to_sql(),
            "CREATE OR REPLACE MASKING POLICY DB.SCH.MP AS (A VARCHAR(16777216)) RETURNS VARCHAR(16777216) -> \
             case when current_role() in ('ANALYST') then A else '*****' end COMMENT = 'masks A' \
             EXEMPT_OTHER_POLICIES = TRUE"
        );
    }

    #[test]
    fn test_alter() {
        assert_eq!(
            AlterMaskingPolicy::new(id(), MaskingPolicyAction::RenameTo(id().with_name("MP2"))).to_sql(),
            "ALTER MASKING POLICY DB.SCH.MP RENAME TO DB.SCH.MP2"
        );
        assert_eq!(
            AlterMaskingPolicy::new(id(), MaskingPolicyAction::SetBody("'x'".into())).to_sql(),
            "ALTER MASKING POLICY DB.SCH.MP SET BODY -> 'x'"
        );
        assert_eq!(
            AlterMaskingPolicy::new(id(), MaskingPolicyAction::SetComment("c".into())).to_sql(),
            "ALTER MASKING POLICY DB.SCH.MP SET COMMENT = 'c'"
        );
        assert_eq!(
            AlterMaskingPolicy::new(id(), MaskingPolicyAction::UnsetComment).to_sql(),
            "ALTER MASKING POLICY DB.SCH.MP UNSET COMMENT"
        );
        assert_eq!(
            AlterMaskingPolicy::new(id(), MaskingPolicyAction::SetExemptOtherPolicies(false)).to_sql(),
            "ALTER MASKING POLICY DB.SCH.MP SET EXEMPT_OTHER_POLICIES = FALSE"
        );
    }

    #[test]
    fn test_show_and_drop() {
        let show = ShowMaskingPolicies {
            like: Some(Like::new("MP")),
            scope: Some(In::Schema(id().schema_id())),
            limit: Some(1),
        };
        assert_eq!(show.to_sql(), "SHOW MASKING POLICIES LIKE 'MP' IN SCHEMA DB.SCH LIMIT 1");
        let drop = DropMaskingPolicy {
            name: id(),
            if_exists: false,
        };
        assert_eq!(drop.to_sql(), "DROP MASKING POLICY DB.SCH.MP");
    }
}
