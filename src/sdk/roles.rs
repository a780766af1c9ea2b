use serde::Serialize;

use crate::{
    error::Result,
    sdk::{
        client::{Client, FromRecord, RequestContext, ignore_not_found},
        identifier::{AccountObjectIdentifier, ObjectIdentifier},
        record::{RecordError, RecordRef},
        sql::{Like, Options, ToSql, alter_prefix, create_prefix, drop_statement, quote_string, show_statement},
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRole {
    pub name: AccountObjectIdentifier,
    pub or_replace: bool,
    pub if_not_exists: bool,
    pub comment: Option<String>,
}

impl CreateRole {
    pub fn new(name: AccountObjectIdentifier) -> Self {
        CreateRole {
            name,
            or_replace: false,
            if_not_exists: false,
            comment: None,
        }
    }
}

impl ToSql for CreateRole {
    fn to_sql(&self) -> String {
        let mut sql = create_prefix("ROLE", &self.name, self.or_replace, self.if_not_exists);
        let mut options = Options::new();
        options.text("COMMENT", self.comment.as_deref());
        sql.push_str(&options.to_create_clause());
        sql
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleAction {
    RenameTo(AccountObjectIdentifier),
    SetComment(String),
    UnsetComment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterRole {
    pub name: AccountObjectIdentifier,
    pub if_exists: bool,
    pub action: RoleAction,
}

impl AlterRole {
    pub fn new(name: AccountObjectIdentifier, action: RoleAction) -> Self {
        AlterRole {
            name,
            if_exists: false,
            action,
        }
    }
}

impl ToSql for AlterRole {
    fn to_sql(&self) -> String {
        let prefix = alter_prefix("ROLE", &self.name, self.if_exists);
        match &self.action {
            RoleAction::RenameTo(new_name) => format!("{prefix} RENAME TO {new_name}"),
            RoleAction::SetComment(comment) => format!("{prefix} SET COMMENT = {}", quote_string(comment)),
            RoleAction::UnsetComment => format!("{prefix} UNSET COMMENT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropRole {
    pub name: AccountObjectIdentifier,
    pub if_exists: bool,
}

impl ToSql for DropRole {
    fn to_sql(&self) -> String {
        drop_statement("ROLE", &self.name, self.if_exists)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShowRoles {
    pub like: Option<Like>,
}

impl ToSql for ShowRoles {
    fn to_sql(&self) -> String {
        show_statement("ROLES", self.like.as_ref(), None, None)
    }
}

/// One row of `SHOW ROLES`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Role {
    pub created_on: String,
    pub name: String,
    pub is_default: bool,
    pub is_current: bool,
    pub is_inherited: bool,
    pub assigned_to_users: i64,
    pub granted_to_roles: i64,
    pub granted_roles: i64,
    pub owner: String,
    pub comment: String,
}

impl FromRecord for Role {
    fn from_record(r: &RecordRef<'_>) -> Result<Self, RecordError> {
        // SHOW ROLES reports the flags as Y/N.
        let flag = |col: &str| r.get_string(col).is_some_and(|v| v.eq_ignore_ascii_case("Y"));
        Ok(Role {
            created_on: r.get_string("created_on").unwrap_or_default(),
            name: r.require_string("name")?,
            is_default: flag("is_default"),
            is_current: flag("is_current"),
            is_inherited: flag("is_inherited"),
            assigned_to_users: r.get_i64("assigned_to_users")?.unwrap_or_default(),
            granted_to_roles: r.get_i64("granted_to_roles")?.unwrap_or_default(),
            granted_roles: r.get_i64("granted_roles")?.unwrap_or_default(),
            owner: r.get_string("owner").unwrap_or_default(),
            comment: r.get_string("comment").unwrap_or_default(),
        })
    }
}

pub struct Roles<'a> {
    client: &'a Client,
}

impl<'a> Roles<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Roles { client }
    }

    pub async fn create(&self, ctx: &RequestContext, request: &CreateRole) -> Result<()> {
        self.client.exec(ctx, &request.to_sql()).await
    }

    pub async fn alter(&self, ctx: &RequestContext, request: &AlterRole) -> Result<()> {
        self.client.exec(ctx, &request.to_sql()).await
    }

    pub async fn drop(&self, ctx: &RequestContext, request: &DropRole) -> Result<()> {
        self.client
            .drop_object(ctx, &request.to_sql(), &request.name.fully_qualified_name())
            .await
    }

    pub async fn drop_safely(&self, ctx: &RequestContext, id: &AccountObjectIdentifier) -> Result<()> {
        let request = DropRole {
            name: id.clone(),
            if_exists: true,
        };
        ignore_not_found(self.drop(ctx, &request).await)
    }

    pub async fn show(&self, ctx: &RequestContext, request: &ShowRoles) -> Result<Vec<Role>> {
        self.client.query_as(ctx, &request.to_sql()).await
    }

    pub async fn show_by_id(&self, ctx: &RequestContext, id: &AccountObjectIdentifier) -> Result<Role> {
        let request = ShowRoles {
            like: Some(Like::new(id.name())),
        };
        self.client
            .show_one(ctx, &request.to_sql(), &id.fully_qualified_name(), |r: &Role| r.name == id.name())
            .await
    }

    pub async fn show_by_id_safely(&self, ctx: &RequestContext, id: &AccountObjectIdentifier) -> Result<Role> {
        self.show_by_id(ctx, id)
            .await
            .map_err(|e| e.classify_not_found(&id.fully_qualified_name()))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::sdk::record::RowSet;

    #[test]
    fn test_create_and_alter() {
        let id = AccountObjectIdentifier::new("ANALYST");
        let mut create = CreateRole::new(id.clone());
        create.comment = Some("reads things".into());
        assert_eq!(create.to_sql(), "CREATE ROLE ANALYST COMMENT = 'reads things'");

        assert_eq!(
            AlterRole::new(id.clone(), RoleAction::RenameTo(AccountObjectIdentifier::new("reader"))).to_sql(),
            "ALTER ROLE ANALYST RENAME TO \"reader\""
        );
        assert_eq!(
            AlterRole::new(id.clone(), RoleAction::UnsetComment).to_sql(),
            "ALTER ROLE ANALYST UNSET COMMENT"
        );
        assert_eq!(
            DropRole { name: id, if_exists: true }.to_sql(),
            "DROP ROLE IF EXISTS ANALYST"
        );
    }

    #[test]
    fn test_decode_row() {
        let rows = RowSet::from_objects(&json!([{
            "created_on": "2024-01-01",
            "name": "ANALYST",
            "is_default": "N",
            "is_current": "Y",
            "assigned_to_users": "2",
            "owner": "SECURITYADMIN",
            "comment": "",
        }]))
        .unwrap();
        let role = Role::from_record(&rows.first().unwrap()).unwrap();
        assert!(role.is_current);
        assert!(!role.is_default);
        assert_eq!(role.assigned_to_users, 2);
        assert_eq!(role.owner, "SECURITYADMIN");
    }
}
