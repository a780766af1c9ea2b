//! Role membership grants: `GRANT ROLE r TO ROLE p` and `GRANT ROLE r TO USER u`.

use std::fmt;

use serde::Serialize;

use crate::{
    error::Result,
    sdk::{
        client::{Client, FromRecord, RequestContext, ignore_not_found},
        identifier::{AccountObjectIdentifier, ObjectIdentifier},
        record::{RecordError, RecordRef},
        sql::ToSql,
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Grantee {
    Role(AccountObjectIdentifier),
    User(AccountObjectIdentifier),
}

impl Grantee {
    pub fn kind(&self) -> &'static str {
        match self {
            Grantee::Role(_) => "ROLE",
            Grantee::User(_) => "USER",
        }
    }

    pub fn id(&self) -> &AccountObjectIdentifier {
        match self {
            Grantee::Role(id) | Grantee::User(id) => id,
        }
    }
}

impl fmt::Display for Grantee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantRole {
    pub role: AccountObjectIdentifier,
    pub to: Grantee,
}

impl ToSql for GrantRole {
    fn to_sql(&self) -> String {
        format!("GRANT ROLE {} TO {}", self.role, self.to)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevokeRole {
    pub role: AccountObjectIdentifier,
    pub from: Grantee,
}

impl ToSql for RevokeRole {
    fn to_sql(&self) -> String {
        format!("REVOKE ROLE {} FROM {}", self.role, self.from)
    }
}

/// `SHOW GRANTS OF ROLE r`: everyone the role is granted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowGrantsOfRole {
    pub role: AccountObjectIdentifier,
}

impl ToSql for ShowGrantsOfRole {
    fn to_sql(&self) -> String {
        format!("SHOW GRANTS OF ROLE {}", self.role)
    }
}

/// One row of `SHOW GRANTS OF ROLE`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoleGrant {
    pub created_on: String,
    pub role: String,
    pub granted_to: String,
    pub grantee_name: String,
    pub granted_by: String,
}

impl RoleGrant {
    pub fn is_for(&self, grantee: &Grantee) -> bool {
        self.granted_to.eq_ignore_ascii_case(grantee.kind()) && self.grantee_name == grantee.id().name()
    }
}

/// Grant listings sometimes wrap names in double quotes.
fn unquoted(name: String) -> String {
    let stripped = name.strip_prefix('"').unwrap_or(&name);
    let stripped = stripped.strip_suffix('"').unwrap_or(stripped);
    stripped.to_string()
}

impl FromRecord for RoleGrant {
    fn from_record(r: &RecordRef<'_>) -> Result<Self, RecordError> {
        Ok(RoleGrant {
            created_on: r.get_string("created_on").unwrap_or_default(),
            role: unquoted(r.require_string("role")?),
            granted_to: r.require_string("granted_to")?,
            grantee_name: unquoted(r.require_string("grantee_name")?),
            granted_by: r.get_string("granted_by").unwrap_or_default(),
        })
    }
}

pub struct Grants<'a> {
    client: &'a Client,
}

impl<'a> Grants<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Grants { client }
    }

    pub async fn grant_role(&self, ctx: &RequestContext, request: &GrantRole) -> Result<()> {
        self.client.exec(ctx, &request.to_sql()).await
    }

    pub async fn revoke_role(&self, ctx: &RequestContext, request: &RevokeRole) -> Result<()> {
        self.client.exec(ctx, &request.to_sql()).await
    }

    /// Revoking from a dropped role or user counts as done.
    pub async fn revoke_role_safely(&self, ctx: &RequestContext, request: &RevokeRole) -> Result<()> {
        let object = format!("{} -> {}", request.role, request.from);
        ignore_not_found(
            self.revoke_role(ctx, request)
                .await
                .map_err(|e| e.classify_not_found(&object)),
        )
    }

    pub async fn show_of_role(&self, ctx: &RequestContext, role: &AccountObjectIdentifier) -> Result<Vec<RoleGrant>> {
        let request = ShowGrantsOfRole { role: role.clone() };
        self.client
            .query_as(ctx, &request.to_sql())
            .await
            .map_err(|e| e.classify_not_found(&role.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::sdk::record::RowSet;

    #[test]
    fn test_statements() {
        let role = AccountObjectIdentifier::new("ANALYST");
        let grant = GrantRole {
            role: role.clone(),
            to: Grantee::Role(AccountObjectIdentifier::new("SYSADMIN")),
        };
        assert_eq!(grant.to_sql(), "GRANT ROLE ANALYST TO ROLE SYSADMIN");
        let revoke = RevokeRole {
            role: role.clone(),
            from: Grantee::User(AccountObjectIdentifier::new("jane")),
        };
        assert_eq!(revoke.to_sql(), "REVOKE ROLE ANALYST FROM USER \"jane\"");
        assert_eq!(ShowGrantsOfRole { role }.to_sql(), "SHOW GRANTS OF ROLE ANALYST");
    }

    #[test]
    fn test_decode_and_match() {
        let rows = RowSet::from_objects(&json!([
            {"role": "ANALYST", "granted_to": "ROLE", "grantee_name": "SYSADMIN", "granted_by": "SECURITYADMIN"},
            {"role": "ANALYST", "granted_to": "USER", "grantee_name": "\"jane\"", "granted_by": "SECURITYADMIN"},
        ]))
        .unwrap();
        let grants: Vec<RoleGrant> = rows.iter_records().map(|r| RoleGrant::from_record(&r).unwrap()).collect();
        assert!(grants[0].is_for(&Grantee::Role(AccountObjectIdentifier::new("SYSADMIN"))));
        assert!(!grants[0].is_for(&Grantee::User(AccountObjectIdentifier::new("SYSADMIN"))));
        assert!(grants[1].is_for(&Grantee::User(AccountObjectIdentifier::new("jane"))));
    }
}
