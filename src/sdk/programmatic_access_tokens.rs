//! Programmatic access tokens, managed through `ALTER USER`.

use serde::Serialize;

use crate::{
    error::{ProviderError, Result},
    sdk::{
        client::{Client, FromRecord, RequestContext, ignore_not_found},
        identifier::{AccountObjectIdentifier, ObjectIdentifier},
        record::{RecordError, RecordRef},
        sql::{Options, ToSql, UnsetList},
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddProgrammaticAccessToken {
    pub user: AccountObjectIdentifier,
    pub name: AccountObjectIdentifier,
    pub role_restriction: Option<AccountObjectIdentifier>,
    pub days_to_expiry: Option<i64>,
    pub mins_to_bypass_network_policy_requirement: Option<i64>,
    pub comment: Option<String>,
}

impl AddProgrammaticAccessToken {
    pub fn new(user: AccountObjectIdentifier, name: AccountObjectIdentifier) -> Self {
        AddProgrammaticAccessToken {
            user,
            name,
            role_restriction: None,
            days_to_expiry: None,
            mins_to_bypass_network_policy_requirement: None,
            comment: None,
        }
    }
}

impl ToSql for AddProgrammaticAccessToken {
    fn to_sql(&self) -> String {
        let mut options = Options::new();
        options
            .ident("ROLE_RESTRICTION", self.role_restriction.as_ref())
            .int("DAYS_TO_EXPIRY", self.days_to_expiry)
            .int(
                "MINS_TO_BYPASS_NETWORK_POLICY_REQUIREMENT",
                self.mins_to_bypass_network_policy_requirement,
            )
            .text("COMMENT", self.comment.as_deref());
        format!(
            "ALTER USER {} ADD PROGRAMMATIC ACCESS TOKEN {}{}",
            self.user,
            self.name,
            options.to_create_clause()
        )
    }
}

/// What `ADD PROGRAMMATIC ACCESS TOKEN` returns. The secret is only ever shown once.
#[derive(Clone, PartialEq, Eq)]
pub struct AddedProgrammaticAccessToken {
    pub token_name: String,
    pub token_secret: String,
}

impl std::fmt::Debug for AddedProgrammaticAccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddedProgrammaticAccessToken")
            .field("token_name", &self.token_name)
            .field("token_secret", &"<redacted>")
            .finish()
    }
}

impl FromRecord for AddedProgrammaticAccessToken {
    fn from_record(r: &RecordRef<'_>) -> Result<Self, RecordError> {
        Ok(AddedProgrammaticAccessToken {
            token_name: r.require_string("token_name")?,
            token_secret: r.require_string("token_secret")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgrammaticAccessTokenSet {
    pub disabled: Option<bool>,
    pub mins_to_bypass_network_policy_requirement: Option<i64>,
    pub comment: Option<String>,
}

impl ProgrammaticAccessTokenSet {
    pub fn is_empty(&self) -> bool {
        self == &ProgrammaticAccessTokenSet::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgrammaticAccessTokenUnset {
    pub disabled: bool,
    pub mins_to_bypass_network_policy_requirement: bool,
    pub comment: bool,
}

impl ProgrammaticAccessTokenUnset {
    pub fn is_empty(&self) -> bool {
        self == &ProgrammaticAccessTokenUnset::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgrammaticAccessTokenAction {
    Set(ProgrammaticAccessTokenSet),
    Unset(ProgrammaticAccessTokenUnset),
    RenameTo(AccountObjectIdentifier),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifyProgrammaticAccessToken {
    pub user: AccountObjectIdentifier,
    pub name: AccountObjectIdentifier,
    pub action: ProgrammaticAccessTokenAction,
}

impl ToSql for ModifyProgrammaticAccessToken {
    fn to_sql(&self) -> String {
        let prefix = format!("ALTER USER {} MODIFY PROGRAMMATIC ACCESS TOKEN {}", self.user, self.name);
        match &self.action {
            ProgrammaticAccessTokenAction::Set(set) => {
                let mut options = Options::new();
                options
                    .bool("DISABLED", set.disabled)
                    .int(
                        "MINS_TO_BYPASS_NETWORK_POLICY_REQUIREMENT",
                        set.mins_to_bypass_network_policy_requirement,
                    )
                    .text("COMMENT", set.comment.as_deref());
                format!("{prefix} SET {}", options.to_set_list())
            }
            ProgrammaticAccessTokenAction::Unset(unset) => {
                let mut keys = UnsetList::new();
                keys.push("DISABLED", unset.disabled)
                    .push(
                        "MINS_TO_BYPASS_NETWORK_POLICY_REQUIREMENT",
                        unset.mins_to_bypass_network_policy_requirement,
                    )
                    .push("COMMENT", unset.comment);
                format!("{prefix} UNSET {}", keys.to_list())
            }
            ProgrammaticAccessTokenAction::RenameTo(new_name) => format!("{prefix} RENAME TO {new_name}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveProgrammaticAccessToken {
    pub user: AccountObjectIdentifier,
    pub name: AccountObjectIdentifier,
}

impl ToSql for RemoveProgrammaticAccessToken {
    fn to_sql(&self) -> String {
        format!("ALTER USER {} REMOVE PROGRAMMATIC ACCESS TOKEN {}", self.user, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowProgrammaticAccessTokens {
    pub user: AccountObjectIdentifier,
}

impl ToSql for ShowProgrammaticAccessTokens {
    fn to_sql(&self) -> String {
        format!("SHOW USER PROGRAMMATIC ACCESS TOKENS FOR USER {}", self.user)
    }
}

/// One row of `SHOW USER PROGRAMMATIC ACCESS TOKENS`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgrammaticAccessToken {
    pub name: String,
    pub user_name: String,
    pub role_restriction: String,
    pub expires_at: String,
    pub status: String,
    pub comment: String,
    pub created_on: String,
    pub created_by: String,
    pub mins_to_bypass_network_policy_requirement: i64,
    pub rotated_to: String,
}

impl ProgrammaticAccessToken {
    pub fn is_disabled(&self) -> bool {
        self.status.eq_ignore_ascii_case("DISABLED")
    }
}

impl FromRecord for ProgrammaticAccessToken {
    fn from_record(r: &RecordRef<'_>) -> Result<Self, RecordError> {
        Ok(ProgrammaticAccessToken {
            name: r.require_string("name")?,
            user_name: r.get_string("user_name").unwrap_or_default(),
            role_restriction: r.get_string("role_restriction").unwrap_or_default(),
            expires_at: r.get_string("expires_at").unwrap_or_default(),
            status: r.get_string("status").unwrap_or_default(),
            comment: r.get_string("comment").unwrap_or_default(),
            created_on: r.get_string("created_on").unwrap_or_default(),
            created_by: r.get_string("created_by").unwrap_or_default(),
            mins_to_bypass_network_policy_requirement: r
                .get_i64("mins_to_bypass_network_policy_requirement")?
                .unwrap_or_default(),
            rotated_to: r.get_string("rotated_to").unwrap_or_default(),
        })
    }
}

pub struct ProgrammaticAccessTokens<'a> {
    client: &'a Client,
}

impl<'a> ProgrammaticAccessTokens<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        ProgrammaticAccessTokens { client }
    }

    /// Adds the token and returns its secret.
    pub async fn add(&self, ctx: &RequestContext, request: &AddProgrammaticAccessToken) -> Result<AddedProgrammaticAccessToken> {
        self.client
            .query_as::<AddedProgrammaticAccessToken>(ctx, &request.to_sql())
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Remote {
                statement: request.to_sql(),
                message: "no token returned".to_string(),
            })
    }

    pub async fn modify(&self, ctx: &RequestContext, request: &ModifyProgrammaticAccessToken) -> Result<()> {
        self.client.exec(ctx, &request.to_sql()).await
    }

    pub async fn remove(&self, ctx: &RequestContext, request: &RemoveProgrammaticAccessToken) -> Result<()> {
        let object = format!("{}|{}", request.user, request.name);
        self.client.drop_object(ctx, &request.to_sql(), &object).await
    }

    /// A removed token, or a dropped user, counts as done.
    pub async fn remove_safely(
        &self,
        ctx: &RequestContext,
        user: &AccountObjectIdentifier,
        name: &AccountObjectIdentifier,
    ) -> Result<()> {
        let request = RemoveProgrammaticAccessToken {
            user: user.clone(),
            name: name.clone(),
        };
        ignore_not_found(self.remove(ctx, &request).await)
    }

    pub async fn show(&self, ctx: &RequestContext, user: &AccountObjectIdentifier) -> Result<Vec<ProgrammaticAccessToken>> {
        let request = ShowProgrammaticAccessTokens { user: user.clone() };
        self.client.query_as(ctx, &request.to_sql()).await
    }

    pub async fn show_by_id(
        &self,
        ctx: &RequestContext,
        user: &AccountObjectIdentifier,
        name: &AccountObjectIdentifier,
    ) -> Result<ProgrammaticAccessToken> {
        let request = ShowProgrammaticAccessTokens { user: user.clone() };
        self.client
            .show_one(ctx, &request.to_sql(), &format!("{user}|{name}"), |t: &ProgrammaticAccessToken| {
                t.name == name.name()
            })
            .await
    }

    pub async fn show_by_id_safely(
        &self,
        ctx: &RequestContext,
        user: &AccountObjectIdentifier,
        name: &AccountObjectIdentifier,
    ) -> Result<ProgrammaticAccessToken> {
        self.show_by_id(ctx, user, name)
            .await
            .map_err(|e| e.classify_not_found(&format!("{user}|{name}")))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::sdk::record::RowSet;

    fn user() -> AccountObjectIdentifier {
        AccountObjectIdentifier::new("JANE")
    }

    fn token() -> AccountObjectIdentifier {
        AccountObjectIdentifier::new("CI_TOKEN")
    }

    #[test]
    fn test_add() {
        let mut request = AddProgrammaticAccessToken::new(user(), token());
        assert_eq!(request.to_sql(), "ALTER USER JANE ADD PROGRAMMATIC ACCESS TOKEN CI_TOKEN");
        request.role_restriction = Some(AccountObjectIdentifier::new("ANALYST"));
        request.days_to_expiry = Some(30);
        request.comment = Some("ci".into());
        assert_eq!(
            request.to_sql(),
            "ALTER USER JANE ADD PROGRAMMATIC ACCESS TOKEN CI_TOKEN ROLE_RESTRICTION = ANALYST DAYS_TO_EXPIRY = 30 \
             COMMENT = 'ci'"
        );
    }

    #[test]
    fn test_modify_and_remove() {
        let set = ModifyProgrammaticAccessToken {
            user: user(),
            name: token(),
            action: ProgrammaticAccessTokenAction::Set(ProgrammaticAccessTokenSet {
                disabled: Some(true),
                mins_to_bypass_network_policy_requirement: Some(15),
                comment: None,
            }),
        };
        assert_eq!(
            set.to_sql(),
            "ALTER USER JANE MODIFY PROGRAMMATIC ACCESS TOKEN CI_TOKEN SET DISABLED = TRUE, \
             MINS_TO_BYPASS_NETWORK_POLICY_REQUIREMENT = 15"
        );
        let unset = ModifyProgrammaticAccessToken {
            user: user(),
            name: token(),
            action: ProgrammaticAccessTokenAction::Unset(ProgrammaticAccessTokenUnset {
                comment: true,
                ..Default::default()
            }),
        };
        assert_eq!(
            unset.to_sql(),
            "ALTER USER JANE MODIFY PROGRAMMATIC ACCESS TOKEN CI_TOKEN UNSET COMMENT"
        );
        let rename = ModifyProgrammaticAccessToken {
            user: user(),
            name: token(),
            action: ProgrammaticAccessTokenAction::RenameTo(AccountObjectIdentifier::new("CI_TOKEN_2")),
        };
        assert_eq!(
            rename.to_sql(),
            "ALTER USER JANE MODIFY PROGRAMMATIC ACCESS TOKEN CI_TOKEN RENAME TO CI_TOKEN_2"
        );
        let remove = RemoveProgrammaticAccessToken {
            user: user(),
            name: token(),
        };
        assert_eq!(remove.to_sql(), "ALTER USER JANE REMOVE PROGRAMMATIC ACCESS TOKEN CI_TOKEN");
    }

    #[test]
    fn test_secret_is_redacted_in_debug() {
        let added = AddedProgrammaticAccessToken {
            token_name: "CI_TOKEN".into(),
            token_secret: "s3cr3t".into(),
        };
        assert!(!format!("{added:?}").contains("s3cr3t"));
    }

    #[test]
    fn test_decode_row() {
        let rows = RowSet::from_objects(&json!([{
            "name": "CI_TOKEN",
            "user_name": "JANE",
            "status": "DISABLED",
            "mins_to_bypass_network_policy_requirement": null,
        }]))
        .unwrap();
        let token = ProgrammaticAccessToken::from_record(&rows.first().unwrap()).unwrap();
        assert!(token.is_disabled());
        assert_eq!(token.mins_to_bypass_network_policy_requirement, 0);
    }
}
