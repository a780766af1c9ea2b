use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use snowflake_provider::{
    testing::{ProviderTester, assert_plan_no_changes, assert_plan_replaces, assert_plan_updates_in_place},
    tracking::Operation,
};

const ROLE: &str = "snowflake_account_role";
const GRANT: &str = "snowflake_grant_account_role";
const TOKEN: &str = "snowflake_user_programmatic_access_token";

fn remote_role(tester: &ProviderTester, name: &str, comment: &str) {
    tester.executor().on_query(
        "SHOW ROLES",
        json!([{"name": name, "comment": comment, "owner": "SECURITYADMIN", "assigned_to_users": 0}]),
    );
}

#[tokio::test]
async fn test_account_role_lifecycle() {
    let tester = ProviderTester::new();
    remote_role(&tester, "ANALYST", "reads things");
    let config = json!({"name": "ANALYST", "comment": "reads things"});

    let created = tester.create(ROLE, config.clone()).await.unwrap();
    assert_eq!(
        tester.executor().statements_for(Operation::Create),
        vec![
            "CREATE ROLE ANALYST COMMENT = 'reads things'",
            "SHOW ROLES LIKE 'ANALYST'",
        ]
    );
    let state = Value::Object(created.state.unwrap());
    assert_eq!(state["id"], json!("ANALYST"));
    assert_plan_no_changes(&tester.plan(ROLE, Some(state.clone()), Some(config)).unwrap());

    let renamed = json!({"name": "READER", "comment": ""});
    assert_plan_updates_in_place(&tester.plan(ROLE, Some(state.clone()), Some(renamed.clone())).unwrap());

    remote_role(&tester, "READER", "");
    tester.executor().clear_statements();
    let updated = tester.update(ROLE, state, renamed).await.unwrap();
    assert_eq!(
        tester.executor().changes(),
        vec!["ALTER ROLE ANALYST RENAME TO READER", "ALTER ROLE READER UNSET COMMENT"]
    );
    let state = Value::Object(updated.state.unwrap());
    assert_eq!(state["id"], json!("READER"));

    tester.executor().clear_statements();
    tester.delete(ROLE, state).await.unwrap();
    assert_eq!(
        tester.executor().statements_for(Operation::Delete),
        vec!["DROP ROLE IF EXISTS READER"]
    );
}

#[tokio::test]
async fn test_import_role_by_quoted_name() {
    let tester = ProviderTester::new();
    remote_role(&tester, "reader", "");

    let imported = tester.import(ROLE, "\"reader\"").await.unwrap();
    let state = Value::Object(imported.state.unwrap());
    assert_eq!(state["name"], json!("reader"));
    assert_eq!(state["fully_qualified_name"], json!("\"reader\""));
    assert_eq!(
        tester.executor().statements_for(Operation::Import),
        vec!["SHOW ROLES LIKE 'reader'"]
    );

    let missing = ProviderTester::new();
    assert!(missing.import(ROLE, "GHOST").await.is_err());
}

fn grant_config() -> Value {
    json!({"role_name": "ANALYST", "user_name": "JANE"})
}

#[tokio::test]
async fn test_grant_to_user() {
    let tester = ProviderTester::new();
    tester.executor().on_query(
        "SHOW GRANTS OF ROLE ANALYST",
        json!([
            {"role": "ANALYST", "granted_to": "ROLE", "grantee_name": "SYSADMIN", "granted_by": "SECURITYADMIN"},
            {"role": "ANALYST", "granted_to": "USER", "grantee_name": "JANE", "granted_by": "SECURITYADMIN"},
        ]),
    );

    let created = tester.create(GRANT, grant_config()).await.unwrap();
    assert_eq!(tester.executor().changes(), vec!["GRANT ROLE ANALYST TO USER JANE"]);
    let state = Value::Object(created.state.unwrap());
    assert_eq!(state["id"], json!("ANALYST|USER|JANE"));
    assert_plan_no_changes(&tester.plan(GRANT, Some(state.clone()), Some(grant_config())).unwrap());

    let to_role = json!({"role_name": "ANALYST", "parent_role_name": "SYSADMIN"});
    assert_plan_replaces(&tester.plan(GRANT, Some(state.clone()), Some(to_role)).unwrap(), "user_name");

    tester.executor().clear_statements();
    tester.delete(GRANT, state).await.unwrap();
    assert_eq!(tester.executor().changes(), vec!["REVOKE ROLE ANALYST FROM USER JANE"]);
}

#[tokio::test]
async fn test_revoked_grant_is_gone() {
    let tester = ProviderTester::new();
    tester.executor().on_query(
        "SHOW GRANTS OF ROLE ANALYST",
        json!([{"role": "ANALYST", "granted_to": "ROLE", "grantee_name": "SYSADMIN"}]),
    );
    let state = json!({"id": "ANALYST|USER|JANE", "role_name": "ANALYST", "user_name": "JANE"});

    let read = tester.read(GRANT, state.clone()).await.unwrap();
    assert_eq!(read.state, None);

    let dropped = ProviderTester::new();
    dropped
        .executor()
        .on_error("SHOW GRANTS", "Role 'ANALYST' does not exist or not authorized.");
    assert_eq!(dropped.read(GRANT, state).await.unwrap().state, None);
}

#[tokio::test]
async fn test_grant_needs_exactly_one_grantee() {
    let tester = ProviderTester::new();
    let both = json!({"role_name": "ANALYST", "user_name": "JANE", "parent_role_name": "SYSADMIN"});
    assert!(tester.create(GRANT, both).await.is_err());
    assert!(tester.create(GRANT, json!({"role_name": "ANALYST"})).await.is_err());
    assert_eq!(tester.executor().changes(), Vec::<String>::new());
}

fn token_config() -> Value {
    json!({
        "user": "JANE",
        "name": "CI_TOKEN",
        "days_to_expiry": 30,
        "mins_to_bypass_network_policy_requirement": 240,
        "disabled": "true",
        "comment": "",
    })
}

fn remote_token(tester: &ProviderTester, name: &str, status: &str) {
    tester.executor().on_query(
        "SHOW USER PROGRAMMATIC ACCESS TOKENS FOR USER JANE",
        json!([{
            "name": name,
            "user_name": "JANE",
            "role_restriction": "",
            "expires_at": "2026-11-13 00:00:00.000 -0800",
            "status": status,
            "comment": "",
            "mins_to_bypass_network_policy_requirement": 240,
        }]),
    );
}

#[tokio::test]
async fn test_token_secret_is_kept_from_add() {
    let tester = ProviderTester::new();
    tester.executor().on_query(
        "ALTER USER JANE ADD PROGRAMMATIC ACCESS TOKEN",
        json!([{"token_name": "CI_TOKEN", "token_secret": "s3cr3t"}]),
    );
    remote_token(&tester, "CI_TOKEN", "DISABLED");

    let created = tester.create(TOKEN, token_config()).await.unwrap();
    assert_eq!(
        tester.executor().changes(),
        vec![
            "ALTER USER JANE ADD PROGRAMMATIC ACCESS TOKEN CI_TOKEN DAYS_TO_EXPIRY = 30 \
             MINS_TO_BYPASS_NETWORK_POLICY_REQUIREMENT = 240",
            "ALTER USER JANE MODIFY PROGRAMMATIC ACCESS TOKEN CI_TOKEN SET DISABLED = TRUE",
        ]
    );
    let state = Value::Object(created.state.unwrap());
    assert_eq!(state["id"], json!("JANE|CI_TOKEN"));
    assert_eq!(state["token"], json!("s3cr3t"));
    assert_eq!(state["status"], json!("DISABLED"));
    assert_eq!(state["disabled"], json!("true"));
    assert_plan_no_changes(&tester.plan(TOKEN, Some(state.clone()), Some(token_config())).unwrap());

    // A re-read never sees the secret again; state keeps it.
    let read = tester.read(TOKEN, state.clone()).await.unwrap();
    assert_eq!(Value::Object(read.state.unwrap())["token"], json!("s3cr3t"));

    let mut longer = token_config();
    longer["days_to_expiry"] = json!(90);
    assert_plan_replaces(
        &tester.plan(TOKEN, Some(state), Some(longer)).unwrap(),
        "days_to_expiry",
    );
}

#[tokio::test]
async fn test_token_rename_and_enable() {
    let tester = ProviderTester::new();
    let state = json!({
        "id": "JANE|CI_TOKEN",
        "user": "JANE",
        "name": "CI_TOKEN",
        "days_to_expiry": 30,
        "mins_to_bypass_network_policy_requirement": 240,
        "disabled": "true",
        "comment": "",
        "token": "s3cr3t",
        "status": "DISABLED",
    });
    let mut config = token_config();
    config["name"] = json!("CI_TOKEN_2");
    config["disabled"] = json!("false");
    remote_token(&tester, "CI_TOKEN_2", "ACTIVE");

    let updated = tester.update(TOKEN, state, config).await.unwrap();
    assert_eq!(
        tester.executor().changes(),
        vec![
            "ALTER USER JANE MODIFY PROGRAMMATIC ACCESS TOKEN CI_TOKEN RENAME TO CI_TOKEN_2",
            "ALTER USER JANE MODIFY PROGRAMMATIC ACCESS TOKEN CI_TOKEN_2 SET DISABLED = FALSE",
        ]
    );
    let state = Value::Object(updated.state.unwrap());
    assert_eq!(state["id"], json!("JANE|CI_TOKEN_2"));
    assert_eq!(state["disabled"], json!("false"));
    assert_eq!(state["status"], json!("ACTIVE"));
}
