//! Changes made outside the provider: edited comments, dropped services.

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use snowflake_provider::testing::{
    ProviderTester, assert_plan_no_changes, assert_plan_replaces, assert_plan_updates_in_place,
};

const IMAGE_REPOSITORY: &str = "snowflake_image_repository";
const SERVICE: &str = "snowflake_service";
const JOB_SERVICE: &str = "snowflake_job_service";

fn remote_repository(tester: &ProviderTester, comment: &str) {
    tester.executor().on_query(
        "SHOW IMAGE REPOSITORIES",
        json!([{
            "name": "REPO",
            "database_name": "DB",
            "schema_name": "SCH",
            "repository_url": "org-acct.registry.snowflakecomputing.com/db/sch/repo",
            "owner": "SYSADMIN",
            "comment": comment,
        }]),
    );
}

fn repository_config() -> Value {
    json!({"database": "DB", "schema": "SCH", "name": "REPO", "comment": ""})
}

#[tokio::test]
async fn test_external_comment_is_reverted() {
    let tester = ProviderTester::new();
    remote_repository(&tester, "");

    let created = tester.create(IMAGE_REPOSITORY, repository_config()).await.unwrap();
    assert_eq!(tester.executor().changes(), vec!["CREATE IMAGE REPOSITORY DB.SCH.REPO"]);
    let state = Value::Object(created.state.unwrap());
    assert_eq!(
        state["repository_url"],
        json!("org-acct.registry.snowflakecomputing.com/db/sch/repo")
    );
    assert_plan_no_changes(
        &tester
            .plan(IMAGE_REPOSITORY, Some(state.clone()), Some(repository_config()))
            .unwrap(),
    );

    remote_repository(&tester, "foo");
    let read = tester.read(IMAGE_REPOSITORY, state).await.unwrap();
    let state = Value::Object(read.state.unwrap());
    assert_eq!(state["comment"], json!("foo"));

    let plan = tester
        .plan(IMAGE_REPOSITORY, Some(state.clone()), Some(repository_config()))
        .unwrap();
    assert_plan_updates_in_place(&plan);

    remote_repository(&tester, "");
    tester.executor().clear_statements();
    tester
        .update(IMAGE_REPOSITORY, state, repository_config())
        .await
        .unwrap();
    assert_eq!(
        tester.executor().changes(),
        vec!["ALTER IMAGE REPOSITORY DB.SCH.REPO UNSET COMMENT"]
    );
}

fn service_state() -> Value {
    json!({
        "id": "DB.SCH.X",
        "database": "DB",
        "schema": "SCH",
        "name": "X",
        "compute_pool": "POOL",
        "from_specification": "spec:\n  containers:\n  - name: main\n    image: /db/sch/repo/app:latest\n",
        "fully_qualified_name": "DB.SCH.X",
    })
}

#[tokio::test]
async fn test_service_gone_is_removed_from_state() {
    let tester = ProviderTester::new();

    let read = tester.read(SERVICE, service_state()).await.unwrap();
    assert_eq!(read.state, None);
    assert_eq!(read.diagnostics.len(), 1);
    assert!(!read.diagnostics[0].is_error());
    assert_eq!(tester.executor().changes(), Vec::<String>::new());
    assert_eq!(
        tester.executor().executed(),
        vec!["SHOW SERVICES LIKE 'X' IN SCHEMA DB.SCH"]
    );
}

#[tokio::test]
async fn test_service_gone_with_its_schema() {
    let tester = ProviderTester::new();
    tester
        .executor()
        .on_error("SHOW SERVICES", "Schema 'DB.SCH' does not exist or not authorized.");

    let read = tester.read(SERVICE, service_state()).await.unwrap();
    assert_eq!(read.state, None);
}

#[tokio::test]
async fn test_service_read_surfaces_other_errors() {
    let tester = ProviderTester::new();
    tester
        .executor()
        .on_error("SHOW SERVICES", "SQL compilation error: syntax error line 1");

    assert!(tester.read(SERVICE, service_state()).await.is_err());
}

#[tokio::test]
async fn test_delete_of_dropped_service_succeeds() {
    let tester = ProviderTester::new();
    tester
        .executor()
        .on_error("DROP SERVICE", "Service 'DB.SCH.X' does not exist or not authorized.");

    let deleted = tester.delete(SERVICE, service_state()).await.unwrap();
    assert_eq!(deleted.state, None);
    assert_eq!(tester.executor().changes(), vec!["DROP SERVICE IF EXISTS DB.SCH.X"]);
}

#[test]
fn test_job_service_changes_replace() {
    let tester = ProviderTester::new();
    let mut state = service_state();
    state["comment"] = json!("");
    let mut config = service_state();
    for computed in ["id", "fully_qualified_name"] {
        config.as_object_mut().unwrap().remove(computed);
    }
    config["comment"] = json!("nightly");

    let plan = tester.plan(JOB_SERVICE, Some(state), Some(config)).unwrap();
    assert_plan_replaces(&plan, "comment");
}
