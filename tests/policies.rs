use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use snowflake_provider::testing::{
    ProviderTester, assert_plan_no_changes, assert_plan_replaces, assert_plan_updates_in_place,
};

const MASKING: &str = "snowflake_masking_policy";
const ROW_ACCESS: &str = "snowflake_row_access_policy";

const MASKING_BODY: &str = "case when current_role() in ('ANALYST') then val else '***' end";
const ROW_ACCESS_BODY: &str = "case\n  when current_role() in ('ANALYST') then true\n  else false\nend";

fn masking_config(argument_type: &str) -> Value {
    json!({
        "database": "DB",
        "schema": "SCH",
        "name": "MP",
        "argument": [{"name": "A", "type": argument_type}],
        "body": MASKING_BODY,
        "return_data_type": "VARCHAR",
    })
}

fn remote_masking_policy(tester: &ProviderTester, signature: &str) {
    tester
        .executor()
        .on_query(
            "SHOW MASKING POLICIES",
            json!([{
                "name": "MP",
                "database_name": "DB",
                "schema_name": "SCH",
                "kind": "MASKING_POLICY",
                "comment": "",
                "options": "",
            }]),
        )
        .on_query(
            "DESCRIBE MASKING POLICY",
            json!([{
                "name": "MP",
                "signature": signature,
                "return_type": "VARCHAR(16777216)",
                "body": MASKING_BODY,
            }]),
        );
}

#[tokio::test]
async fn test_masking_policy_argument_types() {
    let tester = ProviderTester::new();
    remote_masking_policy(&tester, "(A VARCHAR(16777216))");

    let created = tester.create(MASKING, masking_config("VARCHAR")).await.unwrap();
    let changes = tester.executor().changes();
    assert_eq!(changes.len(), 1);
    assert!(
        changes[0].starts_with("CREATE MASKING POLICY DB.SCH.MP AS (A VARCHAR(16777216)) RETURNS VARCHAR(16777216) ->"),
        "{}",
        changes[0]
    );
    let state = Value::Object(created.state.unwrap());
    assert_eq!(state["argument"], json!([{"name": "A", "type": "VARCHAR"}]));
    assert_eq!(state["return_data_type"], json!("VARCHAR"));

    // VARCHAR is VARCHAR(16777216) once defaulted.
    assert_plan_no_changes(&tester.plan(MASKING, Some(state.clone()), Some(masking_config("VARCHAR"))).unwrap());

    let narrowed = tester
        .plan(MASKING, Some(state.clone()), Some(masking_config("VARCHAR(100)")))
        .unwrap();
    assert_plan_replaces(&narrowed, "argument");

    // Someone recreates the policy with a narrower argument.
    remote_masking_policy(&tester, "(A VARCHAR(100))");
    let read = tester.read(MASKING, state).await.unwrap();
    let state = Value::Object(read.state.unwrap());
    assert_eq!(state["argument"], json!([{"name": "A", "type": "VARCHAR(100)"}]));
    let back = tester.plan(MASKING, Some(state), Some(masking_config("VARCHAR"))).unwrap();
    assert_plan_replaces(&back, "argument");
}

#[tokio::test]
async fn test_masking_policy_upgrade_from_v0() {
    let tester = ProviderTester::new();
    let v0 = json!({
        "id": "DB.SCH.MP",
        "database": "DB",
        "schema": "SCH",
        "name": "MP",
        "signature": [{"column": [{"name": "A", "type": "VARCHAR"}]}],
        "masking_expression": MASKING_BODY,
        "return_data_type": "VARCHAR",
    });
    let upgraded = tester
        .provider()
        .upgrade_state(MASKING, 0, v0.as_object().cloned().unwrap())
        .unwrap();
    let upgraded = Value::Object(upgraded);
    assert_eq!(upgraded["argument"], json!([{"name": "A", "type": "VARCHAR"}]));
    assert_eq!(upgraded["body"], json!(MASKING_BODY));
    assert_eq!(upgraded.get("signature"), None);
    assert_eq!(upgraded.get("masking_expression"), None);
}

fn row_access_config(body: &str) -> Value {
    json!({
        "database": "DB",
        "schema": "SCH",
        "name": "RAP",
        "argument": [{"name": "A", "type": "VARCHAR"}],
        "body": body,
    })
}

fn remote_row_access_policy(tester: &ProviderTester, body: &str) {
    tester
        .executor()
        .on_query(
            "SHOW ROW ACCESS POLICIES",
            json!([{
                "name": "RAP",
                "database_name": "DB",
                "schema_name": "SCH",
                "kind": "ROW_ACCESS_POLICY",
                "comment": "",
            }]),
        )
        .on_query(
            "DESCRIBE ROW ACCESS POLICY",
            json!([{
                "name": "RAP",
                "signature": "(A VARCHAR)",
                "return_type": "BOOLEAN",
                "body": body,
            }]),
        );
}

#[tokio::test]
async fn test_row_access_policy_body_whitespace() {
    let tester = ProviderTester::new();
    let reformatted = "case\n    when current_role() in ('ANALYST')\n        then true\n    else false\nend\n";
    remote_row_access_policy(&tester, reformatted);

    let created = tester.create(ROW_ACCESS, row_access_config(ROW_ACCESS_BODY)).await.unwrap();
    let state = Value::Object(created.state.unwrap());
    assert_eq!(state["body"], json!(ROW_ACCESS_BODY));
    assert_plan_no_changes(
        &tester
            .plan(ROW_ACCESS, Some(state.clone()), Some(row_access_config(ROW_ACCESS_BODY)))
            .unwrap(),
    );

    // State holding Snowflake's formatting still matches the config.
    let mut imported = state.clone();
    imported["body"] = json!(reformatted);
    assert_plan_no_changes(
        &tester
            .plan(ROW_ACCESS, Some(imported), Some(row_access_config(ROW_ACCESS_BODY)))
            .unwrap(),
    );

    // Changing a literal is a real change, applied in place.
    let analyst_or_admin = ROW_ACCESS_BODY.replace("('ANALYST')", "('ANALYST', 'ADMIN')");
    let plan = tester
        .plan(ROW_ACCESS, Some(state.clone()), Some(row_access_config(&analyst_or_admin)))
        .unwrap();
    assert_plan_updates_in_place(&plan);

    remote_row_access_policy(&tester, &analyst_or_admin);
    tester.executor().clear_statements();
    tester
        .update(ROW_ACCESS, state, row_access_config(&analyst_or_admin))
        .await
        .unwrap();
    assert_eq!(
        tester.executor().changes(),
        vec![format!("ALTER ROW ACCESS POLICY DB.SCH.RAP SET BODY -> {analyst_or_admin}")]
    );
}

#[tokio::test]
async fn test_policy_rename_keeps_schema() {
    let tester = ProviderTester::new();
    remote_row_access_policy(&tester, ROW_ACCESS_BODY);
    let state = Value::Object(
        tester
            .create(ROW_ACCESS, row_access_config(ROW_ACCESS_BODY))
            .await
            .unwrap()
            .state
            .unwrap(),
    );

    let mut renamed = row_access_config(ROW_ACCESS_BODY);
    renamed["name"] = json!("RAP_2");
    assert_plan_updates_in_place(&tester.plan(ROW_ACCESS, Some(state.clone()), Some(renamed.clone())).unwrap());

    tester.executor().on_query(
        "SHOW ROW ACCESS POLICIES",
        json!([{"name": "RAP_2", "database_name": "DB", "schema_name": "SCH", "comment": ""}]),
    );
    tester.executor().clear_statements();
    let updated = tester.update(ROW_ACCESS, state, renamed).await.unwrap();
    assert_eq!(
        tester.executor().changes(),
        vec!["ALTER ROW ACCESS POLICY DB.SCH.RAP RENAME TO DB.SCH.RAP_2"]
    );
    let state = Value::Object(updated.state.unwrap());
    assert_eq!(state["id"], json!("DB.SCH.RAP_2"));
    assert_eq!(state["fully_qualified_name"], json!("DB.SCH.RAP_2"));
}
