use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use snowflake_provider::testing::{
    ProviderTester, assert_plan_no_changes, assert_plan_replaces, assert_plan_updates_in_place,
};

const KIND: &str = "snowflake_listing";

fn config(name: &str) -> Value {
    json!({"name": name, "manifest": {"from_string": "title: t\n"}})
}

fn remote_listing(tester: &ProviderTester, name: &str, state: &str) {
    let listing = json!({
        "name": name,
        "title": "t",
        "state": state,
        "comment": "",
        "owner": "ACCOUNTADMIN",
        "is_monetized": "false",
    });
    let mut details = listing.clone();
    details["manifest_yaml"] = json!("title: t\n");
    tester
        .executor()
        .on_query("SHOW LISTINGS", json!([listing]))
        .on_query("DESCRIBE LISTING", json!([details]));
}

#[tokio::test]
async fn test_rename_keeps_listing() {
    let tester = ProviderTester::new();
    remote_listing(&tester, "listing_a", "PUBLISHED");

    let created = tester.create(KIND, config("listing_a")).await.unwrap();
    let changes = tester.executor().changes();
    assert_eq!(changes.len(), 1);
    assert!(changes[0].starts_with(r#"CREATE EXTERNAL LISTING "listing_a" AS $$title: t"#), "{}", changes[0]);
    let state = Value::Object(created.state.unwrap());
    assert_eq!(state["id"], json!("\"listing_a\""));
    assert_eq!(state["describe_output"][0]["manifest_yaml"], json!("title: t\n"));
    assert_plan_no_changes(&tester.plan(KIND, Some(state.clone()), Some(config("listing_a"))).unwrap());

    assert_plan_updates_in_place(&tester.plan(KIND, Some(state.clone()), Some(config("listing_b"))).unwrap());

    remote_listing(&tester, "listing_b", "PUBLISHED");
    tester.executor().clear_statements();
    let updated = tester.update(KIND, state, config("listing_b")).await.unwrap();
    assert_eq!(
        tester.executor().changes(),
        vec![r#"ALTER LISTING "listing_a" RENAME TO "listing_b""#]
    );
    let state = Value::Object(updated.state.unwrap());
    assert_eq!(state["id"], json!("\"listing_b\""));
    assert_eq!(state["fully_qualified_name"], json!("\"listing_b\""));
    assert_eq!(state["name"], json!("listing_b"));
    assert_plan_no_changes(&tester.plan(KIND, Some(state), Some(config("listing_b"))).unwrap());
}

#[test]
fn test_switching_manifest_source_replaces() {
    let tester = ProviderTester::new();
    let state = json!({
        "id": "\"listing_a\"",
        "name": "listing_a",
        "manifest": {"from_string": "title: t\n"},
        "fully_qualified_name": "\"listing_a\"",
    });
    let mut staged = config("listing_a");
    staged["manifest"] = json!({"from_stage": {"stage": "DB.SCH.ST", "location": "v1"}});

    let plan = tester.plan(KIND, Some(state.clone()), Some(staged)).unwrap();
    assert_plan_replaces(&plan, "manifest");

    // Trailing newlines are not a change.
    let mut trimmed = config("listing_a");
    trimmed["manifest"] = json!({"from_string": "title: t"});
    assert_plan_no_changes(&tester.plan(KIND, Some(state), Some(trimmed)).unwrap());
}

#[tokio::test]
async fn test_published_listing_is_unpublished_before_drop() {
    let tester = ProviderTester::new();
    remote_listing(&tester, "listing_a", "PUBLISHED");
    let state = json!({"id": "\"listing_a\"", "name": "listing_a", "manifest": {"from_string": "title: t\n"}});

    tester.delete(KIND, state).await.unwrap();
    assert_eq!(
        tester.executor().changes(),
        vec![
            r#"ALTER LISTING "listing_a" UNPUBLISH"#,
            r#"DROP LISTING IF EXISTS "listing_a""#,
        ]
    );
}
