use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use snowflake_provider::{
    ProviderError,
    sdk::{
        client::RequestContext,
        compute_pools::DropComputePool,
        identifier::AccountObjectIdentifier,
    },
    testing::{ProviderTester, assert_plan_no_changes, assert_plan_updates_in_place},
    tracking::Operation,
};

const KIND: &str = "snowflake_compute_pool";

fn config() -> Value {
    json!({
        "name": "p",
        "min_nodes": 1,
        "max_nodes": 2,
        "instance_family": "CPU_X64_XS",
        "auto_resume": "true",
        "auto_suspend_secs": 300,
    })
}

fn with(mut base: Value, changes: Value) -> Value {
    if let (Some(base), Some(changes)) = (base.as_object_mut(), changes.as_object()) {
        for (k, v) in changes {
            base.insert(k.clone(), v.clone());
        }
    }
    base
}

/// What SHOW and DESCRIBE report for the pool from now on.
fn remote_pool(tester: &ProviderTester, max_nodes: i64, auto_suspend_secs: i64, comment: &str) {
    let rows = json!([{
        "name": "p",
        "state": "IDLE",
        "min_nodes": 1,
        "max_nodes": max_nodes,
        "instance_family": "CPU_X64_XS",
        "auto_resume": "true",
        "auto_suspend_secs": auto_suspend_secs,
        "comment": comment,
        "owner": "SYSADMIN",
    }]);
    tester
        .executor()
        .on_query("SHOW COMPUTE POOLS", rows.clone())
        .on_query("DESCRIBE COMPUTE POOL", rows);
}

#[tokio::test]
async fn test_create_then_update_in_place() {
    let tester = ProviderTester::new();
    remote_pool(&tester, 2, 300, "");

    let created = tester.create(KIND, config()).await.unwrap();
    let state = Value::Object(created.state.unwrap());
    assert_eq!(
        tester.executor().changes(),
        vec![r#"CREATE COMPUTE POOL "p" MIN_NODES = 1 MAX_NODES = 2 INSTANCE_FAMILY = CPU_X64_XS AUTO_RESUME = TRUE AUTO_SUSPEND_SECS = 300"#]
    );
    assert_eq!(state["id"], json!("\"p\""));
    assert_eq!(state["min_nodes"], json!(1));
    assert_eq!(state["max_nodes"], json!(2));
    assert_eq!(state["instance_family"], json!("CPU_X64_XS"));
    assert_eq!(state["auto_resume"], json!("true"));
    assert_eq!(state["auto_suspend_secs"], json!(300));
    assert_eq!(state["show_output"][0]["max_nodes"], json!(2));
    assert_plan_no_changes(&tester.plan(KIND, Some(state.clone()), Some(config())).unwrap());

    // Only what changed is SET; nothing is unset.
    let changed = with(config(), json!({"max_nodes": 3, "comment": "changed"}));
    assert_plan_updates_in_place(&tester.plan(KIND, Some(state.clone()), Some(changed.clone())).unwrap());
    remote_pool(&tester, 3, 300, "changed");
    tester.executor().clear_statements();
    let updated = tester.update(KIND, state, changed.clone()).await.unwrap();
    assert_eq!(
        tester.executor().changes(),
        vec![r#"ALTER COMPUTE POOL "p" SET MAX_NODES = 3, COMMENT = 'changed'"#]
    );
    let state = Value::Object(updated.state.unwrap());
    assert_plan_no_changes(&tester.plan(KIND, Some(state.clone()), Some(changed.clone())).unwrap());

    // The sentinel unsets.
    let defaulted = with(changed, json!({"auto_suspend_secs": -1}));
    assert_plan_updates_in_place(&tester.plan(KIND, Some(state.clone()), Some(defaulted.clone())).unwrap());
    remote_pool(&tester, 3, 3600, "changed");
    tester.executor().clear_statements();
    let updated = tester.update(KIND, state, defaulted.clone()).await.unwrap();
    assert_eq!(
        tester.executor().changes(),
        vec![r#"ALTER COMPUTE POOL "p" UNSET AUTO_SUSPEND_SECS"#]
    );
    let state = Value::Object(updated.state.unwrap());
    assert_eq!(state["auto_suspend_secs"], json!(-1));
    assert_plan_no_changes(&tester.plan(KIND, Some(state), Some(defaulted)).unwrap());
}

#[tokio::test]
async fn test_sentinel_matching_account_default_plans_nothing() {
    let tester = ProviderTester::new();
    remote_pool(&tester, 2, 3600, "");
    let config = with(config(), json!({"auto_resume": "", "auto_suspend_secs": -1}));

    let created = tester.create(KIND, config.clone()).await.unwrap();
    let state = Value::Object(created.state.unwrap());
    assert_eq!(
        tester.executor().changes(),
        vec![r#"CREATE COMPUTE POOL "p" MIN_NODES = 1 MAX_NODES = 2 INSTANCE_FAMILY = CPU_X64_XS"#]
    );
    assert_eq!(state["auto_resume"], json!(""));
    assert_eq!(state["auto_suspend_secs"], json!(-1));
    assert_plan_no_changes(&tester.plan(KIND, Some(state.clone()), Some(config.clone())).unwrap());

    // Spelling out the account default is not a change either.
    let explicit = with(config, json!({"auto_resume": "true", "auto_suspend_secs": 3600}));
    assert_plan_no_changes(&tester.plan(KIND, Some(state), Some(explicit)).unwrap());
}

#[tokio::test]
async fn test_lifecycle_steps_are_tagged() {
    let tester = ProviderTester::new();
    remote_pool(&tester, 2, 300, "");

    let created = tester.create(KIND, config()).await.unwrap();
    let state = Value::Object(created.state.unwrap());
    tester.read(KIND, state.clone()).await.unwrap();
    tester
        .update(KIND, state.clone(), with(config(), json!({"comment": "c"})))
        .await
        .unwrap();
    tester.import(KIND, "\"p\"").await.unwrap();
    tester.delete(KIND, state).await.unwrap();

    let executor = tester.executor();
    assert!(executor.statements_for(Operation::Create)[0].starts_with("CREATE COMPUTE POOL"));
    assert!(executor.statements_for(Operation::Read)[0].starts_with("SHOW COMPUTE POOLS"));
    assert!(executor.statements_for(Operation::Update)[0].starts_with("ALTER COMPUTE POOL"));
    assert!(executor.statements_for(Operation::Import)[0].starts_with("SHOW COMPUTE POOLS"));
    assert_eq!(
        executor.statements_for(Operation::Delete),
        vec![r#"DROP COMPUTE POOL IF EXISTS "p""#]
    );
    assert!(
        executor
            .statements()
            .iter()
            .all(|s| s.contains(r#""resource":"snowflake_compute_pool""#))
    );
}

#[tokio::test]
async fn test_drop_safely_on_absent_pool() {
    let tester = ProviderTester::new();
    tester
        .executor()
        .on_error("DROP COMPUTE POOL", "Compute pool 'P' does not exist or not authorized.");
    let pools = tester.client().compute_pools();
    let ctx = RequestContext::for_operation(KIND, Operation::Delete);
    let id = AccountObjectIdentifier::new("P");

    pools.drop_safely(&ctx, &id).await.unwrap();
    let err = pools
        .drop(
            &ctx,
            &DropComputePool {
                name: id,
                if_exists: false,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::ObjectNotFound(_)), "{err:?}");
}

#[tokio::test]
async fn test_failed_update_returns_partial_state() {
    let tester = ProviderTester::new();
    remote_pool(&tester, 2, 300, "");
    let state = Value::Object(tester.create(KIND, config()).await.unwrap().state.unwrap());

    tester
        .executor()
        .on_error("ALTER COMPUTE POOL \"p\" UNSET", "Insufficient privileges to operate on compute pool 'p'");
    let config = with(config(), json!({"max_nodes": 4, "auto_suspend_secs": -1}));
    let err = tester.update(KIND, state, config).await.unwrap_err();

    assert!(err.partial);
    let partial = err.state.unwrap();
    assert_eq!(partial["max_nodes"], json!(4));
    assert_eq!(partial["auto_suspend_secs"], json!(300));
}

#[tokio::test]
async fn test_invalid_update_keeps_prior_state() {
    let tester = ProviderTester::new();
    remote_pool(&tester, 2, 300, "");
    let prior = tester.create(KIND, config()).await.unwrap().state.unwrap();
    tester.executor().clear_statements();

    let config = with(config(), json!({"max_nodes": 4, "auto_resume": "maybe"}));
    let err = tester
        .update(KIND, Value::Object(prior.clone()), config)
        .await
        .unwrap_err();

    assert!(!err.partial);
    assert!(matches!(err.source, ProviderError::Validation(_)), "{err:?}");
    assert_eq!(err.state, Some(prior));
    assert_eq!(tester.executor().executed(), Vec::<String>::new());
}
