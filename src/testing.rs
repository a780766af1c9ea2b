//! Test doubles for lifecycle code.
//!
//! [`MockExecutor`] stands in for Snowflake: statements are answered by
//! prefix rules and recorded with their operation tag. [`ProviderTester`]
//! wires a [`Provider`] to it and takes JSON attribute maps.
//!
//! ```ignore
//! let tester = ProviderTester::new();
//! tester.executor().on_query("SHOW COMPUTE POOLS", json!([{"name": "P", "state": "IDLE"}]));
//! let state = tester.create("snowflake_compute_pool", json!({"name": "P"})).await.unwrap();
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    error::{ProviderError, Result},
    provider::{
        ApplyError, ApplyResult, Provider,
        data::AttributeMap,
        diff::{PlanAction, PlanResult},
    },
    sdk::{
        client::{Client, QueryExecutor},
        record::RowSet,
    },
    tracking::{Operation, parse_tag, strip_tag},
};

#[derive(Debug, Clone)]
enum Response {
    Rows(RowSet),
    Error(String),
}

#[derive(Debug, Clone)]
struct Rule {
    prefix: String,
    response: Response,
}

#[derive(Debug, Default)]
struct Inner {
    rules: Vec<Rule>,
    statements: Vec<String>,
}

/// Scripted executor. Rules match on the untagged statement's prefix; the
/// most recently added matching rule wins. Unmatched statements succeed and
/// unmatched queries return no rows.
#[derive(Debug, Default)]
pub struct MockExecutor {
    inner: Mutex<Inner>,
}

impl MockExecutor {
    pub fn new() -> Self {
        MockExecutor::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A test that panicked while holding the lock already failed.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Answers statements starting with `prefix` with `rows`, an array of objects.
    #[track_caller]
    pub fn on_query(&self, prefix: &str, rows: Value) -> &Self {
        let rows = match RowSet::from_objects(&rows) {
            Ok(rows) => rows,
            Err(e) => panic!("invalid rows for `{prefix}`: {e}"),
        };
        self.push(prefix, Response::Rows(rows));
        self
    }

    /// Fails statements starting with `prefix` the way Snowflake reports SQL errors.
    pub fn on_error(&self, prefix: &str, message: &str) -> &Self {
        self.push(prefix, Response::Error(message.to_string()));
        self
    }

    fn push(&self, prefix: &str, response: Response) {
        self.lock().rules.push(Rule {
            prefix: prefix.to_string(),
            response,
        });
    }

    fn respond(&self, sql: &str) -> Option<Response> {
        let mut inner = self.lock();
        inner.statements.push(sql.to_string());
        let statement = strip_tag(sql);
        inner
            .rules
            .iter()
            .rev()
            .find(|rule| statement.starts_with(&rule.prefix))
            .map(|rule| rule.response.clone())
    }

    /// Every statement so far, tag included.
    pub fn statements(&self) -> Vec<String> {
        self.lock().statements.clone()
    }

    /// Every statement so far, without its tag.
    pub fn executed(&self) -> Vec<String> {
        self.lock()
            .statements
            .iter()
            .map(|s| strip_tag(s).to_string())
            .collect()
    }

    /// Untagged statements issued on behalf of `operation`.
    pub fn statements_for(&self, operation: Operation) -> Vec<String> {
        self.lock()
            .statements
            .iter()
            .filter_map(|s| parse_tag(s))
            .filter(|(metadata, _)| metadata.operation == operation)
            .map(|(_, statement)| statement.to_string())
            .collect()
    }

    /// Untagged statements that are not SHOW or DESCRIBE.
    pub fn changes(&self) -> Vec<String> {
        self.executed()
            .into_iter()
            .filter(|s| !s.starts_with("SHOW ") && !s.starts_with("DESCRIBE "))
            .collect()
    }

    pub fn clear_statements(&self) {
        self.lock().statements.clear();
    }
}

#[async_trait]
impl QueryExecutor for MockExecutor {
    async fn exec(&self, sql: &str) -> Result<()> {
        match self.respond(sql) {
            Some(Response::Error(message)) => Err(ProviderError::Remote {
                statement: strip_tag(sql).to_string(),
                message,
            }),
            _ => Ok(()),
        }
    }

    async fn query(&self, sql: &str) -> Result<RowSet> {
        match self.respond(sql) {
            Some(Response::Error(message)) => Err(ProviderError::Remote {
                statement: strip_tag(sql).to_string(),
                message,
            }),
            Some(Response::Rows(rows)) => Ok(rows),
            None => Ok(RowSet::default()),
        }
    }
}

/// JSON object to attribute map.
#[track_caller]
pub fn attributes(value: Value) -> AttributeMap {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// A [`Provider`] with every kind registered, talking to a [`MockExecutor`].
pub struct ProviderTester {
    provider: Provider,
    executor: Arc<MockExecutor>,
    client: Client,
}

impl Default for ProviderTester {
    fn default() -> Self {
        ProviderTester::new()
    }
}

impl ProviderTester {
    pub fn new() -> Self {
        ProviderTester::with_provider(Provider::new())
    }

    pub fn with_provider(provider: Provider) -> Self {
        let executor = Arc::new(MockExecutor::new());
        let client = Client::new(executor.clone());
        ProviderTester {
            provider,
            executor,
            client,
        }
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    pub fn executor(&self) -> &MockExecutor {
        &self.executor
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn plan(&self, kind: &str, prior: Option<Value>, config: Option<Value>) -> Result<PlanResult> {
        let prior = prior.map(attributes);
        let config = config.map(attributes);
        self.provider.plan(kind, prior.as_ref(), config.as_ref())
    }

    pub async fn create(&self, kind: &str, config: Value) -> Result<ApplyResult, ApplyError> {
        self.provider.create(&self.client, kind, &attributes(config)).await
    }

    pub async fn read(&self, kind: &str, state: Value) -> Result<ApplyResult> {
        self.provider.read(&self.client, kind, &attributes(state)).await
    }

    pub async fn update(&self, kind: &str, state: Value, config: Value) -> Result<ApplyResult, ApplyError> {
        self.provider
            .update(&self.client, kind, &attributes(state), &attributes(config))
            .await
    }

    pub async fn delete(&self, kind: &str, state: Value) -> Result<ApplyResult> {
        self.provider.delete(&self.client, kind, &attributes(state)).await
    }

    pub async fn import(&self, kind: &str, id: &str) -> Result<ApplyResult> {
        self.provider.import(&self.client, kind, id).await
    }
}

#[track_caller]
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert_eq!(
        plan.action,
        PlanAction::Noop,
        "expected an empty plan, got changes: {:?}",
        plan.changes
    );
}

#[track_caller]
pub fn assert_plan_replaces(plan: &PlanResult, attr: &str) {
    assert_eq!(plan.action, PlanAction::Replace, "changes: {:?}", plan.changes);
    assert!(
        plan.replace_reasons.iter().any(|r| r == attr),
        "`{attr}` is not among the replace reasons {:?}",
        plan.replace_reasons
    );
}

#[track_caller]
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert_eq!(
        plan.action,
        PlanAction::Update,
        "expected an in-place update, replace reasons: {:?}",
        plan.replace_reasons
    );
}
