//! The reconciliation engine: drives each managed kind through its lifecycle.

pub mod attributes;
pub mod data;
pub mod diff;
pub mod lifecycle;
pub mod schema;
pub mod upgrade;

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{ProviderError, Result},
    provider::{
        data::{AttributeMap, ResourceData, planned_state},
        diff::{AttributeChange, CustomDiff, PlanAction, PlanResult, diff_resource},
        schema::{Diagnostic, Schema},
        upgrade::StateUpgrader,
    },
    sdk::client::{Client, RequestContext},
    tracking::{Operation, OperationMetadata},
};

/// What a kind can do. The engine consults these instead of probing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub has_show: bool,
    pub has_describe: bool,
    pub has_alter: bool,
    pub has_drop_safely: bool,
    pub has_rename: bool,
    pub has_state_upgrader: bool,
    /// Without update every change replaces the object.
    pub supports_update: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities {
            has_show: true,
            has_describe: false,
            has_alter: true,
            has_drop_safely: true,
            has_rename: false,
            has_state_upgrader: false,
            supports_update: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    Found,
    /// The object no longer exists; state is dropped without issuing anything else.
    Gone,
}

#[async_trait]
pub trait ManagedResource: Send + Sync {
    /// Kind name as the host knows it, e.g. `snowflake_compute_pool`.
    fn name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    fn capabilities(&self) -> Capabilities;

    fn state_upgraders(&self) -> Vec<StateUpgrader> {
        Vec::new()
    }

    fn custom_diff(&self, _d: &ResourceData) -> Result<CustomDiff> {
        Ok(CustomDiff::default())
    }

    /// Issues the create and sets the id. The engine reads the object back afterwards.
    async fn create(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<()>;

    async fn read(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<ReadOutcome>;

    /// Issues the alters. The engine reads the object back afterwards.
    async fn update(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<()>;

    async fn delete(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<()>;

    /// Parses the user-supplied id into the attributes the next read needs.
    fn import(&self, id: &str, d: &mut ResourceData) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApplyResult {
    /// `None` once the object is gone.
    pub state: Option<AttributeMap>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct ApplyError {
    /// State to record despite the failure. Never set for a failed create.
    pub state: Option<AttributeMap>,
    /// Some statements committed before the failure.
    pub partial: bool,
    #[source]
    pub source: ProviderError,
}

impl ApplyError {
    fn without_state(source: ProviderError) -> Self {
        ApplyError {
            state: None,
            partial: false,
            source,
        }
    }

    /// Nothing was issued; the prior state stands.
    fn unchanged(state: AttributeMap, source: ProviderError) -> Self {
        ApplyError {
            state: Some(state),
            partial: false,
            source,
        }
    }

    fn partial(state: AttributeMap, source: ProviderError) -> Self {
        ApplyError {
            state: Some(state),
            partial: true,
            source,
        }
    }
}

struct Registered {
    resource: Arc<dyn ManagedResource>,
    schema: Arc<Schema>,
}

/// Host-facing registry of managed kinds.
pub struct Provider {
    resources: IndexMap<&'static str, Registered>,
    cancel: CancellationToken,
}

impl Default for Provider {
    fn default() -> Self {
        Provider::new()
    }
}

impl Provider {
    pub fn new() -> Self {
        Provider::with_resources(crate::resources::all())
    }

    pub fn with_resources(resources: Vec<Arc<dyn ManagedResource>>) -> Self {
        let resources = resources
            .into_iter()
            .map(|resource| {
                let schema = Arc::new(resource.schema());
                (resource.name(), Registered { resource, schema })
            })
            .collect();
        Provider {
            resources,
            cancel: CancellationToken::new(),
        }
    }

    /// Cancelling `cancel` stops every lifecycle call before its next statement.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn resource_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.resources.keys().copied()
    }

    fn registered(&self, kind: &str) -> Result<&Registered> {
        self.resources
            .get(kind)
            .ok_or_else(|| ProviderError::UnknownResource(kind.to_string()))
    }

    fn context(&self, kind: &str, operation: Operation) -> RequestContext {
        RequestContext::new(OperationMetadata::new(kind, operation)).with_cancellation(self.cancel.clone())
    }

    pub fn schema(&self, kind: &str) -> Result<&Schema> {
        Ok(&self.registered(kind)?.schema)
    }

    pub fn capabilities(&self, kind: &str) -> Result<Capabilities> {
        Ok(self.registered(kind)?.resource.capabilities())
    }

    pub fn validate(&self, kind: &str, config: &AttributeMap) -> Result<Vec<Diagnostic>> {
        Ok(self.registered(kind)?.schema.validate(config))
    }

    fn check_config(&self, registered: &Registered, config: &AttributeMap) -> Result<()> {
        let errors: Vec<String> = registered
            .schema
            .validate(config)
            .into_iter()
            .filter(Diagnostic::is_error)
            .map(|d| match (d.attribute, d.detail) {
                (Some(attr), Some(detail)) => format!("{attr}: {}: {detail}", d.summary),
                (Some(attr), None) => format!("{attr}: {}", d.summary),
                (None, _) => d.summary,
            })
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProviderError::Validation(errors.join("; ")))
        }
    }

    /// Custom diff: decides between noop, create, update in place, replace and delete.
    pub fn plan(&self, kind: &str, prior: Option<&AttributeMap>, config: Option<&AttributeMap>) -> Result<PlanResult> {
        let registered = self.registered(kind)?;
        let result = match (prior, config) {
            (None, None) => PlanResult {
                action: PlanAction::Noop,
                planned_state: None,
                changes: Vec::new(),
                replace_reasons: Vec::new(),
            },
            (Some(prior), None) => PlanResult {
                action: PlanAction::Delete,
                planned_state: None,
                changes: prior
                    .iter()
                    .map(|(k, v)| AttributeChange {
                        path: k.clone(),
                        before: Some(v.clone()),
                        after: None,
                        requires_replace: false,
                    })
                    .collect(),
                replace_reasons: Vec::new(),
            },
            (None, Some(config)) => {
                self.check_config(registered, config)?;
                let planned = planned_state(&registered.schema, None, config);
                PlanResult {
                    action: PlanAction::Create,
                    changes: planned
                        .iter()
                        .map(|(k, v)| AttributeChange {
                            path: k.clone(),
                            before: None,
                            after: Some(v.clone()),
                            requires_replace: false,
                        })
                        .collect(),
                    planned_state: Some(planned),
                    replace_reasons: Vec::new(),
                }
            }
            (Some(prior), Some(config)) => {
                self.check_config(registered, config)?;
                let d = ResourceData::for_update(registered.schema.clone(), prior, config);
                let custom = registered.resource.custom_diff(&d)?;
                diff_resource(&d, registered.resource.capabilities().supports_update, &custom)
            }
        };

        tracing::info!(
            "plan for {kind}: {:?} ({} change(s){})",
            result.action,
            result.changes.len(),
            if result.replace_reasons.is_empty() {
                String::new()
            } else {
                format!(", replace because of {}", result.replace_reasons.join(", "))
            }
        );
        Ok(result)
    }

    pub async fn create(&self, client: &Client, kind: &str, config: &AttributeMap) -> Result<ApplyResult, ApplyError> {
        let registered = self.registered(kind).map_err(ApplyError::without_state)?;
        self.check_config(registered, config).map_err(ApplyError::without_state)?;

        let ctx = self.context(kind, Operation::Create);
        let mut d = ResourceData::for_create(registered.schema.clone(), config);
        registered
            .resource
            .create(client, &ctx, &mut d)
            .await
            .map_err(ApplyError::without_state)?;
        tracing::info!("created {kind} {}", d.id().unwrap_or_default());

        self.read_back(registered, client, &ctx, d)
            .await
            .map_err(ApplyError::without_state)
    }

    pub async fn read(&self, client: &Client, kind: &str, state: &AttributeMap) -> Result<ApplyResult> {
        let registered = self.registered(kind)?;
        let ctx = self.context(kind, Operation::Read);
        let d = ResourceData::for_read(registered.schema.clone(), state);
        self.read_back(registered, client, &ctx, d).await
    }

    pub async fn update(
        &self,
        client: &Client,
        kind: &str,
        state: &AttributeMap,
        config: &AttributeMap,
    ) -> Result<ApplyResult, ApplyError> {
        let registered = self.registered(kind).map_err(ApplyError::without_state)?;
        self.check_config(registered, config)
            .map_err(|e| ApplyError::unchanged(state.clone(), e))?;

        let ctx = self.context(kind, Operation::Update);
        let mut d = ResourceData::for_update(registered.schema.clone(), state, config);
        if let Err(e) = registered.resource.update(client, &ctx, &mut d).await {
            tracing::warn!("update of {kind} failed, returning partial state: {e}");
            return Err(ApplyError::partial(d.partial_state(), e));
        }

        let committed = d.state().clone();
        self.read_back(registered, client, &ctx, d)
            .await
            .map_err(|e| ApplyError::partial(committed, e))
    }

    pub async fn delete(&self, client: &Client, kind: &str, state: &AttributeMap) -> Result<ApplyResult> {
        let registered = self.registered(kind)?;
        let ctx = self.context(kind, Operation::Delete);
        let mut d = ResourceData::for_read(registered.schema.clone(), state);
        registered.resource.delete(client, &ctx, &mut d).await?;
        tracing::info!("deleted {kind} {}", d.id().unwrap_or_default());
        Ok(ApplyResult {
            state: None,
            diagnostics: d.take_diagnostics(),
        })
    }

    pub async fn import(&self, client: &Client, kind: &str, id: &str) -> Result<ApplyResult> {
        let registered = self.registered(kind)?;
        let ctx = self.context(kind, Operation::Import);
        let mut d = ResourceData::for_import(registered.schema.clone(), id);
        registered.resource.import(id, &mut d)?;
        let result = self.read_back(registered, client, &ctx, d).await?;
        if result.state.is_none() {
            return Err(ProviderError::ObjectNotFound(id.to_string()));
        }
        Ok(result)
    }

    pub fn upgrade_state(&self, kind: &str, version: u64, state: AttributeMap) -> Result<AttributeMap> {
        let registered = self.registered(kind)?;
        upgrade::upgrade_state(&registered.resource.state_upgraders(), version, state)
    }

    async fn read_back(
        &self,
        registered: &Registered,
        client: &Client,
        ctx: &RequestContext,
        mut d: ResourceData,
    ) -> Result<ApplyResult> {
        match registered.resource.read(client, ctx, &mut d).await? {
            ReadOutcome::Found => {}
            ReadOutcome::Gone => {
                d.warn(
                    format!("{} not found", registered.resource.name()),
                    format!(
                        "{} does not exist anymore and was removed from state",
                        d.id().unwrap_or_default()
                    ),
                );
                d.clear();
            }
        }
        let diagnostics = d.take_diagnostics();
        Ok(ApplyResult {
            state: d.into_state(),
            diagnostics,
        })
    }
}
