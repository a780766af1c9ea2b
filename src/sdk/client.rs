use std::{fmt, sync::Arc};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{ProviderError, Result},
    sdk::{
        compute_pools::ComputePools,
        grants::Grants,
        image_repositories::ImageRepositories,
        listings::Listings,
        masking_policies::MaskingPolicies,
        programmatic_access_tokens::ProgrammaticAccessTokens,
        record::{RecordError, RecordRef, RowSet},
        roles::Roles,
        row_access_policies::RowAccessPolicies,
        services::Services,
    },
    tracking::{Operation, OperationMetadata, tag_query},
};

/// Runs already-tagged SQL against Snowflake.
///
/// SQL errors come back as [`ProviderError::Remote`], everything else the
/// driver reports as [`ProviderError::Transport`].
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn exec(&self, sql: &str) -> Result<()>;
    async fn query(&self, sql: &str) -> Result<RowSet>;
}

/// Per-call context: who is asking, and whether they still want the answer.
#[derive(Debug, Clone)]
pub struct RequestContext {
    cancel: CancellationToken,
    metadata: OperationMetadata,
}

impl RequestContext {
    pub fn new(metadata: OperationMetadata) -> Self {
        RequestContext {
            cancel: CancellationToken::new(),
            metadata,
        }
    }

    pub fn for_operation(resource: &str, operation: Operation) -> Self {
        RequestContext::new(OperationMetadata::new(resource, operation))
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn metadata(&self) -> &OperationMetadata {
        &self.metadata
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Decodes one SHOW or DESCRIBE row.
pub trait FromRecord: Sized {
    fn from_record(record: &RecordRef<'_>) -> Result<Self, RecordError>;
}

/// Snowflake client facade. Cheap to clone; every clone shares the executor.
#[derive(Clone)]
pub struct Client {
    executor: Arc<dyn QueryExecutor>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

impl Client {
    pub fn new(executor: Arc<dyn QueryExecutor>) -> Self {
        Client { executor }
    }

    fn tagged(&self, ctx: &RequestContext, sql: &str) -> Result<String> {
        if ctx.is_cancelled() {
            return Err(ProviderError::Cancelled(sql.to_string()));
        }
        let sql = tag_query(sql, ctx.metadata());
        tracing::debug!("executing: {sql}");
        Ok(sql)
    }

    /// Issues one statement. Once issued it runs to completion.
    pub async fn exec(&self, ctx: &RequestContext, sql: &str) -> Result<()> {
        let sql = self.tagged(ctx, sql)?;
        self.executor.exec(&sql).await
    }

    pub async fn query(&self, ctx: &RequestContext, sql: &str) -> Result<RowSet> {
        let sql = self.tagged(ctx, sql)?;
        self.executor.query(&sql).await
    }

    pub async fn query_as<T: FromRecord>(&self, ctx: &RequestContext, sql: &str) -> Result<Vec<T>> {
        let rows = self.query(ctx, sql).await?;
        rows.iter_records()
            .map(|r| T::from_record(&r).map_err(ProviderError::from))
            .collect()
    }

    /// First row of a SHOW narrowed to one object, selected by `matches`.
    /// No match is `ObjectNotFound`.
    pub async fn show_one<T: FromRecord>(
        &self,
        ctx: &RequestContext,
        sql: &str,
        object: &str,
        matches: impl Fn(&T) -> bool,
    ) -> Result<T> {
        self.query_as::<T>(ctx, sql)
            .await?
            .into_iter()
            .find(matches)
            .ok_or_else(|| ProviderError::ObjectNotFound(object.to_string()))
    }

    /// A DESCRIBE; absence (remote "does not exist") is `ObjectNotFound`.
    pub async fn describe_as<T: FromRecord>(&self, ctx: &RequestContext, sql: &str, object: &str) -> Result<Vec<T>> {
        self.query_as(ctx, sql)
            .await
            .map_err(|e| e.classify_not_found(object))
    }

    /// A DROP; absence is `ObjectNotFound`.
    pub async fn drop_object(&self, ctx: &RequestContext, sql: &str, object: &str) -> Result<()> {
        self.exec(ctx, sql).await.map_err(|e| e.classify_not_found(object))
    }

    pub fn compute_pools(&self) -> ComputePools<'_> {
        ComputePools::new(self)
    }

    pub fn services(&self) -> Services<'_> {
        Services::new(self)
    }

    pub fn masking_policies(&self) -> MaskingPolicies<'_> {
        MaskingPolicies::new(self)
    }

    pub fn row_access_policies(&self) -> RowAccessPolicies<'_> {
        RowAccessPolicies::new(self)
    }

    pub fn image_repositories(&self) -> ImageRepositories<'_> {
        ImageRepositories::new(self)
    }

    pub fn listings(&self) -> Listings<'_> {
        Listings::new(self)
    }

    pub fn roles(&self) -> Roles<'_> {
        Roles::new(self)
    }

    pub fn grants(&self) -> Grants<'_> {
        Grants::new(self)
    }

    pub fn programmatic_access_tokens(&self) -> ProgrammaticAccessTokens<'_> {
        ProgrammaticAccessTokens::new(self)
    }
}

/// Treats `ObjectNotFound` as success; every DropSafely goes through here.
pub(crate) fn ignore_not_found(result: Result<()>) -> Result<()> {
    match result {
        Err(e) if e.is_not_found() => {
            tracing::debug!("object already gone: {e}");
            Ok(())
        }
        other => other,
    }
}
