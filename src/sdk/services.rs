//! Snowpark Container Services: long-running services and one-shot job services.

use serde::Serialize;
use serde_json::Value;

use crate::{
    error::{ProviderError, Result},
    sdk::{
        client::{Client, FromRecord, RequestContext, ignore_not_found},
        identifier::{AccountObjectIdentifier, ObjectIdentifier, SchemaObjectIdentifier},
        record::{RecordError, RecordRef},
        sql::{
            In, Like, Options, ToSql, UnsetList, alter_prefix, create_prefix, dollar_quote, drop_statement, show_statement,
        },
    },
};

pub const DEFAULT_AUTO_RESUME: bool = true;
pub const DEFAULT_AUTO_SUSPEND_SECS: i64 = 0;
pub const DEFAULT_INSTANCES: i64 = 1;

fn integrations_list(integrations: &[AccountObjectIdentifier]) -> String {
    let names: Vec<String> = integrations.iter().map(ObjectIdentifier::fully_qualified_name).collect();
    format!("({})", names.join(", "))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateService {
    pub name: SchemaObjectIdentifier,
    pub if_not_exists: bool,
    pub compute_pool: AccountObjectIdentifier,
    pub specification: String,
    pub auto_suspend_secs: Option<i64>,
    pub external_access_integrations: Vec<AccountObjectIdentifier>,
    pub auto_resume: Option<bool>,
    pub initially_suspended: Option<bool>,
    pub min_instances: Option<i64>,
    pub min_ready_instances: Option<i64>,
    pub max_instances: Option<i64>,
    pub query_warehouse: Option<AccountObjectIdentifier>,
    pub comment: Option<String>,
}

impl CreateService {
    pub fn new(name: SchemaObjectIdentifier, compute_pool: AccountObjectIdentifier, specification: impl Into<String>) -> Self {
        CreateService {
            name,
            if_not_exists: false,
            compute_pool,
            specification: specification.into(),
            auto_suspend_secs: None,
            external_access_integrations: Vec::new(),
            auto_resume: None,
            initially_suspended: None,
            min_instances: None,
            min_ready_instances: None,
            max_instances: None,
            query_warehouse: None,
            comment: None,
        }
    }
}

impl ToSql for CreateService {
    fn to_sql(&self) -> String {
        let mut sql = create_prefix("SERVICE", &self.name, false, self.if_not_exists);
        sql.push_str(&format!(
            " IN COMPUTE POOL {} FROM SPECIFICATION {}",
            self.compute_pool,
            dollar_quote(&self.specification)
        ));

        let integrations =
            (!self.external_access_integrations.is_empty()).then(|| integrations_list(&self.external_access_integrations));
        let mut options = Options::new();
        options
            .int("AUTO_SUSPEND_SECS", self.auto_suspend_secs)
            .raw("EXTERNAL_ACCESS_INTEGRATIONS", integrations)
            .bool("AUTO_RESUME", self.auto_resume)
            .bool("INITIALLY_SUSPENDED", self.initially_suspended)
            .int("MIN_INSTANCES", self.min_instances)
            .int("MIN_READY_INSTANCES", self.min_ready_instances)
            .int("MAX_INSTANCES", self.max_instances)
            .ident("QUERY_WAREHOUSE", self.query_warehouse.as_ref())
            .text("COMMENT", self.comment.as_deref());
        sql.push_str(&options.to_create_clause());
        sql
    }
}

/// `EXECUTE JOB SERVICE`: runs the specification once and keeps the service object around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteJobService {
    pub name: SchemaObjectIdentifier,
    pub compute_pool: AccountObjectIdentifier,
    pub specification: String,
    pub is_async: bool,
    pub query_warehouse: Option<AccountObjectIdentifier>,
    pub comment: Option<String>,
    pub external_access_integrations: Vec<AccountObjectIdentifier>,
}

impl ExecuteJobService {
    pub fn new(name: SchemaObjectIdentifier, compute_pool: AccountObjectIdentifier, specification: impl Into<String>) -> Self {
        ExecuteJobService {
            name,
            compute_pool,
            specification: specification.into(),
            is_async: true,
            query_warehouse: None,
            comment: None,
            external_access_integrations: Vec::new(),
        }
    }
}

impl ToSql for ExecuteJobService {
    fn to_sql(&self) -> String {
        let integrations =
            (!self.external_access_integrations.is_empty()).then(|| integrations_list(&self.external_access_integrations));
        let mut options = Options::new();
        options
            .ident("NAME", Some(&self.name))
            .bool("ASYNC", Some(self.is_async))
            .ident("QUERY_WAREHOUSE", self.query_warehouse.as_ref())
            .text("COMMENT", self.comment.as_deref())
            .raw("EXTERNAL_ACCESS_INTEGRATIONS", integrations);
        format!(
            "EXECUTE JOB SERVICE IN COMPUTE POOL {}{} FROM SPECIFICATION {}",
            self.compute_pool,
            options.to_create_clause(),
            dollar_quote(&self.specification)
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceSet {
    pub min_instances: Option<i64>,
    pub max_instances: Option<i64>,
    pub auto_suspend_secs: Option<i64>,
    pub min_ready_instances: Option<i64>,
    pub query_warehouse: Option<AccountObjectIdentifier>,
    pub auto_resume: Option<bool>,
    pub external_access_integrations: Option<Vec<AccountObjectIdentifier>>,
    pub comment: Option<String>,
}

impl ServiceSet {
    pub fn is_empty(&self) -> bool {
        self == &ServiceSet::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceUnset {
    pub min_instances: bool,
    pub max_instances: bool,
    pub auto_suspend_secs: bool,
    pub min_ready_instances: bool,
    pub query_warehouse: bool,
    pub auto_resume: bool,
    pub external_access_integrations: bool,
    pub comment: bool,
}

impl ServiceUnset {
    pub fn is_empty(&self) -> bool {
        self == &ServiceUnset::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceAction {
    Suspend,
    Resume,
    /// Replaces the specification; running instances are upgraded.
    FromSpecification(String),
    Set(ServiceSet),
    Unset(ServiceUnset),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterService {
    pub name: SchemaObjectIdentifier,
    pub if_exists: bool,
    pub action: ServiceAction,
}

impl AlterService {
    pub fn new(name: SchemaObjectIdentifier, action: ServiceAction) -> Self {
        AlterService {
            name,
            if_exists: false,
            action,
        }
    }
}

impl ToSql for AlterService {
    fn to_sql(&self) -> String {
        let prefix = alter_prefix("SERVICE", &self.name, self.if_exists);
        match &self.action {
            ServiceAction::Suspend => format!("{prefix} SUSPEND"),
            ServiceAction::Resume => format!("{prefix} RESUME"),
            ServiceAction::FromSpecification(spec) => format!("{prefix} FROM SPECIFICATION {}", dollar_quote(spec)),
            ServiceAction::Set(set) => {
                let integrations = set.external_access_integrations.as_deref().map(integrations_list);
                let mut options = Options::new();
                options
                    .int("MIN_INSTANCES", set.min_instances)
                    .int("MAX_INSTANCES", set.max_instances)
                    .int("AUTO_SUSPEND_SECS", set.auto_suspend_secs)
                    .int("MIN_READY_INSTANCES", set.min_ready_instances)
                    .ident("QUERY_WAREHOUSE", set.query_warehouse.as_ref())
                    .bool("AUTO_RESUME", set.auto_resume)
                    .raw("EXTERNAL_ACCESS_INTEGRATIONS", integrations)
                    .text("COMMENT", set.comment.as_deref());
                format!("{prefix} SET {}", options.to_set_list())
            }
            ServiceAction::Unset(unset) => {
                let mut keys = UnsetList::new();
                keys.push("MIN_INSTANCES", unset.min_instances)
                    .push("MAX_INSTANCES", unset.max_instances)
                    .push("AUTO_SUSPEND_SECS", unset.auto_suspend_secs)
                    .push("MIN_READY_INSTANCES", unset.min_ready_instances)
                    .push("QUERY_WAREHOUSE", unset.query_warehouse)
                    .push("AUTO_RESUME", unset.auto_resume)
                    .push("EXTERNAL_ACCESS_INTEGRATIONS", unset.external_access_integrations)
                    .push("COMMENT", unset.comment);
                format!("{prefix} UNSET {}", keys.to_list())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropService {
    pub name: SchemaObjectIdentifier,
    pub if_exists: bool,
}

impl ToSql for DropService {
    fn to_sql(&self) -> String {
        drop_statement("SERVICE", &self.name, self.if_exists)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShowServices {
    /// `SHOW JOB SERVICES` instead of `SHOW SERVICES`.
    pub job: bool,
    pub like: Option<Like>,
    pub scope: Option<In>,
    pub limit: Option<u64>,
}

impl ToSql for ShowServices {
    fn to_sql(&self) -> String {
        let object = if self.job { "JOB SERVICES" } else { "SERVICES" };
        show_statement(object, self.like.as_ref(), self.scope.as_ref(), self.limit)
    }
}

/// One row of `SHOW SERVICES` / `SHOW JOB SERVICES`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Service {
    pub name: String,
    pub status: String,
    pub database_name: String,
    pub schema_name: String,
    pub owner: String,
    pub compute_pool: String,
    pub dns_name: String,
    pub current_instances: i64,
    pub target_instances: i64,
    pub min_ready_instances: i64,
    pub min_instances: i64,
    pub max_instances: i64,
    pub auto_resume: bool,
    pub external_access_integrations: Vec<String>,
    pub created_on: String,
    pub updated_on: String,
    pub resumed_on: String,
    pub suspended_on: String,
    pub auto_suspend_secs: i64,
    pub comment: String,
    pub owner_role_type: String,
    pub query_warehouse: String,
    pub is_job: bool,
    pub is_async_job: bool,
    pub spec_digest: String,
    pub is_upgrading: bool,
}

impl Service {
    pub fn id(&self) -> SchemaObjectIdentifier {
        SchemaObjectIdentifier::new(self.database_name.clone(), self.schema_name.clone(), self.name.clone())
    }
}

/// SHOW renders the integration list as a JSON array inside a string.
fn decode_integrations(r: &RecordRef<'_>) -> Result<Vec<String>, RecordError> {
    const COLUMN: &str = "external_access_integrations";
    match r.get(COLUMN) {
        None => Ok(Vec::new()),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(Vec::new()),
        Some(Value::String(s)) => serde_json::from_str(s).map_err(|e| RecordError::InvalidCell {
            col: COLUMN.to_string(),
            r#type: "list of integrations",
            row: 0,
            reason: e.to_string(),
        }),
        Some(_) => r.require_as(COLUMN),
    }
}

impl FromRecord for Service {
    fn from_record(r: &RecordRef<'_>) -> Result<Self, RecordError> {
        Ok(Service {
            name: r.require_string("name")?,
            status: r.get_string("status").unwrap_or_default(),
            database_name: r.require_string("database_name")?,
            schema_name: r.require_string("schema_name")?,
            owner: r.get_string("owner").unwrap_or_default(),
            compute_pool: r.get_string("compute_pool").unwrap_or_default(),
            dns_name: r.get_string("dns_name").unwrap_or_default(),
            current_instances: r.get_i64("current_instances")?.unwrap_or_default(),
            target_instances: r.get_i64("target_instances")?.unwrap_or_default(),
            min_ready_instances: r.get_i64("min_ready_instances")?.unwrap_or_default(),
            min_instances: r.get_i64("min_instances")?.unwrap_or_default(),
            max_instances: r.get_i64("max_instances")?.unwrap_or_default(),
            auto_resume: r.get_bool("auto_resume")?.unwrap_or_default(),
            external_access_integrations: decode_integrations(r)?,
            created_on: r.get_string("created_on").unwrap_or_default(),
            updated_on: r.get_string("updated_on").unwrap_or_default(),
            resumed_on: r.get_string("resumed_on").unwrap_or_default(),
            suspended_on: r.get_string("suspended_on").unwrap_or_default(),
            auto_suspend_secs: r.get_i64("auto_suspend_secs")?.unwrap_or_default(),
            comment: r.get_string("comment").unwrap_or_default(),
            owner_role_type: r.get_string("owner_role_type").unwrap_or_default(),
            query_warehouse: r.get_string("query_warehouse").unwrap_or_default(),
            is_job: r.get_bool("is_job")?.unwrap_or_default(),
            is_async_job: r.get_bool("is_async_job")?.unwrap_or_default(),
            spec_digest: r.get_string("spec_digest").unwrap_or_default(),
            is_upgrading: r.get_bool("is_upgrading")?.unwrap_or_default(),
        })
    }
}

/// `DESCRIBE SERVICE`: the SHOW columns plus the specification text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceDetails {
    #[serde(flatten)]
    pub service: Service,
    pub spec: String,
}

impl FromRecord for ServiceDetails {
    fn from_record(r: &RecordRef<'_>) -> Result<Self, RecordError> {
        Ok(ServiceDetails {
            service: Service::from_record(r)?,
            spec: r.get_string("spec").unwrap_or_default(),
        })
    }
}

pub struct Services<'a> {
    client: &'a Client,
}

impl<'a> Services<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Services { client }
    }

    pub async fn create(&self, ctx: &RequestContext, request: &CreateService) -> Result<()> {
        self.client.exec(ctx, &request.to_sql()).await
    }

    pub async fn execute_job(&self, ctx: &RequestContext, request: &ExecuteJobService) -> Result<()> {
        self.client.exec(ctx, &request.to_sql()).await
    }

    pub async fn alter(&self, ctx: &RequestContext, request: &AlterService) -> Result<()> {
        self.client.exec(ctx, &request.to_sql()).await
    }

    pub async fn drop(&self, ctx: &RequestContext, request: &DropService) -> Result<()> {
        self.client
            .drop_object(ctx, &request.to_sql(), &request.name.fully_qualified_name())
            .await
    }

    /// Job services are dropped with `DROP SERVICE` too.
    pub async fn drop_safely(&self, ctx: &RequestContext, id: &SchemaObjectIdentifier) -> Result<()> {
        let request = DropService {
            name: id.clone(),
            if_exists: true,
        };
        ignore_not_found(self.drop(ctx, &request).await)
    }

    pub async fn show(&self, ctx: &RequestContext, request: &ShowServices) -> Result<Vec<Service>> {
        self.client.query_as(ctx, &request.to_sql()).await
    }

    async fn show_one(&self, ctx: &RequestContext, id: &SchemaObjectIdentifier, job: bool) -> Result<Service> {
        let request = ShowServices {
            job,
            like: Some(Like::new(id.name())),
            scope: Some(In::Schema(id.schema_id())),
            limit: None,
        };
        self.client
            .show_one(ctx, &request.to_sql(), &id.fully_qualified_name(), |s: &Service| {
                s.name == id.name()
            })
            .await
    }

    pub async fn show_by_id(&self, ctx: &RequestContext, id: &SchemaObjectIdentifier) -> Result<Service> {
        self.show_one(ctx, id, false).await
    }

    /// Missing database or schema also count as the service being absent.
    pub async fn show_by_id_safely(&self, ctx: &RequestContext, id: &SchemaObjectIdentifier) -> Result<Service> {
        self.show_by_id(ctx, id)
            .await
            .map_err(|e| e.classify_not_found(&id.fully_qualified_name()))
    }

    pub async fn show_job_by_id_safely(&self, ctx: &RequestContext, id: &SchemaObjectIdentifier) -> Result<Service> {
        self.show_one(ctx, id, true)
            .await
            .map_err(|e| e.classify_not_found(&id.fully_qualified_name()))
    }

    pub async fn describe(&self, ctx: &RequestContext, id: &SchemaObjectIdentifier) -> Result<ServiceDetails> {
        let object = id.fully_qualified_name();
        self.client
            .describe_as::<ServiceDetails>(ctx, &format!("DESCRIBE SERVICE {object}"), &object)
            .await?
            .into_iter()
            .next()
            .ok_or(ProviderError::ObjectNotFound(object))
    }
}
