use serde::Serialize;

use crate::{
    error::{ProviderError, Result},
    sdk::{
        client::{Client, FromRecord, RequestContext, ignore_not_found},
        identifier::{AccountObjectIdentifier, ObjectIdentifier},
        record::{RecordError, RecordRef},
        sql::{Like, Options, ToSql, UnsetList, alter_prefix, create_prefix, drop_statement, show_statement},
    },
};

pub const DEFAULT_AUTO_RESUME: bool = true;
pub const DEFAULT_AUTO_SUSPEND_SECS: i64 = 3600;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateComputePool {
    pub name: AccountObjectIdentifier,
    pub if_not_exists: bool,
    pub for_application: Option<AccountObjectIdentifier>,
    pub min_nodes: i64,
    pub max_nodes: i64,
    pub instance_family: String,
    pub auto_resume: Option<bool>,
    pub initially_suspended: Option<bool>,
    pub auto_suspend_secs: Option<i64>,
    pub comment: Option<String>,
}

impl CreateComputePool {
    pub fn new(name: AccountObjectIdentifier, min_nodes: i64, max_nodes: i64, instance_family: impl Into<String>) -> Self {
        CreateComputePool {
            name,
            if_not_exists: false,
            for_application: None,
            min_nodes,
            max_nodes,
            instance_family: instance_family.into(),
            auto_resume: None,
            initially_suspended: None,
            auto_suspend_secs: None,
            comment: None,
        }
    }
}

impl ToSql for CreateComputePool {
    fn to_sql(&self) -> String {
        let mut sql = create_prefix("COMPUTE POOL", &self.name, false, self.if_not_exists);
        if let Some(ref application) = self.for_application {
            sql.push_str(&format!(" FOR APPLICATION {application}"));
        }

        let mut options = Options::new();
        options
            .int("MIN_NODES", Some(self.min_nodes))
            .int("MAX_NODES", Some(self.max_nodes))
            .raw("INSTANCE_FAMILY", Some(&self.instance_family))
            .bool("AUTO_RESUME", self.auto_resume)
            .bool("INITIALLY_SUSPENDED", self.initially_suspended)
            .int("AUTO_SUSPEND_SECS", self.auto_suspend_secs)
            .text("COMMENT", self.comment.as_deref());
        sql.push_str(&options.to_create_clause());
        sql
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComputePoolSet {
    pub min_nodes: Option<i64>,
    pub max_nodes: Option<i64>,
    pub auto_resume: Option<bool>,
    pub auto_suspend_secs: Option<i64>,
    pub comment: Option<String>,
}

impl ComputePoolSet {
    pub fn is_empty(&self) -> bool {
        self == &ComputePoolSet::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComputePoolUnset {
    pub auto_resume: bool,
    pub auto_suspend_secs: bool,
    pub comment: bool,
}

impl ComputePoolUnset {
    pub fn is_empty(&self) -> bool {
        self == &ComputePoolUnset::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComputePoolAction {
    Suspend,
    Resume,
    /// Stops every service and job running on the pool.
    StopAll,
    Set(ComputePoolSet),
    Unset(ComputePoolUnset),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterComputePool {
    pub name: AccountObjectIdentifier,
    pub if_exists: bool,
    pub action: ComputePoolAction,
}

impl AlterComputePool {
    pub fn new(name: AccountObjectIdentifier, action: ComputePoolAction) -> Self {
        AlterComputePool {
            name,
            if_exists: false,
            action,
        }
    }
}

impl ToSql for AlterComputePool {
    fn to_sql(&self) -> String {
        let prefix = alter_prefix("COMPUTE POOL", &self.name, self.if_exists);
        match &self.action {
            ComputePoolAction::Suspend => format!("{prefix} SUSPEND"),
            ComputePoolAction::Resume => format!("{prefix} RESUME"),
            ComputePoolAction::StopAll => format!("{prefix} STOP ALL"),
            ComputePoolAction::Set(set) => {
                let mut options = Options::new();
                options
                    .int("MIN_NODES", set.min_nodes)
                    .int("MAX_NODES", set.max_nodes)
                    .bool("AUTO_RESUME", set.auto_resume)
                    .int("AUTO_SUSPEND_SECS", set.auto_suspend_secs)
                    .text("COMMENT", set.comment.as_deref());
                format!("{prefix} SET {}", options.to_set_list())
            }
            ComputePoolAction::Unset(unset) => {
                let mut keys = UnsetList::new();
                keys.push("AUTO_RESUME", unset.auto_resume)
                    .push("AUTO_SUSPEND_SECS", unset.auto_suspend_secs)
                    .push("COMMENT", unset.comment);
                format!("{prefix} UNSET {}", keys.to_list())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropComputePool {
    pub name: AccountObjectIdentifier,
    pub if_exists: bool,
}

impl ToSql for DropComputePool {
    fn to_sql(&self) -> String {
        drop_statement("COMPUTE POOL", &self.name, self.if_exists)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShowComputePools {
    pub like: Option<Like>,
    pub limit: Option<u64>,
}

impl ToSql for ShowComputePools {
    fn to_sql(&self) -> String {
        show_statement("COMPUTE POOLS", self.like.as_ref(), None, self.limit)
    }
}

/// One row of `SHOW COMPUTE POOLS`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComputePool {
    pub name: String,
    pub state: String,
    pub min_nodes: i64,
    pub max_nodes: i64,
    pub instance_family: String,
    pub num_services: i64,
    pub num_jobs: i64,
    pub auto_suspend_secs: i64,
    pub auto_resume: bool,
    pub active_nodes: i64,
    pub idle_nodes: i64,
    pub target_nodes: i64,
    pub created_on: String,
    pub resumed_on: String,
    pub updated_on: String,
    pub owner: String,
    pub comment: String,
    pub is_exclusive: bool,
    pub application: String,
}

impl ComputePool {
    pub fn id(&self) -> AccountObjectIdentifier {
        AccountObjectIdentifier::new(self.name.clone())
    }
}

impl FromRecord for ComputePool {
    fn from_record(r: &RecordRef<'_>) -> Result<Self, RecordError> {
        Ok(ComputePool {
            name: r.require_string("name")?,
            state: r.get_string("state").unwrap_or_default(),
            min_nodes: r.get_i64("min_nodes")?.unwrap_or_default(),
            max_nodes: r.get_i64("max_nodes")?.unwrap_or_default(),
            instance_family: r.get_string("instance_family").unwrap_or_default(),
            num_services: r.get_i64("num_services")?.unwrap_or_default(),
            num_jobs: r.get_i64("num_jobs")?.unwrap_or_default(),
            auto_suspend_secs: r.get_i64("auto_suspend_secs")?.unwrap_or_default(),
            auto_resume: r.get_bool("auto_resume")?.unwrap_or_default(),
            active_nodes: r.get_i64("active_nodes")?.unwrap_or_default(),
            idle_nodes: r.get_i64("idle_nodes")?.unwrap_or_default(),
            target_nodes: r.get_i64("target_nodes")?.unwrap_or_default(),
            created_on: r.get_string("created_on").unwrap_or_default(),
            resumed_on: r.get_string("resumed_on").unwrap_or_default(),
            updated_on: r.get_string("updated_on").unwrap_or_default(),
            owner: r.get_string("owner").unwrap_or_default(),
            comment: r.get_string("comment").unwrap_or_default(),
            is_exclusive: r.get_bool("is_exclusive")?.unwrap_or_default(),
            application: r.get_string("application").unwrap_or_default(),
        })
    }
}

/// `DESCRIBE COMPUTE POOL`: the SHOW columns plus the last error, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComputePoolDetails {
    #[serde(flatten)]
    pub pool: ComputePool,
    pub error_code: String,
    pub status_message: String,
}

impl FromRecord for ComputePoolDetails {
    fn from_record(r: &RecordRef<'_>) -> Result<Self, RecordError> {
        Ok(ComputePoolDetails {
            pool: ComputePool::from_record(r)?,
            error_code: r.get_string("error_code").unwrap_or_default(),
            status_message: r.get_string("status_message").unwrap_or_default(),
        })
    }
}

pub struct ComputePools<'a> {
    client: &'a Client,
}

impl<'a> ComputePools<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        ComputePools { client }
    }

    pub async fn create(&self, ctx: &RequestContext, request: &CreateComputePool) -> Result<()> {
        self.client.exec(ctx, &request.to_sql()).await
    }

    pub async fn alter(&self, ctx: &RequestContext, request: &AlterComputePool) -> Result<()> {
        self.client.exec(ctx, &request.to_sql()).await
    }

    pub async fn drop(&self, ctx: &RequestContext, request: &DropComputePool) -> Result<()> {
        self.client
            .drop_object(ctx, &request.to_sql(), &request.name.fully_qualified_name())
            .await
    }

    pub async fn drop_safely(&self, ctx: &RequestContext, id: &AccountObjectIdentifier) -> Result<()> {
        let request = DropComputePool {
            name: id.clone(),
            if_exists: true,
        };
        ignore_not_found(self.drop(ctx, &request).await)
    }

    pub async fn show(&self, ctx: &RequestContext, request: &ShowComputePools) -> Result<Vec<ComputePool>> {
        self.client.query_as(ctx, &request.to_sql()).await
    }

    pub async fn show_by_id(&self, ctx: &RequestContext, id: &AccountObjectIdentifier) -> Result<ComputePool> {
        let request = ShowComputePools {
            like: Some(Like::new(id.name())),
            limit: None,
        };
        self.client
            .show_one(ctx, &request.to_sql(), &id.fully_qualified_name(), |p: &ComputePool| {
                p.name == id.name()
            })
            .await
    }

    pub async fn show_by_id_safely(&self, ctx: &RequestContext, id: &AccountObjectIdentifier) -> Result<ComputePool> {
        self.show_by_id(ctx, id)
            .await
            .map_err(|e| e.classify_not_found(&id.fully_qualified_name()))
    }

    pub async fn describe(&self, ctx: &RequestContext, id: &AccountObjectIdentifier) -> Result<ComputePoolDetails> {
        let object = id.fully_qualified_name();
        self.client
            .describe_as::<ComputePoolDetails>(ctx, &format!("DESCRIBE COMPUTE POOL {object}"), &object)
            .await?
            .into_iter()
            .next()
            .ok_or(ProviderError::ObjectNotFound(object))
    }
}
