use async_trait::async_trait;
use serde_json::json;

use crate::{
    error::Result,
    provider::{
        Capabilities, ManagedResource, ReadOutcome,
        attributes::{
            ShowMapping, Tristate, computed_if_any_attribute_changed, create_builder, get_tristate,
            handle_external_changes_in_show, ignore_case, ignore_change_to_current_value_in_show, read_set,
            show_output_value, update_set_unset,
        },
        data::{DESCRIBE_OUTPUT, FULLY_QUALIFIED_NAME, ResourceData, SHOW_OUTPUT},
        diff::CustomDiff,
        lifecycle::LifecycleState,
        schema::{Attribute, AttributeType, Schema, validate_one_of},
    },
    resources::common::{
        COMMENT, NAME, account_object_id, account_object_id_from_config, comment, found, fully_qualified_name,
        import_account_object, name_part, persist_all, set_identifiers, set_output, warn_on_external_transition,
    },
    sdk::{
        client::{Client, RequestContext},
        compute_pools::{
            AlterComputePool, ComputePoolAction, ComputePoolSet, ComputePoolUnset, CreateComputePool,
            DEFAULT_AUTO_RESUME, DEFAULT_AUTO_SUSPEND_SECS,
        },
        identifier::{AccountObjectIdentifier, ObjectIdentifier},
    },
};

const FOR_APPLICATION: &str = "for_application";
const MIN_NODES: &str = "min_nodes";
const MAX_NODES: &str = "max_nodes";
const INSTANCE_FAMILY: &str = "instance_family";
const AUTO_RESUME: &str = "auto_resume";
const INITIALLY_SUSPENDED: &str = "initially_suspended";
const AUTO_SUSPEND_SECS: &str = "auto_suspend_secs";

pub const INSTANCE_FAMILIES: &[&str] = &[
    "CPU_X64_XS",
    "CPU_X64_S",
    "CPU_X64_M",
    "CPU_X64_SL",
    "CPU_X64_L",
    "HIGHMEM_X64_S",
    "HIGHMEM_X64_M",
    "HIGHMEM_X64_SL",
    "HIGHMEM_X64_L",
    "GPU_NV_XS",
    "GPU_NV_S",
    "GPU_NV_SM",
    "GPU_NV_M",
    "GPU_NV_2M",
    "GPU_NV_3M",
    "GPU_NV_L",
    "GPU_NV_SL",
];

fn validate_node_count(v: &serde_json::Value) -> std::result::Result<(), String> {
    match v.as_i64() {
        Some(n) if n < 1 => Err(format!("expected at least 1 node, got {n}")),
        _ => Ok(()),
    }
}

pub struct ComputePoolResource;

#[async_trait]
impl ManagedResource for ComputePoolResource {
    fn name(&self) -> &'static str {
        "snowflake_compute_pool"
    }

    fn schema(&self) -> Schema {
        Schema::new(0)
            .with_attribute(NAME, name_part().with_force_new())
            .with_attribute(
                FOR_APPLICATION,
                Attribute::optional(AttributeType::String)
                    .with_force_new()
                    .with_description("Name of the Native App that owns the pool."),
            )
            .with_attribute(
                MIN_NODES,
                Attribute::required(AttributeType::Int).with_validator(validate_node_count),
            )
            .with_attribute(
                MAX_NODES,
                Attribute::required(AttributeType::Int).with_validator(validate_node_count),
            )
            .with_attribute(
                INSTANCE_FAMILY,
                Attribute::required(AttributeType::String)
                    .with_force_new()
                    .with_validator(validate_one_of(INSTANCE_FAMILIES))
                    .with_diff_suppress(ignore_case()),
            )
            .with_attribute(
                AUTO_RESUME,
                Attribute::bool_tristate().with_diff_suppress(ignore_change_to_current_value_in_show(
                    AUTO_RESUME,
                    json!(DEFAULT_AUTO_RESUME),
                )),
            )
            .with_attribute(
                INITIALLY_SUSPENDED,
                Attribute::bool_tristate().with_ignore_after_creation().with_force_new(),
            )
            .with_attribute(
                AUTO_SUSPEND_SECS,
                Attribute::int_with_sentinel().with_diff_suppress(ignore_change_to_current_value_in_show(
                    AUTO_SUSPEND_SECS,
                    json!(DEFAULT_AUTO_SUSPEND_SECS),
                )),
            )
            .with_attribute(COMMENT, comment())
            .with_attribute(FULLY_QUALIFIED_NAME, fully_qualified_name())
            .with_attribute(SHOW_OUTPUT, Attribute::output())
            .with_attribute(DESCRIBE_OUTPUT, Attribute::output())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            has_describe: true,
            ..Default::default()
        }
    }

    fn custom_diff(&self, d: &ResourceData) -> Result<CustomDiff> {
        let mut diff = CustomDiff::default();
        let watched = [MIN_NODES, MAX_NODES, AUTO_RESUME, AUTO_SUSPEND_SECS, COMMENT];
        computed_if_any_attribute_changed(d, &mut diff, SHOW_OUTPUT, &watched);
        computed_if_any_attribute_changed(d, &mut diff, DESCRIBE_OUTPUT, &watched);
        Ok(diff)
    }

    async fn create(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<()> {
        let id = account_object_id_from_config(d);
        let mut request = CreateComputePool::new(
            id.clone(),
            d.get_i64(MIN_NODES).unwrap_or_default(),
            d.get_i64(MAX_NODES).unwrap_or_default(),
            d.get_str(INSTANCE_FAMILY),
        );
        create_builder(d, FOR_APPLICATION, |v: AccountObjectIdentifier| {
            request.for_application = Some(v)
        })?;
        create_builder(d, AUTO_RESUME, |v| request.auto_resume = Some(v))?;
        create_builder(d, INITIALLY_SUSPENDED, |v| request.initially_suspended = Some(v))?;
        create_builder(d, AUTO_SUSPEND_SECS, |v| request.auto_suspend_secs = Some(v))?;
        create_builder(d, COMMENT, |v| request.comment = Some(v))?;

        client.compute_pools().create(ctx, &request).await?;

        let suspended = matches!(get_tristate::<bool>(d, INITIALLY_SUSPENDED)?, Tristate::Value(true));
        tracing::debug!("compute pool {id} created, {}", LifecycleState::after_create(suspended));
        set_identifiers(d, &id);
        Ok(())
    }

    async fn read(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<ReadOutcome> {
        let id = account_object_id(d)?;
        let pools = client.compute_pools();
        let Some(pool) = found(pools.show_by_id_safely(ctx, &id).await)? else {
            return Ok(ReadOutcome::Gone);
        };
        let Some(details) = found(pools.describe(ctx, &id).await)? else {
            return Ok(ReadOutcome::Gone);
        };

        warn_on_external_transition(d, "state", &pool.state);
        handle_external_changes_in_show(
            d,
            &[ShowMapping::new(COMMENT, COMMENT, pool.comment.clone(), pool.comment.clone())],
        );

        if d.get_raw(NAME).is_none() {
            d.set(NAME, pool.name.clone());
        }
        if !pool.application.is_empty() {
            d.set(FOR_APPLICATION, pool.application.clone());
        }
        d.set(MIN_NODES, pool.min_nodes);
        d.set(MAX_NODES, pool.max_nodes);
        d.set(INSTANCE_FAMILY, pool.instance_family.clone());
        read_set(d, AUTO_RESUME, pool.auto_resume, &DEFAULT_AUTO_RESUME)?;
        read_set(d, AUTO_SUSPEND_SECS, pool.auto_suspend_secs, &DEFAULT_AUTO_SUSPEND_SECS)?;
        d.set(FULLY_QUALIFIED_NAME, id.fully_qualified_name());
        set_output(d, SHOW_OUTPUT, &pool)?;
        set_output(d, DESCRIBE_OUTPUT, &details)?;
        Ok(ReadOutcome::Found)
    }

    async fn update(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<()> {
        let id = account_object_id(d)?;
        let mut set = ComputePoolSet::default();
        let mut unset = ComputePoolUnset::default();
        let mut set_attrs = Vec::new();
        let mut unset_attrs = Vec::new();

        if d.has_change(MIN_NODES) {
            set.min_nodes = d.get_i64(MIN_NODES);
            set_attrs.push(MIN_NODES);
        }
        if d.has_change(MAX_NODES) {
            set.max_nodes = d.get_i64(MAX_NODES);
            set_attrs.push(MAX_NODES);
        }
        update_set_unset(
            d,
            AUTO_RESUME,
            |v| {
                set.auto_resume = Some(v);
                set_attrs.push(AUTO_RESUME);
            },
            || {
                unset.auto_resume = true;
                unset_attrs.push(AUTO_RESUME);
            },
        )?;
        update_set_unset(
            d,
            AUTO_SUSPEND_SECS,
            |v| {
                set.auto_suspend_secs = Some(v);
                set_attrs.push(AUTO_SUSPEND_SECS);
            },
            || {
                unset.auto_suspend_secs = true;
                unset_attrs.push(AUTO_SUSPEND_SECS);
            },
        )?;
        update_set_unset(
            d,
            COMMENT,
            |v| {
                set.comment = Some(v);
                set_attrs.push(COMMENT);
            },
            || {
                unset.comment = true;
                unset_attrs.push(COMMENT);
            },
        )?;

        let pools = client.compute_pools();
        if !set.is_empty() {
            pools
                .alter(ctx, &AlterComputePool::new(id.clone(), ComputePoolAction::Set(set)))
                .await?;
            persist_all(d, &set_attrs);
        }
        if !unset.is_empty() {
            pools
                .alter(ctx, &AlterComputePool::new(id, ComputePoolAction::Unset(unset)))
                .await?;
            persist_all(d, &unset_attrs);
        }
        Ok(())
    }

    async fn delete(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<()> {
        let id = account_object_id(d)?;
        client.compute_pools().drop_safely(ctx, &id).await?;
        if let Some(serde_json::Value::String(state)) = show_output_value(d, "state") {
            tracing::debug!("compute pool {id} is {}", LifecycleState::from_remote(&state).after_drop());
        }
        d.clear();
        Ok(())
    }

    fn import(&self, id: &str, d: &mut ResourceData) -> Result<()> {
        import_account_object(id, d)
    }
}
