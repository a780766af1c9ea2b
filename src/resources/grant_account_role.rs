//! Membership of an account role in another role or in a user.
//!
//! Grants have no alter: every configurable attribute forces a new grant.

use async_trait::async_trait;

use crate::{
    error::{ProviderError, Result},
    provider::{
        Capabilities, ManagedResource, ReadOutcome,
        data::ResourceData,
        schema::{Attribute, Schema},
    },
    resources::common::{found, optional_reference},
    sdk::{
        client::{Client, RequestContext},
        grants::{GrantRole, Grantee, RevokeRole},
        identifier::{AccountObjectIdentifier, IdentifierKind, ObjectIdentifier, composite_id, parse_composite_id},
    },
};

const ROLE_NAME: &str = "role_name";
const USER_NAME: &str = "user_name";
const PARENT_ROLE_NAME: &str = "parent_role_name";

pub struct GrantAccountRoleResource;

fn grantee_from_config(d: &ResourceData) -> Result<Grantee> {
    let user = d.get_str(USER_NAME);
    let parent = d.get_str(PARENT_ROLE_NAME);
    match (user.is_empty(), parent.is_empty()) {
        (false, true) => Ok(Grantee::User(AccountObjectIdentifier::parse(&user)?)),
        (true, false) => Ok(Grantee::Role(AccountObjectIdentifier::parse(&parent)?)),
        _ => Err(ProviderError::Validation(format!(
            "exactly one of `{USER_NAME}` or `{PARENT_ROLE_NAME}` must be set"
        ))),
    }
}

fn grant_id(role: &AccountObjectIdentifier, grantee: &Grantee) -> Result<String> {
    Ok(composite_id(&[
        &role.fully_qualified_name(),
        grantee.kind(),
        &grantee.id().fully_qualified_name(),
    ])?)
}

fn parse_grant_id(id: &str) -> Result<(AccountObjectIdentifier, Grantee)> {
    let parts = parse_composite_id(id, 3)?;
    let role = AccountObjectIdentifier::parse(&parts[0])?;
    let target = AccountObjectIdentifier::parse(&parts[2])?;
    let grantee = match parts[1].to_ascii_uppercase().as_str() {
        "ROLE" => Grantee::Role(target),
        "USER" => Grantee::User(target),
        other => {
            return Err(ProviderError::Validation(format!(
                "grant id `{id}`: expected ROLE or USER, got `{other}`"
            )));
        }
    };
    Ok((role, grantee))
}

fn set_from_id(d: &mut ResourceData, role: &AccountObjectIdentifier, grantee: &Grantee) {
    d.set(ROLE_NAME, role.fully_qualified_name());
    match grantee {
        Grantee::User(user) => d.set(USER_NAME, user.fully_qualified_name()),
        Grantee::Role(parent) => d.set(PARENT_ROLE_NAME, parent.fully_qualified_name()),
    }
}

#[async_trait]
impl ManagedResource for GrantAccountRoleResource {
    fn name(&self) -> &'static str {
        "snowflake_grant_account_role"
    }

    fn schema(&self) -> Schema {
        Schema::new(0)
            .with_attribute(
                ROLE_NAME,
                Attribute::identifier(IdentifierKind::Account)
                    .with_force_new()
                    .with_description("The role being granted."),
            )
            .with_attribute(USER_NAME, optional_reference(IdentifierKind::Account).with_force_new())
            .with_attribute(
                PARENT_ROLE_NAME,
                optional_reference(IdentifierKind::Account).with_force_new(),
            )
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            has_alter: false,
            supports_update: false,
            ..Default::default()
        }
    }

    async fn create(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<()> {
        let role = AccountObjectIdentifier::parse(&d.get_str(ROLE_NAME))?;
        let grantee = grantee_from_config(d)?;
        let id = grant_id(&role, &grantee)?;

        client
            .grants()
            .grant_role(ctx, &GrantRole { role, to: grantee })
            .await?;
        d.set_id(id);
        Ok(())
    }

    async fn read(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<ReadOutcome> {
        let (role, grantee) = parse_grant_id(d.id().unwrap_or_default())?;
        let Some(grants) = found(client.grants().show_of_role(ctx, &role).await)? else {
            return Ok(ReadOutcome::Gone);
        };
        if !grants.iter().any(|grant| grant.is_for(&grantee)) {
            tracing::debug!("{role} is no longer granted to {grantee}");
            return Ok(ReadOutcome::Gone);
        }
        set_from_id(d, &role, &grantee);
        Ok(ReadOutcome::Found)
    }

    async fn update(&self, _client: &Client, _ctx: &RequestContext, _d: &mut ResourceData) -> Result<()> {
        Err(ProviderError::Validation(
            "role grants cannot be updated in place".to_string(),
        ))
    }

    async fn delete(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<()> {
        let (role, grantee) = parse_grant_id(d.id().unwrap_or_default())?;
        client
            .grants()
            .revoke_role_safely(ctx, &RevokeRole { role, from: grantee })
            .await?;
        d.clear();
        Ok(())
    }

    fn import(&self, id: &str, d: &mut ResourceData) -> Result<()> {
        let (role, grantee) = parse_grant_id(id)?;
        set_from_id(d, &role, &grantee);
        d.set_id(grant_id(&role, &grantee)?);
        Ok(())
    }
}
