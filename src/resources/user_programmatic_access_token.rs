use async_trait::async_trait;

use crate::{
    error::Result,
    provider::{
        Capabilities, ManagedResource, ReadOutcome,
        attributes::{
            ShowMapping, computed_if_any_attribute_changed, create_builder, handle_external_changes_in_show, read_set,
            update_set_unset,
        },
        data::{ResourceData, SHOW_OUTPUT},
        diff::CustomDiff,
        schema::{Attribute, AttributeType, Schema},
    },
    resources::common::{COMMENT, NAME, comment, found, name_part, optional_reference, persist_all, set_output},
    sdk::{
        client::{Client, RequestContext},
        identifier::{AccountObjectIdentifier, IdentifierKind, ObjectIdentifier, composite_id, parse_composite_id},
        programmatic_access_tokens::{
            AddProgrammaticAccessToken, ModifyProgrammaticAccessToken, ProgrammaticAccessTokenAction,
            ProgrammaticAccessTokenSet, ProgrammaticAccessTokenUnset,
        },
    },
};

const USER: &str = "user";
const ROLE_RESTRICTION: &str = "role_restriction";
const DAYS_TO_EXPIRY: &str = "days_to_expiry";
const MINS_TO_BYPASS: &str = "mins_to_bypass_network_policy_requirement";
const DISABLED: &str = "disabled";
const TOKEN: &str = "token";
const EXPIRES_AT: &str = "expires_at";
const STATUS: &str = "status";

pub struct UserProgrammaticAccessTokenResource;

fn token_id(user: &AccountObjectIdentifier, name: &AccountObjectIdentifier) -> Result<String> {
    Ok(composite_id(&[&user.fully_qualified_name(), &name.fully_qualified_name()])?)
}

fn parse_token_id(id: &str) -> Result<(AccountObjectIdentifier, AccountObjectIdentifier)> {
    let parts = parse_composite_id(id, 2)?;
    Ok((
        AccountObjectIdentifier::parse(&parts[0])?,
        AccountObjectIdentifier::parse(&parts[1])?,
    ))
}

fn state_token_id(d: &ResourceData) -> Result<(AccountObjectIdentifier, AccountObjectIdentifier)> {
    parse_token_id(d.id().unwrap_or_default())
}

#[async_trait]
impl ManagedResource for UserProgrammaticAccessTokenResource {
    fn name(&self) -> &'static str {
        "snowflake_user_programmatic_access_token"
    }

    fn schema(&self) -> Schema {
        Schema::new(0)
            .with_attribute(USER, Attribute::identifier(IdentifierKind::Account).with_force_new())
            .with_attribute(NAME, name_part())
            .with_attribute(
                ROLE_RESTRICTION,
                optional_reference(IdentifierKind::Account).with_force_new(),
            )
            .with_attribute(
                DAYS_TO_EXPIRY,
                Attribute::int_with_sentinel()
                    .with_force_new()
                    .with_description("Days until the token expires. Only honoured when the token is added."),
            )
            .with_attribute(MINS_TO_BYPASS, Attribute::int_with_sentinel())
            .with_attribute(DISABLED, Attribute::bool_tristate())
            .with_attribute(COMMENT, comment())
            .with_attribute(
                TOKEN,
                Attribute::computed(AttributeType::String)
                    .sensitive()
                    .with_description("The secret, returned once when the token is added."),
            )
            .with_attribute(EXPIRES_AT, Attribute::computed(AttributeType::String))
            .with_attribute(STATUS, Attribute::computed(AttributeType::String))
            .with_attribute(SHOW_OUTPUT, Attribute::output())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            has_rename: true,
            ..Default::default()
        }
    }

    fn custom_diff(&self, d: &ResourceData) -> Result<CustomDiff> {
        let mut diff = CustomDiff::default();
        computed_if_any_attribute_changed(d, &mut diff, SHOW_OUTPUT, &[NAME, COMMENT, DISABLED, MINS_TO_BYPASS]);
        computed_if_any_attribute_changed(d, &mut diff, STATUS, &[DISABLED]);
        Ok(diff)
    }

    async fn create(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<()> {
        let user = AccountObjectIdentifier::parse(&d.get_str(USER))?;
        let name = AccountObjectIdentifier::new(d.get_str(NAME));
        let mut request = AddProgrammaticAccessToken::new(user.clone(), name.clone());
        create_builder(d, ROLE_RESTRICTION, |v| request.role_restriction = Some(v))?;
        create_builder(d, DAYS_TO_EXPIRY, |v| request.days_to_expiry = Some(v))?;
        create_builder(d, MINS_TO_BYPASS, |v| {
            request.mins_to_bypass_network_policy_requirement = Some(v)
        })?;
        create_builder(d, COMMENT, |v| request.comment = Some(v))?;

        let tokens = client.programmatic_access_tokens();
        let added = tokens.add(ctx, &request).await?;
        d.set_id(token_id(&user, &name)?);
        d.set(TOKEN, added.token_secret);

        // ADD has no DISABLED option.
        let mut disabled: Option<bool> = None;
        create_builder(d, DISABLED, |v| disabled = Some(v))?;
        if disabled == Some(true) {
            let set = ProgrammaticAccessTokenSet {
                disabled: Some(true),
                ..Default::default()
            };
            tokens
                .modify(
                    ctx,
                    &ModifyProgrammaticAccessToken {
                        user,
                        name,
                        action: ProgrammaticAccessTokenAction::Set(set),
                    },
                )
                .await?;
        }
        Ok(())
    }

    async fn read(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<ReadOutcome> {
        let (user, name) = state_token_id(d)?;
        let Some(token) = found(client.programmatic_access_tokens().show_by_id_safely(ctx, &user, &name).await)? else {
            return Ok(ReadOutcome::Gone);
        };

        handle_external_changes_in_show(
            d,
            &[
                ShowMapping::new(COMMENT, COMMENT, token.comment.clone(), token.comment.clone()),
                ShowMapping::new(
                    MINS_TO_BYPASS,
                    MINS_TO_BYPASS,
                    token.mins_to_bypass_network_policy_requirement,
                    token.mins_to_bypass_network_policy_requirement,
                ),
            ],
        );

        if d.get_raw(USER).is_none() {
            d.set(USER, user.fully_qualified_name());
        }
        d.set(NAME, token.name.clone());
        if !token.role_restriction.is_empty() {
            let configured = AccountObjectIdentifier::parse(&d.get_str(ROLE_RESTRICTION)).ok();
            if configured.is_none_or(|r| !r.name().eq_ignore_ascii_case(&token.role_restriction)) {
                d.set(
                    ROLE_RESTRICTION,
                    AccountObjectIdentifier::new(token.role_restriction.clone()).fully_qualified_name(),
                );
            }
        }
        read_set(d, DISABLED, token.is_disabled(), &false)?;
        d.set(EXPIRES_AT, token.expires_at.clone());
        d.set(STATUS, token.status.clone());
        set_output(d, SHOW_OUTPUT, &token)?;
        Ok(ReadOutcome::Found)
    }

    async fn update(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<()> {
        let (user, mut name) = state_token_id(d)?;
        let tokens = client.programmatic_access_tokens();

        if d.has_change(NAME) {
            let new_name = AccountObjectIdentifier::new(d.get_str(NAME));
            tokens
                .modify(
                    ctx,
                    &ModifyProgrammaticAccessToken {
                        user: user.clone(),
                        name,
                        action: ProgrammaticAccessTokenAction::RenameTo(new_name.clone()),
                    },
                )
                .await?;
            d.set_id(token_id(&user, &new_name)?);
            d.persist(NAME);
            name = new_name;
        }

        let mut set = ProgrammaticAccessTokenSet::default();
        let mut unset = ProgrammaticAccessTokenUnset::default();
        update_set_unset(d, DISABLED, |v| set.disabled = Some(v), || unset.disabled = true)?;
        update_set_unset(
            d,
            MINS_TO_BYPASS,
            |v| set.mins_to_bypass_network_policy_requirement = Some(v),
            || unset.mins_to_bypass_network_policy_requirement = true,
        )?;
        update_set_unset(d, COMMENT, |v| set.comment = Some(v), || unset.comment = true)?;

        let set_attrs: Vec<&str> = [
            (DISABLED, set.disabled.is_some()),
            (MINS_TO_BYPASS, set.mins_to_bypass_network_policy_requirement.is_some()),
            (COMMENT, set.comment.is_some()),
        ]
        .into_iter()
        .filter_map(|(attr, present)| present.then_some(attr))
        .collect();

        if !set.is_empty() {
            tokens
                .modify(
                    ctx,
                    &ModifyProgrammaticAccessToken {
                        user: user.clone(),
                        name: name.clone(),
                        action: ProgrammaticAccessTokenAction::Set(set),
                    },
                )
                .await?;
            persist_all(d, &set_attrs);
        }
        if !unset.is_empty() {
            tokens
                .modify(
                    ctx,
                    &ModifyProgrammaticAccessToken {
                        user,
                        name,
                        action: ProgrammaticAccessTokenAction::Unset(unset),
                    },
                )
                .await?;
            persist_all(d, &[DISABLED, MINS_TO_BYPASS, COMMENT]);
        }
        Ok(())
    }

    async fn delete(&self, client: &Client, ctx: &RequestContext, d: &mut ResourceData) -> Result<()> {
        let (user, name) = state_token_id(d)?;
        client
            .programmatic_access_tokens()
            .remove_safely(ctx, &user, &name)
            .await?;
        d.clear();
        Ok(())
    }

    fn import(&self, id: &str, d: &mut ResourceData) -> Result<()> {
        let (user, name) = parse_token_id(id)?;
        d.set(USER, user.fully_qualified_name());
        d.set(NAME, name.name());
        d.set_id(token_id(&user, &name)?);
        Ok(())
    }
}
