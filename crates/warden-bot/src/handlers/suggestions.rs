//! Suggestion box: members submit through a modal, staff approve or deny.

use anyhow::{Context as _, Result};
use serenity::builder::{
    CreateActionRow, CreateButton, CreateInputText, CreateInteractionResponse,
    CreateInteractionResponseMessage, CreateMessage, CreateModal,
};
use serenity::model::application::{
    ActionRow, ActionRowComponent, ButtonStyle, ComponentInteraction, InputTextStyle,
    ModalInteraction,
};
use serenity::model::guild::Member;
use serenity::model::id::{ChannelId, RoleId};
use serenity::prelude::Context;
use tracing::info;

use super::{Verdict, admit_or_reply, ids, reply_ephemeral};
use crate::actions::{GuardedAction, Subject};
use crate::warden::Warden;

const SUGGESTION_TEXT_INPUT: &str = "suggestion:text";

pub(super) async fn open_modal(ctx: &Context, comp: &ComponentInteraction) -> Result<()> {
    let input = CreateInputText::new(InputTextStyle::Paragraph, "Your suggestion", SUGGESTION_TEXT_INPUT)
        .min_length(10)
        .max_length(1000);
    let modal = CreateModal::new(ids::SUGGESTION_SUBMIT, "New suggestion")
        .components(vec![CreateActionRow::InputText(input)]);

    comp.create_response(&ctx.http, CreateInteractionResponse::Modal(modal))
        .await
        .context("open suggestion modal")?;
    Ok(())
}

pub(super) async fn submit(ctx: &Context, warden: &Warden, modal: &ModalInteraction) -> Result<()> {
    let Some(channel_id) = warden.discord.suggestion_channel_id else {
        return reply_ephemeral(
            &ctx.http,
            modal.id,
            &modal.token,
            "Suggestions are not enabled on this server.",
        )
        .await;
    };

    let Some(text) = input_value(&modal.data.components, SUGGESTION_TEXT_INPUT) else {
        return reply_ephemeral(&ctx.http, modal.id, &modal.token, "Your suggestion was empty.")
            .await;
    };

    let subject = Subject::from_modal(modal);
    let Some(claim) = admit_or_reply(
        &ctx.http,
        warden,
        GuardedAction::SuggestionSubmit,
        &subject,
        modal.id,
        &modal.token,
    )
    .await?
    else {
        return Ok(());
    };

    let message = ChannelId::new(channel_id)
        .send_message(
            &ctx.http,
            CreateMessage::new()
                .content(suggestion_body(modal.user.id.get(), text))
                .components(vec![review_controls()]),
        )
        .await
        .context("post suggestion")?;

    reply_ephemeral(
        &ctx.http,
        modal.id,
        &modal.token,
        "Thanks! Your suggestion has been posted.",
    )
    .await?;

    info!(key = %claim.key(), message_id = %message.id, "Suggestion posted");
    claim.complete();
    Ok(())
}

pub(super) async fn review(
    ctx: &Context,
    warden: &Warden,
    comp: &ComponentInteraction,
    verdict: Verdict,
) -> Result<()> {
    let Some(staff_role) = warden.discord.staff_role_id else {
        return reply_ephemeral(
            &ctx.http,
            comp.id,
            &comp.token,
            "Suggestion review is not enabled on this server.",
        )
        .await;
    };
    if !is_staff(comp.member.as_ref(), staff_role) {
        return reply_ephemeral(
            &ctx.http,
            comp.id,
            &comp.token,
            "Only staff can review suggestions.",
        )
        .await;
    }
    if comp.message.components.is_empty() {
        return reply_ephemeral(
            &ctx.http,
            comp.id,
            &comp.token,
            "This suggestion has already been reviewed.",
        )
        .await;
    }

    let subject = Subject::from_component(comp);
    let Some(claim) = admit_or_reply(
        &ctx.http,
        warden,
        GuardedAction::SuggestionReview,
        &subject,
        comp.id,
        &comp.token,
    )
    .await?
    else {
        return Ok(());
    };

    // The interaction carries the message as it was when clicked; a review
    // that finished since then has already removed the buttons.
    let current = comp
        .channel_id
        .message(&ctx.http, comp.message.id)
        .await
        .context("fetch suggestion")?;
    if current.components.is_empty() {
        claim.complete();
        return reply_ephemeral(
            &ctx.http,
            comp.id,
            &comp.token,
            "This suggestion has already been reviewed.",
        )
        .await;
    }

    let content = reviewed_body(&current.content, verdict, comp.user.id.get());
    comp.create_response(
        &ctx.http,
        CreateInteractionResponse::UpdateMessage(
            CreateInteractionResponseMessage::new()
                .content(content)
                .components(Vec::new()),
        ),
    )
    .await
    .context("record suggestion verdict")?;

    info!(key = %claim.key(), verdict = verdict.label(), "Suggestion reviewed");
    claim.complete();
    Ok(())
}

fn review_controls() -> CreateActionRow {
    CreateActionRow::Buttons(vec![
        CreateButton::new(ids::SUGGESTION_APPROVE)
            .label("Approve")
            .style(ButtonStyle::Success),
        CreateButton::new(ids::SUGGESTION_DENY)
            .label("Deny")
            .style(ButtonStyle::Danger),
    ])
}

/// Trimmed value of the input text `custom_id`, if present and non-blank.
fn input_value<'a>(rows: &'a [ActionRow], custom_id: &str) -> Option<&'a str> {
    rows.iter()
        .flat_map(|row| row.components.iter())
        .find_map(|component| match component {
            ActionRowComponent::InputText(input) if input.custom_id == custom_id => {
                input.value.as_deref()
            }
            _ => None,
        })
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn is_staff(member: Option<&Member>, staff_role_id: u64) -> bool {
    member.is_some_and(|m| m.roles.contains(&RoleId::new(staff_role_id)))
}

fn suggestion_body(author_id: u64, text: &str) -> String {
    format!("**Suggestion from <@{}>**\n{}", author_id, text)
}

fn reviewed_body(original: &str, verdict: Verdict, reviewer_id: u64) -> String {
    format!("{}\n\n**{}** by <@{}>", original, verdict.label(), reviewer_id)
}
