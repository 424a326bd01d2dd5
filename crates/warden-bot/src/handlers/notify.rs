//! Staff pings from inside a ticket, limited to one per user per channel
//! for the length of the action's cooldown.

use anyhow::{Context as _, Result};
use serenity::builder::{CreateAllowedMentions, CreateMessage};
use serenity::model::application::ComponentInteraction;
use serenity::model::id::{ChannelId, RoleId};
use serenity::prelude::Context;
use tracing::info;

use super::{admit_or_reply, reply_ephemeral};
use crate::actions::{GuardedAction, Subject};
use crate::warden::Warden;

pub(super) async fn staff(ctx: &Context, warden: &Warden, comp: &ComponentInteraction) -> Result<()> {
    let (Some(role_id), Some(staff_channel)) =
        (warden.discord.staff_role_id, warden.discord.staff_channel_id)
    else {
        return reply_ephemeral(
            &ctx.http,
            comp.id,
            &comp.token,
            "Staff notifications are not enabled on this server.",
        )
        .await;
    };

    let subject = Subject::from_component(comp);
    let Some(claim) = admit_or_reply(
        &ctx.http,
        warden,
        GuardedAction::StaffNotify,
        &subject,
        comp.id,
        &comp.token,
    )
    .await?
    else {
        return Ok(());
    };

    ChannelId::new(staff_channel)
        .send_message(
            &ctx.http,
            CreateMessage::new()
                .content(staff_ping(role_id, comp.user.id.get(), comp.channel_id.get()))
                .allowed_mentions(CreateAllowedMentions::new().roles(vec![RoleId::new(role_id)])),
        )
        .await
        .context("notify staff")?;

    reply_ephemeral(&ctx.http, comp.id, &comp.token, "Staff have been notified.").await?;

    info!(key = %claim.key(), "Staff notified");
    claim.complete();
    Ok(())
}

fn staff_ping(role_id: u64, user_id: u64, channel_id: u64) -> String {
    format!(
        "<@&{}> <@{}> is asking for help in <#{}>.",
        role_id, user_id, channel_id
    )
}
