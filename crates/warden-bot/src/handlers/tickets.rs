//! Support tickets: private channels between one member and staff.

use anyhow::{Context as _, Result};
use serenity::builder::{
    CreateActionRow, CreateButton, CreateChannel, CreateInteractionResponse,
    CreateInteractionResponseMessage, CreateMessage, EditInteractionResponse,
};
use serenity::model::application::{ButtonStyle, ComponentInteraction};
use serenity::model::channel::{ChannelType, PermissionOverwrite, PermissionOverwriteType};
use serenity::model::id::{ChannelId, GuildId, RoleId, UserId};
use serenity::model::permissions::Permissions;
use serenity::prelude::Context;
use tracing::info;

use super::{admit_or_reply, ids, reply_ephemeral};
use crate::actions::{GuardedAction, Subject};
use crate::warden::Warden;

const MAX_CHANNEL_NAME_LEN: usize = 90;

pub(super) async fn create(ctx: &Context, warden: &Warden, comp: &ComponentInteraction) -> Result<()> {
    let Some(guild_id) = comp.guild_id else {
        return reply_ephemeral(
            &ctx.http,
            comp.id,
            &comp.token,
            "Tickets can only be opened inside a server.",
        )
        .await;
    };

    let subject = Subject::from_component(comp);
    let Some(claim) = admit_or_reply(
        &ctx.http,
        warden,
        GuardedAction::TicketCreate,
        &subject,
        comp.id,
        &comp.token,
    )
    .await?
    else {
        return Ok(());
    };

    // Channel creation can take longer than the 3s interaction deadline.
    comp.create_response(
        &ctx.http,
        CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new().ephemeral(true)),
    )
    .await
    .context("defer ticket interaction")?;

    let name = ticket_channel_name(&comp.user.name, comp.user.id);
    let overwrites = ticket_overwrites(guild_id, comp.user.id, warden.discord.staff_role_id);
    let mut builder = CreateChannel::new(name)
        .kind(ChannelType::Text)
        .permissions(overwrites);
    if let Some(category) = warden.discord.ticket_category_id {
        builder = builder.category(ChannelId::new(category));
    }

    let channel = guild_id
        .create_channel(&ctx.http, builder)
        .await
        .context("create ticket channel")?;

    channel
        .id
        .send_message(
            &ctx.http,
            CreateMessage::new()
                .content(format!(
                    "<@{}> thanks for reaching out. Describe your issue and staff will be with you shortly.",
                    comp.user.id
                ))
                .components(vec![ticket_controls()]),
        )
        .await
        .context("post ticket greeting")?;

    comp.edit_response(
        &ctx.http,
        EditInteractionResponse::new().content(format!("Your ticket is open: <#{}>", channel.id)),
    )
    .await
    .context("confirm ticket")?;

    info!(key = %claim.key(), channel_id = %channel.id, "Ticket opened");
    claim.complete();
    Ok(())
}

pub(super) async fn close(ctx: &Context, warden: &Warden, comp: &ComponentInteraction) -> Result<()> {
    let subject = Subject::from_component(comp);
    let Some(claim) = admit_or_reply(
        &ctx.http,
        warden,
        GuardedAction::TicketClose,
        &subject,
        comp.id,
        &comp.token,
    )
    .await?
    else {
        return Ok(());
    };

    reply_ephemeral(&ctx.http, comp.id, &comp.token, "Closing this ticket.").await?;
    comp.channel_id
        .delete(&ctx.http)
        .await
        .context("delete ticket channel")?;

    info!(key = %claim.key(), closed_by = %comp.user.id, "Ticket closed");
    claim.complete();
    Ok(())
}

/// Buttons posted in every new ticket.
fn ticket_controls() -> CreateActionRow {
    CreateActionRow::Buttons(vec![
        CreateButton::new(ids::TICKET_CLOSE)
            .label("Close ticket")
            .style(ButtonStyle::Danger),
        CreateButton::new(ids::STAFF_NOTIFY)
            .label("Notify staff")
            .style(ButtonStyle::Secondary),
    ])
}

/// `ticket-<name>` using only characters Discord keeps in text channel names.
pub(crate) fn ticket_channel_name(username: &str, user_id: UserId) -> String {
    let mut slug = String::with_capacity(username.len());
    for c in username.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() || c == '_' {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');

    let mut name = if slug.is_empty() {
        format!("ticket-{}", user_id)
    } else {
        format!("ticket-{}", slug)
    };
    name.truncate(MAX_CHANNEL_NAME_LEN);
    name
}

/// Hide the channel from everyone except the opener and the staff role.
pub(crate) fn ticket_overwrites(
    guild_id: GuildId,
    user_id: UserId,
    staff_role_id: Option<u64>,
) -> Vec<PermissionOverwrite> {
    let member_access =
        Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES | Permissions::READ_MESSAGE_HISTORY;

    // @everyone shares the guild's id
    let mut overwrites = vec![
        PermissionOverwrite {
            allow: Permissions::empty(),
            deny: Permissions::VIEW_CHANNEL,
            kind: PermissionOverwriteType::Role(RoleId::new(guild_id.get())),
        },
        PermissionOverwrite {
            allow: member_access,
            deny: Permissions::empty(),
            kind: PermissionOverwriteType::Member(user_id),
        },
    ];
    if let Some(role) = staff_role_id {
        overwrites.push(PermissionOverwrite {
            allow: member_access,
            deny: Permissions::empty(),
            kind: PermissionOverwriteType::Role(RoleId::new(role)),
        });
    }
    overwrites
}
