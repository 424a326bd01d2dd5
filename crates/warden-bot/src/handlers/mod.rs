//! Serenity event handler implementation
//!
//! Every interaction first passes an `InteractionAck` check keyed by its id,
//! which drops gateway redeliveries before any handler runs. Handlers then
//! claim their own action key; a rejected claim is answered with an
//! ephemeral "try again" message instead of repeating the side effect.

mod notify;
mod suggestions;
mod tickets;

use anyhow::Result;
use serenity::async_trait;
use serenity::builder::{CreateInteractionResponse, CreateInteractionResponseMessage};
use serenity::http::Http;
use serenity::model::application::{ComponentInteraction, Interaction};
use serenity::model::gateway::Ready;
use serenity::model::id::InteractionId;
use serenity::prelude::*;
use single_flight::Rejected;
use tracing::{debug, error, info};

use crate::actions::{GuardedAction, Subject};
use crate::errors;
use crate::health::AppState;
use crate::warden::{Claim, Gate, Warden};

/// Custom ids on the buttons and modals this bot posts.
pub mod ids {
    pub const TICKET_CREATE: &str = "ticket:create";
    pub const TICKET_CLOSE: &str = "ticket:close";
    pub const SUGGESTION_OPEN: &str = "suggestion:open";
    pub const SUGGESTION_SUBMIT: &str = "suggestion:submit";
    pub const SUGGESTION_APPROVE: &str = "suggestion:approve";
    pub const SUGGESTION_DENY: &str = "suggestion:deny";
    pub const STAFF_NOTIFY: &str = "staff:notify";
}

/// Staff decision on a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Approved,
    Denied,
}

impl Verdict {
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Approved => "Approved",
            Verdict::Denied => "Denied",
        }
    }
}

/// Which handler a component interaction goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    TicketCreate,
    TicketClose,
    SuggestionOpen,
    SuggestionReview(Verdict),
    StaffNotify,
}

impl Route {
    pub fn from_custom_id(custom_id: &str) -> Option<Self> {
        match custom_id {
            ids::TICKET_CREATE => Some(Route::TicketCreate),
            ids::TICKET_CLOSE => Some(Route::TicketClose),
            ids::SUGGESTION_OPEN => Some(Route::SuggestionOpen),
            ids::SUGGESTION_APPROVE => Some(Route::SuggestionReview(Verdict::Approved)),
            ids::SUGGESTION_DENY => Some(Route::SuggestionReview(Verdict::Denied)),
            ids::STAFF_NOTIFY => Some(Route::StaffNotify),
            _ => None,
        }
    }
}

pub struct Handler;

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("Discord bot connected as {}", ready.user.name);

        let state = ctx.data.read().await.get::<AppState>().cloned();
        if let Some(state) = state {
            state.set_bot_username(ready.user.name.clone()).await;
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Some(warden) = Warden::from_context(&ctx).await else {
            return;
        };

        let ack = Subject::interaction(interaction.id().get());
        match warden.admit(GuardedAction::InteractionAck, &ack) {
            Ok(Gate::Admitted(claim)) => claim.complete(),
            Ok(Gate::Rejected(_)) => return,
            Err(e) => {
                error!("Cannot build interaction key: {}", e);
                return;
            }
        }

        match interaction {
            Interaction::Component(comp) => {
                let Some(route) = Route::from_custom_id(&comp.data.custom_id) else {
                    debug!("Ignoring component with custom_id {}", comp.data.custom_id);
                    return;
                };
                if let Err(e) = dispatch_component(&ctx, &warden, &comp, route).await {
                    errors::log_error(
                        &format!("Component '{}' failed", comp.data.custom_id),
                        &e,
                    );
                }
            }
            Interaction::Modal(modal) => {
                if modal.data.custom_id != ids::SUGGESTION_SUBMIT {
                    debug!("Ignoring modal with custom_id {}", modal.data.custom_id);
                    return;
                }
                if let Err(e) = suggestions::submit(&ctx, &warden, &modal).await {
                    errors::log_error("Suggestion submit failed", &e);
                }
            }
            _ => {
                // Commands, autocomplete and pings are not handled
            }
        }
    }
}

async fn dispatch_component(
    ctx: &Context,
    warden: &Warden,
    comp: &ComponentInteraction,
    route: Route,
) -> Result<()> {
    match route {
        Route::TicketCreate => tickets::create(ctx, warden, comp).await,
        Route::TicketClose => tickets::close(ctx, warden, comp).await,
        Route::SuggestionOpen => suggestions::open_modal(ctx, comp).await,
        Route::SuggestionReview(verdict) => suggestions::review(ctx, warden, comp, verdict).await,
        Route::StaffNotify => notify::staff(ctx, warden, comp).await,
    }
}

/// Claims `action` for `subject`, or tells the user to wait and returns `None`.
async fn admit_or_reply<'a>(
    http: &Http,
    warden: &'a Warden,
    action: GuardedAction,
    subject: &Subject,
    interaction_id: InteractionId,
    token: &str,
) -> Result<Option<Claim<'a>>> {
    match warden.admit(action, subject)? {
        Gate::Admitted(claim) => Ok(Some(claim)),
        Gate::Rejected(rejected) => {
            reply_ephemeral(http, interaction_id, token, busy_message(action, &rejected)).await?;
            Ok(None)
        }
    }
}

async fn reply_ephemeral(
    http: &Http,
    interaction_id: InteractionId,
    token: &str,
    content: impl Into<String>,
) -> Result<()> {
    let response = CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .content(content)
            .ephemeral(true),
    );
    http.create_interaction_response(interaction_id, token, &response, Vec::new())
        .await?;
    Ok(())
}

fn busy_message(action: GuardedAction, rejected: &Rejected) -> String {
    match action {
        GuardedAction::StaffNotify => format!(
            "Staff have already been notified. You can notify them again in {}s.",
            rejected.retry_after_secs()
        ),
        _ => format!(
            "Your previous request is still being processed. Please try again in {}s.",
            rejected.retry_after_secs()
        ),
    }
}
