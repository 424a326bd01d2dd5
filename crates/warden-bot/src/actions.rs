//! Protected operations and the scope each one is exclusive over.
//!
//! Every action picks the identity parts its key is built from. Ticket
//! creation is exclusive per user, closing per channel, suggestion review
//! per message and staff notification per user within a channel.

use std::time::Duration;

use serenity::model::application::{ComponentInteraction, ModalInteraction};
use single_flight::{GuardKey, InvalidKey};

/// Operations that go through the single-flight guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuardedAction {
    /// Any interaction, keyed by its id. Drops gateway redeliveries.
    InteractionAck,
    TicketCreate,
    TicketClose,
    SuggestionSubmit,
    SuggestionReview,
    StaffNotify,
}

impl GuardedAction {
    pub const ALL: [GuardedAction; 6] = [
        GuardedAction::InteractionAck,
        GuardedAction::TicketCreate,
        GuardedAction::TicketClose,
        GuardedAction::SuggestionSubmit,
        GuardedAction::SuggestionReview,
        GuardedAction::StaffNotify,
    ];

    /// Key prefix and config name.
    pub fn name(&self) -> &'static str {
        match self {
            GuardedAction::InteractionAck => "interaction",
            GuardedAction::TicketCreate => "ticket_create",
            GuardedAction::TicketClose => "ticket_close",
            GuardedAction::SuggestionSubmit => "suggestion_submit",
            GuardedAction::SuggestionReview => "suggestion_review",
            GuardedAction::StaffNotify => "notify",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.name() == name)
    }

    pub fn default_ttl(&self) -> Duration {
        match self {
            GuardedAction::InteractionAck => Duration::from_secs(2),
            GuardedAction::TicketCreate => Duration::from_secs(30),
            GuardedAction::TicketClose => Duration::from_secs(120),
            GuardedAction::SuggestionSubmit => Duration::from_secs(5),
            GuardedAction::SuggestionReview => Duration::from_secs(30),
            GuardedAction::StaffNotify => Duration::from_secs(300),
        }
    }

    /// Whether the entry is freed once the operation finishes. Actions that
    /// return `false` keep their entry for the full ttl as a cooldown.
    pub fn releases_on_exit(&self) -> bool {
        !matches!(
            self,
            GuardedAction::InteractionAck
                | GuardedAction::SuggestionReview
                | GuardedAction::StaffNotify
        )
    }

    /// Builds the key for this action from the ids in `subject`.
    pub fn key(&self, subject: &Subject) -> Result<GuardKey, InvalidKey> {
        let parts = match self {
            GuardedAction::InteractionAck => vec![subject.interaction_id],
            GuardedAction::TicketCreate | GuardedAction::SuggestionSubmit => {
                vec![subject.user_id]
            }
            GuardedAction::TicketClose => vec![subject.channel_id],
            GuardedAction::SuggestionReview => vec![subject.message_id],
            GuardedAction::StaffNotify => vec![subject.channel_id, subject.user_id],
        };

        let mut ids = Vec::with_capacity(parts.len());
        for (i, part) in parts.into_iter().enumerate() {
            match part {
                Some(id) => ids.push(id),
                None => return Err(InvalidKey::EmptyPart { position: i + 1 }),
            }
        }
        GuardKey::compose(self.name(), ids)
    }
}

/// Identity of the event that triggered an action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Subject {
    pub interaction_id: Option<u64>,
    pub user_id: Option<u64>,
    pub channel_id: Option<u64>,
    pub message_id: Option<u64>,
}

impl Subject {
    pub fn interaction(interaction_id: u64) -> Self {
        Self {
            interaction_id: Some(interaction_id),
            ..Self::default()
        }
    }

    pub fn from_component(comp: &ComponentInteraction) -> Self {
        Self {
            interaction_id: Some(comp.id.get()),
            user_id: Some(comp.user.id.get()),
            channel_id: Some(comp.channel_id.get()),
            message_id: Some(comp.message.id.get()),
        }
    }

    pub fn from_modal(modal: &ModalInteraction) -> Self {
        Self {
            interaction_id: Some(modal.id.get()),
            user_id: Some(modal.user.id.get()),
            channel_id: Some(modal.channel_id.get()),
            message_id: modal.message.as_ref().map(|m| m.id.get()),
        }
    }
}
