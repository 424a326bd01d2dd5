//! Shared bot state: the guard, its per-action ttls and the Discord ids the
//! handlers need. One instance is built in `main` and stored in serenity's
//! `TypeMap`.

use std::sync::Arc;
use std::time::Duration;

use serenity::prelude::{Context, TypeMapKey};
use single_flight::{Clock, GuardKey, InvalidKey, Permit, Rejected, SingleFlight, SystemClock};
use tracing::{debug, error};

use crate::actions::{GuardedAction, Subject};
use crate::config::{DiscordBotConfig, GuardSettings};

pub struct Warden<C: Clock = SystemClock> {
    guard: Arc<SingleFlight<C>>,
    settings: GuardSettings,
    pub discord: DiscordBotConfig,
}

impl TypeMapKey for Warden {
    type Value = Arc<Warden>;
}

/// Result of asking the guard to run an action.
pub enum Gate<'a, C: Clock = SystemClock> {
    Admitted(Claim<'a, C>),
    Rejected(Rejected),
}

/// An admitted action. Dropping it releases the key, so a failed operation
/// can be retried right away; [`complete`](Claim::complete) applies the
/// action's exit policy instead.
pub struct Claim<'a, C: Clock = SystemClock> {
    permit: Permit<'a, C>,
    action: GuardedAction,
}

impl<C: Clock> Claim<'_, C> {
    pub fn key(&self) -> &GuardKey {
        self.permit.key()
    }

    pub fn complete(self) {
        if self.action.releases_on_exit() {
            self.permit.release();
        } else {
            self.permit.hold();
        }
    }
}

impl<C: Clock> Warden<C> {
    pub fn new(
        guard: Arc<SingleFlight<C>>,
        settings: GuardSettings,
        discord: DiscordBotConfig,
    ) -> Self {
        Self {
            guard,
            settings,
            discord,
        }
    }

    pub fn guard(&self) -> &Arc<SingleFlight<C>> {
        &self.guard
    }

    pub fn ttl(&self, action: GuardedAction) -> Duration {
        self.settings.ttl_for(action)
    }

    pub fn admit(
        &self,
        action: GuardedAction,
        subject: &Subject,
    ) -> Result<Gate<'_, C>, InvalidKey> {
        let key = action.key(subject)?;
        match self.guard.acquire(&key, self.ttl(action)) {
            Ok(permit) => Ok(Gate::Admitted(Claim { permit, action })),
            Err(rejected) => {
                debug!(%key, retry_after = ?rejected.retry_after, "Duplicate submission rejected");
                Ok(Gate::Rejected(rejected))
            }
        }
    }
}

impl Warden {
    pub async fn from_context(ctx: &Context) -> Option<Arc<Warden>> {
        let data = ctx.data.read().await;
        let warden = data.get::<Warden>().cloned();
        if warden.is_none() {
            error!("Warden not found in context data");
        }
        warden
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use single_flight::{GuardConfig, MockClock};

    fn warden() -> (Warden<MockClock>, MockClock) {
        let clock = MockClock::new();
        let guard = Arc::new(SingleFlight::with_clock(
            clock.clone(),
            GuardConfig::default(),
        ));
        (
            Warden::new(guard, GuardSettings::default(), DiscordBotConfig::default()),
            clock,
        )
    }

    fn subject(user: u64, channel: u64) -> Subject {
        Subject {
            interaction_id: Some(user * 1000 + channel),
            user_id: Some(user),
            channel_id: Some(channel),
            message_id: Some(channel + 1),
        }
    }

    fn admitted<C: Clock>(gate: Gate<'_, C>) -> Claim<'_, C> {
        match gate {
            Gate::Admitted(claim) => claim,
            Gate::Rejected(r) => panic!("expected admission, got rejection {r}"),
        }
    }

    #[test]
    fn second_ticket_create_from_same_user_is_rejected() {
        let (warden, _) = warden();
        let _claim = admitted(warden.admit(GuardedAction::TicketCreate, &subject(1, 10)).unwrap());

        match warden.admit(GuardedAction::TicketCreate, &subject(1, 11)).unwrap() {
            Gate::Rejected(r) => assert_eq!(r.retry_after, Duration::from_secs(30)),
            Gate::Admitted(_) => panic!("duplicate ticket creation admitted"),
        }

        assert!(matches!(
            warden.admit(GuardedAction::TicketCreate, &subject(2, 10)).unwrap(),
            Gate::Admitted(_)
        ));
    }

    #[test]
    fn completed_ticket_create_frees_the_user() {
        let (warden, _) = warden();
        admitted(warden.admit(GuardedAction::TicketCreate, &subject(1, 10)).unwrap()).complete();
        assert!(matches!(
            warden.admit(GuardedAction::TicketCreate, &subject(1, 10)).unwrap(),
            Gate::Admitted(_)
        ));
    }

    #[test]
    fn completed_staff_notify_becomes_a_cooldown() {
        let (warden, clock) = warden();
        let claim = admitted(warden.admit(GuardedAction::StaffNotify, &subject(1, 10)).unwrap());
        assert_eq!(claim.key().as_str(), "notify:10:1");
        claim.complete();

        clock.advance(Duration::from_secs(120));
        match warden.admit(GuardedAction::StaffNotify, &subject(1, 10)).unwrap() {
            Gate::Rejected(r) => assert_eq!(r.retry_after_secs(), 180),
            Gate::Admitted(_) => panic!("cooldown not enforced"),
        }

        // Same user, other channel.
        assert!(matches!(
            warden.admit(GuardedAction::StaffNotify, &subject(1, 20)).unwrap(),
            Gate::Admitted(_)
        ));

        clock.advance(Duration::from_secs(180));
        assert!(matches!(
            warden.admit(GuardedAction::StaffNotify, &subject(1, 10)).unwrap(),
            Gate::Admitted(_)
        ));
    }

    #[test]
    fn completed_review_blocks_a_second_reviewer() {
        let (warden, clock) = warden();
        let first = Subject {
            interaction_id: Some(1),
            user_id: Some(100),
            channel_id: Some(10),
            message_id: Some(777),
        };
        let second = Subject {
            interaction_id: Some(2),
            user_id: Some(200),
            ..first
        };

        let claim = admitted(warden.admit(GuardedAction::SuggestionReview, &first).unwrap());
        assert_eq!(claim.key().as_str(), "suggestion_review:777");
        claim.complete();

        clock.advance(Duration::from_secs(5));
        match warden.admit(GuardedAction::SuggestionReview, &second).unwrap() {
            Gate::Rejected(r) => assert_eq!(r.retry_after_secs(), 25),
            Gate::Admitted(_) => panic!("second review of the same message admitted"),
        }

        // Other suggestions stay open for review.
        let other = Subject {
            message_id: Some(778),
            ..second
        };
        assert!(matches!(
            warden.admit(GuardedAction::SuggestionReview, &other).unwrap(),
            Gate::Admitted(_)
        ));
    }

    #[test]
    fn failed_staff_notify_can_be_retried() {
        let (warden, _) = warden();
        {
            let _claim =
                admitted(warden.admit(GuardedAction::StaffNotify, &subject(1, 10)).unwrap());
            // operation fails, claim dropped without complete()
        }
        assert!(matches!(
            warden.admit(GuardedAction::StaffNotify, &subject(1, 10)).unwrap(),
            Gate::Admitted(_)
        ));
    }

    #[test]
    fn redelivered_interaction_is_rejected() {
        let (warden, clock) = warden();
        admitted(
            warden
                .admit(GuardedAction::InteractionAck, &Subject::interaction(5))
                .unwrap(),
        )
        .complete();

        assert!(matches!(
            warden
                .admit(GuardedAction::InteractionAck, &Subject::interaction(5))
                .unwrap(),
            Gate::Rejected(_)
        ));

        clock.advance(Duration::from_secs(2));
        assert_eq!(warden.guard().sweep(), 1);
    }

    #[test]
    fn ttl_override_applies() {
        let clock = MockClock::new();
        let guard = Arc::new(SingleFlight::with_clock(clock, GuardConfig::default()));
        let mut settings = GuardSettings::default();
        settings.ttl_overrides.insert("ticket_close".to_string(), 7);
        let warden = Warden::new(guard, settings, DiscordBotConfig::default());

        assert_eq!(warden.ttl(GuardedAction::TicketClose), Duration::from_secs(7));
        assert_eq!(
            warden.ttl(GuardedAction::TicketCreate),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn incomplete_subject_is_reported() {
        let (warden, _) = warden();
        assert!(warden
            .admit(GuardedAction::TicketClose, &Subject::interaction(1))
            .is_err());
    }
}
