use classcast_core::ParticipantId;

use crate::error::NegotiationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NegotiationState {
    Idle,
    HaveLocalOffer,
    HaveRemoteOffer,
    Stable,
}

impl NegotiationState {
    /// The offering path runs Idle|Stable -> HaveLocalOffer -> Stable, the
    /// answering path Idle|Stable -> HaveRemoteOffer -> Stable. A rollback
    /// only ever undoes a local offer.
    pub fn can_transition(self, to: NegotiationState) -> bool {
        use NegotiationState::*;
        matches!(
            (self, to),
            (Idle | Stable, HaveLocalOffer)
                | (Idle | Stable, HaveRemoteOffer)
                | (HaveLocalOffer, Stable)
                | (HaveRemoteOffer, Stable)
                | (HaveLocalOffer, Idle)
        )
    }

    /// An offer is out and its answer has not been applied or sent yet.
    pub fn is_mid_exchange(self) -> bool {
        matches!(self, NegotiationState::HaveLocalOffer | NegotiationState::HaveRemoteOffer)
    }
}

/// Glare role of the local side towards one remote participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerRole {
    Polite,
    Impolite,
}

impl PeerRole {
    /// The lower id of the pair is polite.
    pub fn for_pair(local: ParticipantId, remote: ParticipantId) -> Self {
        if local < remote {
            PeerRole::Polite
        } else {
            PeerRole::Impolite
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferAction {
    /// No collision: set remote, answer, send.
    Accept,
    /// Polite side in collision: drop our own offer first, then accept.
    RollbackAndAccept,
    /// Impolite side in collision: the remote polite peer will take ours.
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerAction {
    Apply,
    /// Not waiting for an answer; applying it would corrupt the session.
    DiscardStale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalOfferAction {
    Send,
    /// An exchange is already running; offer again once it settles.
    Defer,
}

/// Per-peer offer/answer progress with polite/impolite glare resolution.
///
/// Decisions are pure; the owner performs the asynchronous step and then
/// records the resulting state with [`SignalingStateMachine::advance`].
#[derive(Debug, Clone)]
pub struct SignalingStateMachine {
    state: NegotiationState,
    role: PeerRole,
}

impl SignalingStateMachine {
    pub fn new(role: PeerRole) -> Self {
        Self {
            state: NegotiationState::Idle,
            role,
        }
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn role(&self) -> PeerRole {
        self.role
    }

    pub fn on_local_negotiation(&self) -> LocalOfferAction {
        match self.state {
            NegotiationState::Idle | NegotiationState::Stable => LocalOfferAction::Send,
            NegotiationState::HaveLocalOffer | NegotiationState::HaveRemoteOffer => {
                LocalOfferAction::Defer
            }
        }
    }

    pub fn on_remote_offer(&self) -> OfferAction {
        match (self.state, self.role) {
            (NegotiationState::HaveLocalOffer, PeerRole::Polite) => {
                OfferAction::RollbackAndAccept
            }
            (NegotiationState::HaveLocalOffer, PeerRole::Impolite) => OfferAction::Ignore,
            _ => OfferAction::Accept,
        }
    }

    pub fn on_remote_answer(&self) -> AnswerAction {
        if self.state == NegotiationState::HaveLocalOffer {
            AnswerAction::Apply
        } else {
            AnswerAction::DiscardStale
        }
    }

    pub fn advance(&mut self, to: NegotiationState) -> Result<(), NegotiationError> {
        if !self.state.can_transition(to) {
            return Err(NegotiationError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }
}
