use axum::extract::ws::Message;
use classcast_core::{IceServerConfig, ParticipantId, SessionId, SignalEnvelope, SignalMessage};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

type Outbox = mpsc::UnboundedSender<Message>;

struct RelayInner {
    sessions: DashMap<SessionId, DashMap<ParticipantId, Outbox>>,
    ice_servers: Vec<IceServerConfig>,
}

/// Membership and routing state of the relay, shared by every socket.
///
/// Each session room maps participants to the outbox of their socket. The
/// relay never looks inside offers, answers or candidates; it only stamps
/// the sender and forwards them to the named target.
#[derive(Clone)]
pub struct RelayService {
    inner: Arc<RelayInner>,
}

impl RelayService {
    pub fn new(ice_servers: Vec<IceServerConfig>) -> Self {
        Self {
            inner: Arc::new(RelayInner {
                sessions: DashMap::new(),
                ice_servers,
            }),
        }
    }

    pub fn ice_servers(&self) -> Vec<IceServerConfig> {
        self.inner.ice_servers.clone()
    }

    /// Participants currently connected to `session`, in id order.
    pub fn participants(&self, session: &SessionId) -> Vec<ParticipantId> {
        let mut ids: Vec<_> = self
            .inner
            .sessions
            .get(session)
            .map(|room| room.iter().map(|e| *e.key()).collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    pub fn session_count(&self) -> usize {
        self.inner.sessions.len()
    }

    /// Admits `participant` to `session`.
    ///
    /// The new socket first receives the ICE configuration (when one is
    /// set) and the roster, then everybody else hears about the join. A
    /// participant that is already connected has its old socket replaced;
    /// the others see it leave and join again so they rebuild their
    /// connection to it.
    pub fn join(&self, session: &SessionId, participant: ParticipantId, outbox: Outbox) {
        if !self.inner.ice_servers.is_empty() {
            let ice = SignalMessage::IceConfig {
                ice_servers: self.inner.ice_servers.clone(),
            };
            Self::push(&outbox, &SignalEnvelope::room(ice));
        }

        let room = self.inner.sessions.entry(session.clone()).or_default();
        let roster: Vec<_> = room
            .iter()
            .map(|e| *e.key())
            .filter(|id| *id != participant)
            .collect();

        Self::push(
            &outbox,
            &SignalEnvelope::room(SignalMessage::Welcome {
                participant_id: participant,
                roster,
            }),
        );

        if room.insert(participant, outbox).is_some() {
            warn!(
                "{} reconnected to session {}, replacing its socket",
                participant, session
            );
            Self::broadcast(
                &room,
                participant,
                SignalMessage::ParticipantLeft {
                    participant_id: participant,
                },
            );
        }
        Self::broadcast(
            &room,
            participant,
            SignalMessage::ParticipantJoined {
                participant_id: participant,
            },
        );
        info!(
            "{} joined session {} ({} connected)",
            participant,
            session,
            room.len()
        );
    }

    /// Removes the membership owned by `outbox`. A socket that was already
    /// replaced by a reconnect leaves the newer membership alone.
    pub fn leave(&self, session: &SessionId, participant: &ParticipantId, outbox: &Outbox) {
        let Some(room) = self.inner.sessions.get(session) else {
            return;
        };
        let removed = room
            .remove_if(participant, |_, current| current.same_channel(outbox))
            .is_some();
        if !removed {
            debug!("Stale socket of {} closed, membership kept", participant);
            return;
        }

        Self::broadcast(
            &room,
            *participant,
            SignalMessage::ParticipantLeft {
                participant_id: *participant,
            },
        );
        info!("{} left session {}", participant, session);
        drop(room);

        if self
            .inner
            .sessions
            .remove_if(session, |_, room| room.is_empty())
            .is_some()
        {
            info!("Session {} is empty, closed", session);
        }
    }

    /// Forwards a directed message from `from` to the target named in the
    /// envelope. Returns whether it was delivered.
    pub fn route(&self, session: &SessionId, from: ParticipantId, envelope: SignalEnvelope) -> bool {
        let Some(to) = envelope.to else {
            warn!("Message from {} has no target, dropped", from);
            return false;
        };
        if !envelope.message.is_directed() {
            warn!("{} tried to send a relay-only message, dropped", from);
            return false;
        }

        let Some(room) = self.inner.sessions.get(session) else {
            return false;
        };
        let Some(target) = room.get(&to) else {
            debug!("{} sent to {} who is not in session {}", from, to, session);
            return false;
        };

        let stamped = SignalEnvelope {
            from: Some(from),
            to: Some(to),
            message: envelope.message,
        };
        Self::push(target.value(), &stamped)
    }

    fn broadcast(
        room: &DashMap<ParticipantId, Outbox>,
        except: ParticipantId,
        message: SignalMessage,
    ) {
        let envelope = SignalEnvelope::room(message);
        for member in room.iter().filter(|e| *e.key() != except) {
            Self::push(member.value(), &envelope);
        }
    }

    fn push(outbox: &Outbox, envelope: &SignalEnvelope) -> bool {
        match serde_json::to_string(envelope) {
            Ok(json) => outbox.send(Message::Text(json.into())).is_ok(),
            Err(e) => {
                error!("Failed to serialize envelope: {}", e);
                false
            }
        }
    }
}
