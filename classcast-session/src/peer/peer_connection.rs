use classcast_core::{IceCandidate, ParticipantId, SessionDescription, SignalMessage};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, error, info, warn};

use crate::error::SessionError;
use crate::media::{MediaTrack, TrackId};
use crate::negotiation::{
    AnswerAction, LocalOfferAction, NegotiationState, OfferAction, PeerRole,
    PendingCandidateQueue, SignalingStateMachine,
};
use crate::peer::{PeerContext, PeerHealth, PeerInput, PeerNotice, PeerStatus};
use crate::remote::{RemoteTrack, TrackClass};
use crate::session::SessionEvent;
use crate::transport::{ConnectionState, PeerTransport, TransportEvent};

/// The connection to one remote participant.
///
/// Owns the transport, the signaling state machine and the candidate buffer
/// for that participant. All of its state is touched from a single task, so
/// one signaling step finishes before the next starts, while peers of the
/// same session negotiate independently.
pub struct PeerConnection {
    participant_id: ParticipantId,
    transport: Box<dyn PeerTransport>,
    signaling: SignalingStateMachine,
    candidates: PendingCandidateQueue,
    local_tracks: HashMap<TrackId, Arc<MediaTrack>>,
    /// A local change arrived mid-exchange; offer again once it settles.
    negotiation_needed: bool,
    /// Remote screen tracks currently muted, with the instant they expire.
    muted_screens: HashMap<String, Instant>,
    health: PeerHealth,
    terminated: bool,
    ctx: PeerContext,
}

impl PeerConnection {
    /// Wraps a fresh transport and attaches every live local track so a late
    /// joiner receives the current media state.
    pub async fn create(
        participant_id: ParticipantId,
        transport: Box<dyn PeerTransport>,
        local_tracks: Vec<Arc<MediaTrack>>,
        ctx: PeerContext,
    ) -> Self {
        let role = PeerRole::for_pair(ctx.local_id, participant_id);
        let mut peer = Self {
            participant_id,
            transport,
            signaling: SignalingStateMachine::new(role),
            candidates: PendingCandidateQueue::new(),
            local_tracks: HashMap::new(),
            negotiation_needed: false,
            muted_screens: HashMap::new(),
            health: PeerHealth::Connecting,
            terminated: false,
            ctx,
        };

        for track in local_tracks {
            peer.attach(track).await;
        }

        info!(
            "Peer {} created ({:?}, {} local tracks)",
            participant_id,
            role,
            peer.local_tracks.len()
        );
        peer.publish_status();
        peer
    }

    pub fn participant_id(&self) -> ParticipantId {
        self.participant_id
    }

    pub fn role(&self) -> PeerRole {
        self.signaling.role()
    }

    pub fn negotiation_state(&self) -> NegotiationState {
        self.signaling.state()
    }

    pub fn health(&self) -> PeerHealth {
        self.health
    }

    pub fn pending_candidates(&self) -> usize {
        self.candidates.len()
    }

    pub fn local_track_ids(&self) -> Vec<TrackId> {
        self.local_tracks.keys().copied().collect()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Runs the peer until it is closed or its transport fails.
    pub async fn run(
        mut self,
        generation: u64,
        mut inbox: mpsc::Receiver<PeerInput>,
        mut transport_rx: mpsc::Receiver<TransportEvent>,
    ) {
        debug!("Peer {} task started", self.participant_id);

        loop {
            let deadline = self.next_mute_deadline();
            let grace = async move {
                match deadline {
                    Some(at) => time::sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                input = inbox.recv() => match input {
                    Some(PeerInput::Close) | None => break,
                    Some(input) => self.handle(input).await,
                },

                Some(event) = transport_rx.recv() => {
                    self.handle_transport_event(event).await;
                }

                _ = grace => self.expire_muted_tracks(Instant::now()),
            }

            if self.terminated {
                let _ = self.ctx.notices.send(PeerNotice::Terminated {
                    participant: self.participant_id,
                    generation,
                });
                debug!("Peer {} task finished after failure", self.participant_id);
                return;
            }
        }

        self.close().await;
        debug!("Peer {} task finished", self.participant_id);
    }

    pub fn spawn(
        self,
        generation: u64,
        inbox: mpsc::Receiver<PeerInput>,
        transport_rx: mpsc::Receiver<TransportEvent>,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(generation, inbox, transport_rx))
    }

    pub async fn handle(&mut self, input: PeerInput) {
        if self.terminated {
            return;
        }

        let result = match input {
            PeerInput::Signal(message) => self.handle_signal(message).await,
            PeerInput::AddTrack(track) => {
                if self.attach(track).await {
                    self.negotiate().await
                } else {
                    Ok(())
                }
            }
            PeerInput::RemoveTrack(track_id) => {
                if self.detach(track_id).await {
                    self.negotiate().await
                } else {
                    Ok(())
                }
            }
            PeerInput::Negotiate => self.negotiate().await,
            PeerInput::Close => {
                self.close().await;
                Ok(())
            }
        };

        if let Err(e) = result {
            error!("Negotiation with {} failed: {}", self.participant_id, e);
            // Neither side can finish this exchange any more.
            if self.signaling.state().is_mid_exchange() || matches!(e, SessionError::Relay(_)) {
                self.abandon().await;
            }
        }
        self.publish_status();
    }

    async fn handle_signal(&mut self, message: SignalMessage) -> Result<(), SessionError> {
        match message {
            SignalMessage::Offer { sdp } => self.on_remote_offer(sdp).await,
            SignalMessage::Answer { sdp } => self.on_remote_answer(sdp).await,
            SignalMessage::IceCandidate { candidate } => {
                self.on_remote_candidate(candidate).await;
                Ok(())
            }
            other => {
                warn!("Peer {} ignoring non-peer signal {:?}", self.participant_id, other);
                Ok(())
            }
        }
    }

    /// Sends an offer unless an exchange is already running, in which case
    /// the offer is sent once that exchange completes.
    pub async fn negotiate(&mut self) -> Result<(), SessionError> {
        if self.signaling.on_local_negotiation() == LocalOfferAction::Defer {
            debug!(
                "Peer {} busy in {:?}, deferring offer",
                self.participant_id,
                self.signaling.state()
            );
            self.negotiation_needed = true;
            return Ok(());
        }
        // Stays set if the offer cannot be made, so the next exchange retries.
        self.negotiation_needed = true;

        let offer = self.transport.create_offer().await?;
        self.transport.set_local_description(offer.clone()).await?;
        self.signaling.advance(NegotiationState::HaveLocalOffer)?;
        self.negotiation_needed = false;

        debug!("Sending offer to {}", self.participant_id);
        self.send_description(SignalMessage::Offer { sdp: offer.sdp })
            .await
    }

    async fn on_remote_offer(&mut self, sdp: String) -> Result<(), SessionError> {
        match self.signaling.on_remote_offer() {
            OfferAction::Ignore => {
                info!(
                    "Offer collision with {}: keeping our offer",
                    self.participant_id
                );
                return Ok(());
            }
            OfferAction::RollbackAndAccept => {
                info!(
                    "Offer collision with {}: rolling back our offer",
                    self.participant_id
                );
                self.transport.rollback().await?;
                self.signaling.advance(NegotiationState::Idle)?;
            }
            OfferAction::Accept => {}
        }

        self.transport
            .set_remote_description(SessionDescription::offer(sdp))
            .await?;
        self.signaling.advance(NegotiationState::HaveRemoteOffer)?;
        self.flush_candidates().await;

        let answer = self.transport.create_answer().await?;
        self.transport.set_local_description(answer.clone()).await?;
        self.signaling.advance(NegotiationState::Stable)?;

        debug!("Sending answer to {}", self.participant_id);
        self.send_description(SignalMessage::Answer { sdp: answer.sdp })
            .await?;

        // An answer only covers the m-lines of the offer, so senders added
        // locally (including those of a rolled back offer) need our own offer.
        if self.negotiation_needed || self.transport.has_unnegotiated_senders().await {
            self.negotiate().await?;
        }
        Ok(())
    }

    async fn on_remote_answer(&mut self, sdp: String) -> Result<(), SessionError> {
        if self.signaling.on_remote_answer() == AnswerAction::DiscardStale {
            debug!(
                "Discarding stale answer from {} in {:?}",
                self.participant_id,
                self.signaling.state()
            );
            return Ok(());
        }

        self.transport
            .set_remote_description(SessionDescription::answer(sdp))
            .await?;
        self.signaling.advance(NegotiationState::Stable)?;
        self.flush_candidates().await;
        info!("Negotiation with {} complete", self.participant_id);

        if self.negotiation_needed {
            self.negotiate().await?;
        }
        Ok(())
    }

    async fn on_remote_candidate(&mut self, candidate: IceCandidate) {
        match self.candidates.push(candidate) {
            Some(candidate) => self.apply_candidate(candidate).await,
            None => debug!(
                "Buffered candidate from {} ({} pending)",
                self.participant_id,
                self.candidates.len()
            ),
        }
    }

    async fn flush_candidates(&mut self) {
        let buffered = self.candidates.drain_on_remote_description();
        if !buffered.is_empty() {
            debug!(
                "Replaying {} buffered candidates for {}",
                buffered.len(),
                self.participant_id
            );
        }
        for candidate in buffered {
            self.apply_candidate(candidate).await;
        }
    }

    async fn apply_candidate(&self, candidate: IceCandidate) {
        if let Err(e) = self.transport.add_ice_candidate(candidate).await {
            warn!("Failed to add ICE candidate for {}: {}", self.participant_id, e);
        }
    }

    /// Returns whether a sender was added.
    async fn attach(&mut self, track: Arc<MediaTrack>) -> bool {
        if self.local_tracks.contains_key(&track.id()) || !track.is_live() {
            return false;
        }
        match self.transport.add_track(Arc::clone(&track)).await {
            Ok(()) => {
                self.local_tracks.insert(track.id(), track);
                true
            }
            Err(e) => {
                warn!(
                    "Failed to send {} to {}: {}",
                    track.label(),
                    self.participant_id,
                    e
                );
                false
            }
        }
    }

    /// Returns whether a sender was removed.
    async fn detach(&mut self, track_id: TrackId) -> bool {
        if self.local_tracks.remove(&track_id).is_none() {
            return false;
        }
        if let Err(e) = self.transport.remove_track(track_id).await {
            warn!(
                "Failed to remove sender {} for {}: {}",
                track_id, self.participant_id, e
            );
        }
        true
    }

    pub async fn handle_transport_event(&mut self, event: TransportEvent) {
        if self.terminated {
            return;
        }

        match event {
            TransportEvent::CandidateGenerated(candidate) => {
                self.signal(SignalMessage::IceCandidate { candidate }).await;
            }
            TransportEvent::StateChanged(state) => self.on_connection_state(state).await,
            TransportEvent::RemoteTrack(track) => self.on_remote_track(track),
            TransportEvent::RemoteTrackMuted(track_id) => {
                let class = self
                    .ctx
                    .remote_streams
                    .class_of(&self.participant_id, &track_id);
                if class == Some(TrackClass::Screen) {
                    debug!("Screen track {} from {} muted", track_id, self.participant_id);
                    let expires = Instant::now() + self.ctx.mute_grace;
                    self.muted_screens.entry(track_id).or_insert(expires);
                }
            }
            TransportEvent::RemoteTrackUnmuted(track_id) => {
                if self.muted_screens.remove(&track_id).is_some() {
                    debug!("Screen track {} from {} unmuted", track_id, self.participant_id);
                }
            }
            TransportEvent::RemoteTrackEnded(track_id) => {
                self.muted_screens.remove(&track_id);
                self.drop_remote_track(&track_id);
            }
        }
    }

    async fn on_connection_state(&mut self, state: ConnectionState) {
        self.set_health(PeerHealth::from_connection(state));

        if state.is_terminal() {
            warn!(
                "Connection to {} is {:?}, tearing down",
                self.participant_id, state
            );
            self.publish_status();
            self.close().await;
        } else {
            self.publish_status();
        }
    }

    fn set_health(&mut self, health: PeerHealth) {
        if health == self.health {
            return;
        }
        self.health = health;
        let _ = self.ctx.events.send(SessionEvent::PeerHealthChanged {
            participant: self.participant_id,
            health,
        });
    }

    /// Tears the connection down after a failed step left the exchange in a
    /// state neither side can leave. The coordinator drops the participant
    /// like after a transport failure.
    async fn abandon(&mut self) {
        warn!(
            "Exchange with {} stuck in {:?}, tearing down",
            self.participant_id,
            self.signaling.state()
        );
        self.set_health(PeerHealth::Failed);
        self.close().await;
    }

    fn on_remote_track(&mut self, track: RemoteTrack) {
        let track_id = track.id().to_owned();
        let class = self.ctx.remote_streams.place(self.participant_id, track);
        info!(
            "Remote track {} from {} classified as {:?}",
            track_id, self.participant_id, class
        );
        let _ = self.ctx.events.send(SessionEvent::RemoteTrackAdded {
            participant: self.participant_id,
            track_id,
            class,
        });
    }

    fn drop_remote_track(&mut self, track_id: &str) {
        let Some(class) = self
            .ctx
            .remote_streams
            .remove_track(&self.participant_id, track_id)
        else {
            return;
        };
        info!("Remote track {} from {} removed", track_id, self.participant_id);
        let _ = self.ctx.events.send(SessionEvent::RemoteTrackRemoved {
            participant: self.participant_id,
            track_id: track_id.to_owned(),
            class,
        });
    }

    fn next_mute_deadline(&self) -> Option<Instant> {
        self.muted_screens.values().min().copied()
    }

    /// Drops screen tracks that stayed muted past the grace window.
    pub fn expire_muted_tracks(&mut self, now: Instant) {
        let expired: Vec<String> = self
            .muted_screens
            .iter()
            .filter(|(_, expires)| **expires <= now)
            .map(|(id, _)| id.clone())
            .collect();

        for track_id in expired {
            self.muted_screens.remove(&track_id);
            info!(
                "Screen track {} from {} stayed muted, treating as stopped",
                track_id, self.participant_id
            );
            self.drop_remote_track(&track_id);
        }
    }

    /// Closes the transport and forgets everything kept for this
    /// participant. Idempotent.
    pub async fn close(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;

        if let Err(e) = self.transport.close().await {
            debug!("Closing transport for {}: {}", self.participant_id, e);
        }
        self.candidates.clear();
        self.muted_screens.clear();
        self.local_tracks.clear();

        if let Some(bucket) = self.ctx.remote_streams.purge(&self.participant_id) {
            let removed = bucket
                .camera
                .iter()
                .map(|t| (t, TrackClass::Camera))
                .chain(bucket.screen.iter().map(|t| (t, TrackClass::Screen)));
            for (track, class) in removed {
                let _ = self.ctx.events.send(SessionEvent::RemoteTrackRemoved {
                    participant: self.participant_id,
                    track_id: track.id().to_owned(),
                    class,
                });
            }
        }
        info!("Peer {} closed", self.participant_id);
    }

    async fn send_description(&self, message: SignalMessage) -> Result<(), SessionError> {
        self.ctx.relay.send(&self.participant_id, message).await?;
        Ok(())
    }

    async fn signal(&self, message: SignalMessage) {
        if let Err(e) = self.ctx.relay.send(&self.participant_id, message).await {
            warn!("Failed to signal {}: {}", self.participant_id, e);
        }
    }

    fn publish_status(&self) {
        if self.terminated && self.health != PeerHealth::Failed {
            return;
        }
        self.ctx.status.set(
            self.participant_id,
            PeerStatus {
                negotiation: self.signaling.state(),
                health: self.health,
            },
        );
    }
}
