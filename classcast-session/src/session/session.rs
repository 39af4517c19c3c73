use classcast_core::{ParticipantId, SignalMessage};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::SessionConfig;
use crate::media::{LocalMediaController, LocalMediaEvent, MediaDevices, MediaTrack, TrackId};
use crate::negotiation::{NegotiationState, PeerRole};
use crate::peer::{
    PeerConnection, PeerContext, PeerHealth, PeerInput, PeerNotice, PeerStatus, PeerStatusBoard,
};
use crate::relay::{RelayEvent, RelayHandle, SignalingRelay};
use crate::remote::RemoteStreams;
use crate::session::{SessionCommand, SessionEvent, SessionHandle};
use crate::transport::{TransportConfig, TransportFactory};

const COMMAND_CAPACITY: usize = 32;
const TRANSPORT_EVENT_CAPACITY: usize = 256;

struct PeerHandle {
    inbox: mpsc::Sender<PeerInput>,
    task: JoinHandle<()>,
    generation: u64,
}

/// Session topology coordinator.
///
/// The only component talking to the signaling relay. Owns the arena of
/// peer connections, creates and destroys them as membership changes and
/// fans local track changes out to every peer.
pub struct Session {
    local_id: ParticipantId,
    relay: Arc<dyn SignalingRelay>,
    relay_rx: mpsc::UnboundedReceiver<RelayEvent>,
    factory: Arc<dyn TransportFactory>,
    transport_config: TransportConfig,
    config: SessionConfig,
    media: LocalMediaController,
    media_rx: mpsc::UnboundedReceiver<LocalMediaEvent>,
    command_rx: mpsc::Receiver<SessionCommand>,
    notice_rx: mpsc::UnboundedReceiver<PeerNotice>,
    peers: HashMap<ParticipantId, PeerHandle>,
    next_generation: u64,
    ctx: PeerContext,
}

impl Session {
    pub fn new(
        local_id: ParticipantId,
        relay: RelayHandle,
        devices: Arc<dyn MediaDevices>,
        factory: Arc<dyn TransportFactory>,
        config: SessionConfig,
    ) -> (Self, SessionHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (media_tx, media_rx) = mpsc::unbounded_channel();
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(config.event_capacity);

        let ctx = PeerContext {
            local_id,
            relay: Arc::clone(&relay.outbound),
            remote_streams: RemoteStreams::new(),
            status: PeerStatusBoard::new(),
            events: events.clone(),
            notices: notice_tx,
            mute_grace: config.mute_grace(),
        };

        let handle = SessionHandle::new(
            local_id,
            command_tx,
            events,
            ctx.remote_streams.clone(),
            ctx.status.clone(),
        );

        let session = Self {
            local_id,
            relay: relay.outbound,
            relay_rx: relay.inbound,
            factory,
            transport_config: TransportConfig::from_servers(config.ice_servers.clone()),
            config,
            media: LocalMediaController::new(devices, media_tx),
            media_rx,
            command_rx,
            notice_rx,
            peers: HashMap::new(),
            next_generation: 0,
            ctx,
        };

        (session, handle)
    }

    /// Acquires local media, then serves relay events, commands and peer
    /// notices until the session is left.
    pub async fn run(mut self) {
        info!("Session for {} started", self.local_id);
        self.media
            .acquire(self.config.want_audio, self.config.want_video)
            .await;

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(c) => {
                            if !self.handle_command(c).await {
                                return;
                            }
                        }
                        None => {
                            info!("All session handles dropped, leaving");
                            break;
                        }
                    }
                }

                evt = self.relay_rx.recv() => {
                    match evt {
                        Some(e) => self.handle_relay_event(e).await,
                        None => {
                            warn!("Signaling relay closed, leaving session");
                            break;
                        }
                    }
                }

                Some(evt) = self.media_rx.recv() => self.handle_media_event(evt).await,

                Some(notice) = self.notice_rx.recv() => self.handle_notice(notice),
            }
        }

        self.shutdown().await;
    }

    /// Returns false once the session has been left.
    async fn handle_command(&mut self, cmd: SessionCommand) -> bool {
        match cmd {
            SessionCommand::ToggleAudio { reply } => {
                let _ = reply.send(self.media.toggle_audio());
            }

            SessionCommand::ToggleVideo { reply } => {
                let _ = reply.send(self.media.toggle_video());
            }

            SessionCommand::StartScreenShare { reply } => {
                let Some(stream) = self.media.start_screen_share().await else {
                    let _ = reply.send(false);
                    return true;
                };
                for track in &stream.tracks {
                    self.fan_out_add(track).await;
                }
                let _ = reply.send(true);
            }

            SessionCommand::StopScreenShare { reply } => {
                self.stop_screen_share().await;
                let _ = reply.send(());
            }

            SessionCommand::LocalMedia { reply } => {
                let _ = reply.send(self.media.state());
            }

            SessionCommand::Peers { reply } => {
                let mut peers: Vec<_> = self.peers.keys().copied().collect();
                peers.sort();
                let _ = reply.send(peers);
            }

            SessionCommand::Leave { reply } => {
                self.shutdown().await;
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    async fn handle_relay_event(&mut self, event: RelayEvent) {
        match event {
            RelayEvent::Welcome { roster } => {
                info!("Joined session with {} participants present", roster.len());
                for participant in roster {
                    if participant != self.local_id && !self.peers.contains_key(&participant) {
                        self.add_peer(participant, true).await;
                    }
                }
            }

            RelayEvent::ParticipantJoined(participant) => {
                if participant == self.local_id {
                    return;
                }
                if self.peers.contains_key(&participant) {
                    debug!("{} already connected, ignoring join", participant);
                    return;
                }
                info!("Participant {} joined", participant);
                self.add_peer(participant, true).await;
            }

            RelayEvent::ParticipantLeft(participant) => {
                info!("Participant {} left", participant);
                self.remove_peer(&participant).await;
                self.ctx.status.remove(&participant);
            }

            RelayEvent::IceServers(ice_servers) => {
                info!("Relay supplied {} ICE servers", ice_servers.len());
                self.transport_config = TransportConfig::from_servers(ice_servers);
            }

            RelayEvent::Signal { from, message } => {
                if !self.peers.contains_key(&from) {
                    if !matches!(message, SignalMessage::Offer { .. }) {
                        debug!("Dropping signal from unknown participant {}", from);
                        return;
                    }
                    info!("Offer from {} before its join event, creating peer", from);
                    self.add_peer(from, false).await;
                }
                self.forward(&from, PeerInput::Signal(message)).await;
            }
        }
    }

    async fn handle_media_event(&mut self, event: LocalMediaEvent) {
        match event {
            LocalMediaEvent::DeviceWarning(e) => {
                let _ = self.ctx.events.send(SessionEvent::DeviceWarning(e));
            }
            LocalMediaEvent::ScreenShareEnded => {
                info!("Screen capture ended by the platform");
                self.stop_screen_share().await;
            }
        }
    }

    fn handle_notice(&mut self, notice: PeerNotice) {
        let PeerNotice::Terminated {
            participant,
            generation,
        } = notice;

        let current = self.peers.get(&participant).map(|p| p.generation);
        if current != Some(generation) {
            debug!("Ignoring stale termination of {}", participant);
            return;
        }
        self.peers.remove(&participant);
        warn!("Dropped participant {} after connection failure", participant);
        let _ = self
            .ctx
            .events
            .send(SessionEvent::ParticipantDropped { participant });
    }

    async fn add_peer(&mut self, participant: ParticipantId, initial: bool) {
        let role = PeerRole::for_pair(self.local_id, participant);
        let (transport_tx, transport_rx) = mpsc::channel(TRANSPORT_EVENT_CAPACITY);
        let transport = match self
            .factory
            .create(participant, role, &self.transport_config, transport_tx)
            .await
        {
            Ok(transport) => transport,
            Err(e) => {
                error!("Failed to create transport for {}: {}", participant, e);
                self.ctx.status.set(
                    participant,
                    PeerStatus {
                        negotiation: NegotiationState::Idle,
                        health: PeerHealth::Failed,
                    },
                );
                return;
            }
        };

        let peer = PeerConnection::create(
            participant,
            transport,
            self.media.live_tracks(),
            self.ctx.clone(),
        )
        .await;

        let (inbox, inbox_rx) = mpsc::channel(self.config.peer_inbox_capacity);
        self.next_generation += 1;
        let generation = self.next_generation;
        let task = peer.spawn(generation, inbox_rx, transport_rx);

        // On first contact only the higher id offers.
        if initial && role == PeerRole::Impolite {
            let _ = inbox.send(PeerInput::Negotiate).await;
        }

        self.peers.insert(
            participant,
            PeerHandle {
                inbox,
                task,
                generation,
            },
        );
    }

    async fn remove_peer(&mut self, participant: &ParticipantId) {
        let Some(peer) = self.peers.remove(participant) else {
            return;
        };
        let _ = peer.inbox.send(PeerInput::Close).await;
        if let Err(e) = peer.task.await {
            warn!("Peer task for {} ended abnormally: {}", participant, e);
        }
    }

    async fn forward(&self, participant: &ParticipantId, input: PeerInput) {
        let Some(peer) = self.peers.get(participant) else {
            return;
        };
        if peer.inbox.send(input).await.is_err() {
            debug!("Peer {} is gone, input dropped", participant);
        }
    }

    async fn fan_out_add(&self, track: &Arc<MediaTrack>) {
        info!("Adding {} to {} peers", track.label(), self.peers.len());
        for participant in self.peers.keys() {
            self.forward(participant, PeerInput::AddTrack(Arc::clone(track)))
                .await;
        }
    }

    async fn fan_out_remove(&self, track_id: TrackId) {
        for participant in self.peers.keys() {
            self.forward(participant, PeerInput::RemoveTrack(track_id))
                .await;
        }
    }

    async fn stop_screen_share(&mut self) {
        let stopped = self.media.stop_screen_share();
        if stopped.is_empty() {
            return;
        }
        for track_id in stopped {
            self.fan_out_remove(track_id).await;
        }
        let _ = self.ctx.events.send(SessionEvent::ScreenShareStopped);
    }

    async fn shutdown(&mut self) {
        info!("Leaving session, closing {} peers", self.peers.len());
        let participants: Vec<_> = self.peers.keys().copied().collect();
        for participant in participants {
            self.remove_peer(&participant).await;
            self.ctx.status.remove(&participant);
        }
        self.media.release();
        self.relay.close().await;
    }
}
