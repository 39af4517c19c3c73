use async_trait::async_trait;
use classcast_core::{IceCandidate, IceServerConfig, ParticipantId, SdpKind, SessionDescription};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8, MediaEngine};
use webrtc::api::setting_engine::SettingEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::media::Sample;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::signaling_state::RTCSignalingState;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_remote::TrackRemote;

use crate::error::TransportError;
use crate::media::{MediaTrack, TrackId, TrackKind};
use crate::negotiation::PeerRole;
use crate::remote::{RemoteTrack, TrackInfo};
use crate::transport::{
    ConnectionState, PeerTransport, TransportConfig, TransportEvent, TransportFactory,
};

/// A remote track with no packets for this long is reported as muted.
const SILENCE_WINDOW: Duration = Duration::from_millis(500);
const RTP_FANOUT_CAPACITY: usize = 256;

const AUDIO_FRAME: Duration = Duration::from_millis(20);
const VIDEO_FRAME: Duration = Duration::from_millis(33);
/// Opus "silence" frame.
const AUDIO_PLACEHOLDER: [u8; 3] = [0xf8, 0xff, 0xfe];
const VIDEO_PLACEHOLDER: [u8; 10] = [0x10, 0x02, 0x00, 0x9d, 0x01, 0x2a, 0x10, 0x00, 0x10, 0x00];

struct LocalSender {
    sender: Arc<RTCRtpSender>,
    pump: JoinHandle<()>,
}

/// [`PeerTransport`] backed by a `webrtc` crate peer connection.
///
/// The crate cannot roll back a local description, so on the polite side a
/// local offer is held back and only applied right before its answer.
/// Rolling back then just forgets the held offer. The impolite side never
/// rolls back and applies its offers immediately.
pub struct WebRtcTransport {
    remote: ParticipantId,
    role: PeerRole,
    peer_connection: Arc<RTCPeerConnection>,
    senders: DashMap<TrackId, LocalSender>,
    held_offer: Mutex<Option<RTCSessionDescription>>,
}

impl WebRtcTransport {
    /// Builds the peer connection and wires its callbacks to `event_tx`.
    pub async fn new(
        remote: ParticipantId,
        role: PeerRole,
        config: &TransportConfig,
        event_tx: mpsc::Sender<TransportEvent>,
    ) -> Result<Self, TransportError> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let mut settings = SettingEngine::default();
        settings.set_mid_generator(move |greatest| next_mid(role, greatest));

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .with_setting_engine(settings)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config.ice_servers.iter().map(rtc_ice_server).collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        let state_tx = event_tx.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();

                Box::pin(async move {
                    info!("Peer connection state for {} changed: {:?}", remote, s);
                    let Some(state) = connection_state(s) else {
                        return;
                    };
                    let _ = tx.send(TransportEvent::StateChanged(state)).await;
                })
            },
        ));

        let ice_tx = event_tx.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let candidate = IceCandidate {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_m_line_index: init.sdp_mline_index,
                };
                let _ = tx.send(TransportEvent::CandidateGenerated(candidate)).await;
            })
        }));

        let track_tx = event_tx;
        peer_connection.on_track(Box::new(move |track, _receiver, _transceiver| {
            let tx = track_tx.clone();

            Box::pin(async move {
                tokio::spawn(read_remote_track(remote, track, tx));
            })
        }));

        Ok(Self {
            remote,
            role,
            peer_connection,
            senders: DashMap::new(),
            held_offer: Mutex::new(None),
        })
    }
}

#[async_trait]
impl PeerTransport for WebRtcTransport {
    async fn add_track(&self, track: Arc<MediaTrack>) -> Result<(), TransportError> {
        if self.senders.contains_key(&track.id()) {
            return Ok(());
        }

        let capability = match track.kind() {
            TrackKind::Audio => RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                clock_rate: 48000,
                channels: 2,
                ..Default::default()
            },
            TrackKind::Video => RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                clock_rate: 90000,
                ..Default::default()
            },
        };
        let local = Arc::new(TrackLocalStaticSample::new(
            capability,
            track.wire_id(),
            track.stream_id().to_owned(),
        ));

        let sender = self
            .peer_connection
            .add_track(Arc::clone(&local) as Arc<dyn TrackLocal + Send + Sync>)
            .await?;

        // RTCP has to be read for the interceptors to run.
        let rtcp_sender = Arc::clone(&sender);
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1500];
            while rtcp_sender.read(&mut buf).await.is_ok() {}
        });

        debug!("Sending {} to {}", track.wire_id(), self.remote);
        let pump = tokio::spawn(pump_samples(Arc::clone(&track), local));
        self.senders.insert(track.id(), LocalSender { sender, pump });
        Ok(())
    }

    async fn remove_track(&self, track_id: TrackId) -> Result<(), TransportError> {
        let Some((_, local)) = self.senders.remove(&track_id) else {
            return Err(TransportError::UnknownSender(track_id));
        };
        local.pump.abort();
        self.peer_connection.remove_track(&local.sender).await?;
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription, TransportError> {
        let offer = self.peer_connection.create_offer(None).await?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription, TransportError> {
        let answer = self.peer_connection.create_answer(None).await?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_local_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), TransportError> {
        let desc = rtc_description(desc)?;
        if self.role == PeerRole::Polite && desc.sdp_type == RTCSdpType::Offer {
            let state = self.peer_connection.signaling_state();
            if state != RTCSignalingState::Stable {
                return Err(TransportError::Rejected {
                    operation: "set_local_description",
                    reason: format!("offer in {state}"),
                });
            }
            debug!("Holding offer for {} until it is answered", self.remote);
            *self.held_offer.lock().await = Some(desc);
            return Ok(());
        }

        self.peer_connection.set_local_description(desc).await?;
        Ok(())
    }

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), TransportError> {
        let desc = rtc_description(desc)?;
        let mut held = self.held_offer.lock().await;
        if held.is_some() {
            if desc.sdp_type != RTCSdpType::Answer {
                return Err(TransportError::Rejected {
                    operation: "set_remote_description",
                    reason: "remote offer while our offer is pending".into(),
                });
            }
            if let Some(offer) = held.take() {
                self.peer_connection.set_local_description(offer).await?;
            }
        }
        drop(held);

        self.peer_connection.set_remote_description(desc).await?;
        Ok(())
    }

    async fn rollback(&self) -> Result<(), TransportError> {
        if self.held_offer.lock().await.take().is_some() {
            debug!("Dropped held offer for {}", self.remote);
            return Ok(());
        }
        Err(TransportError::Rejected {
            operation: "rollback",
            reason: format!("no held offer on the {:?} side", self.role),
        })
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            ..Default::default()
        };
        self.peer_connection.add_ice_candidate(init).await?;
        Ok(())
    }

    async fn has_unnegotiated_senders(&self) -> bool {
        let negotiated = self
            .peer_connection
            .current_local_description()
            .await
            .map(|desc| desc.sdp)
            .unwrap_or_default();

        for transceiver in self.peer_connection.get_transceivers().await {
            if transceiver.sender().await.track().await.is_none() {
                continue;
            }
            let carried = transceiver
                .mid()
                .is_some_and(|mid| negotiated.contains(&format!("a=mid:{mid}\r\n")));
            if !carried {
                return true;
            }
        }
        false
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.held_offer.lock().await.take();
        for entry in self.senders.iter() {
            entry.pump.abort();
        }
        self.senders.clear();
        self.peer_connection.close().await?;
        Ok(())
    }
}

impl Drop for WebRtcTransport {
    fn drop(&mut self) {
        for entry in self.senders.iter() {
            entry.pump.abort();
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WebRtcTransportFactory;

#[async_trait]
impl TransportFactory for WebRtcTransportFactory {
    async fn create(
        &self,
        remote: ParticipantId,
        role: PeerRole,
        config: &TransportConfig,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn PeerTransport>, TransportError> {
        let transport = WebRtcTransport::new(remote, role, config, events).await?;
        Ok(Box::new(transport))
    }
}

/// Reads one remote track until it ends, republishing RTP for renderers.
///
/// Remote tracks carry no label here, so the wire id (`screen-…`,
/// `camera-…`, `mic-…`) is used as the label.
async fn read_remote_track(
    remote: ParticipantId,
    track: Arc<TrackRemote>,
    tx: mpsc::Sender<TransportEvent>,
) {
    let id = track.id();
    let kind = match track.kind() {
        RTPCodecType::Audio => TrackKind::Audio,
        _ => TrackKind::Video,
    };
    let info = TrackInfo {
        id: id.clone(),
        stream_id: track.stream_id(),
        kind,
        label: id.clone(),
    };
    info!("Receiving {:?} track {} from {}", kind, id, remote);

    let (rtp_tx, _) = broadcast::channel(RTP_FANOUT_CAPACITY);
    let remote_track = RemoteTrack::with_rtp(info, rtp_tx.clone());
    if tx.send(TransportEvent::RemoteTrack(remote_track)).await.is_err() {
        return;
    }

    let mut muted = false;
    loop {
        match time::timeout(SILENCE_WINDOW, track.read_rtp()).await {
            Ok(Ok((packet, _))) => {
                if muted {
                    muted = false;
                    let event = TransportEvent::RemoteTrackUnmuted(id.clone());
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
                let _ = rtp_tx.send(packet);
            }
            Ok(Err(e)) => {
                debug!("Remote track {} from {} ended: {}", id, remote, e);
                let _ = tx.send(TransportEvent::RemoteTrackEnded(id)).await;
                return;
            }
            Err(_) => {
                if !muted {
                    muted = true;
                    let event = TransportEvent::RemoteTrackMuted(id.clone());
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
            }
        }
    }
}

/// Paces placeholder samples onto a local track while it is live.
///
/// Devices in this crate hand out tracks without an encoder behind them; a
/// disabled track writes nothing, which the remote side sees as muted.
async fn pump_samples(track: Arc<MediaTrack>, local: Arc<TrackLocalStaticSample>) {
    let (frame, duration): (&'static [u8], Duration) = match track.kind() {
        TrackKind::Audio => (&AUDIO_PLACEHOLDER, AUDIO_FRAME),
        TrackKind::Video => (&VIDEO_PLACEHOLDER, VIDEO_FRAME),
    };
    let mut ticker = time::interval(duration);
    let ended = track.ended();
    tokio::pin!(ended);

    loop {
        tokio::select! {
            _ = &mut ended => break,
            _ = ticker.tick() => {
                if !track.is_enabled() {
                    continue;
                }
                let sample = Sample {
                    data: frame.to_vec().into(),
                    duration,
                    ..Default::default()
                };
                if let Err(e) = local.write_sample(&sample).await {
                    warn!("Failed to write sample for {}: {}", track.wire_id(), e);
                    break;
                }
            }
        }
    }
}

/// Even mids on the polite side, odd on the impolite side. Transceivers that
/// got a mid from an offer later dropped in a collision can then never be
/// matched against a new m-line of the remote offer.
fn next_mid(role: PeerRole, greatest: isize) -> String {
    let parity = match role {
        PeerRole::Polite => 0,
        PeerRole::Impolite => 1,
    };
    let mut next = greatest + 1;
    if next.rem_euclid(2) != parity {
        next += 1;
    }
    next.to_string()
}

fn rtc_ice_server(server: &IceServerConfig) -> RTCIceServer {
    RTCIceServer {
        urls: server.urls.clone(),
        username: server.username.clone().unwrap_or_default(),
        credential: server.credential.clone().unwrap_or_default(),
        ..Default::default()
    }
}

fn rtc_description(desc: SessionDescription) -> Result<RTCSessionDescription, TransportError> {
    let rtc = match desc.kind {
        SdpKind::Offer => RTCSessionDescription::offer(desc.sdp)?,
        SdpKind::Answer => RTCSessionDescription::answer(desc.sdp)?,
    };
    Ok(rtc)
}

fn connection_state(state: RTCPeerConnectionState) -> Option<ConnectionState> {
    match state {
        RTCPeerConnectionState::New => Some(ConnectionState::New),
        RTCPeerConnectionState::Connecting => Some(ConnectionState::Connecting),
        RTCPeerConnectionState::Connected => Some(ConnectionState::Connected),
        RTCPeerConnectionState::Disconnected => Some(ConnectionState::Disconnected),
        RTCPeerConnectionState::Failed => Some(ConnectionState::Failed),
        RTCPeerConnectionState::Closed => Some(ConnectionState::Closed),
        _ => None,
    }
}
