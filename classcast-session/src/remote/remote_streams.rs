use classcast_core::ParticipantId;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use webrtc::rtp::packet::Packet;

use crate::remote::{TrackClass, TrackInfo, classify};

/// A live track received from a remote participant.
///
/// `rtp` republishes the packets read from the transport so any number of
/// renderers can subscribe. Absent for transports that carry no media.
#[derive(Debug, Clone)]
pub struct RemoteTrack {
    pub info: TrackInfo,
    pub rtp: Option<broadcast::Sender<Packet>>,
}

impl RemoteTrack {
    pub fn new(info: TrackInfo) -> Self {
        Self { info, rtp: None }
    }

    pub fn with_rtp(info: TrackInfo, rtp: broadcast::Sender<Packet>) -> Self {
        Self {
            info,
            rtp: Some(rtp),
        }
    }

    pub fn id(&self) -> &str {
        &self.info.id
    }

    pub fn subscribe_rtp(&self) -> Option<broadcast::Receiver<Packet>> {
        self.rtp.as_ref().map(|tx| tx.subscribe())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RemoteStreamBucket {
    pub camera: Vec<RemoteTrack>,
    pub screen: Vec<RemoteTrack>,
}

impl RemoteStreamBucket {
    /// Classifies and stores the track. A camera/mic track replaces the
    /// existing track of the same kind instead of being appended.
    pub fn place(&mut self, track: RemoteTrack) -> TrackClass {
        let class = classify(&track.info, self);
        match class {
            TrackClass::Camera => {
                let kind = track.info.kind;
                match self.camera.iter_mut().find(|t| t.info.kind == kind) {
                    Some(slot) => *slot = track,
                    None => self.camera.push(track),
                }
            }
            TrackClass::Screen => match self.screen.iter_mut().find(|t| t.id() == track.id()) {
                Some(slot) => *slot = track,
                None => self.screen.push(track),
            },
        }
        class
    }

    pub fn remove(&mut self, track_id: &str) -> Option<TrackClass> {
        if let Some(pos) = self.camera.iter().position(|t| t.id() == track_id) {
            self.camera.remove(pos);
            return Some(TrackClass::Camera);
        }
        if let Some(pos) = self.screen.iter().position(|t| t.id() == track_id) {
            self.screen.remove(pos);
            return Some(TrackClass::Screen);
        }
        None
    }

    pub fn class_of(&self, track_id: &str) -> Option<TrackClass> {
        if self.camera.iter().any(|t| t.id() == track_id) {
            Some(TrackClass::Camera)
        } else if self.screen.iter().any(|t| t.id() == track_id) {
            Some(TrackClass::Screen)
        } else {
            None
        }
    }

    pub fn is_empty(&self) -> bool {
        self.camera.is_empty() && self.screen.is_empty()
    }
}

/// Remote camera and screen collections keyed by participant, shared with
/// the application for rendering.
#[derive(Clone, Default)]
pub struct RemoteStreams {
    buckets: Arc<DashMap<ParticipantId, RemoteStreamBucket>>,
}

impl RemoteStreams {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn place(&self, participant: ParticipantId, track: RemoteTrack) -> TrackClass {
        self.buckets.entry(participant).or_default().place(track)
    }

    pub(crate) fn remove_track(
        &self,
        participant: &ParticipantId,
        track_id: &str,
    ) -> Option<TrackClass> {
        self.buckets.get_mut(participant)?.remove(track_id)
    }

    pub(crate) fn purge(&self, participant: &ParticipantId) -> Option<RemoteStreamBucket> {
        self.buckets.remove(participant).map(|(_, bucket)| bucket)
    }

    pub fn class_of(&self, participant: &ParticipantId, track_id: &str) -> Option<TrackClass> {
        self.buckets.get(participant)?.class_of(track_id)
    }

    pub fn bucket(&self, participant: &ParticipantId) -> Option<RemoteStreamBucket> {
        self.buckets.get(participant).map(|b| b.clone())
    }

    pub fn camera(&self, participant: &ParticipantId) -> Vec<RemoteTrack> {
        self.bucket(participant).map(|b| b.camera).unwrap_or_default()
    }

    pub fn screen(&self, participant: &ParticipantId) -> Vec<RemoteTrack> {
        self.bucket(participant).map(|b| b.screen).unwrap_or_default()
    }

    pub fn participants(&self) -> Vec<ParticipantId> {
        self.buckets.iter().map(|entry| *entry.key()).collect()
    }
}
