use classcast_core::{IceServerConfig, ParticipantId, SignalEnvelope, SignalMessage};

/// What the relay tells a session.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    /// Sent once on entry: everybody already in the room.
    Welcome { roster: Vec<ParticipantId> },

    ParticipantJoined(ParticipantId),

    ParticipantLeft(ParticipantId),

    /// STUN/TURN endpoints supplied by the relay operator.
    IceServers(Vec<IceServerConfig>),

    /// An offer, answer or ICE candidate addressed to us.
    Signal {
        from: ParticipantId,
        message: SignalMessage,
    },
}

impl RelayEvent {
    /// Maps an envelope received from the relay. Directed messages without a
    /// sender cannot be answered and are rejected.
    pub fn from_envelope(envelope: SignalEnvelope) -> Option<Self> {
        let event = match envelope.message {
            SignalMessage::IceConfig { ice_servers } => RelayEvent::IceServers(ice_servers),
            SignalMessage::Welcome { roster, .. } => RelayEvent::Welcome { roster },
            SignalMessage::ParticipantJoined { participant_id } => {
                RelayEvent::ParticipantJoined(participant_id)
            }
            SignalMessage::ParticipantLeft { participant_id } => {
                RelayEvent::ParticipantLeft(participant_id)
            }
            message => RelayEvent::Signal {
                from: envelope.from?,
                message,
            },
        };
        Some(event)
    }
}
