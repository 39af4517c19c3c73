mod description;
mod participant;
mod session;
mod signaling;

pub use description::{SdpKind, SessionDescription};
pub use participant::ParticipantId;
pub use session::SessionId;
pub use signaling::{IceCandidate, IceServerConfig, SignalEnvelope, SignalMessage};
