pub use classcast_core::model::{ParticipantId, SessionId};

pub mod model {
    pub use classcast_core::model::*;
}

#[cfg(feature = "session")]
pub mod session {
    pub use classcast_session::*;
}

#[cfg(feature = "relay")]
pub mod relay {
    pub use classcast_relay::*;
}
