mod local_relay;
mod relay_event;
mod signaling_relay;
mod ws_relay;

pub use local_relay::*;
pub use relay_event::*;
pub use signaling_relay::*;
pub use ws_relay::*;
