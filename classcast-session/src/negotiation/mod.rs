mod ice_buffer;
mod signaling_state;

pub use ice_buffer::*;
pub use signaling_state::*;
