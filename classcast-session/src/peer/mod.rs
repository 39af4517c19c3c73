mod peer_connection;
mod peer_context;
mod peer_input;
mod peer_status;

pub use peer_connection::*;
pub use peer_context::*;
pub use peer_input::*;
pub use peer_status::*;
