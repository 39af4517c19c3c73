mod server;
mod signaling;

pub use server::{router, serve, serve_on};
pub use signaling::{RelayService, ws_handler};
