
pub use mock_relay::*;
pub use mock_transport::*;
pub use peer_fixture::*;
pub use session_helpers::*;
