pub mod config;
pub mod error;
pub mod media;
pub mod negotiation;
pub mod peer;
pub mod relay;
pub mod remote;
pub mod session;
pub mod transport;

pub use config::{
    EnvIceServers, ICE_SERVERS_ENV, IceServerSource, SessionConfig, StaticIceServers,
    resolve_ice_servers,
};
pub use error::{NegotiationError, RelayError, SessionError, TransportError};
pub use media::{
    DeviceError, LocalMediaState, MediaConstraints, MediaDevices, MediaStream, MediaTrack,
    SyntheticDevices, TrackId, TrackKind, TrackSource,
};
pub use negotiation::{NegotiationState, PeerRole};
pub use peer::{PeerHealth, PeerStatus, PeerStatusBoard};
pub use relay::{LocalRelayHub, RelayEvent, RelayHandle, SignalingRelay, WsRelay};
pub use remote::{RemoteStreamBucket, RemoteStreams, RemoteTrack, TrackClass, TrackInfo, classify};
pub use session::{Session, SessionEvent, SessionHandle};
pub use transport::{
    ConnectionState, PeerTransport, TransportConfig, TransportEvent, TransportFactory,
    WebRtcTransport, WebRtcTransportFactory,
};
