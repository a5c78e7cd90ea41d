//! Upstream session adapter: wire frames, codec, and the WebSocket
//! session implementation.

/// Session frame codec.
pub mod codec;

/// Client-to-server wire frames.
pub mod messages;

/// WebSocket session implementation.
pub mod session;

pub use codec::{CodecError, JsonCodec};
pub use messages::RequestFrame;
pub use session::{SessionConfig, WsSession};
