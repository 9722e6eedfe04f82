// vrflow-api: protocol client for the Zhong Hong VRF gateway.
//
// Two independent transports: a pseudo-HTTP query/control API served
// with non-conformant HTTP/0.9-style framing (polling, commands), and
// a raw TCP stream pushing unsolicited binary state-change frames.

pub mod brands;
pub mod client;
pub mod error;
pub mod frame;
mod http09;
pub mod listener;

pub use client::{GatewayClient, GatewayInfo, PollUnit};
pub use error::Error;
pub use frame::PushUpdate;
pub use listener::PushListener;
