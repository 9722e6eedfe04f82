// vrflow-core: Gateway lifecycle and device state layer between vrflow-api and consumers.

pub mod bridge;
pub mod config;
pub mod error;
pub mod gateway;
pub mod model;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bridge::{BridgeMessage, CallbackError, SubscriptionId, UpdateBridge};
pub use config::GatewayConfig;
pub use error::CoreError;
pub use gateway::Gateway;
pub use store::{DeviceStore, VersionGate};

// Re-export model types at the crate root for ergonomics.
pub use model::{DeviceRecord, device_key, fan_name, mode_name};

// Transport types that show up in the public surface.
pub use vrflow_api::{GatewayInfo, PushUpdate};
