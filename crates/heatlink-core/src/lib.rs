//! Heatlink Core
//!
//! Decode-and-normalize pipeline for combustion-heating telemetry and the
//! identity/discovery registry that drives hub auto-configuration.
//!
//! ## Architecture
//!
//! - **[`Registry`]**: system → sensor → measurement identity tree; decides
//!   first-sight of every entity and derives stable topics and ids
//! - **[`DiscoveryPublisher`]**: one-time retained config document per
//!   newly created measurement
//! - **[`StatePublisher`]**: recurring non-retained state document per
//!   sensor and cycle
//! - **[`Pipeline`]**: register → announce → publish composition for one
//!   decode cycle
//!
//! Transports stay outside: the host supplies a [`PublishSink`] and feeds
//! decoded [`TelemetryValue`] batches in; the core never opens a connection.

pub mod discovery;
pub mod pipeline;
pub mod registry;
pub mod sink;
pub mod state;
pub mod value;

pub use discovery::{DeviceInfo, DiscoveryConfig, DiscoveryPublisher, OriginInfo, ORIGIN_NAME};
pub use pipeline::Pipeline;
pub use registry::{
    sanitize, HeatingSystem, Measurement, Registration, Registry, RegistryConfig, SensorChannel,
};
pub use sink::{PublishError, PublishSink, Qos};
pub use state::StatePublisher;
pub use value::{FieldValue, TelemetryValue};
