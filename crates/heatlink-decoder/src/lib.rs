//! Heatlink Decoder
//!
//! Turns raw controller output into typed telemetry values:
//!
//! - [`frame`]: the fixed-grammar serial line written by the boiler
//!   controller every cycle
//! - [`analog`]: the heating-circuit pressure transducer voltage
//!
//! Both decoders are pure functions of their input. Every failure is
//! recovered into a [`DecodeError`]; the caller skips the cycle and the
//! next one starts fresh.

pub mod analog;
pub mod error;
pub mod frame;

pub use analog::PressureFault;
pub use error::DecodeError;
