//! Core types for the traffic stream: activity records, session affinity,
//! user-agent classification, and event synthesis.

pub mod classify;
pub mod error;
pub mod record;
pub mod session;
pub mod synth;

pub use classify::{classify, Classification, ClientFamily, DeviceClass, PlatformFamily};
pub use error::{Error, Result, StoreErrorCode, StreamErrorCode};
pub use record::*;
pub use session::*;
pub use synth::{Burst, SynthConfig, SynthesizedEvent, Synthesizer};
