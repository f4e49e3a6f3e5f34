//! Consumer side of the traffic stream.
//!
//! - [`aggregate`]: running statistics and reports
//! - [`store`]: append-only CSV record log
//! - [`consumer`]: fetch, dedup, persist, commit loop
//! - [`scheduler`]: task spawning and the health monitor

pub mod aggregate;
pub mod consumer;
pub mod scheduler;
pub mod store;

pub use aggregate::*;
pub use consumer::*;
pub use scheduler::*;
pub use store::{latest_log, read_log, RecordLog};
