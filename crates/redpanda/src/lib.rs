//! Redpanda stream channel: record publishing and ordered consumption.

pub mod client;
pub mod config;
pub mod consumer;
pub mod health;
pub mod partitioner;
pub mod producer;

pub use config::*;
pub use consumer::*;
pub use partitioner::*;
pub use producer::*;
