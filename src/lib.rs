//! A single process simulator of federated learning.
//!
//! A [`server::Server`] owns the global model and a set of [`client::Client`]s, each holding a
//! private partition of the data. Every round the server samples some clients, lets them train
//! locally with the optimizer of the configured [`Algorithm`] and combines what they send back
//! into the next global model.

pub mod aggregation;
pub mod arch;
pub mod checkpoint;
pub mod client;
pub mod config;
pub mod data;
mod error;
pub mod evaluation;
pub mod optimization;
mod params;
pub mod server;

pub use config::{Algorithm, DataConfig, FedConfig, GradientSource, PartitionConfig, RunConfig};
pub use error::{FedErr, Result};
pub use params::{GradSet, ParamSet};
