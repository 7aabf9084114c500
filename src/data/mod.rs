//! The data collaborators of the simulation: an in-memory dataset, a synthetic source and the
//! strategies that split a dataset among the clients.

mod dataset;
pub mod partition;
pub mod synthetic;

pub use dataset::{Batch, Dataset};
pub use synthetic::Blobs;
