mod report;
mod selection;
mod server;

pub use report::{RoundReport, TrainingSummary};
pub use selection::{drop_stragglers, select_clients};
pub use server::{RoundContext, Server};
