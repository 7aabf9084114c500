use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path,
};

use serde::Serialize;

use crate::{Algorithm, ParamSet, Result};

/// The outcome of a single round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundReport {
    pub round: usize,
    pub selected: Vec<usize>,
    pub active: Vec<usize>,
    /// Mean of the active clients' last epoch losses.
    pub client_loss: f32,
    /// Accuracy of the new global model over the test set, in `[0, 1]`.
    pub accuracy: f32,
    pub test_loss: f32,
}

/// The outcome of a whole simulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingSummary {
    pub algorithm: Algorithm,
    pub history: Vec<RoundReport>,
    /// The final global model, persisted separately as a checkpoint.
    #[serde(skip)]
    pub global: ParamSet,
}

impl TrainingSummary {
    pub fn last_round(&self) -> Option<&RoundReport> {
        self.history.last()
    }

    /// Writes the algorithm and the round history as pretty printed JSON.
    pub fn save_report<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}
