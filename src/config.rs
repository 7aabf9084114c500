use std::{
    fmt::{self, Display},
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{FedErr, Result};

const DEFAULT_NUM_CLIENTS: NonZeroUsize = NonZeroUsize::new(10).unwrap();
const DEFAULT_NUM_ROUNDS: NonZeroUsize = NonZeroUsize::new(5).unwrap();
const DEFAULT_LOCAL_EPOCHS: NonZeroUsize = NonZeroUsize::new(5).unwrap();
const DEFAULT_BATCH_SIZE: NonZeroUsize = NonZeroUsize::new(64).unwrap();

const DEFAULT_SAMPLES: NonZeroUsize = NonZeroUsize::new(6000).unwrap();
const DEFAULT_TEST_SAMPLES: NonZeroUsize = NonZeroUsize::new(1000).unwrap();
const DEFAULT_FEATURES: NonZeroUsize = NonZeroUsize::new(16).unwrap();
const DEFAULT_CLASSES: NonZeroUsize = NonZeroUsize::new(4).unwrap();
const DEFAULT_SHARDS_PER_CLIENT: NonZeroUsize = NonZeroUsize::new(2).unwrap();

/// The federated algorithm run by the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    #[serde(rename = "fedavg")]
    FedAvg,
    #[serde(rename = "fedprox")]
    FedProx,
    #[serde(rename = "feddane")]
    FedDane,
    #[serde(rename = "fedsgd")]
    FedSgd,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Algorithm::FedAvg,
        Algorithm::FedProx,
        Algorithm::FedDane,
        Algorithm::FedSgd,
    ];

    /// The lowercase name used in configuration files and artifact paths.
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::FedAvg => "fedavg",
            Algorithm::FedProx => "fedprox",
            Algorithm::FedDane => "feddane",
            Algorithm::FedSgd => "fedsgd",
        }
    }

    /// Whether the server computes a global gradient snapshot before local training.
    pub fn needs_global_gradient(self) -> bool {
        matches!(self, Algorithm::FedDane | Algorithm::FedSgd)
    }

    /// Whether the round ends by averaging the clients' parameters.
    pub fn averages_parameters(self) -> bool {
        !matches!(self, Algorithm::FedSgd)
    }
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where the global gradient snapshot of FedDANE and FedSGD comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradientSource {
    /// The average of the selected clients' current parameters stands in for the gradient.
    #[default]
    ModelProxy,
    /// The average of the selected clients' mean local gradients at the global parameters.
    TrueGradient,
}

/// Immutable settings of a federated simulation.
///
/// Every field is optional in the serialized form and falls back to its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FedConfig {
    pub algorithm: Algorithm,
    pub num_clients: NonZeroUsize,
    /// Fraction of the clients selected each round.
    pub frac: f64,
    /// Fraction of the selected clients that drop out before training.
    pub drop_rate: f64,
    pub num_rounds: NonZeroUsize,
    pub local_epochs: NonZeroUsize,
    pub batch_size: NonZeroUsize,
    pub lr: f32,
    /// Proximal coefficient of FedProx and FedDANE.
    pub mu: f32,
    pub momentum: f32,
    pub seed: u64,
    pub gradient_source: GradientSource,
    /// Path of the final checkpoint, `{algorithm}` is replaced by the algorithm's name.
    pub save_path: String,
    /// Optional path for a JSON report of every round.
    pub report_path: Option<PathBuf>,
}

impl Default for FedConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::FedAvg,
            num_clients: DEFAULT_NUM_CLIENTS,
            frac: 0.9,
            drop_rate: 0.1,
            num_rounds: DEFAULT_NUM_ROUNDS,
            local_epochs: DEFAULT_LOCAL_EPOCHS,
            batch_size: DEFAULT_BATCH_SIZE,
            lr: 0.01,
            mu: 0.1,
            momentum: 0.0,
            seed: 42,
            gradient_source: GradientSource::ModelProxy,
            save_path: "models/{algorithm}.json".into(),
            report_path: None,
        }
    }
}

impl FedConfig {
    /// Checks every field against its valid range.
    ///
    /// # Returns
    /// An `InvalidConfig` error describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(FedErr::InvalidConfig(msg));

        if !(self.frac > 0.0 && self.frac <= 1.0) {
            return invalid(format!("frac must be in (0, 1], got {}", self.frac));
        }

        if !(0.0..=1.0).contains(&self.drop_rate) {
            return invalid(format!("drop_rate must be in [0, 1], got {}", self.drop_rate));
        }

        if !(self.lr.is_finite() && self.lr > 0.0) {
            return invalid(format!("lr must be a positive number, got {}", self.lr));
        }

        if !(self.mu.is_finite() && self.mu >= 0.0) {
            return invalid(format!("mu must be a non negative number, got {}", self.mu));
        }

        if !(0.0..1.0).contains(&self.momentum) {
            return invalid(format!("momentum must be in [0, 1), got {}", self.momentum));
        }

        if self.save_path.trim().is_empty() {
            return invalid("save_path must not be empty".into());
        }

        Ok(())
    }

    /// Amount of local passes over the data a client makes each round.
    pub fn epochs_per_round(&self) -> usize {
        match self.algorithm {
            Algorithm::FedSgd => 1,
            _ => self.local_epochs.get(),
        }
    }

    /// The checkpoint path with the algorithm's name substituted in.
    pub fn resolved_save_path(&self) -> PathBuf {
        PathBuf::from(self.save_path.replace("{algorithm}", self.algorithm.name()))
    }
}

/// How the training data is split among the clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionConfig {
    #[default]
    Iid,
    LabelShards {
        #[serde(default = "default_shards_per_client")]
        shards_per_client: NonZeroUsize,
    },
}

fn default_shards_per_client() -> NonZeroUsize {
    DEFAULT_SHARDS_PER_CLIENT
}

/// Settings of the synthetic data the simulation binary trains on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub samples: NonZeroUsize,
    pub test_samples: NonZeroUsize,
    pub features: NonZeroUsize,
    pub classes: NonZeroUsize,
    /// Standard deviation of every class cluster around its center.
    pub spread: f32,
    pub partition: PartitionConfig,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            samples: DEFAULT_SAMPLES,
            test_samples: DEFAULT_TEST_SAMPLES,
            features: DEFAULT_FEATURES,
            classes: DEFAULT_CLASSES,
            spread: 1.5,
            partition: PartitionConfig::Iid,
        }
    }
}

impl DataConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.spread.is_finite() && self.spread > 0.0) {
            return Err(FedErr::InvalidConfig(format!(
                "spread must be a positive number, got {}",
                self.spread
            )));
        }

        Ok(())
    }
}

/// The whole configuration file of the simulation binary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub federation: FedConfig,
    pub data: DataConfig,
}

impl RunConfig {
    /// Parses a configuration from a JSON string, missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON configuration file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        self.federation.validate()?;
        self.data.validate()
    }
}
