use std::env;

use anyhow::Context;
use log::{info, warn};
use rand::{SeedableRng, rngs::StdRng};

use fedsim::{
    PartitionConfig, RunConfig,
    arch::SoftmaxRegression,
    data::{Blobs, partition},
    server::Server,
};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = match env::args().nth(1) {
        Some(path) => RunConfig::from_path(&path)
            .with_context(|| format!("failed to load the config at {path}"))?,
        None => RunConfig::default(),
    };

    let RunConfig { federation, data } = config;
    let mut rng = StdRng::seed_from_u64(federation.seed);

    let blobs = Blobs::new(data.features.get(), data.classes.get(), data.spread, &mut rng)?;
    let train = blobs.sample(data.samples.get(), &mut rng)?;
    let test = blobs.sample(data.test_samples.get(), &mut rng)?;

    let partitions = match data.partition {
        PartitionConfig::Iid => partition::iid(&train, federation.num_clients, &mut rng)?,
        PartitionConfig::LabelShards { shards_per_client } => {
            partition::label_shards(&train, federation.num_clients, shards_per_client, &mut rng)?
        }
    };

    info!(
        "training {} on {} samples split among {} clients",
        federation.algorithm,
        train.len(),
        partitions.len()
    );

    let model = SoftmaxRegression::new(data.features.get(), data.classes.get());
    let mut server = Server::new(federation, model, partitions, test)?;
    let summary = match server.run() {
        Ok(summary) => summary,
        Err(err) => {
            match server.save_checkpoint() {
                Ok(path) => warn!(
                    "training stopped after round {}, model saved at {}",
                    server.round(),
                    path.display()
                ),
                Err(save_err) => warn!("failed to save the last completed model: {save_err}"),
            }
            return Err(err.into());
        }
    };

    let save_path = server
        .save_checkpoint()
        .context("failed to save the model")?;
    info!("model saved at {}", save_path.display());

    let config = server.config();
    if let Some(report_path) = &config.report_path {
        summary.save_report(report_path)?;
        info!("report saved at {}", report_path.display());
    }

    if let Some(last) = summary.last_round() {
        info!("final accuracy {:.2}%", last.accuracy * 100.0);
    }

    Ok(())
}
