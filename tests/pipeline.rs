use std::{env, fs, num::NonZeroUsize, process};

use rand::{SeedableRng, rngs::StdRng};

use fedsim::{
    Algorithm, FedConfig, RunConfig, checkpoint,
    arch::SoftmaxRegression,
    data::{Blobs, Dataset, partition},
    server::Server,
};

fn nz(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

fn blobs(seed: u64) -> (Dataset, Dataset) {
    let mut rng = StdRng::seed_from_u64(seed);
    let blobs = Blobs::new(4, 3, 0.5, &mut rng).unwrap();
    let train = blobs.sample(600, &mut rng).unwrap();
    let test = blobs.sample(150, &mut rng).unwrap();
    (train, test)
}

fn config(algorithm: Algorithm) -> FedConfig {
    FedConfig {
        algorithm,
        num_clients: nz(4),
        num_rounds: nz(5),
        local_epochs: nz(2),
        batch_size: nz(16),
        lr: 0.05,
        ..FedConfig::default()
    }
}

#[test]
fn softmax_regression_learns_separable_blobs() {
    let (train, test) = blobs(42);
    let mut rng = StdRng::seed_from_u64(1);
    let partitions = partition::iid(&train, nz(4), &mut rng).unwrap();

    let mut server = Server::new(
        config(Algorithm::FedAvg),
        SoftmaxRegression::new(4, 3),
        partitions,
        test,
    )
    .unwrap();

    let summary = server.run().unwrap();
    let last = summary.last_round().unwrap();

    assert!(last.accuracy > 0.8, "accuracy {}", last.accuracy);
    assert!(last.test_loss.is_finite());
}

#[test]
fn fedprox_trains_on_label_shards() {
    let (train, test) = blobs(3);
    let mut rng = StdRng::seed_from_u64(2);
    let partitions = partition::label_shards(&train, nz(4), nz(2), &mut rng).unwrap();

    let mut server = Server::new(
        config(Algorithm::FedProx),
        SoftmaxRegression::new(4, 3),
        partitions,
        test,
    )
    .unwrap();

    let summary = server.run().unwrap();

    assert_eq!(summary.history.len(), 5);
    assert!(summary.global.is_finite());
}

#[test]
fn final_model_round_trips_through_a_checkpoint() {
    let (train, test) = blobs(5);
    let mut rng = StdRng::seed_from_u64(5);
    let partitions = partition::iid(&train, nz(4), &mut rng).unwrap();

    let dir = env::temp_dir().join(format!("fedsim-pipeline-{}", process::id()));
    let config = FedConfig {
        save_path: dir.join("{algorithm}.json").display().to_string(),
        num_rounds: nz(2),
        ..config(Algorithm::FedDane)
    };

    let save_path = config.resolved_save_path();
    assert!(save_path.ends_with("feddane.json"));

    let mut server = Server::new(config, SoftmaxRegression::new(4, 3), partitions, test).unwrap();
    let summary = server.run().unwrap();

    checkpoint::save(&save_path, &summary.global).unwrap();
    let loaded = checkpoint::load(&save_path).unwrap();
    fs::remove_dir_all(&dir).unwrap();

    assert_eq!(loaded, summary.global);
}

#[test]
fn run_config_reads_from_a_file() {
    let path = env::temp_dir().join(format!("fedsim-config-{}.json", process::id()));
    fs::write(
        &path,
        r#"{ "federation": { "algorithm": "fedsgd", "num_rounds": 2 }, "data": { "classes": 3 } }"#,
    )
    .unwrap();

    let config = RunConfig::from_path(&path).unwrap();
    fs::remove_file(&path).unwrap();

    assert_eq!(config.federation.algorithm, Algorithm::FedSgd);
    assert_eq!(config.federation.num_rounds.get(), 2);
    assert_eq!(config.federation.num_clients.get(), 10);
    assert_eq!(config.data.classes.get(), 3);
}
