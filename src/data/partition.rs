//! Splits of a training set among the federation's clients.

use std::{num::NonZeroUsize, ops::Range};

use rand::{Rng, seq::SliceRandom};

use super::Dataset;
use crate::{FedErr, Result};

/// Splits `total` samples among `parts` and returns the range of the `part`-th one.
///
/// Properties:
/// - Ranges are contiguous, disjoint and cover `[0..total)`.
/// - Sizes differ by at most 1 (balanced partition).
pub fn shard_range(total: usize, part: usize, parts: NonZeroUsize) -> Range<usize> {
    let parts = parts.get();
    let base = total / parts;
    let rem = total % parts;

    let start = part * base + part.min(rem);
    let extra = usize::from(part < rem);
    start..start + base + extra
}

/// Independent and identically distributed split: the samples are shuffled and then cut into
/// `num_clients` contiguous, nearly equal chunks.
///
/// # Arguments
/// * `dataset` - The dataset to split.
/// * `num_clients` - The amount of partitions.
/// * `rng` - The source of the shuffling.
///
/// # Returns
/// One dataset per client, or an `InvalidDataset` error if some client would get no samples.
pub fn iid<R: Rng + ?Sized>(
    dataset: &Dataset,
    num_clients: NonZeroUsize,
    rng: &mut R,
) -> Result<Vec<Dataset>> {
    if dataset.len() < num_clients.get() {
        return Err(FedErr::InvalidDataset(format!(
            "cannot split {} samples among {num_clients} clients",
            dataset.len()
        )));
    }

    let mut indices: Vec<usize> = (0..dataset.len()).collect();
    indices.shuffle(rng);

    let partitions = (0..num_clients.get())
        .map(|client| {
            let range = shard_range(indices.len(), client, num_clients);
            dataset.subset(&indices[range])
        })
        .collect();

    Ok(partitions)
}

/// Non IID split: the samples are sorted by label and cut into `num_clients *
/// shards_per_client` equal shards, then every client receives `shards_per_client` random
/// shards. Clients therefore only see a few classes each.
///
/// Samples beyond the last whole shard are left out.
///
/// # Arguments
/// * `dataset` - The dataset to split.
/// * `num_clients` - The amount of partitions.
/// * `shards_per_client` - The amount of label-sorted shards each client receives.
/// * `rng` - The source of the shard assignment.
///
/// # Returns
/// One dataset per client, or an `InvalidDataset` error if the shards would be empty.
pub fn label_shards<R: Rng + ?Sized>(
    dataset: &Dataset,
    num_clients: NonZeroUsize,
    shards_per_client: NonZeroUsize,
    rng: &mut R,
) -> Result<Vec<Dataset>> {
    let num_shards = num_clients.get() * shards_per_client.get();
    let shard_size = dataset.len() / num_shards;

    if shard_size == 0 {
        return Err(FedErr::InvalidDataset(format!(
            "cannot cut {} samples into {num_shards} shards",
            dataset.len()
        )));
    }

    let mut sorted: Vec<usize> = (0..dataset.len()).collect();
    sorted.sort_by_key(|&i| dataset.y()[i]);

    let mut shard_ids: Vec<usize> = (0..num_shards).collect();
    shard_ids.shuffle(rng);

    let partitions = shard_ids
        .chunks(shards_per_client.get())
        .map(|shards| {
            let indices: Vec<usize> = shards
                .iter()
                .flat_map(|&shard| &sorted[shard * shard_size..(shard + 1) * shard_size])
                .copied()
                .collect();

            dataset.subset(&indices)
        })
        .collect();

    Ok(partitions)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use ndarray::Array2;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    /// A dataset whose single feature is the sample's index.
    fn indexed(n: usize, classes: usize) -> Dataset {
        let x = Array2::from_shape_fn((n, 1), |(i, _)| i as f32);
        let y = (0..n).map(|i| i % classes).collect();
        Dataset::new(x, y, classes).unwrap()
    }

    fn ids(ds: &Dataset) -> Vec<usize> {
        ds.x().column(0).iter().map(|&v| v as usize).collect()
    }

    #[test]
    fn shard_ranges_are_balanced_and_cover_everything() {
        let parts = nz(3);
        let ranges: Vec<_> = (0..3).map(|p| shard_range(10, p, parts)).collect();
        assert_eq!(ranges, [0..4, 4..7, 7..10]);
    }

    #[test]
    fn iid_covers_the_dataset_exactly_once() {
        let ds = indexed(23, 3);
        let mut rng = StdRng::seed_from_u64(7);
        let parts = iid(&ds, nz(4), &mut rng).unwrap();

        assert_eq!(parts.len(), 4);
        let sizes: Vec<_> = parts.iter().map(Dataset::len).collect();
        assert_eq!(sizes, [6, 6, 6, 5]);

        let mut seen: Vec<usize> = parts.iter().flat_map(ids).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..23).collect::<Vec<_>>());
    }

    #[test]
    fn iid_is_deterministic_for_a_seed() {
        let ds = indexed(20, 2);
        let a = iid(&ds, nz(3), &mut StdRng::seed_from_u64(1)).unwrap();
        let b = iid(&ds, nz(3), &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn iid_rejects_more_clients_than_samples() {
        let ds = indexed(2, 1);
        assert!(iid(&ds, nz(3), &mut StdRng::seed_from_u64(0)).is_err());
    }

    #[test]
    fn label_shards_limit_the_classes_per_client() {
        let ds = indexed(40, 4);
        let mut rng = StdRng::seed_from_u64(3);
        let parts = label_shards(&ds, nz(4), nz(1), &mut rng).unwrap();

        for part in &parts {
            assert_eq!(part.len(), 10);
            let classes: HashSet<_> = part.y().iter().collect();
            assert_eq!(classes.len(), 1);
        }

        let mut seen: Vec<usize> = parts.iter().flat_map(ids).collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 40);
    }

    #[test]
    fn label_shards_reject_empty_shards() {
        let ds = indexed(5, 2);
        assert!(label_shards(&ds, nz(3), nz(2), &mut StdRng::seed_from_u64(0)).is_err());
    }
}
