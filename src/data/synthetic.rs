use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use rand_distr::{Distribution, Normal};

use super::Dataset;
use crate::{FedErr, Result};

/// Standard deviation of the distribution the class centers are drawn from.
const CENTER_STD_DEV: f32 = 3.0;

/// A mixture of isotropic gaussian clusters, one per class.
///
/// The centers are fixed at construction so that every dataset sampled from the same `Blobs`
/// (e.g. a training and a test set) follows the same distribution.
#[derive(Debug, Clone)]
pub struct Blobs {
    centers: Array2<f32>,
    noise: Normal<f32>,
}

impl Blobs {
    /// Creates a new `Blobs` generator.
    ///
    /// # Arguments
    /// * `features` - The dimension of every sample.
    /// * `classes` - The amount of clusters.
    /// * `spread` - The standard deviation of every cluster around its center.
    /// * `rng` - A random number generator used to place the centers.
    ///
    /// # Returns
    /// An `InvalidDataset` error if `spread` is not a valid standard deviation or a dimension
    /// is zero.
    pub fn new<R: Rng + ?Sized>(
        features: usize,
        classes: usize,
        spread: f32,
        rng: &mut R,
    ) -> Result<Self> {
        if features == 0 || classes == 0 {
            return Err(FedErr::InvalidDataset(format!(
                "blobs need at least one feature and one class, got {features} and {classes}"
            )));
        }

        let normal = |std_dev| {
            Normal::new(0.0, std_dev).map_err(|e| FedErr::InvalidDataset(e.to_string()))
        };

        let placement = normal(CENTER_STD_DEV)?;
        let centers = Array2::from_shape_simple_fn((classes, features), || placement.sample(rng));

        Ok(Self {
            centers,
            noise: normal(spread)?,
        })
    }

    pub fn features(&self) -> usize {
        self.centers.ncols()
    }

    pub fn classes(&self) -> usize {
        self.centers.nrows()
    }

    /// Draws `samples` points, labels cycle through the classes so that they are balanced.
    pub fn sample<R: Rng + ?Sized>(&self, samples: usize, rng: &mut R) -> Result<Dataset> {
        let classes = self.classes();
        let y: Vec<usize> = (0..samples).map(|i| i % classes).collect();

        let mut x = Array2::zeros((samples, self.features()));
        for (mut row, &label) in x.axis_iter_mut(Axis(0)).zip(&y) {
            let noise: Array1<f32> = (0..row.len()).map(|_| self.noise.sample(rng)).collect();
            row.assign(&(&self.centers.row(label) + &noise));
        }

        Dataset::new(x, y, classes)
    }
}
