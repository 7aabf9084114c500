use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::Rng;
use rand_distr::{Distribution, Uniform};

use super::{
    Model,
    model::{check_batch, matrix, vector},
};
use crate::{FedErr, GradSet, ParamSet, Result};

const WEIGHT: &str = "weight";
const BIAS: &str = "bias";

/// A single dense layer followed by a log-softmax, trained with the negative log-likelihood.
///
/// Parameters: `weight` with shape `[features, classes]` and `bias` with shape `[classes]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoftmaxRegression {
    features: usize,
    classes: usize,
}

impl SoftmaxRegression {
    /// Creates a new `SoftmaxRegression`.
    ///
    /// # Arguments
    /// * `features` - The size of every input row.
    /// * `classes` - The amount of outputs.
    pub fn new(features: usize, classes: usize) -> Self {
        Self { features, classes }
    }

    /// Runs the forward pass, returning the log-probabilities of every class per row.
    fn log_probs(&self, params: &ParamSet, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let w = matrix(params, WEIGHT, [self.features, self.classes])?;
        let b = vector(params, BIAS, self.classes)?;

        let mut z = x.dot(&w) + &b;
        for mut row in z.rows_mut() {
            let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
            let lse = max + row.mapv(|v| (v - max).exp()).sum().ln();
            row.mapv_inplace(|v| v - lse);
        }

        Ok(z)
    }
}

impl Model for SoftmaxRegression {
    /// Xavier uniform weights and zero biases.
    fn init_params<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<ParamSet> {
        let range = (6. / (self.features + self.classes) as f32).sqrt();
        let dist = Uniform::new(-range, range).map_err(|e| FedErr::InvalidConfig(e.to_string()))?;

        let w = Array2::from_shape_simple_fn((self.features, self.classes), || dist.sample(rng));
        let b = Array1::<f32>::zeros(self.classes);

        Ok(ParamSet::new()
            .with(WEIGHT, w.into_dyn())
            .with(BIAS, b.into_dyn()))
    }

    fn loss_and_grad(
        &self,
        params: &ParamSet,
        x: ArrayView2<f32>,
        y: &[usize],
    ) -> Result<(f32, GradSet)> {
        check_batch(&x, y, self.features)?;
        let n = y.len() as f32;

        let log_p = self.log_probs(params, x)?;
        let loss = -y
            .iter()
            .enumerate()
            .map(|(i, &label)| log_p[[i, label]])
            .sum::<f32>()
            / n;

        // d(nll)/dz = softmax - one_hot, averaged over the batch
        let mut d = log_p.mapv(f32::exp);
        for (i, &label) in y.iter().enumerate() {
            d[[i, label]] -= 1.0;
        }
        d /= n;

        let dw = x.t().dot(&d);
        let db = d.sum_axis(Axis(0));

        let grad = ParamSet::new()
            .with(WEIGHT, dw.into_dyn())
            .with(BIAS, db.into_dyn());

        Ok((loss, grad))
    }

    fn evaluate_batch(
        &self,
        params: &ParamSet,
        x: ArrayView2<f32>,
        y: &[usize],
    ) -> Result<(f32, usize)> {
        check_batch(&x, y, self.features)?;
        let log_p = self.log_probs(params, x)?;

        let mut loss = 0.0;
        let mut correct = 0;

        for (row, &label) in log_p.rows().into_iter().zip(y) {
            loss -= row[label];

            let predicted = row
                .iter()
                .enumerate()
                .fold((0, f32::NEG_INFINITY), |best, (class, &v)| {
                    if v > best.1 { (class, v) } else { best }
                })
                .0;

            correct += usize::from(predicted == label);
        }

        Ok((loss, correct))
    }
}
