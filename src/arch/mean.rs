use ndarray::{ArrayView2, arr1};
use rand::Rng;

use super::{
    Model,
    model::{check_batch, vector},
};
use crate::{GradSet, ParamSet, Result};

const MEAN: &str = "mean";

/// The smallest possible model: a single scalar fitted to the labels with the squared error.
///
/// It ignores the features entirely and predicts the class closest to its scalar. Its only
/// parameter, `mean`, starts at zero so runs built on it don't depend on initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeanModel {
    classes: usize,
}

impl MeanModel {
    pub fn new(classes: usize) -> Self {
        Self { classes }
    }

    fn predict(&self, mean: f32) -> usize {
        let last = self.classes.saturating_sub(1) as f32;
        mean.round().clamp(0.0, last) as usize
    }
}

impl Model for MeanModel {
    fn init_params<R: Rng + ?Sized>(&self, _rng: &mut R) -> Result<ParamSet> {
        Ok(ParamSet::new().with(MEAN, arr1(&[0.0f32]).into_dyn()))
    }

    fn loss_and_grad(
        &self,
        params: &ParamSet,
        x: ArrayView2<f32>,
        y: &[usize],
    ) -> Result<(f32, GradSet)> {
        check_batch(&x, y, x.ncols())?;
        let mean = vector(params, MEAN, 1)?[0];
        let n = y.len() as f32;

        let (loss, grad) = y.iter().fold((0.0, 0.0), |(loss, grad), &label| {
            let diff = mean - label as f32;
            (loss + diff * diff, grad + 2.0 * diff)
        });

        let grad = ParamSet::new().with(MEAN, arr1(&[grad / n]).into_dyn());
        Ok((loss / n, grad))
    }

    fn evaluate_batch(
        &self,
        params: &ParamSet,
        x: ArrayView2<f32>,
        y: &[usize],
    ) -> Result<(f32, usize)> {
        check_batch(&x, y, x.ncols())?;
        let mean = vector(params, MEAN, 1)?[0];
        let predicted = self.predict(mean);

        let loss = y.iter().map(|&label| (mean - label as f32).powi(2)).sum();
        let correct = y.iter().filter(|&&label| label == predicted).count();

        Ok((loss, correct))
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array2;

    use super::*;
    use crate::FedErr;

    fn at(mean: f32) -> ParamSet {
        ParamSet::new().with(MEAN, arr1(&[mean]).into_dyn())
    }

    #[test]
    fn squared_error_and_its_gradient() {
        let model = MeanModel::new(3);
        let x = Array2::zeros((2, 1));

        let (loss, grad) = model.loss_and_grad(&at(1.0), x.view(), &[0, 2]).unwrap();

        assert!((loss - 1.0).abs() < 1e-6);
        assert!(grad.get(MEAN).unwrap().iter().all(|g| g.abs() < 1e-6));
    }

    #[test]
    fn predicts_the_nearest_valid_class() {
        let model = MeanModel::new(3);
        assert_eq!(model.predict(1.4), 1);
        assert_eq!(model.predict(1.6), 2);
        assert_eq!(model.predict(-3.0), 0);
        assert_eq!(model.predict(7.0), 2);
    }

    #[test]
    fn evaluation_sums_the_loss() {
        let model = MeanModel::new(2);
        let x = Array2::zeros((3, 4));

        let (loss, correct) = model.evaluate_batch(&at(1.0), x.view(), &[1, 0, 1]).unwrap();

        assert!((loss - 1.0).abs() < 1e-6);
        assert_eq!(correct, 2);
    }

    #[test]
    fn missing_parameter_is_a_shape_mismatch() {
        let model = MeanModel::new(2);
        let x = Array2::zeros((1, 1));
        assert!(matches!(
            model.loss_and_grad(&ParamSet::new(), x.view(), &[0]),
            Err(FedErr::ShapeMismatch { .. })
        ));
    }
}
