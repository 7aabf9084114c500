use ndarray::{ArrayView, ArrayView1, ArrayView2, ArrayViewD, Dimension, Ix1, Ix2};
use rand::Rng;

use crate::{FedErr, GradSet, ParamSet, Result};

/// A differentiable model whose parameters live outside of it, in a `ParamSet`.
///
/// The simulation never looks into the architecture, it only initializes parameters, asks for
/// gradients during local training and scores batches during evaluation.
pub trait Model {
    /// Samples a fresh set of parameters.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    fn init_params<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<ParamSet>;

    /// Computes the mean loss of a batch and its gradient with respect to `params`.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `x` - The features of the batch, one row per sample.
    /// * `y` - The labels of the batch.
    ///
    /// # Returns
    /// A tuple with the batch loss and the gradient, which has the keys and shapes of `params`.
    fn loss_and_grad(
        &self,
        params: &ParamSet,
        x: ArrayView2<f32>,
        y: &[usize],
    ) -> Result<(f32, GradSet)>;

    /// Scores a batch without computing gradients.
    ///
    /// # Returns
    /// A tuple with the summed (not averaged) loss and the amount of correct predictions.
    fn evaluate_batch(
        &self,
        params: &ParamSet,
        x: ArrayView2<f32>,
        y: &[usize],
    ) -> Result<(f32, usize)>;
}

/// Looks up the tensor at `key` and checks its shape.
pub(super) fn tensor<'a>(
    params: &'a ParamSet,
    key: &str,
    shape: &[usize],
) -> Result<ArrayViewD<'a, f32>> {
    let tensor = params
        .get(key)
        .ok_or_else(|| FedErr::shape_mismatch(key, "missing parameter"))?;

    if tensor.shape() != shape {
        return Err(FedErr::shape_mismatch(
            key,
            format!("expected {shape:?}, got {:?}", tensor.shape()),
        ));
    }

    Ok(tensor.view())
}

pub(super) fn matrix<'a>(
    params: &'a ParamSet,
    key: &str,
    shape: [usize; 2],
) -> Result<ArrayView2<'a, f32>> {
    fixed::<Ix2>(key, tensor(params, key, &shape)?)
}

pub(super) fn vector<'a>(
    params: &'a ParamSet,
    key: &str,
    len: usize,
) -> Result<ArrayView1<'a, f32>> {
    fixed::<Ix1>(key, tensor(params, key, &[len])?)
}

fn fixed<'a, D: Dimension>(
    key: &str,
    view: ArrayViewD<'a, f32>,
) -> Result<ArrayView<'a, f32, D>> {
    view.into_dimensionality::<D>()
        .map_err(|e| FedErr::shape_mismatch(key, e.to_string()))
}

/// Checks that a batch is not empty and that its features and labels agree.
pub(super) fn check_batch(x: &ArrayView2<f32>, y: &[usize], features: usize) -> Result<()> {
    if y.is_empty() {
        return Err(FedErr::EmptyInput { what: "batch" });
    }

    if x.nrows() != y.len() || x.ncols() != features {
        return Err(FedErr::shape_mismatch(
            "batch",
            format!(
                "expected {} rows of {features} features, got {:?}",
                y.len(),
                x.shape()
            ),
        ));
    }

    Ok(())
}
