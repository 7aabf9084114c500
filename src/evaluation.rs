use std::num::NonZeroUsize;

use serde::Serialize;

use crate::{FedErr, ParamSet, Result, arch::Model, data::Dataset};

/// The score of a parameter set over a held-out dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Evaluation {
    /// Fraction of correct predictions, in `[0, 1]`.
    pub accuracy: f32,
    /// Mean loss per sample.
    pub loss: f32,
}

/// Scores `params` over `data` without modifying anything.
///
/// # Arguments
/// * `model` - The model the parameters belong to.
/// * `params` - The parameters to score.
/// * `data` - The held-out dataset.
/// * `batch_size` - The amount of samples scored at once.
///
/// # Returns
/// The accuracy and mean loss, or an `EmptyInput` error if `data` has no samples.
pub fn evaluate<M: Model>(
    model: &M,
    params: &ParamSet,
    data: &Dataset,
    batch_size: NonZeroUsize,
) -> Result<Evaluation> {
    if data.is_empty() {
        return Err(FedErr::EmptyInput {
            what: "evaluation data",
        });
    }

    let mut loss = 0.0;
    let mut correct = 0;

    for (x, y) in data.chunks(batch_size) {
        let (batch_loss, batch_correct) = model.evaluate_batch(params, x, y)?;
        loss += batch_loss;
        correct += batch_correct;
    }

    let total = data.len() as f32;
    Ok(Evaluation {
        accuracy: correct as f32 / total,
        loss: loss / total,
    })
}
