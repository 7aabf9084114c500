use ndarray::Zip;

use super::GradientDescent;
use crate::{GradSet, ParamSet, Result};

/// Gradient descent followed by a proximal pull toward the global parameters.
#[derive(Debug, Clone)]
pub struct FedProx {
    descent: GradientDescent,
    mu: f32,
}

impl FedProx {
    /// Creates a new `FedProx` optimizer.
    ///
    /// # Arguments
    /// * `descent` - The plain step taken before the proximal correction.
    /// * `mu` - The proximal coefficient.
    ///
    /// # Returns
    /// A new `FedProx` instance.
    pub fn new(descent: GradientDescent, mu: f32) -> Self {
        Self { descent, mu }
    }

    pub fn descent(&self) -> &GradientDescent {
        &self.descent
    }

    /// Takes the plain step and then `param -= mu * lr * (param - global_param)`.
    ///
    /// # Arguments
    /// * `params` - The local parameters.
    /// * `grad` - The local gradient.
    /// * `global` - The global parameters, the correction is skipped when absent.
    ///
    /// # Returns
    /// A `ShapeMismatch` error if any input disagrees with `params`, which are then untouched.
    pub fn step(
        &mut self,
        params: &mut ParamSet,
        grad: &GradSet,
        global: Option<&ParamSet>,
    ) -> Result<()> {
        if let Some(global) = global {
            params.check_compatible(global)?;
        }

        self.descent.update_params(params, grad)?;

        let Some(global) = global else {
            return Ok(());
        };

        let scale = self.mu * self.descent.learning_rate();

        for (key, p) in params.iter_mut() {
            let Some(g) = global.get(key) else { continue };
            Zip::from(p).and(g).for_each(|p, &g| *p -= scale * (*p - g));
        }

        Ok(())
    }
}
