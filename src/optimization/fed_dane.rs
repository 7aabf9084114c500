use ndarray::Zip;

use super::GradientDescent;
use crate::{GradSet, ParamSet, Result};

/// Gradient descent followed by a DANE correction: a second step along the local gradient
/// corrected by the global gradient snapshot and a proximal term.
#[derive(Debug, Clone)]
pub struct FedDane {
    descent: GradientDescent,
    mu: f32,
}

impl FedDane {
    /// Creates a new `FedDane` optimizer.
    ///
    /// # Arguments
    /// * `descent` - The plain step taken before the correction.
    /// * `mu` - The proximal coefficient.
    ///
    /// # Returns
    /// A new `FedDane` instance.
    pub fn new(descent: GradientDescent, mu: f32) -> Self {
        Self { descent, mu }
    }

    pub fn descent(&self) -> &GradientDescent {
        &self.descent
    }

    /// Takes the plain step and then, with
    /// `corrected = grad + global_grad + mu * (param - global_param)`,
    /// applies `param -= lr * corrected`.
    ///
    /// # Arguments
    /// * `params` - The local parameters.
    /// * `grad` - The local gradient.
    /// * `global` - The global parameters.
    /// * `global_grad` - The global gradient snapshot.
    ///
    /// The correction needs both global inputs and is skipped if either is absent. A
    /// `ShapeMismatch` is returned before `params` is touched.
    pub fn step(
        &mut self,
        params: &mut ParamSet,
        grad: &GradSet,
        global: Option<&ParamSet>,
        global_grad: Option<&GradSet>,
    ) -> Result<()> {
        if let (Some(global), Some(global_grad)) = (global, global_grad) {
            params.check_compatible(global)?;
            params.check_compatible(global_grad)?;
        }

        self.descent.update_params(params, grad)?;

        let (Some(global), Some(global_grad)) = (global, global_grad) else {
            return Ok(());
        };

        let lr = self.descent.learning_rate();
        let mu = self.mu;

        for (key, p) in params.iter_mut() {
            let (Some(d), Some(g), Some(gg)) =
                (grad.get(key), global.get(key), global_grad.get(key))
            else {
                continue;
            };

            Zip::from(p)
                .and(d)
                .and(g)
                .and(gg)
                .for_each(|p, &d, &g, &gg| *p -= lr * (d + gg + mu * (*p - g)));
        }

        Ok(())
    }
}
