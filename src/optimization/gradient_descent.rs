use crate::{GradSet, ParamSet, Result};

/// Gradient descent, optionally with heavy-ball momentum.
///
/// This is the *plain step* every local algorithm starts from. The velocity buffer is owned by
/// the optimizer, so a client that keeps its optimizer across rounds also keeps its momentum.
#[derive(Debug, Clone)]
pub struct GradientDescent {
    learning_rate: f32,
    momentum: f32,
    velocity: Option<GradSet>,
}

impl GradientDescent {
    /// Creates a new `GradientDescent` optimizer.
    ///
    /// # Arguments
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `momentum` - The decay of the velocity buffer, `0.0` disables it.
    ///
    /// # Returns
    /// A new `GradientDescent` instance.
    pub fn new(learning_rate: f32, momentum: f32) -> Self {
        Self {
            learning_rate,
            momentum,
            velocity: None,
        }
    }

    #[inline]
    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    /// The current velocity buffer, `None` until the first momentum step.
    pub fn velocity(&self) -> Option<&GradSet> {
        self.velocity.as_ref()
    }

    /// Updates the parameters making a step in the opposite direction of the gradient.
    ///
    /// # Arguments
    /// * `params` - The parameters that are going to be modified.
    /// * `grad` - The gradient used for taking the step.
    ///
    /// # Returns
    /// A `ShapeMismatch` error if `grad` doesn't match `params`.
    pub fn update_params(&mut self, params: &mut ParamSet, grad: &GradSet) -> Result<()> {
        let lr = self.learning_rate;

        if self.momentum == 0.0 {
            return params.scaled_add(-lr, grad);
        }

        params.check_compatible(grad)?;

        let mu = self.momentum;
        let velocity = self.velocity.get_or_insert_with(|| grad.zeros_like());
        velocity.check_compatible(grad)?;

        for (key, v) in velocity.iter_mut() {
            let Some(g) = grad.get(key) else { continue };
            v.zip_mut_with(g, |v, &g| *v = (mu * *v) + g);
        }

        params.scaled_add(-lr, velocity)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn scalar(v: f32) -> ParamSet {
        ParamSet::new().with("w", array![v].into_dyn())
    }

    fn value(set: &ParamSet) -> f32 {
        set.get("w").unwrap().iter().next().copied().unwrap()
    }

    #[test]
    fn plain_step() {
        let mut gd = GradientDescent::new(0.1, 0.0);
        let mut params = scalar(1.0);

        gd.update_params(&mut params, &scalar(2.0)).unwrap();

        assert!((value(&params) - 0.8).abs() < 1e-6);
        assert!(gd.velocity().is_none());
    }

    #[test]
    fn momentum_accumulates_across_steps() {
        let mut gd = GradientDescent::new(0.1, 0.5);
        let mut params = scalar(0.0);
        let grad = scalar(1.0);

        // v = 1.0, p = -0.1
        gd.update_params(&mut params, &grad).unwrap();
        // v = 1.5, p = -0.25
        gd.update_params(&mut params, &grad).unwrap();

        assert!((value(&params) + 0.25).abs() < 1e-6);
        assert!((value(gd.velocity().unwrap()) - 1.5).abs() < 1e-6);
    }

    #[test]
    fn mismatched_gradient_is_rejected() {
        let mut gd = GradientDescent::new(0.1, 0.9);
        let mut params = scalar(1.0);
        let grad = ParamSet::new().with("v", array![1.0].into_dyn());

        assert!(gd.update_params(&mut params, &grad).is_err());
        assert_eq!(params, scalar(1.0));
    }
}
