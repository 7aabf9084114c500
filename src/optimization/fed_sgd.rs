use crate::{GradSet, ParamSet, Result};

/// Applies an externally supplied, already averaged, gradient. It never looks at the local
/// gradient.
#[derive(Debug, Clone)]
pub struct FedSgd {
    learning_rate: f32,
}

impl FedSgd {
    /// Creates a new `FedSgd` optimizer.
    ///
    /// # Arguments
    /// * `learning_rate` - The length of the step along the global gradient.
    ///
    /// # Returns
    /// A new `FedSgd` instance.
    pub fn new(learning_rate: f32) -> Self {
        Self { learning_rate }
    }

    /// Applies `param -= lr * global_grad`.
    ///
    /// # Arguments
    /// * `params` - The parameters to update.
    /// * `global_grad` - The averaged gradient, without it this is a no-op.
    pub fn step(&mut self, params: &mut ParamSet, global_grad: Option<&GradSet>) -> Result<()> {
        match global_grad {
            Some(global_grad) => params.scaled_add(-self.learning_rate, global_grad),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn applies_the_global_gradient() {
        let mut opt = FedSgd::new(0.5);
        let mut params = ParamSet::new().with("w", array![1.0, 1.0].into_dyn());
        let global_grad = ParamSet::new().with("w", array![2.0, -2.0].into_dyn());

        opt.step(&mut params, Some(&global_grad)).unwrap();

        assert_eq!(params.get("w").unwrap(), &array![0.0, 2.0].into_dyn());
    }

    #[test]
    fn without_global_gradient_is_bit_identical_no_op() {
        let mut opt = FedSgd::new(0.5);
        let before = ParamSet::new().with("w", array![0.1, f32::MIN_POSITIVE, -3.3].into_dyn());
        let mut params = before.clone();

        opt.step(&mut params, None).unwrap();

        let bits = |s: &ParamSet| -> Vec<u32> {
            s.get("w").unwrap().iter().map(|v| v.to_bits()).collect()
        };
        assert_eq!(bits(&params), bits(&before));
    }
}
