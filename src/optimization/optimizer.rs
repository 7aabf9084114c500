use log::debug;

use super::{FedDane, FedProx, FedSgd, GradientDescent};
use crate::{Algorithm, FedConfig, GradSet, ParamSet, Result};

/// Everything an optimizer step may consume.
///
/// Each variant of [`FedOptimizer`] reads only the fields its update rule needs:
///
/// | variant | `grad` | `global_params` | `global_grads` |
/// |---------|--------|-----------------|----------------|
/// | FedAvg  | yes    |                 |                |
/// | FedProx | yes    | optional        |                |
/// | FedDANE | yes    | optional        | optional       |
/// | FedSGD  |        |                 | optional       |
#[derive(Debug, Clone, Copy)]
pub struct StepRequest<'a> {
    pub grad: &'a GradSet,
    pub global_params: Option<&'a ParamSet>,
    pub global_grads: Option<&'a GradSet>,
}

impl<'a> StepRequest<'a> {
    /// Creates a request carrying only the local gradient.
    pub fn new(grad: &'a GradSet) -> Self {
        Self {
            grad,
            global_params: None,
            global_grads: None,
        }
    }

    pub fn with_global_params(mut self, global_params: Option<&'a ParamSet>) -> Self {
        self.global_params = global_params;
        self
    }

    pub fn with_global_grads(mut self, global_grads: Option<&'a GradSet>) -> Self {
        self.global_grads = global_grads;
        self
    }
}

/// The per-client optimizer, one variant per federated algorithm.
#[derive(Debug, Clone)]
pub enum FedOptimizer {
    FedAvg(GradientDescent),
    FedProx(FedProx),
    FedDane(FedDane),
    FedSgd(FedSgd),
}

impl FedOptimizer {
    /// Creates the optimizer matching `algorithm`.
    ///
    /// # Arguments
    /// * `algorithm` - The federated algorithm.
    /// * `learning_rate` - The local learning rate.
    /// * `mu` - The proximal coefficient, ignored by FedAvg and FedSGD.
    /// * `momentum` - The plain step's momentum, ignored by FedSGD.
    ///
    /// # Returns
    /// A new `FedOptimizer` with empty internal state.
    pub fn new(algorithm: Algorithm, learning_rate: f32, mu: f32, momentum: f32) -> Self {
        let descent = || GradientDescent::new(learning_rate, momentum);

        match algorithm {
            Algorithm::FedAvg => Self::FedAvg(descent()),
            Algorithm::FedProx => Self::FedProx(FedProx::new(descent(), mu)),
            Algorithm::FedDane => Self::FedDane(FedDane::new(descent(), mu)),
            Algorithm::FedSgd => Self::FedSgd(FedSgd::new(learning_rate)),
        }
    }

    /// Creates the optimizer described by a validated configuration.
    pub fn from_config(config: &FedConfig) -> Self {
        Self::new(config.algorithm, config.lr, config.mu, config.momentum)
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            Self::FedAvg(_) => Algorithm::FedAvg,
            Self::FedProx(_) => Algorithm::FedProx,
            Self::FedDane(_) => Algorithm::FedDane,
            Self::FedSgd(_) => Algorithm::FedSgd,
        }
    }

    /// Updates `params` according to the variant's rule.
    ///
    /// # Arguments
    /// * `params` - The parameters to update.
    /// * `request` - The local gradient and the optional global state.
    ///
    /// # Returns
    /// A `ShapeMismatch` error if any consumed input disagrees with `params`.
    pub fn step(&mut self, params: &mut ParamSet, request: StepRequest<'_>) -> Result<()> {
        let StepRequest {
            grad,
            global_params,
            global_grads,
        } = request;

        match self {
            Self::FedAvg(descent) => descent.update_params(params, grad),
            Self::FedProx(prox) => {
                if global_params.is_none() {
                    debug!("fedprox step without global parameters, skipping the proximal term");
                }
                prox.step(params, grad, global_params)
            }
            Self::FedDane(dane) => {
                if global_params.is_none() || global_grads.is_none() {
                    debug!("feddane step without global state, skipping the correction");
                }
                dane.step(params, grad, global_params, global_grads)
            }
            Self::FedSgd(sgd) => sgd.step(params, global_grads),
        }
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
    fn variants_match_their_algorithm() {
        for algorithm in Algorithm::ALL {
            let opt = FedOptimizer::new(algorithm, 0.1, 0.1, 0.0);
            assert_eq!(opt.algorithm(), algorithm);
        }
    }

    #[test]
    fn fedavg_step() {
        let mut opt = FedOptimizer::new(Algorithm::FedAvg, 0.1, 0.1, 0.0);
        let mut params = scalar(1.0);
        let grad = scalar(2.0);

        // global inputs are ignored by fedavg
        let global = scalar(100.0);
        let request = StepRequest::new(&grad)
            .with_global_params(Some(&global))
            .with_global_grads(Some(&global));
        opt.step(&mut params, request).unwrap();

        assert!((value(&params) - 0.8).abs() < 1e-6);
    }

    #[test]
    fn fedprox_step() {
        let mut opt = FedOptimizer::new(Algorithm::FedProx, 0.1, 0.1, 0.0);
        let mut params = scalar(1.0);
        let grad = scalar(2.0);
        let global = scalar(0.5);

        let request = StepRequest::new(&grad).with_global_params(Some(&global));
        opt.step(&mut params, request).unwrap();

        assert!((value(&params) - 0.797).abs() < 1e-6);
    }

    #[test]
    fn fedsgd_ignores_the_local_gradient() {
        let mut opt = FedOptimizer::new(Algorithm::FedSgd, 0.1, 0.1, 0.0);
        let mut params = scalar(1.0);
        let grad = scalar(1000.0);

        opt.step(&mut params, StepRequest::new(&grad)).unwrap();
        assert_eq!(value(&params).to_bits(), 1.0f32.to_bits());

        let global_grads = scalar(2.0);
        let request = StepRequest::new(&grad).with_global_grads(Some(&global_grads));
        opt.step(&mut params, request).unwrap();
        assert!((value(&params) - 0.8).abs() < 1e-6);
    }
}
