//! Combination of client contributions into a single set.
//!
//! Both averages sum the contributions in the order they are given, so callers that want a
//! result independent of arrival order must sort their inputs first (the server orders them by
//! client id). Floating point addition is not associative, so two different orders can differ
//! in the last bits of the result.

use crate::{FedErr, GradSet, ParamSet, Result};

/// Averages a sequence of parameter sets element-wise.
///
/// # Arguments
/// * `sets` - The parameter sets to average, all with identical keys and shapes.
///
/// # Returns
/// The element-wise arithmetic mean, `EmptyInput` if `sets` is empty or `ShapeMismatch` if any
/// of the sets disagrees with the first one.
pub fn average_parameters(sets: &[ParamSet]) -> Result<ParamSet> {
    average(sets, "average_parameters received no parameter sets")
}

/// Averages a sequence of gradient sets element-wise.
///
/// Same contract as [`average_parameters`].
pub fn average_gradients(sets: &[GradSet]) -> Result<GradSet> {
    average(sets, "average_gradients received no gradient sets")
}

fn average(sets: &[ParamSet], what: &'static str) -> Result<ParamSet> {
    let Some((first, rest)) = sets.split_first() else {
        return Err(FedErr::EmptyInput { what });
    };

    for set in rest {
        first.check_compatible(set)?;
    }

    let mut sum = first.clone();
    for set in rest {
        sum.scaled_add(1.0, set)?;
    }

    let n = sets.len() as f32;
    for (_, tensor) in sum.iter_mut() {
        tensor.mapv_inplace(|v| v / n);
    }

    Ok(sum)
}

#[cfg(test)]
mod tests {
    use ndarray::{ArrayD, array};

    use super::*;

    fn w(values: ArrayD<f32>) -> ParamSet {
        ParamSet::new().with("w", values)
    }

    #[test]
    fn two_sets_average_elementwise() {
        let sets = [w(array![1.0, 2.0].into_dyn()), w(array![3.0, 4.0].into_dyn())];
        let avg = average_parameters(&sets).unwrap();
        assert_eq!(avg, w(array![2.0, 3.0].into_dyn()));
    }

    #[test]
    fn three_sets_with_several_tensors() {
        let set = |a: f32, b: f32| {
            ParamSet::new()
                .with("weight", array![[a, a], [a, a]].into_dyn())
                .with("bias", array![b].into_dyn())
        };

        let sets = [set(1.0, -3.0), set(2.0, 0.0), set(6.0, 6.0)];
        let avg = average_parameters(&sets).unwrap();

        assert_eq!(avg.get("weight").unwrap(), &array![[3.0, 3.0], [3.0, 3.0]].into_dyn());
        assert_eq!(avg.get("bias").unwrap(), &array![1.0].into_dyn());
    }

    #[test]
    fn a_single_set_is_its_own_average() {
        let sets = [w(array![0.5, -0.25].into_dyn())];
        assert_eq!(average_gradients(&sets).unwrap(), sets[0]);
    }

    #[test]
    fn empty_input_fails() {
        assert!(matches!(average_parameters(&[]), Err(FedErr::EmptyInput { .. })));
        assert!(matches!(average_gradients(&[]), Err(FedErr::EmptyInput { .. })));
    }

    #[test]
    fn mismatched_keys_fail() {
        let sets = [
            w(array![1.0].into_dyn()),
            ParamSet::new().with("v", array![1.0].into_dyn()),
        ];

        assert!(matches!(average_parameters(&sets), Err(FedErr::ShapeMismatch { .. })));
        assert!(matches!(average_gradients(&sets), Err(FedErr::ShapeMismatch { .. })));
    }

    #[test]
    fn mismatched_shapes_fail_instead_of_broadcasting() {
        let sets = [w(array![1.0, 2.0].into_dyn()), w(array![1.0].into_dyn())];
        assert!(matches!(average_parameters(&sets), Err(FedErr::ShapeMismatch { .. })));
    }
}
