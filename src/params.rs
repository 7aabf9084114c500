use std::collections::{BTreeMap, btree_map};

use ndarray::{ArrayD, Zip};
use serde::{Deserialize, Serialize};

use crate::{FedErr, Result};

/// A named set of tensors: the parameters of a model.
///
/// Keys are kept ordered so that every traversal (aggregation, serialization, logging) visits
/// the tensors in the same order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamSet {
    tensors: BTreeMap<String, ArrayD<f32>>,
}

/// Gradients share the representation of the parameters they were computed for.
pub type GradSet = ParamSet;

impl ParamSet {
    /// Creates a new empty `ParamSet`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a tensor under `key`, returning the one it replaced.
    pub fn insert<K: Into<String>>(&mut self, key: K, tensor: ArrayD<f32>) -> Option<ArrayD<f32>> {
        self.tensors.insert(key.into(), tensor)
    }

    /// Builder flavoured `insert`.
    pub fn with<K: Into<String>>(mut self, key: K, tensor: ArrayD<f32>) -> Self {
        self.insert(key, tensor);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ArrayD<f32>> {
        self.tensors.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut ArrayD<f32>> {
        self.tensors.get_mut(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.tensors.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, ArrayD<f32>> {
        self.tensors.iter()
    }

    pub fn iter_mut(&mut self) -> btree_map::IterMut<'_, String, ArrayD<f32>> {
        self.tensors.iter_mut()
    }

    /// The total amount of scalars held across every tensor.
    pub fn num_elements(&self) -> usize {
        self.tensors.values().map(ArrayD::len).sum()
    }

    /// Returns a set with the same keys and shapes but every value set to zero.
    pub fn zeros_like(&self) -> Self {
        self.tensors
            .iter()
            .map(|(k, t)| (k.clone(), ArrayD::zeros(t.raw_dim())))
            .collect()
    }

    /// Checks that `other` has exactly the same keys as `self` and that every pair of tensors
    /// has the same shape.
    ///
    /// # Arguments
    /// * `other` - The set to compare against.
    ///
    /// # Returns
    /// A `ShapeMismatch` error naming the first offending key.
    pub fn check_compatible(&self, other: &ParamSet) -> Result<()> {
        if let Some(key) = other.keys().find(|k| !self.tensors.contains_key(*k)) {
            return Err(FedErr::shape_mismatch(key, "unexpected parameter"));
        }

        for (key, tensor) in &self.tensors {
            let Some(theirs) = other.get(key) else {
                return Err(FedErr::shape_mismatch(key.as_str(), "missing parameter"));
            };

            if tensor.shape() != theirs.shape() {
                return Err(FedErr::shape_mismatch(
                    key.as_str(),
                    format!("expected {:?}, got {:?}", tensor.shape(), theirs.shape()),
                ));
            }
        }

        Ok(())
    }

    /// Computes `self += alpha * other` element-wise.
    ///
    /// # Arguments
    /// * `alpha` - The scale applied to `other`.
    /// * `other` - A set compatible with `self`.
    ///
    /// # Returns
    /// A `ShapeMismatch` error if the sets are not compatible, in which case `self` is untouched.
    pub fn scaled_add(&mut self, alpha: f32, other: &ParamSet) -> Result<()> {
        self.check_compatible(other)?;

        for (key, tensor) in self.tensors.iter_mut() {
            let theirs = &other.tensors[key];
            Zip::from(tensor).and(theirs).for_each(|t, &o| *t += alpha * o);
        }

        Ok(())
    }

    /// Whether every value of every tensor is finite.
    pub fn is_finite(&self) -> bool {
        self.tensors
            .values()
            .all(|t| t.iter().all(|v| v.is_finite()))
    }
}

impl<K: Into<String>> FromIterator<(K, ArrayD<f32>)> for ParamSet {
    fn from_iter<I: IntoIterator<Item = (K, ArrayD<f32>)>>(iter: I) -> Self {
        Self {
            tensors: iter.into_iter().map(|(k, t)| (k.into(), t)).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ParamSet {
    type Item = (&'a String, &'a ArrayD<f32>);
    type IntoIter = btree_map::Iter<'a, String, ArrayD<f32>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
