use std::num::NonZeroUsize;

use ndarray::{Array2, ArrayView2, Axis, s};

use crate::{FedErr, Result};

/// An in-memory labeled dataset: one row of features per sample and a class label per row.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    x: Array2<f32>,
    y: Vec<usize>,
    classes: usize,
}

/// An owned batch of samples, gathered from a dataset in an arbitrary order.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub x: Array2<f32>,
    pub y: Vec<usize>,
}

impl Batch {
    #[inline]
    pub fn len(&self) -> usize {
        self.y.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }
}

impl Dataset {
    /// Creates a new `Dataset`.
    ///
    /// # Arguments
    /// * `x` - The features, one row per sample.
    /// * `y` - The labels, one per row of `x`.
    /// * `classes` - The amount of classes, every label must be lower than it.
    ///
    /// # Returns
    /// A new `Dataset` or an `InvalidDataset` error if the inputs are inconsistent.
    pub fn new(x: Array2<f32>, y: Vec<usize>, classes: usize) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(FedErr::InvalidDataset(format!(
                "got {} feature rows but {} labels",
                x.nrows(),
                y.len()
            )));
        }

        if classes == 0 {
            return Err(FedErr::InvalidDataset("a dataset needs at least one class".into()));
        }

        if let Some(&label) = y.iter().find(|&&label| label >= classes) {
            return Err(FedErr::InvalidDataset(format!(
                "label {label} is out of range for {classes} classes"
            )));
        }

        Ok(Self { x, y, classes })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.y.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    #[inline]
    pub fn features(&self) -> usize {
        self.x.ncols()
    }

    #[inline]
    pub fn classes(&self) -> usize {
        self.classes
    }

    pub fn x(&self) -> ArrayView2<'_, f32> {
        self.x.view()
    }

    pub fn y(&self) -> &[usize] {
        &self.y
    }

    /// Builds a new dataset holding the rows at `indices`, in that order.
    pub fn subset(&self, indices: &[usize]) -> Dataset {
        let Batch { x, y } = self.gather(indices);
        Self {
            x,
            y,
            classes: self.classes,
        }
    }

    /// Iterates the dataset in batches following `order`, the last batch may be shorter.
    ///
    /// # Arguments
    /// * `order` - The indices of the samples, usually a permutation of `0..len`.
    /// * `batch_size` - The maximum amount of samples per batch.
    pub fn batches<'a>(
        &'a self,
        order: &'a [usize],
        batch_size: NonZeroUsize,
    ) -> impl Iterator<Item = Batch> + 'a {
        order
            .chunks(batch_size.get())
            .map(move |indices| self.gather(indices))
    }

    /// Iterates the dataset in its stored order, borrowing each batch.
    pub fn chunks(
        &self,
        batch_size: NonZeroUsize,
    ) -> impl Iterator<Item = (ArrayView2<'_, f32>, &[usize])> {
        let size = batch_size.get();

        (0..self.len()).step_by(size).map(move |start| {
            let end = (start + size).min(self.len());
            (self.x.slice(s![start..end, ..]), &self.y[start..end])
        })
    }

    fn gather(&self, indices: &[usize]) -> Batch {
        Batch {
            x: self.x.select(Axis(0), indices),
            y: indices.iter().map(|&i| self.y[i]).collect(),
        }
    }
}
