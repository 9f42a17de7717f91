use rand::seq::SliceRandom;
use rand::Rng;

/// A dataset split into a minimal sample and the remaining data.
///
/// Both views are slices of one permutation, so sample and remainder are consistent
/// by construction. When the subsample size exceeds the dataset size the whole
/// dataset is the sample and nothing remains.
#[derive(Clone, Debug)]
pub struct ShuffledDataset<D> {
    data: Vec<D>,
    subsample_size: usize,
}

impl<D> ShuffledDataset<D> {
    /// Wrap a dataset. The initial permutation is the input order.
    pub fn new(data: Vec<D>, subsample_size: usize) -> Self {
        Self {
            data,
            subsample_size,
        }
    }

    /// Number of data points in the minimal sample, as configured.
    pub fn subsample_size(&self) -> usize {
        self.subsample_size
    }

    /// All data points in the current order.
    pub fn data(&self) -> &[D] {
        &self.data
    }

    /// Number of data points.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Randomly permute the dataset in place.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.data.shuffle(rng);
    }

    /// The first `subsample_size` elements of the current permutation.
    pub fn sample(&self) -> &[D] {
        &self.data[..self.split_index()]
    }

    /// All elements after the sample in the current permutation.
    pub fn remaining(&self) -> &[D] {
        &self.data[self.split_index()..]
    }

    /// Give back the data, in the current order.
    pub fn into_inner(self) -> Vec<D> {
        self.data
    }

    fn split_index(&self) -> usize {
        self.subsample_size.min(self.data.len())
    }
}
