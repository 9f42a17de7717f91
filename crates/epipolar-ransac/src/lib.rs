#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # RANSAC
//!
//! A sample/fit/score/consensus loop over any model type. A problem owns the data
//! and knows how to fit a model from a minimal sample; a model knows how to score a
//! single data point. The engine only draws samples and keeps the best candidate.
//!
//! ```rust
//! use epipolar_ransac::{Ransac, RansacModel, RansacOptions, RansacProblem, ShuffledDataset};
//! use rand::Rng;
//!
//! // A constant model fitted from a single sample.
//! struct Constant {
//!     value: f64,
//!     error: f64,
//! }
//!
//! impl RansacModel for Constant {
//!     type Datum = f64;
//!
//!     fn error(&self) -> f64 {
//!         self.error
//!     }
//!
//!     fn is_good_fit(&mut self, datum: &f64, error_tolerance: f64) -> bool {
//!         self.error = (datum - self.value).powi(2);
//!         self.error < error_tolerance
//!     }
//! }
//!
//! struct ConstantProblem(ShuffledDataset<f64>);
//!
//! impl RansacProblem for ConstantProblem {
//!     type Datum = f64;
//!     type Model = Constant;
//!
//!     fn shuffle_data<R: Rng + ?Sized>(&mut self, rng: &mut R) {
//!         self.0.shuffle(rng);
//!     }
//!
//!     fn sample_data(&self) -> &[f64] {
//!         self.0.sample()
//!     }
//!
//!     fn remaining_data(&self) -> &[f64] {
//!         self.0.remaining()
//!     }
//!
//!     fn fit_model(&self, sample: &[f64]) -> Option<Constant> {
//!         sample.first().map(|&value| Constant { value, error: 0.0 })
//!     }
//! }
//!
//! let mut data = vec![2.0; 10];
//! data.extend([40.0, -7.0, 13.0]);
//! let mut problem = ConstantProblem(ShuffledDataset::new(data, 1));
//!
//! let options = RansacOptions {
//!     iterations: 50,
//!     acceptable_error: 1e-6,
//!     minimum_num_inliers: 5,
//!     random_seed: Some(7),
//!     ..Default::default()
//! };
//! let result = Ransac::new(options)?.run(&mut problem)?;
//! assert_eq!(result.model.value, 2.0);
//! assert_eq!(result.num_inliers, 9);
//! # Ok::<(), epipolar_ransac::RansacError>(())
//! ```

/// Permutation-based split of a dataset into a minimal sample and its complement.
pub mod dataset;

/// Capabilities a model and a problem must provide to the engine.
pub mod problem;

/// The consensus loop.
pub mod ransac;

pub use dataset::ShuffledDataset;
pub use problem::{RansacModel, RansacProblem};
pub use ransac::{required_iterations, Ransac, RansacError, RansacOptions, RansacResult};
