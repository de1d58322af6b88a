//! # deepsurv
//!
//! deepsurv-style survival networks - a feed-forward net scored with the cox
//! negative log partial likelihood, evaluated with a concordance index
//!
//! ## what you get
//!
//! - survival data container that keeps times/events/features aligned
//! - the ranking loss (average negative log partial likelihood) + gradient
//! - a dropout MLP with glorot init and an L2-penalized output kernel
//! - full-batch Nadam training with terminate-on-NaN and best-loss weights
//! - `.npz` weight checkpoints readable from numpy
//! - concordance metrics (plain + Harrell tie handling)
//!
//! ## quick start
//!
//! ```rust
//! use deepsurv::{NetworkConfig, SurvivalData, TrainConfig};
//! use ndarray::Array2;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // setup some survival data
//! let times = vec![1.0, 2.5, 3.2, 4.1, 5.0, 6.3];
//! let events = vec![true, false, true, true, true, false];
//! let covariates = Array2::from_shape_vec((6, 2), vec![
//!     1.0, 0.5, // patient features
//!     2.0, 1.0,
//!     1.5, 0.0,
//!     3.0, 1.5,
//!     0.5, 2.0,
//!     2.5, 0.5,
//! ])?;
//! let mut data = SurvivalData::new(times, events, covariates)?;
//!
//! // the ranking loss needs descending time order
//! data.sort_by_descending_time();
//!
//! // small net, a few epochs
//! let mut network = NetworkConfig::new()
//!     .with_hidden_units(8)
//!     .with_dropout(0.1)
//!     .build(data.n_features())?;
//!
//! let config = TrainConfig::new().with_epochs(20).with_learning_rate(0.01);
//! let history = deepsurv::fit(&mut network, &data, &config)?;
//! assert!(history.best_loss.is_finite());
//!
//! // higher risk score should mean shorter survival
//! let risk_scores = network.predict(data.covariates())?;
//! let c_index = deepsurv::metrics::concordance_index(
//!     risk_scores.view(),
//!     data.times(),
//!     data.events(),
//! )?;
//! assert!((0.0..=1.0).contains(&c_index));
//! # Ok(())
//! # }
//! ```

pub mod checkpoint;
pub mod data;
pub mod error;
pub mod loss;
pub mod metrics;
pub mod network;
pub mod optimization;
pub mod train;

pub use data::SurvivalData;
pub use error::{DeepSurvError, Result};
pub use network::{NetworkConfig, RiskNetwork};
pub use optimization::TrainConfig;
pub use train::{fit, TrainingHistory};
