use std::fs::File;
use std::path::Path;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use ndarray_npy::ReadNpyExt;
use rand::seq::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};

use crate::error::{DeepSurvError, Result};

/// survival data - times, events, and patient features
///
/// the three arrays stay index-aligned at all times: any reordering goes
/// through [`SurvivalData::sort_by_descending_time`], which applies one
/// permutation to all of them at once.
#[derive(Debug, Clone)]
pub struct SurvivalData {
    times: Array1<f64>,      // time to event/censoring
    events: Array1<bool>,    // true = event, false = censored
    covariates: Array2<f64>, // patient features (n_samples x n_features)
}

impl SurvivalData {
    /// make new survival data from raw vecs/arrays
    pub fn new(
        times: Vec<f64>,         // survival/censoring times
        events: Vec<bool>,       // true = event occurred, false = censored
        covariates: Array2<f64>, // patient features matrix
    ) -> Result<Self> {
        let n_samples = times.len();

        if events.len() != n_samples {
            return Err(DeepSurvError::invalid_dimensions(format!(
                "times len ({}) != events len ({})",
                n_samples,
                events.len()
            )));
        }

        if covariates.nrows() != n_samples {
            return Err(DeepSurvError::invalid_dimensions(format!(
                "covariates rows ({}) != n_samples ({})",
                covariates.nrows(),
                n_samples
            )));
        }

        if times.iter().any(|&t| t <= 0.0 || !t.is_finite()) {
            return Err(DeepSurvError::invalid_survival_data(
                "survival times must be positive & finite",
            ));
        }

        Ok(Self {
            times: Array1::from(times),
            events: Array1::from(events),
            covariates,
        })
    }

    /// load `x.npy` / `t.npy` / `e.npy` from a directory of pre-serialized
    /// numpy arrays. `e.npy` is read as floats and anything nonzero counts
    /// as an observed event.
    pub fn from_npy_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(DeepSurvError::MissingDataDir {
                path: dir.display().to_string(),
            });
        }

        let covariates = read_npy_2d(&dir.join("x.npy"))?;
        let times = read_npy_1d(&dir.join("t.npy"))?;
        let events = read_npy_1d(&dir.join("e.npy"))?;

        Self::new(
            times.to_vec(),
            events.iter().map(|&e| e != 0.0).collect(),
            covariates,
        )
    }

    /// how many patients
    pub fn n_samples(&self) -> usize {
        self.times.len()
    }

    /// how many features per patient
    pub fn n_features(&self) -> usize {
        self.covariates.ncols()
    }

    /// how many observed (uncensored) events
    pub fn n_events(&self) -> usize {
        self.events.iter().filter(|&&e| e).count()
    }

    /// survival/censoring times
    pub fn times(&self) -> ArrayView1<'_, f64> {
        self.times.view()
    }

    /// event indicators (true = event, false = censored)
    pub fn events(&self) -> &[bool] {
        self.events.as_slice().expect("events array is contiguous")
    }

    /// patient feature matrix
    pub fn covariates(&self) -> ArrayView2<'_, f64> {
        self.covariates.view()
    }

    /// reorder all three arrays by descending survival time (stable).
    ///
    /// the ranking loss walks a running sum over the batch, so the risk set
    /// of patient i must be exactly the prefix 0..=i. descending time order
    /// is what makes that true.
    pub fn sort_by_descending_time(&mut self) {
        let mut order: Vec<usize> = (0..self.n_samples()).collect();
        order.sort_by(|&a, &b| self.times[b].total_cmp(&self.times[a]));

        self.times = order.iter().map(|&i| self.times[i]).collect();
        self.events = order.iter().map(|&i| self.events[i]).collect();
        self.covariates = self.covariates.select(ndarray::Axis(0), &order);
    }

    /// true when times are non-increasing
    pub fn is_sorted_by_descending_time(&self) -> bool {
        self.times
            .as_slice()
            .map(|s| s.windows(2).all(|w| w[0] >= w[1]))
            .unwrap_or(false)
    }

    /// grab a subset of patients by indices
    pub fn subset(&self, indices: &[usize]) -> Result<Self> {
        if indices.iter().any(|&i| i >= self.n_samples()) {
            return Err(DeepSurvError::invalid_dimensions(
                "subset index out of bounds",
            ));
        }

        let times: Vec<f64> = indices.iter().map(|&i| self.times[i]).collect();
        let events: Vec<bool> = indices.iter().map(|&i| self.events[i]).collect();
        let covariates = self.covariates.select(ndarray::Axis(0), indices);

        Self::new(times, events, covariates)
    }

    /// deterministic shuffled split into (train, test)
    pub fn train_test_split(&self, test_fraction: f64, seed: u64) -> Result<(Self, Self)> {
        if !(0.0..1.0).contains(&test_fraction) || test_fraction == 0.0 {
            return Err(DeepSurvError::invalid_parameter(
                "test_fraction",
                test_fraction.to_string(),
            ));
        }

        let n = self.n_samples();
        let n_test = ((n as f64) * test_fraction).round() as usize;
        if n_test == 0 || n_test >= n {
            return Err(DeepSurvError::invalid_survival_data(
                "split would leave an empty partition",
            ));
        }

        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let test = self.subset(&indices[..n_test])?;
        let train = self.subset(&indices[n_test..])?;
        Ok((train, test))
    }

    /// standardize features (mean=0, std=1) in place, returning the
    /// training-set statistics so a test partition can reuse them
    pub fn standardize_covariates(&mut self) -> Result<(Array1<f64>, Array1<f64>)> {
        let means = self
            .covariates
            .mean_axis(ndarray::Axis(0))
            .ok_or_else(|| DeepSurvError::invalid_survival_data("empty covariate matrix"))?;
        let stds = self.covariates.std_axis(ndarray::Axis(0), 0.0);

        self.apply_standardization(means.view(), stds.view())?;
        Ok((means, stds))
    }

    /// z-score with externally supplied statistics - use the training-set
    /// means/stds here so no test information leaks into preprocessing
    pub fn apply_standardization(
        &mut self,
        means: ArrayView1<f64>,
        stds: ArrayView1<f64>,
    ) -> Result<()> {
        if means.len() != self.n_features() || stds.len() != self.n_features() {
            return Err(DeepSurvError::invalid_dimensions(
                "standardization stats length != n_features",
            ));
        }

        // reject before touching anything so a failed call leaves the
        // covariates exactly as they were
        for j in 0..self.n_features() {
            if stds[j] == 0.0 {
                return Err(DeepSurvError::numerical_error(format!(
                    "feature {} has zero variance - can't standardize",
                    j
                )));
            }
        }

        for j in 0..self.n_features() {
            for i in 0..self.n_samples() {
                self.covariates[[i, j]] = (self.covariates[[i, j]] - means[j]) / stds[j];
            }
        }

        Ok(())
    }
}

fn read_npy_1d(path: &Path) -> Result<Array1<f64>> {
    let file = File::open(path)?;
    Array1::<f64>::read_npy(file).map_err(|e| {
        DeepSurvError::invalid_survival_data(format!("failed to read {}: {e}", path.display()))
    })
}

fn read_npy_2d(path: &Path) -> Result<Array2<f64>> {
    let file = File::open(path)?;
    Array2::<f64>::read_npy(file).map_err(|e| {
        DeepSurvError::invalid_survival_data(format!("failed to read {}: {e}", path.display()))
    })
}
