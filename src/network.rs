//! feed-forward risk network - the "deep" part of DeepSurv.
//!
//! architecture follows the original paper's example network: an input-wide
//! relu layer, two hidden relu layers, and a single linear output unit whose
//! kernel carries an L2 penalty. dropout sits after every relu layer during
//! training and disappears at inference.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::error::{DeepSurvError, Result};

/// network hyperparameters, builder style
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    hidden_units: usize, // width of the two hidden layers
    dropout: f64,        // drop probability after each relu layer
    l2_penalty: f64,     // on the output kernel only
    seed: u64,           // weight init + dropout masks
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            hidden_units: 48,
            dropout: 0.0,
            l2_penalty: 0.0,
            seed: 42,
        }
    }
}

impl NetworkConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// width of the two hidden layers
    pub fn with_hidden_units(mut self, units: usize) -> Self {
        self.hidden_units = units;
        self
    }

    /// drop probability in [0, 1)
    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout;
        self
    }

    /// L2 penalty on the output kernel
    pub fn with_l2_penalty(mut self, penalty: f64) -> Self {
        self.l2_penalty = penalty.max(0.0);
        self
    }

    /// rng seed for reproducible init and dropout
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// build the network with glorot-uniform weights and zero biases
    pub fn build(self, n_features: usize) -> Result<RiskNetwork> {
        if n_features == 0 {
            return Err(DeepSurvError::invalid_parameter("n_features", "0"));
        }
        if self.hidden_units == 0 {
            return Err(DeepSurvError::invalid_parameter("hidden_units", "0"));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(DeepSurvError::invalid_parameter(
                "dropout",
                self.dropout.to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let sizes = [
            (n_features, n_features),
            (n_features, self.hidden_units),
            (self.hidden_units, self.hidden_units),
            (self.hidden_units, 1),
        ];

        let layers = sizes
            .iter()
            .map(|&(fan_in, fan_out)| DenseLayer::glorot(fan_in, fan_out, &mut rng))
            .collect();

        Ok(RiskNetwork {
            layers,
            dropout: self.dropout,
            l2_penalty: self.l2_penalty,
            rng,
        })
    }
}

#[derive(Debug, Clone)]
struct DenseLayer {
    weights: Array2<f64>, // (fan_in, fan_out)
    biases: Array1<f64>,  // (fan_out,)
}

impl DenseLayer {
    fn glorot(fan_in: usize, fan_out: usize, rng: &mut StdRng) -> Self {
        let limit = (6.0 / (fan_in + fan_out) as f64).sqrt();
        Self {
            weights: Array2::from_shape_fn((fan_in, fan_out), |_| rng.gen_range(-limit..limit)),
            biases: Array1::zeros(fan_out),
        }
    }
}

/// per-tensor gradients, index-aligned with the network's layers
#[derive(Debug, Clone)]
pub struct Gradients {
    pub(crate) weights: Vec<Array2<f64>>,
    pub(crate) biases: Vec<Array1<f64>>,
}

/// intermediate activations kept around for the backward pass
pub struct ForwardCache {
    inputs: Vec<Array2<f64>>,       // input to each layer, post-dropout
    pre_activations: Vec<Array2<f64>>, // z values, for the relu derivative
    masks: Vec<Option<Array2<f64>>>,   // inverted dropout masks (relu layers only)
}

/// a snapshot of all weights/biases, used for best-loss checkpointing
#[derive(Debug, Clone)]
pub struct WeightSnapshot {
    weights: Vec<Array2<f64>>,
    biases: Vec<Array1<f64>>,
}

/// DeepSurv risk network: covariates in, scalar risk score out
#[derive(Debug, Clone)]
pub struct RiskNetwork {
    layers: Vec<DenseLayer>,
    dropout: f64,
    l2_penalty: f64,
    rng: StdRng,
}

impl RiskNetwork {
    /// how many input features the network expects
    pub fn n_features(&self) -> usize {
        self.layers[0].weights.nrows()
    }

    /// number of dense layers (always 4 for this architecture)
    pub fn n_layers(&self) -> usize {
        self.layers.len()
    }

    pub(crate) fn layer_shape(&self, i: usize) -> (usize, usize) {
        self.layers[i].weights.dim()
    }

    pub(crate) fn layer_arrays(&self, i: usize) -> (ArrayView2<'_, f64>, ArrayView1<'_, f64>) {
        (self.layers[i].weights.view(), self.layers[i].biases.view())
    }

    /// inference risk scores - dropout off
    pub fn predict(&self, covariates: ArrayView2<f64>) -> Result<Array1<f64>> {
        self.check_features(covariates)?;

        let mut activation = covariates.to_owned();
        let last = self.layers.len() - 1;
        for (i, layer) in self.layers.iter().enumerate() {
            let z = activation.dot(&layer.weights) + &layer.biases;
            activation = if i < last { z.mapv(relu) } else { z };
        }

        Ok(activation.index_axis(Axis(1), 0).to_owned())
    }

    /// training-mode forward pass with inverted dropout, caching everything
    /// the backward pass needs. returns (risk scores, cache).
    pub fn forward_train(
        &mut self,
        covariates: ArrayView2<f64>,
    ) -> Result<(Array1<f64>, ForwardCache)> {
        self.check_features(covariates)?;

        let last = self.layers.len() - 1;
        let mut cache = ForwardCache {
            inputs: Vec::with_capacity(self.layers.len()),
            pre_activations: Vec::with_capacity(self.layers.len()),
            masks: Vec::with_capacity(self.layers.len()),
        };

        let mut activation = covariates.to_owned();
        for i in 0..self.layers.len() {
            cache.inputs.push(activation.clone());
            let z = activation.dot(&self.layers[i].weights) + &self.layers[i].biases;
            cache.pre_activations.push(z.clone());

            if i < last {
                let mut a = z.mapv(relu);
                cache.masks.push(self.sample_dropout_mask(a.dim()));
                if let Some(mask) = cache.masks[i].as_ref() {
                    a *= mask;
                }
                activation = a;
            } else {
                cache.masks.push(None);
                activation = z;
            }
        }

        Ok((activation.index_axis(Axis(1), 0).to_owned(), cache))
    }

    /// backprop from d loss / d score down to every weight and bias.
    /// the output kernel's L2 term is folded in here.
    pub fn backward(&self, cache: &ForwardCache, score_grad: ArrayView1<f64>) -> Gradients {
        let last = self.layers.len() - 1;

        let mut weight_grads = vec![Array2::zeros((0, 0)); self.layers.len()];
        let mut bias_grads = vec![Array1::zeros(0); self.layers.len()];

        // delta at the linear output unit, as a column
        let mut delta = score_grad.to_owned().insert_axis(Axis(1));

        for i in (0..self.layers.len()).rev() {
            let mut dw = cache.inputs[i].t().dot(&delta);
            if i == last && self.l2_penalty > 0.0 {
                dw += &(2.0 * self.l2_penalty * &self.layers[i].weights);
            }
            weight_grads[i] = dw;
            bias_grads[i] = delta.sum_axis(Axis(0));

            if i > 0 {
                let mut upstream = delta.dot(&self.layers[i].weights.t());
                if let Some(mask) = cache.masks[i - 1].as_ref() {
                    upstream *= mask;
                }
                let relu_gate = cache.pre_activations[i - 1].mapv(|z| if z > 0.0 { 1.0 } else { 0.0 });
                delta = upstream * relu_gate;
            }
        }

        Gradients {
            weights: weight_grads,
            biases: bias_grads,
        }
    }

    /// L2 penalty contribution of the output kernel to the training loss
    pub fn l2_penalty_term(&self) -> f64 {
        let last = self.layers.len() - 1;
        self.l2_penalty * self.layers[last].weights.mapv(|w| w * w).sum()
    }

    pub(crate) fn apply_update(&mut self, i: usize, dw: &Array2<f64>, db: &Array1<f64>) {
        self.layers[i].weights += dw;
        self.layers[i].biases += db;
    }

    /// clone out all weights/biases
    pub fn snapshot(&self) -> WeightSnapshot {
        WeightSnapshot {
            weights: self.layers.iter().map(|l| l.weights.clone()).collect(),
            biases: self.layers.iter().map(|l| l.biases.clone()).collect(),
        }
    }

    /// restore a snapshot - shapes must match this network's architecture
    pub fn restore(&mut self, snapshot: &WeightSnapshot) -> Result<()> {
        if snapshot.weights.len() != self.layers.len() {
            return Err(DeepSurvError::invalid_dimensions(
                "snapshot layer count mismatch",
            ));
        }
        for (i, layer) in self.layers.iter().enumerate() {
            if snapshot.weights[i].dim() != layer.weights.dim()
                || snapshot.biases[i].len() != layer.biases.len()
            {
                return Err(DeepSurvError::invalid_dimensions(format!(
                    "snapshot shape mismatch at layer {}",
                    i
                )));
            }
        }
        for (i, layer) in self.layers.iter_mut().enumerate() {
            layer.weights.assign(&snapshot.weights[i]);
            layer.biases.assign(&snapshot.biases[i]);
        }
        Ok(())
    }

    pub(crate) fn set_layer(&mut self, i: usize, weights: Array2<f64>, biases: Array1<f64>) -> Result<()> {
        if weights.dim() != self.layers[i].weights.dim()
            || biases.len() != self.layers[i].biases.len()
        {
            return Err(DeepSurvError::invalid_dimensions(format!(
                "layer {} shape mismatch: got {:?}/{}, expected {:?}/{}",
                i,
                weights.dim(),
                biases.len(),
                self.layers[i].weights.dim(),
                self.layers[i].biases.len()
            )));
        }
        self.layers[i].weights = weights;
        self.layers[i].biases = biases;
        Ok(())
    }

    fn sample_dropout_mask(&mut self, dim: (usize, usize)) -> Option<Array2<f64>> {
        if self.dropout == 0.0 {
            return None;
        }
        let keep = 1.0 - self.dropout;
        let rng = &mut self.rng;
        Some(Array2::from_shape_fn(dim, |_| {
            if rng.gen_bool(keep) {
                1.0 / keep
            } else {
                0.0
            }
        }))
    }

    fn check_features(&self, covariates: ArrayView2<f64>) -> Result<()> {
        if covariates.ncols() != self.n_features() {
            return Err(DeepSurvError::invalid_dimensions(format!(
                "feature count mismatch: expected {}, got {}",
                self.n_features(),
                covariates.ncols()
            )));
        }
        Ok(())
    }
}

fn relu(x: f64) -> f64 {
    x.max(0.0)
}
