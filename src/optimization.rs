//! Nadam - Adam with Nesterov momentum, the optimizer the original DeepSurv
//! setup trains with. decoupled weight decay and per-element update clipping
//! keep the full-batch updates from blowing up.

use ndarray::{Array1, Array2};

use crate::error::{DeepSurvError, Result};
use crate::network::{Gradients, RiskNetwork};

/// training hyperparameters
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    pub weight_decay: f64, // decoupled, applied directly to the parameters
    pub beta1: f64,        // first moment decay
    pub beta2: f64,        // second moment decay
    pub epsilon: f64,      // numerical stability
    pub update_clip: f64,  // per-element clamp on each update
    /// when set, the best-loss weights are also written here as `best.npz`
    pub checkpoint_dir: Option<std::path::PathBuf>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 200,
            learning_rate: 1e-3,
            weight_decay: 0.0,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            update_clip: 1.0,
            checkpoint_dir: None,
        }
    }
}

impl TrainConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_weight_decay(mut self, decay: f64) -> Self {
        self.weight_decay = decay.max(0.0);
        self
    }

    pub fn with_checkpoint_dir(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.checkpoint_dir = Some(dir.into());
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.learning_rate <= 0.0 || !self.learning_rate.is_finite() {
            return Err(DeepSurvError::invalid_parameter(
                "learning_rate",
                self.learning_rate.to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.beta1) {
            return Err(DeepSurvError::invalid_parameter(
                "beta1",
                self.beta1.to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.beta2) {
            return Err(DeepSurvError::invalid_parameter(
                "beta2",
                self.beta2.to_string(),
            ));
        }
        Ok(())
    }
}

/// moment estimates for one parameter tensor pair (weights + biases)
#[derive(Debug, Clone)]
struct LayerMoments {
    m_weights: Array2<f64>,
    v_weights: Array2<f64>,
    m_biases: Array1<f64>,
    v_biases: Array1<f64>,
}

/// Nadam optimizer state across all network layers
#[derive(Debug, Clone)]
pub struct Nadam {
    learning_rate: f64,
    weight_decay: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    update_clip: f64,
    t: i32,
    moments: Option<Vec<LayerMoments>>,
}

impl Nadam {
    pub fn new(config: &TrainConfig) -> Self {
        Self {
            learning_rate: config.learning_rate,
            weight_decay: config.weight_decay,
            beta1: config.beta1,
            beta2: config.beta2,
            epsilon: config.epsilon,
            update_clip: config.update_clip,
            t: 0,
            moments: None,
        }
    }

    /// one Nadam step over every layer of the network
    pub fn step(&mut self, network: &mut RiskNetwork, grads: &Gradients) {
        if self.moments.is_none() {
            let init = (0..network.n_layers())
                .map(|i| {
                    let (rows, cols) = network.layer_shape(i);
                    LayerMoments {
                        m_weights: Array2::zeros((rows, cols)),
                        v_weights: Array2::zeros((rows, cols)),
                        m_biases: Array1::zeros(cols),
                        v_biases: Array1::zeros(cols),
                    }
                })
                .collect();
            self.moments = Some(init);
        }

        self.t += 1;
        let t = self.t;
        let (beta1, beta2) = (self.beta1, self.beta2);
        let bias1_now = 1.0 - beta1.powi(t);
        let bias1_next = 1.0 - beta1.powi(t + 1);
        let bias2 = 1.0 - beta2.powi(t);
        let lr = self.learning_rate;
        let eps = self.epsilon;
        let clip = self.update_clip;

        let moments = self
            .moments
            .as_mut()
            .expect("moments initialized above");

        for (i, layer_moments) in moments.iter_mut().enumerate() {
            let gw = &grads.weights[i];
            let gb = &grads.biases[i];

            layer_moments.m_weights = beta1 * &layer_moments.m_weights + (1.0 - beta1) * gw;
            layer_moments.v_weights =
                beta2 * &layer_moments.v_weights + (1.0 - beta2) * gw.mapv(|g| g * g);
            layer_moments.m_biases = beta1 * &layer_moments.m_biases + (1.0 - beta1) * gb;
            layer_moments.v_biases =
                beta2 * &layer_moments.v_biases + (1.0 - beta2) * gb.mapv(|g| g * g);

            // nesterov blend of the lookahead momentum and the raw gradient
            let m_hat_w =
                beta1 * &layer_moments.m_weights / bias1_next + (1.0 - beta1) * gw / bias1_now;
            let v_hat_w = &layer_moments.v_weights / bias2;
            let m_hat_b =
                beta1 * &layer_moments.m_biases / bias1_next + (1.0 - beta1) * gb / bias1_now;
            let v_hat_b = &layer_moments.v_biases / bias2;

            let mut dw = ndarray::Zip::from(&m_hat_w)
                .and(&v_hat_w)
                .map_collect(|&m, &v| (-lr * m / (v.sqrt() + eps)).clamp(-clip, clip));
            let db = ndarray::Zip::from(&m_hat_b)
                .and(&v_hat_b)
                .map_collect(|&m, &v| (-lr * m / (v.sqrt() + eps)).clamp(-clip, clip));

            if self.weight_decay > 0.0 {
                let (w, _) = network.layer_arrays(i);
                dw -= &(lr * self.weight_decay * &w.to_owned());
            }

            network.apply_update(i, &dw, &db);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NetworkConfig;
    use ndarray::Array2;

    fn quadratic_grads(network: &RiskNetwork, x: &Array2<f64>) -> (f64, Gradients) {
        // L = sum(scores^2), minimized at scores == 0
        let mut net = network.clone();
        let (scores, cache) = net.forward_train(x.view()).unwrap();
        let loss = scores.mapv(|s| s * s).sum();
        let grads = network.backward(&cache, scores.mapv(|s| 2.0 * s).view());
        (loss, grads)
    }

    #[test]
    fn test_config_validation() {
        assert!(TrainConfig::new().with_learning_rate(0.0).validate().is_err());
        assert!(TrainConfig { beta1: 1.0, ..TrainConfig::new() }.validate().is_err());
        assert!(TrainConfig::new().validate().is_ok());
    }

    #[test]
    fn test_nadam_decreases_a_quadratic_loss() {
        let mut network = NetworkConfig::new()
            .with_hidden_units(6)
            .with_seed(11)
            .build(4)
            .unwrap();
        let x = Array2::from_shape_fn((10, 4), |(i, j)| ((i * 4 + j) as f64 * 0.37).sin());

        let config = TrainConfig::new().with_learning_rate(0.01);
        let mut optimizer = Nadam::new(&config);

        let (initial_loss, _) = quadratic_grads(&network, &x);
        for _ in 0..100 {
            let (_, grads) = quadratic_grads(&network, &x);
            optimizer.step(&mut network, &grads);
        }
        let (final_loss, _) = quadratic_grads(&network, &x);

        assert!(
            final_loss < initial_loss * 0.5,
            "loss {} -> {}",
            initial_loss,
            final_loss
        );
    }

    #[test]
    fn test_updates_are_clipped() {
        let mut network = NetworkConfig::new()
            .with_hidden_units(4)
            .with_seed(5)
            .build(2)
            .unwrap();

        let huge = Gradients {
            weights: (0..network.n_layers())
                .map(|i| {
                    let (r, c) = network.layer_shape(i);
                    Array2::from_elem((r, c), 1e12)
                })
                .collect(),
            biases: (0..network.n_layers())
                .map(|i| {
                    let (_, c) = network.layer_shape(i);
                    ndarray::Array1::from_elem(c, 1e12)
                })
                .collect(),
        };

        let config = TrainConfig::new().with_learning_rate(1e6);
        let mut optimizer = Nadam::new(&config);
        let before: Vec<f64> = (0..network.n_layers())
            .map(|i| network.layer_arrays(i).0[[0, 0]])
            .collect();

        optimizer.step(&mut network, &huge);

        for (i, b) in before.iter().enumerate() {
            let after = network.layer_arrays(i).0[[0, 0]];
            assert!(
                (after - b).abs() <= config.update_clip + 1e-12,
                "layer {} moved by {}",
                i,
                (after - b).abs()
            );
        }
    }
}
