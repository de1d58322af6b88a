//! full-batch training loop.
//!
//! the whole dataset is one batch per epoch, no shuffling - order carries
//! the risk-set structure, so the data must be sorted by descending time
//! before it gets here. training halts early on a non-finite loss and the
//! lowest-loss weights seen so far are restored at the end.

use log::{debug, info, warn};

use crate::checkpoint;
use crate::data::SurvivalData;
use crate::error::{DeepSurvError, Result};
use crate::loss::{neg_log_partial_likelihood, neg_log_partial_likelihood_grad};
use crate::network::RiskNetwork;
use crate::optimization::{Nadam, TrainConfig};

/// what happened during a fit
#[derive(Debug, Clone)]
pub struct TrainingHistory {
    /// penalized loss per completed epoch
    pub epoch_losses: Vec<f64>,
    /// epoch index of the best (lowest) loss
    pub best_epoch: usize,
    /// the best loss itself
    pub best_loss: f64,
    /// true when training halted on a non-finite loss
    pub stopped_on_nan: bool,
}

/// train `network` on `data` with the Cox ranking loss.
///
/// `data` must already be sorted by descending time. on return the network
/// holds the weights of its best epoch, not its last one; if
/// `config.checkpoint_dir` is set those weights are also on disk as
/// `best.npz`.
pub fn fit(
    network: &mut RiskNetwork,
    data: &SurvivalData,
    config: &TrainConfig,
) -> Result<TrainingHistory> {
    config.validate()?;

    if !data.is_sorted_by_descending_time() {
        return Err(DeepSurvError::UnsortedData);
    }
    if data.n_events() == 0 {
        return Err(DeepSurvError::invalid_survival_data(
            "no observed events - nothing to fit",
        ));
    }

    if let Some(dir) = config.checkpoint_dir.as_deref() {
        if !dir.exists() {
            info!("creating checkpoint directory {}", dir.display());
            std::fs::create_dir_all(dir)?;
        }
    }

    let mut optimizer = Nadam::new(config);
    let mut history = TrainingHistory {
        epoch_losses: Vec::with_capacity(config.epochs),
        best_epoch: 0,
        best_loss: f64::INFINITY,
        stopped_on_nan: false,
    };
    let mut best_snapshot = None;

    for epoch in 0..config.epochs {
        let (scores, cache) = network.forward_train(data.covariates())?;
        let data_loss = neg_log_partial_likelihood(scores.view(), data.events())?;
        let loss = data_loss + network.l2_penalty_term();

        if !loss.is_finite() {
            warn!("epoch {}: non-finite loss ({}) - terminating", epoch, loss);
            history.stopped_on_nan = true;
            break;
        }

        history.epoch_losses.push(loss);
        if loss < history.best_loss {
            history.best_loss = loss;
            history.best_epoch = epoch;
            best_snapshot = Some(network.snapshot());
            if let Some(dir) = config.checkpoint_dir.as_deref() {
                checkpoint::save(network, dir.join("best.npz"))?;
            }
        }

        debug!("epoch {}: loss = {:.6}", epoch, loss);

        let score_grad = neg_log_partial_likelihood_grad(scores.view(), data.events())?;
        let grads = network.backward(&cache, score_grad.view());
        optimizer.step(network, &grads);
    }

    if let Some(snapshot) = best_snapshot.as_ref() {
        network.restore(snapshot)?;
        info!(
            "training done: best loss {:.6} at epoch {} ({} epochs run{})",
            history.best_loss,
            history.best_epoch,
            history.epoch_losses.len(),
            if history.stopped_on_nan {
                ", stopped on NaN"
            } else {
                ""
            }
        );
    } else {
        warn!("no finite loss observed - network left at initialization");
    }

    Ok(history)
}
