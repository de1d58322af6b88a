//! the full DeepSurv walkthrough on pre-serialized numpy arrays.
//!
//! expects a data directory holding `x.npy` (n x p covariates), `t.npy`
//! (survival days) and `e.npy` (event flags) for a train and a test
//! partition, e.g. exported from the WHAS study:
//!
//! ```text
//! cargo run --example whas_training -- data/whas/train data/whas/test
//! ```
//!
//! hyperparameters follow the published WHAS configuration.

use deepsurv::{metrics, NetworkConfig, SurvivalData, TrainConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let (train_dir, test_dir) = match (args.next(), args.next()) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            eprintln!("usage: whas_training <train-data-dir> <test-data-dir>");
            std::process::exit(2);
        }
    };

    let mut train = SurvivalData::from_npy_dir(&train_dir)?;
    let mut test = SurvivalData::from_npy_dir(&test_dir)?;
    println!(
        "loaded {} training / {} testing patients, {} features",
        train.n_samples(),
        test.n_samples(),
        train.n_features()
    );

    // standardize with training statistics only - no test leakage
    let (means, stds) = train.standardize_covariates()?;
    test.apply_standardization(means.view(), stds.view())?;

    // ranking task: descending time order before anything touches the loss
    train.sort_by_descending_time();

    let mut network = NetworkConfig::new()
        .with_hidden_units(48)
        .with_dropout(0.147)
        .with_l2_penalty(16.094)
        .with_seed(42)
        .build(train.n_features())?;

    let config = TrainConfig::new()
        .with_epochs(200)
        .with_learning_rate(0.067)
        .with_weight_decay(6.494e-4)
        .with_checkpoint_dir("models");

    let history = deepsurv::fit(&mut network, &train, &config)?;
    println!(
        "best loss {:.6} at epoch {} ({} epochs run{})",
        history.best_loss,
        history.best_epoch,
        history.epoch_losses.len(),
        if history.stopped_on_nan { ", stopped on NaN" } else { "" }
    );

    let train_scores = network.predict(train.covariates())?;
    let c_index_train =
        metrics::concordance_index(train_scores.view(), train.times(), train.events())?;
    println!("c-index of training dataset = {c_index_train}");

    let test_scores = network.predict(test.covariates())?;
    let c_index_test =
        metrics::concordance_index(test_scores.view(), test.times(), test.events())?;
    println!("c-index of testing dataset = {c_index_test}");

    Ok(())
}
