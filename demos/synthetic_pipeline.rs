//! self-contained pipeline on generated data - no files needed.
//!
//! ```text
//! RUST_LOG=debug cargo run --example synthetic_pipeline
//! ```

use deepsurv::{metrics, NetworkConfig, SurvivalData, TrainConfig};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn simulate_cohort(n_patients: usize, n_features: usize, seed: u64) -> SurvivalData {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut covariates_vec: Vec<f64> = Vec::with_capacity(n_patients * n_features);
    for _ in 0..(n_patients * n_features) {
        covariates_vec.push(rng.gen_range(-1.5..1.5));
    }
    let covariates = Array2::from_shape_vec((n_patients, n_features), covariates_vec)
        .expect("shape matches the generated vec");

    // exponential survival with hazard driven by the first two features
    let mut times = Vec::with_capacity(n_patients);
    let mut events = Vec::with_capacity(n_patients);
    for i in 0..n_patients {
        let linear_pred = 1.0 * covariates[[i, 0]] - 0.6 * covariates[[i, 1]];
        let hazard = linear_pred.exp();
        let time = (-rng.gen::<f64>().ln() / (0.15 * hazard)).max(0.05);
        let censoring_time = rng.gen_range(2.0..30.0);

        if time < censoring_time {
            times.push(time);
            events.push(true);
        } else {
            times.push(censoring_time);
            events.push(false);
        }
    }

    SurvivalData::new(times, events, covariates).expect("generated data is well formed")
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let cohort = simulate_cohort(500, 6, 20240817);
    println!(
        "simulated {} patients, {} events, {} censored",
        cohort.n_samples(),
        cohort.n_events(),
        cohort.n_samples() - cohort.n_events()
    );

    let (mut train, mut test) = cohort.train_test_split(0.2, 7)?;
    let (means, stds) = train.standardize_covariates()?;
    test.apply_standardization(means.view(), stds.view())?;
    train.sort_by_descending_time();

    let mut network = NetworkConfig::new()
        .with_hidden_units(32)
        .with_dropout(0.1)
        .with_l2_penalty(0.001)
        .with_seed(1)
        .build(train.n_features())?;

    let config = TrainConfig::new()
        .with_epochs(500)
        .with_learning_rate(0.01)
        .with_weight_decay(1e-4);

    let history = deepsurv::fit(&mut network, &train, &config)?;
    println!(
        "best loss {:.6} at epoch {}",
        history.best_loss, history.best_epoch
    );

    let train_scores = network.predict(train.covariates())?;
    let c_train = metrics::harrell_c_index(train_scores.view(), train.times(), train.events())?;
    println!("c-index (train) = {c_train:.4}");

    let test_scores = network.predict(test.covariates())?;
    let c_test = metrics::harrell_c_index(test_scores.view(), test.times(), test.events())?;
    println!("c-index (test)  = {c_test:.4}");

    Ok(())
}
