use approx::assert_relative_eq;
use deepsurv::{metrics, NetworkConfig, SurvivalData, TrainConfig};
use ndarray::Array2;

fn create_synthetic_data(n_samples: usize, n_features: usize, seed: u64) -> SurvivalData {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(seed);

    // random covariates; the first two carry the survival signal
    let mut covariates_vec: Vec<f64> = Vec::with_capacity(n_samples * n_features);
    for _ in 0..(n_samples * n_features) {
        covariates_vec.push(rng.gen_range(-1.5..1.5));
    }
    let covariates = Array2::from_shape_vec((n_samples, n_features), covariates_vec).unwrap();

    let mut times = Vec::with_capacity(n_samples);
    let mut events = Vec::with_capacity(n_samples);

    for i in 0..n_samples {
        let linear_pred = 1.2 * covariates[[i, 0]] - 0.8 * covariates[[i, 1]];
        let hazard = linear_pred.exp();
        let time = (-rng.gen::<f64>().ln() / (0.2 * hazard)).max(0.05);
        let censoring_time = rng.gen_range(2.0..25.0);

        if time < censoring_time {
            times.push(time);
            events.push(true);
        } else {
            times.push(censoring_time);
            events.push(false);
        }
    }

    SurvivalData::new(times, events, covariates).unwrap()
}

#[test]
fn test_end_to_end_training_beats_chance() {
    let mut data = create_synthetic_data(200, 4, 42);
    data.sort_by_descending_time();

    let mut network = NetworkConfig::new()
        .with_hidden_units(16)
        .with_seed(7)
        .build(data.n_features())
        .unwrap();

    let config = TrainConfig::new()
        .with_epochs(400)
        .with_learning_rate(0.01);

    let history = deepsurv::fit(&mut network, &data, &config).unwrap();
    assert!(!history.stopped_on_nan);
    assert!(history.best_loss.is_finite());

    let risk_scores = network.predict(data.covariates()).unwrap();
    let c_index =
        metrics::concordance_index(risk_scores.view(), data.times(), data.events()).unwrap();

    assert!(
        c_index > 0.6,
        "trained c-index {} should beat chance comfortably",
        c_index
    );
}

#[test]
fn test_trained_model_generalizes_to_held_out_patients() {
    let data = create_synthetic_data(300, 4, 99);
    let (mut train, mut test) = data.train_test_split(0.25, 17).unwrap();

    // standardize with training statistics only
    let (means, stds) = train.standardize_covariates().unwrap();
    test.apply_standardization(means.view(), stds.view()).unwrap();

    train.sort_by_descending_time();

    let mut network = NetworkConfig::new()
        .with_hidden_units(16)
        .with_dropout(0.1)
        .with_seed(3)
        .build(train.n_features())
        .unwrap();

    let config = TrainConfig::new()
        .with_epochs(400)
        .with_learning_rate(0.01);

    deepsurv::fit(&mut network, &train, &config).unwrap();

    let test_scores = network.predict(test.covariates()).unwrap();
    let c_index =
        metrics::harrell_c_index(test_scores.view(), test.times(), test.events()).unwrap();

    assert!(
        c_index > 0.55,
        "held-out c-index {} should beat chance",
        c_index
    );
}

#[test]
fn test_best_checkpoint_reload_matches_in_memory_weights() {
    let dir = std::env::temp_dir().join(format!("deepsurv_it_{}", std::process::id()));
    std::fs::remove_dir_all(&dir).ok();

    let mut data = create_synthetic_data(100, 3, 5);
    data.sort_by_descending_time();

    let mut network = NetworkConfig::new()
        .with_hidden_units(8)
        .with_seed(11)
        .build(3)
        .unwrap();

    let config = TrainConfig::new()
        .with_epochs(100)
        .with_learning_rate(0.01)
        .with_checkpoint_dir(&dir);

    deepsurv::fit(&mut network, &data, &config).unwrap();

    // the on-disk best checkpoint reproduces the restored network exactly
    let mut reloaded = NetworkConfig::new()
        .with_hidden_units(8)
        .with_seed(999)
        .build(3)
        .unwrap();
    deepsurv::checkpoint::load(&mut reloaded, dir.join("best.npz")).unwrap();

    let a = network.predict(data.covariates()).unwrap();
    let b = reloaded.predict(data.covariates()).unwrap();
    for (x, y) in a.iter().zip(b.iter()) {
        assert_relative_eq!(x, y, epsilon = 1e-12);
    }

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_dropout_training_still_converges() {
    let mut data = create_synthetic_data(150, 4, 8);
    data.sort_by_descending_time();

    let mut network = NetworkConfig::new()
        .with_hidden_units(16)
        .with_dropout(0.2)
        .with_l2_penalty(0.001)
        .with_seed(1)
        .build(4)
        .unwrap();

    let config = TrainConfig::new()
        .with_epochs(300)
        .with_learning_rate(0.01)
        .with_weight_decay(1e-4);

    let history = deepsurv::fit(&mut network, &data, &config).unwrap();
    assert!(history.best_loss.is_finite());
    assert!(history.best_loss < history.epoch_losses[0]);
}

#[test]
fn test_loss_history_is_recorded_per_epoch() {
    let mut data = create_synthetic_data(50, 3, 2);
    data.sort_by_descending_time();

    let mut network = NetworkConfig::new()
        .with_hidden_units(8)
        .build(3)
        .unwrap();
    let config = TrainConfig::new().with_epochs(25).with_learning_rate(0.005);

    let history = deepsurv::fit(&mut network, &data, &config).unwrap();
    assert_eq!(history.epoch_losses.len(), 25);
    assert!(history.epoch_losses.iter().all(|l| l.is_finite()));
    assert_relative_eq!(
        history.best_loss,
        history.epoch_losses[history.best_epoch],
        epsilon = 1e-15
    );
}

#[test]
fn test_npy_directory_loading_roundtrip() {
    use ndarray::Array1;
    use ndarray_npy::WriteNpyExt;

    let dir = std::env::temp_dir().join(format!("deepsurv_npy_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let x = Array2::from_shape_vec((3, 2), vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6]).unwrap();
    let t = Array1::from(vec![4.0, 2.0, 9.0]);
    let e = Array1::from(vec![1.0, 0.0, 1.0]);

    x.write_npy(std::fs::File::create(dir.join("x.npy")).unwrap()).unwrap();
    t.write_npy(std::fs::File::create(dir.join("t.npy")).unwrap()).unwrap();
    e.write_npy(std::fs::File::create(dir.join("e.npy")).unwrap()).unwrap();

    let data = SurvivalData::from_npy_dir(&dir).unwrap();
    assert_eq!(data.n_samples(), 3);
    assert_eq!(data.n_features(), 2);
    assert_eq!(data.events(), &[true, false, true]);
    assert_relative_eq!(data.times()[2], 9.0);

    std::fs::remove_dir_all(&dir).ok();
}
