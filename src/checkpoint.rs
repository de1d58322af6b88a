//! weight persistence as NumPy `.npz` archives.
//!
//! the archive holds `w0`/`b0` .. `w3`/`b3` in layer order. loading goes
//! into an existing network so shapes are validated against its
//! architecture - a mismatched checkpoint is an error, not a silent
//! truncation.

use std::fs::File;
use std::path::Path;

use ndarray::{Array1, Array2};
use ndarray_npy::{NpzReader, NpzWriter};

use crate::error::{DeepSurvError, Result};
use crate::network::RiskNetwork;

/// write all network weights to an `.npz` file
pub fn save(network: &RiskNetwork, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = NpzWriter::new(file);

    for i in 0..network.n_layers() {
        let (weights, biases) = network.layer_arrays(i);
        writer
            .add_array(format!("w{i}"), &weights)
            .map_err(|e| DeepSurvError::checkpoint(format!("write w{i}: {e}")))?;
        writer
            .add_array(format!("b{i}"), &biases)
            .map_err(|e| DeepSurvError::checkpoint(format!("write b{i}: {e}")))?;
    }

    writer
        .finish()
        .map_err(|e| DeepSurvError::checkpoint(format!("finish {}: {e}", path.display())))?;
    Ok(())
}

/// load weights from an `.npz` file into `network`, validating shapes
pub fn load(network: &mut RiskNetwork, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = NpzReader::new(file)
        .map_err(|e| DeepSurvError::checkpoint(format!("open {}: {e}", path.display())))?;

    for i in 0..network.n_layers() {
        let weights = read_array2(&mut reader, &format!("w{i}"))?;
        let biases = read_array1(&mut reader, &format!("b{i}"))?;
        network.set_layer(i, weights, biases)?;
    }

    Ok(())
}

fn read_array1(npz: &mut NpzReader<File>, key: &str) -> Result<Array1<f64>> {
    npz.by_name::<ndarray::OwnedRepr<f64>, ndarray::Ix1>(&format!("{key}.npy"))
        .or_else(|_| npz.by_name::<ndarray::OwnedRepr<f64>, ndarray::Ix1>(key))
        .map_err(|e| DeepSurvError::checkpoint(format!("read {key}: {e}")))
}

fn read_array2(npz: &mut NpzReader<File>, key: &str) -> Result<Array2<f64>> {
    npz.by_name::<ndarray::OwnedRepr<f64>, ndarray::Ix2>(&format!("{key}.npy"))
        .or_else(|_| npz.by_name::<ndarray::OwnedRepr<f64>, ndarray::Ix2>(key))
        .map_err(|e| DeepSurvError::checkpoint(format!("read {key}: {e}")))
}
