use anyhow::{bail, Context, Result};
use npyz::{npz::NpzArchive, DType, NpyFile};
use std::{
    fs::File,
    io::{BufReader, Read},
    path::{Path, PathBuf},
};
use track_consistency::Prediction;

/// Find the prediction file of a video, preferring `<stem>.npz` over `<stem>.npy`.
pub fn prediction_path(result_dir: &Path, stem: &str) -> Option<PathBuf> {
    ["npz", "npy"]
        .iter()
        .map(|extension| result_dir.join(format!("{stem}.{extension}")))
        .find(|path| path.is_file())
}

/// Load a `(frames, points, 3)` prediction array from an `.npz` archive entry or a plain `.npy` file.
///
/// `f4` and `f8` arrays are accepted, doubles are narrowed to `f32`.
pub fn load_prediction(path: &Path, npz_key: &str) -> Result<Prediction> {
    let prediction = match path.extension().and_then(|extension| extension.to_str()) {
        Some("npz") => {
            let mut archive = NpzArchive::open(path)
                .with_context(|| format!("failed to open npz archive {}", path.display()))?;
            let npy = archive.by_name(npz_key)?.with_context(|| {
                format!("npz archive {} has no array '{npz_key}'", path.display())
            })?;
            read_prediction(npy)
        }
        Some("npy") => {
            let file =
                File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
            read_prediction(NpyFile::new(BufReader::new(file))?)
        }
        _ => bail!("unsupported prediction file {}", path.display()),
    };
    prediction.with_context(|| format!("failed to read predictions from {}", path.display()))
}

/// Read the values of an npy array into a Prediction.
pub fn read_prediction<R: Read>(npy: NpyFile<R>) -> Result<Prediction> {
    let shape = npy.shape().iter().map(|&dim| dim as usize).collect::<Vec<_>>();
    let is_double =
        matches!(npy.dtype(), DType::Plain(type_str) if type_str.to_string().ends_with("f8"));
    let values = if is_double {
        npy.into_vec::<f64>()?
            .into_iter()
            .map(|value| value as f32)
            .collect()
    } else {
        npy.into_vec::<f32>()?
    };
    Prediction::from_shape_vec(&shape, values)
}
