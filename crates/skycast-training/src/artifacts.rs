//! Model and scaler persistence.
//!
//! The model is stored as bincode, the scaler and feature schema as pretty
//! JSON. Writes go through [`ArtifactWriter`], which creates the output
//! directory and removes what it created if the run fails before
//! [`ArtifactWriter::commit`].

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use skycast_data::{FeatureSchema, StandardScaler};
use skycast_layers::Sequential;
use tracing::{info, warn};

use crate::error::{ArtifactError, ArtifactResult};

/// File name of the serialized network.
pub const MODEL_FILE: &str = "weather_model.bin";

/// File name of the serialized scaler.
pub const SCALER_FILE: &str = "scaler.json";

/// Layout version of [`ModelArtifact`].
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Contents of the model file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Layout version, see [`MODEL_FORMAT_VERSION`].
    pub format_version: u32,
    /// Feature width the network expects.
    pub input_dim: usize,
    /// Trained network, including batch-norm running statistics.
    pub network: Sequential,
}

impl ModelArtifact {
    /// Wraps a trained network.
    pub fn new(network: Sequential) -> Self {
        Self {
            format_version: MODEL_FORMAT_VERSION,
            input_dim: network.input_dim(),
            network,
        }
    }
}

/// Contents of the scaler file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerArtifact {
    /// Fitted column statistics.
    pub scaler: StandardScaler,
    /// Column layout, including the weather label mapping.
    pub schema: FeatureSchema,
}

/// A file being written that is deleted unless committed.
#[derive(Debug)]
pub struct PendingFile {
    path: PathBuf,
    file: Option<BufWriter<File>>,
}

impl PendingFile {
    /// Creates or truncates `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::Io`] if the file cannot be created.
    pub fn create(path: impl Into<PathBuf>) -> ArtifactResult<Self> {
        let path = path.into();
        let file = File::create(&path).map_err(|source| ArtifactError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            path,
            file: Some(BufWriter::new(file)),
        })
    }

    /// Target path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes and syncs the file, keeping it on disk.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::Io`] if flushing fails; the file is removed.
    pub fn commit(mut self) -> ArtifactResult<PathBuf> {
        let path = self.path.clone();
        if let Some(writer) = self.file.take() {
            let synced = writer
                .into_inner()
                .map_err(|e| e.into_error())
                .and_then(|file| file.sync_all());
            if let Err(source) = synced {
                let _ = fs::remove_file(&path);
                return Err(ArtifactError::Io { path, source });
            }
        }
        Ok(path)
    }
}

impl Write for PendingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.file.as_mut() {
            Some(file) => file.write(buf),
            None => Err(io::Error::new(io::ErrorKind::Other, "file already committed")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for PendingFile {
    fn drop(&mut self) {
        if self.file.take().is_some() {
            warn!(path = %self.path.display(), "Removing uncommitted artifact");
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// Writes artifacts into one directory.
///
/// The directory is created on construction if absent. Dropping the writer
/// without calling [`ArtifactWriter::commit`] removes every file it wrote and,
/// if it created the directory, every directory it created on the way there.
/// Existing files with the same names are overwritten.
#[derive(Debug)]
pub struct ArtifactWriter {
    dir: PathBuf,
    created_root: Option<PathBuf>,
    written: Vec<PathBuf>,
    committed: bool,
}

impl ArtifactWriter {
    /// Opens `dir`, creating it (and any parents) if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::Io`] if the directory cannot be created.
    pub fn create(dir: impl Into<PathBuf>) -> ArtifactResult<Self> {
        let dir = dir.into();
        let created_root = topmost_missing_ancestor(&dir);
        if let Some(root) = &created_root {
            fs::create_dir_all(&dir).map_err(|source| ArtifactError::Io {
                path: dir.clone(),
                source,
            })?;
            info!(path = %dir.display(), root = %root.display(), "Created artifact directory");
        }
        Ok(Self {
            dir,
            created_root,
            written: Vec::new(),
            committed: false,
        })
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether this writer created the directory.
    pub fn created_dir(&self) -> bool {
        self.created_root.is_some()
    }

    /// Starts a file inside the directory.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::Io`] if the file cannot be created.
    pub fn begin(&self, file_name: &str) -> ArtifactResult<PendingFile> {
        PendingFile::create(self.dir.join(file_name))
    }

    /// Writes `network` to [`MODEL_FILE`].
    ///
    /// # Errors
    ///
    /// Fails on encoding or I/O errors.
    pub fn write_model(&mut self, network: &Sequential) -> ArtifactResult<PathBuf> {
        let artifact = ModelArtifact::new(network.clone());
        let mut pending = self.begin(MODEL_FILE)?;
        bincode::serialize_into(&mut pending, &artifact).map_err(ArtifactError::Encode)?;
        self.finish(pending)
    }

    /// Writes `artifact` to [`SCALER_FILE`].
    ///
    /// # Errors
    ///
    /// Fails on encoding or I/O errors.
    pub fn write_scaler(&mut self, artifact: &ScalerArtifact) -> ArtifactResult<PathBuf> {
        let mut pending = self.begin(SCALER_FILE)?;
        serde_json::to_writer_pretty(&mut pending, artifact)?;
        self.finish(pending)
    }

    /// Keeps everything written so far and returns the file paths.
    pub fn commit(mut self) -> Vec<PathBuf> {
        self.committed = true;
        std::mem::take(&mut self.written)
    }

    fn finish(&mut self, pending: PendingFile) -> ArtifactResult<PathBuf> {
        let path = pending.commit()?;
        info!(path = %path.display(), "Saved artifact");
        self.written.push(path.clone());
        Ok(path)
    }
}

impl Drop for ArtifactWriter {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for path in &self.written {
            let _ = fs::remove_file(path);
        }
        if let Some(root) = &self.created_root {
            warn!(path = %root.display(), "Removing artifact directory after failed run");
            let _ = fs::remove_dir_all(root);
        }
    }
}

/// Outermost directory in the missing chain `dir`, `dir/..`, ... that
/// `create_dir_all` would create. `None` if `dir` already exists.
fn topmost_missing_ancestor(dir: &Path) -> Option<PathBuf> {
    dir.ancestors()
        .filter(|p| !p.as_os_str().is_empty())
        .take_while(|p| !p.exists())
        .last()
        .map(Path::to_path_buf)
}

/// Reads a model file written by [`ArtifactWriter::write_model`].
///
/// # Errors
///
/// Fails if the file cannot be read or decoded, was written by another
/// format version, or its recorded width disagrees with the network.
pub fn load_model(path: impl AsRef<Path>) -> ArtifactResult<ModelArtifact> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let artifact: ModelArtifact = bincode::deserialize(&bytes).map_err(ArtifactError::Decode)?;
    if artifact.format_version != MODEL_FORMAT_VERSION {
        return Err(ArtifactError::VersionMismatch {
            expected: MODEL_FORMAT_VERSION,
            found: artifact.format_version,
        });
    }
    if artifact.input_dim != artifact.network.input_dim() {
        return Err(ArtifactError::Corrupted(format!(
            "recorded input width {} but network expects {}",
            artifact.input_dim,
            artifact.network.input_dim()
        )));
    }
    info!(path = %path.display(), input_dim = artifact.input_dim, "Loaded model");
    Ok(artifact)
}

/// Reads a scaler file written by [`ArtifactWriter::write_scaler`].
///
/// # Errors
///
/// Fails if the file cannot be read or parsed.
pub fn load_scaler(path: impl AsRef<Path>) -> ArtifactResult<ScalerArtifact> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let artifact: ScalerArtifact = serde_json::from_str(&text)?;
    if artifact.scaler.n_features() != artifact.schema.width() {
        return Err(ArtifactError::Corrupted(format!(
            "scaler has {} columns but schema describes {}",
            artifact.scaler.n_features(),
            artifact.schema.width()
        )));
    }
    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use skycast_data::{generate, FeatureBuilder, SyntheticConfig};
    use skycast_layers::{ActivationType, Layer, Regularizer, SequentialConfig, Tensor};
    use tempfile::tempdir;

    fn network() -> Sequential {
        let mut net = SequentialConfig::new(3)
            .add_dense(4, ActivationType::ReLU, Regularizer::L2(0.001))
            .add_batch_norm(0.01, 1e-3)
            .add_dense(1, ActivationType::None, Regularizer::None)
            .build(7)
            .unwrap();
        net.set_training(false);
        net
    }

    fn scaler_artifact() -> ScalerArtifact {
        let table = generate(&SyntheticConfig::new(20, 3, 1)).unwrap();
        let set = FeatureBuilder::new().build(&table).unwrap();
        ScalerArtifact {
            scaler: set.scaler,
            schema: set.schema,
        }
    }

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("models");
        let net = network();
        let scaler = scaler_artifact();

        let mut writer = ArtifactWriter::create(&out).unwrap();
        assert!(writer.created_dir());
        let model_path = writer.write_model(&net).unwrap();
        let scaler_path = writer.write_scaler(&scaler).unwrap();
        let written = writer.commit();
        assert_eq!(written, vec![model_path.clone(), scaler_path.clone()]);

        assert_eq!(model_path, out.join(MODEL_FILE));
        let model = load_model(&model_path).unwrap();
        assert_eq!(model.format_version, MODEL_FORMAT_VERSION);
        assert_eq!(model.input_dim, 3);
        let x = Tensor::ones(&[2, 3]);
        assert_eq!(model.network.forward(&x).unwrap(), net.forward(&x).unwrap());

        let loaded = load_scaler(&scaler_path).unwrap();
        assert_eq!(loaded, scaler);
        assert_eq!(loaded.schema.indicator_index("Clear"), Some(13));
    }

    #[test]
    fn test_overwrites_existing_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(MODEL_FILE), b"stale").unwrap();

        let mut writer = ArtifactWriter::create(dir.path()).unwrap();
        assert!(!writer.created_dir());
        writer.write_model(&network()).unwrap();
        writer.commit();
        assert!(load_model(dir.path().join(MODEL_FILE)).is_ok());
    }

    #[test]
    fn test_uncommitted_writer_removes_created_dir() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("nested").join("models");
        {
            let mut writer = ArtifactWriter::create(&out).unwrap();
            writer.write_model(&network()).unwrap();
            assert!(out.join(MODEL_FILE).exists());
        }
        assert!(!out.exists());
        assert!(!dir.path().join("nested").exists());
        assert!(dir.path().exists());
    }

    #[test]
    fn test_uncommitted_writer_keeps_existing_parent() {
        let dir = tempdir().unwrap();
        let parent = dir.path().join("runs");
        fs::create_dir(&parent).unwrap();
        let out = parent.join("a").join("b");
        {
            let writer = ArtifactWriter::create(&out).unwrap();
            assert!(writer.created_dir());
        }
        assert!(parent.exists());
        assert!(!parent.join("a").exists());
    }

    #[test]
    fn test_uncommitted_writer_keeps_existing_dir() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), b"keep me").unwrap();
        {
            let mut writer = ArtifactWriter::create(dir.path()).unwrap();
            writer.write_scaler(&scaler_artifact()).unwrap();
        }
        assert!(dir.path().exists());
        assert!(dir.path().join("notes.txt").exists());
        assert!(!dir.path().join(SCALER_FILE).exists());
    }

    #[test]
    fn test_dropped_pending_file_is_removed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.bin");
        {
            let mut pending = PendingFile::create(&path).unwrap();
            pending.write_all(b"half").unwrap();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(MODEL_FILE);
        fs::write(&path, b"\x01\x02").unwrap();
        assert!(matches!(load_model(&path), Err(ArtifactError::Decode(_))));

        let path = dir.path().join(SCALER_FILE);
        fs::write(&path, "{").unwrap();
        assert!(matches!(load_scaler(&path), Err(ArtifactError::Json(_))));

        assert!(matches!(
            load_model(dir.path().join("missing.bin")),
            Err(ArtifactError::Io { .. })
        ));
    }

    #[test]
    fn test_version_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(MODEL_FILE);
        let mut artifact = ModelArtifact::new(network());
        artifact.format_version = 99;
        fs::write(&path, bincode::serialize(&artifact).unwrap()).unwrap();
        assert!(matches!(
            load_model(&path),
            Err(ArtifactError::VersionMismatch {
                expected: 1,
                found: 99
            })
        ));
    }
}
