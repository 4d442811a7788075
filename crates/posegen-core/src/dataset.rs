//! Pose dataset loading.
//!
//! A dataset is a flat directory with one JSON pose file per sample. Files are
//! read lazily; a file that fails to parse is reported as a
//! [`PosegenError::MalformedRecord`] and never stops the rest of the batch.

use crate::error::{PosegenError, Result};
use crate::pose::PoseRecord;
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level keys carried into pose targets, in output order.
pub const POSE_KEYS: [&str; 3] = ["face", "rotatableBones", "movableBones"];

/// One loaded pose file.
#[derive(Debug, Clone)]
pub struct PoseSample {
    /// Source file.
    pub path: PathBuf,
    /// Typed record.
    pub record: PoseRecord,
    /// The parsed file, untouched.
    pub source: Value,
}

impl PoseSample {
    /// Read and parse one pose file.
    pub fn load(path: &Path) -> Result<Self> {
        let source = read_json(path)?;
        let record = PoseRecord::from_value(&source, path)?;
        Ok(Self {
            path: path.to_path_buf(),
            record,
            source,
        })
    }

    /// The pose without its description: `face`, `rotatableBones` and
    /// `movableBones` exactly as written in the file, each defaulting to `{}`.
    pub fn pose_value(&self) -> Value {
        pose_value(&self.source)
    }

    /// File name for log lines.
    pub fn name(&self) -> String {
        file_name(&self.path)
    }
}

/// A pose file checked only for a JSON object with a string `description`.
///
/// The mappings are kept as written, whatever their shape; typed checks are
/// left to [`PoseSample`] and [`PoseRecord::validate`].
#[derive(Debug, Clone)]
pub struct RawPose {
    /// Source file.
    pub path: PathBuf,
    /// The `description` field.
    pub description: String,
    /// The parsed file, untouched.
    pub source: Value,
}

impl RawPose {
    /// Read one pose file without typing its mappings.
    pub fn load(path: &Path) -> Result<Self> {
        let source = read_json(path)?;
        let Some(object) = source.as_object() else {
            return Err(PosegenError::malformed(path, "top-level value is not an object"));
        };
        let description = match object.get("description") {
            Some(Value::String(d)) => d.clone(),
            Some(_) => return Err(PosegenError::malformed(path, "description is not a string")),
            None => return Err(PosegenError::malformed(path, "missing field `description`")),
        };
        Ok(Self {
            path: path.to_path_buf(),
            description,
            source,
        })
    }

    /// See [`PoseSample::pose_value`].
    pub fn pose_value(&self) -> Value {
        pose_value(&self.source)
    }

    /// File name for log lines.
    pub fn name(&self) -> String {
        file_name(&self.path)
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let contents =
        fs::read_to_string(path).map_err(|e| PosegenError::malformed(path, e.to_string()))?;
    serde_json::from_str(&contents)
        .map_err(|e| PosegenError::malformed(path, format!("invalid JSON: {e}")))
}

fn pose_value(source: &Value) -> Value {
    let mut object = Map::new();
    for key in POSE_KEYS {
        let value = source
            .get(key)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        object.insert(key.to_string(), value);
    }
    Value::Object(object)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Lazy iterator over the pose files of a directory.
///
/// Enumeration order follows the filesystem; call [`PoseDataset::sorted`] for
/// file-name order.
#[derive(Debug)]
pub struct PoseDataset {
    dir: PathBuf,
    paths: std::vec::IntoIter<PathBuf>,
}

impl PoseDataset {
    /// List the `*.json` files of `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().map_or(false, |e| e == "json") {
                paths.push(path);
            }
        }
        tracing::debug!(dir = %dir.display(), files = paths.len(), "opened pose dataset");
        Ok(Self {
            dir: dir.to_path_buf(),
            paths: paths.into_iter(),
        })
    }

    /// Yield the remaining files in file-name order.
    pub fn sorted(self) -> Self {
        let mut paths: Vec<PathBuf> = self.paths.collect();
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Self {
            dir: self.dir,
            paths: paths.into_iter(),
        }
    }

    /// Dataset directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of files not yet read.
    pub fn remaining(&self) -> usize {
        self.paths.len()
    }

    /// Pair each load result with its file.
    pub fn paths_with_results(self) -> impl Iterator<Item = (PathBuf, Result<PoseSample>)> {
        self.paths.map(|path| {
            let loaded = load_logged(&path);
            (path, loaded)
        })
    }

    /// Like [`PoseDataset::paths_with_results`] with the untyped loader.
    pub fn raw_with_results(self) -> impl Iterator<Item = (PathBuf, Result<RawPose>)> {
        self.paths.map(|path| {
            let loaded = RawPose::load(&path);
            if let Err(error) = &loaded {
                tracing::warn!(file = %path.display(), %error, "skipping pose file");
            }
            (path, loaded)
        })
    }

    /// Read every file, collecting samples and per-file failures.
    pub fn collect_report(self) -> LoadReport {
        let mut report = LoadReport::default();
        for (path, loaded) in self.paths_with_results() {
            match loaded {
                Ok(sample) => report.samples.push(sample),
                Err(error) => report.failures.push(LoadFailure { path, error }),
            }
        }
        tracing::info!(
            loaded = report.samples.len(),
            failed = report.failures.len(),
            "pose dataset loaded"
        );
        report
    }
}

fn load_logged(path: &Path) -> Result<PoseSample> {
    let loaded = PoseSample::load(path);
    match &loaded {
        Ok(sample) => tracing::debug!(file = %sample.name(), "loaded pose"),
        Err(error) => tracing::warn!(file = %path.display(), %error, "skipping pose file"),
    }
    loaded
}

impl Iterator for PoseDataset {
    type Item = Result<PoseSample>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.paths.next()?;
        Some(load_logged(&path))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.paths.size_hint()
    }
}

/// Load a whole directory in file-name order.
pub fn load_all(dir: impl AsRef<Path>) -> Result<LoadReport> {
    Ok(PoseDataset::open(dir)?.sorted().collect_report())
}

/// A file that could not be loaded.
#[derive(Debug)]
pub struct LoadFailure {
    /// Offending file.
    pub path: PathBuf,
    /// Why it was skipped.
    pub error: PosegenError,
}

/// Outcome of loading a dataset directory.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Successfully loaded samples.
    pub samples: Vec<PoseSample>,
    /// Skipped files.
    pub failures: Vec<LoadFailure>,
}

impl LoadReport {
    /// Samples usable as training data.
    pub fn usable(&self) -> impl Iterator<Item = &PoseSample> {
        self.samples.iter().filter(|s| s.record.is_usable())
    }

    /// Number of files seen.
    pub fn total(&self) -> usize {
        self.samples.len() + self.failures.len()
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "loaded {}/{} pose files ({} skipped)",
            self.samples.len(),
            self.total(),
            self.failures.len()
        )
    }
}
