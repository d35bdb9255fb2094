use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

use super::{BlobWriter, FsBlobWriter};
use crate::{
    classifier::CancellationModel,
    encoder::CategoryEncoder,
    error::{ArtifactError, EncoderError},
    model::{FeatureVector, ValidatedRequest},
};

pub const CURRENT_POINTER: &str = "CURRENT";
pub const VERSIONS_DIR: &str = "versions";
pub const MANIFEST_BLOB: &str = "manifest.json";
pub const VEHICLE_ENCODER_BLOB: &str = "vehicle_encoder.json";
pub const PAYMENT_ENCODER_BLOB: &str = "payment_encoder.json";
pub const MODEL_BLOB: &str = "cancel_model.json";
pub const VEHICLE_ENCODER_NAME: &str = "vehicle_type";
pub const PAYMENT_ENCODER_NAME: &str = "payment_method";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub holdout_accuracy: f64,
    pub training_rows: usize,
    pub vehicle_categories: usize,
    pub payment_categories: usize,
}

impl ArtifactManifest {
    pub fn new(
        holdout_accuracy: f64,
        training_rows: usize,
        vehicle_encoder: &CategoryEncoder,
        payment_encoder: &CategoryEncoder,
    ) -> Self {
        let created_at = Utc::now();
        Self {
            version: created_at.format("%Y%m%dT%H%M%S%9fZ").to_string(),
            created_at,
            holdout_accuracy,
            training_rows,
            vehicle_categories: vehicle_encoder.len(),
            payment_categories: payment_encoder.len(),
        }
    }
}

/// Encoders and model that were fitted together. They are only ever
/// published and loaded as one unit.
#[derive(Debug, Clone)]
pub struct ArtifactSet<M = CancellationModel> {
    manifest: ArtifactManifest,
    vehicle_encoder: CategoryEncoder,
    payment_encoder: CategoryEncoder,
    model: M,
}

impl<M> ArtifactSet<M> {
    pub fn new(
        manifest: ArtifactManifest,
        vehicle_encoder: CategoryEncoder,
        payment_encoder: CategoryEncoder,
        model: M,
    ) -> Self {
        Self {
            manifest,
            vehicle_encoder,
            payment_encoder,
            model,
        }
    }

    pub fn manifest(&self) -> &ArtifactManifest {
        &self.manifest
    }

    pub fn version(&self) -> &str {
        &self.manifest.version
    }

    pub fn vehicle_encoder(&self) -> &CategoryEncoder {
        &self.vehicle_encoder
    }

    pub fn payment_encoder(&self) -> &CategoryEncoder {
        &self.payment_encoder
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Model input for a validated request, encoded with this set's encoders.
    pub fn features_for(&self, request: &ValidatedRequest) -> Result<FeatureVector, EncoderError> {
        FeatureVector::encode(
            request.vehicle_type(),
            request.payment_method(),
            request.ride_distance(),
            request.booking_hour(),
            &self.vehicle_encoder,
            &self.payment_encoder,
        )
    }
}

#[derive(Serialize)]
struct BlobOut<'a, T> {
    version: &'a str,
    payload: &'a T,
}

#[derive(Deserialize)]
struct BlobIn<T> {
    version: String,
    payload: T,
}

#[derive(Deserialize)]
struct PersistedEncoder {
    name: String,
    categories: Vec<String>,
}

fn read_encoder(dir: &Path, blob: &str, version: &str, expected_name: &str) -> Result<CategoryEncoder, ArtifactError> {
    let persisted: PersistedEncoder = read_versioned(dir, blob, version)?;
    let invalid = |source: EncoderError| ArtifactError::InvalidEncoder {
        blob: blob.to_string(),
        source,
    };
    if persisted.name != expected_name {
        return Err(invalid(EncoderError::NameMismatch {
            expected: expected_name.to_string(),
            found: persisted.name,
        }));
    }
    CategoryEncoder::from_categories(persisted.name, persisted.categories).map_err(invalid)
}

fn check_category_count(blob: &str, encoder: &CategoryEncoder, expected: usize) -> Result<(), ArtifactError> {
    if encoder.len() != expected {
        return Err(ArtifactError::InvalidEncoder {
            blob: blob.to_string(),
            source: EncoderError::CategoryCountMismatch {
                encoder: encoder.name().to_string(),
                expected,
                found: encoder.len(),
            },
        });
    }
    Ok(())
}

/// Versioned artifact directory.
///
/// ```text
/// <root>/CURRENT                    name of the published version
/// <root>/versions/<version>/*.json  manifest, both encoders, model
/// ```
///
/// A set becomes visible only when `CURRENT` is replaced, which happens by
/// rename after every blob of the new version is on disk.
pub struct ArtifactStore<W: BlobWriter = FsBlobWriter> {
    root: PathBuf,
    writer: W,
}

impl ArtifactStore<FsBlobWriter> {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_writer(root, FsBlobWriter)
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ArtifactError + '_ {
    move |source| ArtifactError::Io {
        path: path.display().to_string(),
        source,
    }
}

impl<W: BlobWriter> ArtifactStore<W> {
    pub fn with_writer(root: impl Into<PathBuf>, writer: W) -> Self {
        Self {
            root: root.into(),
            writer,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn version_dir(&self, version: &str) -> PathBuf {
        self.root.join(VERSIONS_DIR).join(version)
    }

    pub fn current_version(&self) -> Result<Option<String>, ArtifactError> {
        let pointer = self.root.join(CURRENT_POINTER);
        match fs::read_to_string(&pointer) {
            Ok(contents) => Ok(Some(contents.trim().to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&pointer)(e)),
        }
    }

    /// Removes published versions beyond the newest `keep`. The version
    /// `CURRENT` points at is always kept. Returns the removed versions.
    pub fn prune(&self, keep: usize) -> Result<Vec<String>, ArtifactError> {
        let versions_dir = self.root.join(VERSIONS_DIR);
        let current = self.current_version()?;

        let entries = match fs::read_dir(&versions_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&versions_dir)(e)),
        };
        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry.map_err(io_error(&versions_dir))?;
            if entry.path().is_dir() {
                versions.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        // Version ids are UTC timestamps, so lexical order is publish order.
        versions.sort_unstable_by(|a, b| b.cmp(a));

        let mut removed = Vec::new();
        for version in versions.into_iter().skip(keep) {
            if current.as_deref() == Some(version.as_str()) {
                continue;
            }
            let dir = self.version_dir(&version);
            fs::remove_dir_all(&dir).map_err(io_error(&dir))?;
            debug!("Pruned artifact set {}", version);
            removed.push(version);
        }
        if !removed.is_empty() {
            info!("Pruned {} old artifact sets from {:?}", removed.len(), versions_dir);
        }
        Ok(removed)
    }

    /// Publishes all blobs of `set` and then switches `CURRENT` to it.
    /// On any error the previously published set stays current.
    pub fn publish(&self, set: &ArtifactSet<CancellationModel>) -> Result<String, ArtifactError> {
        let version = set.version().to_string();
        let versions_dir = self.root.join(VERSIONS_DIR);
        fs::create_dir_all(&versions_dir).map_err(io_error(&versions_dir))?;

        let staging = self.root.join(format!(".staging-{}", version));
        let target = self.version_dir(&version);
        if target.exists() {
            return Err(ArtifactError::Io {
                path: target.display().to_string(),
                source: std::io::Error::new(ErrorKind::AlreadyExists, "version already published"),
            });
        }

        if let Err(e) = self.stage(set, &staging).and_then(|_| {
            fs::rename(&staging, &target).map_err(io_error(&target))
        }) {
            warn!("Publishing artifact set {} failed: {}", version, e);
            remove_dir_best_effort(&staging);
            return Err(e);
        }

        if let Err(e) = self.switch_current(&version) {
            warn!("Switching current artifact set to {} failed: {}", version, e);
            remove_dir_best_effort(&target);
            return Err(e);
        }

        info!(version = %version, root = ?self.root, "Published artifact set");
        Ok(version)
    }

    fn stage(&self, set: &ArtifactSet<CancellationModel>, staging: &Path) -> Result<(), ArtifactError> {
        if staging.exists() {
            remove_dir_best_effort(staging);
        }
        fs::create_dir_all(staging).map_err(io_error(staging))?;

        let version = set.version();
        self.write_versioned(staging, VEHICLE_ENCODER_BLOB, version, &set.vehicle_encoder)?;
        self.write_versioned(staging, PAYMENT_ENCODER_BLOB, version, &set.payment_encoder)?;
        self.write_versioned(staging, MODEL_BLOB, version, &set.model)?;
        self.write_json(&staging.join(MANIFEST_BLOB), &set.manifest)?;
        debug!("Staged artifact set {} in {:?}", version, staging);
        Ok(())
    }

    fn switch_current(&self, version: &str) -> Result<(), ArtifactError> {
        let pointer = self.root.join(CURRENT_POINTER);
        let tmp = self.root.join(format!("{}.tmp", CURRENT_POINTER));
        self.writer
            .write_blob(&tmp, version.as_bytes())
            .map_err(io_error(&tmp))?;
        fs::rename(&tmp, &pointer).map_err(io_error(&pointer))
    }

    fn write_versioned<T: Serialize>(
        &self,
        dir: &Path,
        blob: &str,
        version: &str,
        payload: &T,
    ) -> Result<(), ArtifactError> {
        self.write_json(&dir.join(blob), &BlobOut { version, payload })
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), ArtifactError> {
        let bytes = serde_json::to_vec_pretty(value).map_err(|source| ArtifactError::Serde {
            path: path.display().to_string(),
            source,
        })?;
        self.writer.write_blob(path, &bytes).map_err(io_error(path))
    }

    /// Loads the current set. Fails if any blob is missing, unreadable or
    /// stamped with a different version than the manifest.
    pub fn load(&self) -> Result<ArtifactSet<CancellationModel>, ArtifactError> {
        let version = self
            .current_version()?
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ArtifactError::MissingPointer(self.root.display().to_string()))?;
        let dir = self.version_dir(&version);

        let manifest: ArtifactManifest = read_json(&dir.join(MANIFEST_BLOB))?;
        if manifest.version != version {
            return Err(ArtifactError::VersionMismatch {
                blob: MANIFEST_BLOB.to_string(),
                expected: version,
                found: manifest.version,
            });
        }

        let vehicle_encoder = read_encoder(&dir, VEHICLE_ENCODER_BLOB, &version, VEHICLE_ENCODER_NAME)?;
        let payment_encoder = read_encoder(&dir, PAYMENT_ENCODER_BLOB, &version, PAYMENT_ENCODER_NAME)?;
        check_category_count(VEHICLE_ENCODER_BLOB, &vehicle_encoder, manifest.vehicle_categories)?;
        check_category_count(PAYMENT_ENCODER_BLOB, &payment_encoder, manifest.payment_categories)?;
        let model: CancellationModel = read_versioned(&dir, MODEL_BLOB, &version)?;
        if !model.is_well_formed() {
            return Err(ArtifactError::InvalidModel(MODEL_BLOB.to_string()));
        }

        info!(
            version = %version,
            vehicle_categories = vehicle_encoder.len(),
            payment_categories = payment_encoder.len(),
            holdout_accuracy = manifest.holdout_accuracy,
            "Loaded artifact set"
        );
        Ok(ArtifactSet::new(manifest, vehicle_encoder, payment_encoder, model))
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ArtifactError::MissingBlob(path.display().to_string()));
        }
        Err(e) => return Err(io_error(path)(e)),
    };
    serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Serde {
        path: path.display().to_string(),
        source,
    })
}

fn read_versioned<T: DeserializeOwned>(dir: &Path, blob: &str, version: &str) -> Result<T, ArtifactError> {
    let path = dir.join(blob);
    let envelope: BlobIn<T> = read_json(&path)?;
    if envelope.version != version {
        return Err(ArtifactError::VersionMismatch {
            blob: blob.to_string(),
            expected: version.to_string(),
            found: envelope.version,
        });
    }
    Ok(envelope.payload)
}

fn remove_dir_best_effort(dir: &Path) {
    if let Err(e) = fs::remove_dir_all(dir) {
        if e.kind() != ErrorKind::NotFound {
            warn!("Failed to remove {:?}: {}", dir, e);
        }
    }
}
