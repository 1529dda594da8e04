use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::sync::OnceCell;

use crate::config::ModelConfig;
use crate::inference::model::{Classifier, TorchModel};
use crate::storage::drive_service::{self, DownloadedFile, DriveError, DriveService};

pub type ModelHandle = Arc<dyn Classifier>;

/// TorchScript archives are zip files.
const TORCHSCRIPT_MAGIC: &[u8] = b"PK\x03\x04";
/// Keras `.h5` files.
const HDF5_MAGIC: &[u8] = b"\x89HDF\r\n\x1a\n";

#[derive(Debug, thiserror::Error)]
pub enum ModelUnavailableError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] DriveError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No model at {path} and no model.file_id configured to fetch it from")]
    NoSource { path: String },
    #[error("Checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: String,
        expected: String,
        actual: String,
    },
    #[error(
        "{path} is {found}, not a TorchScript export; save the model with torch.jit.save and point model.file_id at it"
    )]
    NotTorchScript { path: String, found: &'static str },
    #[error("Failed to load model: {0}")]
    Load(String),
}

/// Where the artifact comes from when it is missing locally.
pub trait ModelSource {
    fn fetch(
        &self,
        file_id: &str,
        dest: &Path,
    ) -> impl Future<Output = Result<DownloadedFile, DriveError>> + Send;
}

impl ModelSource for DriveService {
    fn fetch(
        &self,
        file_id: &str,
        dest: &Path,
    ) -> impl Future<Output = Result<DownloadedFile, DriveError>> + Send {
        self.download(file_id, dest)
    }
}

/// Turns the local artifact into something that can predict.
pub trait ModelLoader {
    fn load(&self, path: &Path, config: &ModelConfig) -> Result<ModelHandle, ModelUnavailableError>;
}

pub struct TorchLoader;

impl ModelLoader for TorchLoader {
    fn load(&self, path: &Path, config: &ModelConfig) -> Result<ModelHandle, ModelUnavailableError> {
        let model = TorchModel::load(path, config)
            .map_err(|e| ModelUnavailableError::Load(e.to_string()))?;
        Ok(Arc::new(model))
    }
}

/// Downloads the model on first use and hands out the same handle afterwards.
pub struct ModelProvider<S, L> {
    config: ModelConfig,
    source: S,
    loader: L,
    handle: OnceCell<ModelHandle>,
}

impl<S: ModelSource, L: ModelLoader> ModelProvider<S, L> {
    pub fn new(config: ModelConfig, source: S, loader: L) -> Self {
        Self {
            config,
            source,
            loader,
            handle: OnceCell::new(),
        }
    }

    pub async fn ensure_model_available(&self) -> Result<ModelHandle, ModelUnavailableError> {
        self.handle
            .get_or_try_init(|| self.initialize())
            .await
            .cloned()
    }

    async fn initialize(&self) -> Result<ModelHandle, ModelUnavailableError> {
        let path = self.config.path.as_path();

        if path.exists() {
            log::info!("Using cached model at {}", path.display());
            if let Some(expected) = &self.config.sha256 {
                let actual = hash_in_background(path).await?;
                verify_checksum(path, expected, &actual, false).await?;
            }
            check_torchscript(path).await?;
        } else {
            let file_id = self.config.file_id.as_deref().ok_or_else(|| {
                ModelUnavailableError::NoSource {
                    path: path.display().to_string(),
                }
            })?;
            log::info!("Model not found at {}, fetching", path.display());
            let downloaded = self.source.fetch(file_id, path).await?;
            log::info!(
                "Fetched {} bytes into {}",
                downloaded.size,
                downloaded.path.display()
            );
            if let Some(expected) = &self.config.sha256 {
                verify_checksum(path, expected, &downloaded.sha256, true).await?;
            }
            if let Err(e) = check_torchscript(path).await {
                remove_artifact(path).await;
                return Err(e);
            }
        }

        self.loader.load(path, &self.config)
    }
}

async fn hash_in_background(path: &Path) -> Result<String, ModelUnavailableError> {
    let path = path.to_path_buf();
    let digest = tokio::task::spawn_blocking(move || drive_service::hash_file(&path))
        .await
        .map_err(std::io::Error::other)??;
    Ok(digest)
}

async fn verify_checksum(
    path: &Path,
    expected: &str,
    actual: &str,
    remove_on_mismatch: bool,
) -> Result<(), ModelUnavailableError> {
    if expected.eq_ignore_ascii_case(actual) {
        log::info!("Model checksum verified");
        return Ok(());
    }

    if remove_on_mismatch {
        remove_artifact(path).await;
    }
    Err(ModelUnavailableError::ChecksumMismatch {
        path: path.display().to_string(),
        expected: expected.to_string(),
        actual: actual.to_string(),
    })
}

/// Rejects anything that is not a zip archive before handing it to libtorch.
async fn check_torchscript(path: &Path) -> Result<(), ModelUnavailableError> {
    let mut header = Vec::with_capacity(HDF5_MAGIC.len());
    tokio::fs::File::open(path)
        .await?
        .take(HDF5_MAGIC.len() as u64)
        .read_to_end(&mut header)
        .await?;

    if header.starts_with(TORCHSCRIPT_MAGIC) {
        return Ok(());
    }
    let found = if header.starts_with(HDF5_MAGIC) {
        "an HDF5 (Keras) file"
    } else {
        "an unrecognized file"
    };
    Err(ModelUnavailableError::NotTorchScript {
        path: path.display().to_string(),
        found,
    })
}

async fn remove_artifact(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        log::warn!("Could not remove {}: {}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::model::InferenceError;
    use ndarray::Array4;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PAYLOAD: &[u8] = b"PK\x03\x04frozen leaf classifier";
    const KERAS_PAYLOAD: &[u8] = b"\x89HDF\r\n\x1a\nkeras weights";
    const WRONG_SHA256: &str = "0000000000000000000000000000000000000000000000000000000000000000";

    struct CountingSource {
        fetches: Arc<AtomicUsize>,
        fail: bool,
        payload: &'static [u8],
    }

    impl CountingSource {
        fn new() -> (Self, Arc<AtomicUsize>) {
            let fetches = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    fetches: fetches.clone(),
                    fail: false,
                    payload: PAYLOAD,
                },
                fetches,
            )
        }
    }

    impl ModelSource for CountingSource {
        async fn fetch(&self, _file_id: &str, dest: &Path) -> Result<DownloadedFile, DriveError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(DriveError::ConfirmationNotFound);
            }
            std::fs::write(dest, self.payload)?;
            Ok(DownloadedFile {
                path: dest.to_path_buf(),
                size: self.payload.len() as u64,
                sha256: drive_service::hash_file(dest)?,
            })
        }
    }

    struct StubModel;

    impl Classifier for StubModel {
        fn predict(&self, _input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
            Ok(vec![0.25, 0.75])
        }
    }

    /// Accepts only files holding [`PAYLOAD`].
    struct StubLoader {
        loads: Arc<AtomicUsize>,
    }

    impl ModelLoader for StubLoader {
        fn load(&self, path: &Path, _config: &ModelConfig) -> Result<ModelHandle, ModelUnavailableError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if std::fs::read(path)? != PAYLOAD {
                return Err(ModelUnavailableError::Load("corrupt artifact".to_string()));
            }
            Ok(Arc::new(StubModel))
        }
    }

    fn config_in(dir: &Path) -> ModelConfig {
        ModelConfig {
            file_id: Some("1TorchScriptExport".to_string()),
            path: dir.join("mdm_vgg_net16.pt"),
            ..ModelConfig::default()
        }
    }

    fn build_provider(
        config: ModelConfig,
        source: CountingSource,
    ) -> (ModelProvider<CountingSource, StubLoader>, Arc<AtomicUsize>) {
        let loads = Arc::new(AtomicUsize::new(0));
        let loader = StubLoader {
            loads: loads.clone(),
        };
        (ModelProvider::new(config, source, loader), loads)
    }

    fn payload_sha256() -> String {
        let dir = tempfile::tempdir().unwrap();
        let path: PathBuf = dir.path().join("payload");
        std::fs::write(&path, PAYLOAD).unwrap();
        drive_service::hash_file(&path).unwrap()
    }

    #[actix_web::test]
    async fn fetches_once_and_memoizes() {
        let dir = tempfile::tempdir().unwrap();
        let (source, fetches) = CountingSource::new();
        let (provider, loads) = build_provider(config_in(dir.path()), source);

        let first = provider.ensure_model_available().await.unwrap();
        let second = provider.ensure_model_available().await.unwrap();

        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert!(dir.path().join("mdm_vgg_net16.pt").exists());
    }

    #[actix_web::test]
    async fn existing_artifact_is_not_fetched() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        std::fs::write(&config.path, PAYLOAD).unwrap();

        let (source, fetches) = CountingSource::new();
        let (provider, _) = build_provider(config, source);
        let handle = provider.ensure_model_available().await.unwrap();

        assert_eq!(fetches.load(Ordering::SeqCst), 0);
        let probabilities = handle.predict(&Array4::zeros((1, 2, 2, 3))).unwrap();
        assert_eq!(probabilities, vec![0.25, 0.75]);
    }

    #[actix_web::test]
    async fn fetch_failure_is_model_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let (mut source, fetches) = CountingSource::new();
        source.fail = true;
        let (provider, loads) = build_provider(config_in(dir.path()), source);

        assert!(matches!(
            provider.ensure_model_available().await,
            Err(ModelUnavailableError::Fetch(DriveError::ConfirmationNotFound))
        ));
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert_eq!(loads.load(Ordering::SeqCst), 0);
    }

    #[actix_web::test]
    async fn corrupt_artifact_is_model_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        std::fs::write(&config.path, b"PK\x03\x04truncated").unwrap();

        let (source, _) = CountingSource::new();
        let (provider, _) = build_provider(config, source);
        assert!(matches!(
            provider.ensure_model_available().await,
            Err(ModelUnavailableError::Load(_))
        ));
    }

    #[actix_web::test]
    async fn matching_checksum_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.sha256 = Some(payload_sha256().to_uppercase());

        let (source, _) = CountingSource::new();
        let (provider, _) = build_provider(config, source);
        assert!(provider.ensure_model_available().await.is_ok());
    }

    #[actix_web::test]
    async fn checksum_mismatch_removes_download() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.sha256 = Some(WRONG_SHA256.to_string());
        let path = config.path.clone();

        let (source, _) = CountingSource::new();
        let (provider, loads) = build_provider(config, source);
        assert!(matches!(
            provider.ensure_model_available().await,
            Err(ModelUnavailableError::ChecksumMismatch { .. })
        ));
        assert!(!path.exists());
        assert_eq!(loads.load(Ordering::SeqCst), 0);
    }

    #[actix_web::test]
    async fn cached_artifact_with_wrong_checksum_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.sha256 = Some(WRONG_SHA256.to_string());
        std::fs::write(&config.path, PAYLOAD).unwrap();
        let path = config.path.clone();

        let (source, fetches) = CountingSource::new();
        let (provider, _) = build_provider(config, source);
        assert!(matches!(
            provider.ensure_model_available().await,
            Err(ModelUnavailableError::ChecksumMismatch { .. })
        ));
        assert!(path.exists());
        assert_eq!(fetches.load(Ordering::SeqCst), 0);
    }

    #[actix_web::test]
    async fn fetched_keras_file_is_rejected_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let path = config.path.clone();

        let (mut source, fetches) = CountingSource::new();
        source.payload = KERAS_PAYLOAD;
        let (provider, loads) = build_provider(config, source);

        let err = provider.ensure_model_available().await.err().unwrap();
        assert!(matches!(
            err,
            ModelUnavailableError::NotTorchScript {
                found: "an HDF5 (Keras) file",
                ..
            }
        ));
        assert!(err.to_string().contains("not a TorchScript export"));
        assert!(!path.exists());
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert_eq!(loads.load(Ordering::SeqCst), 0);
    }

    #[actix_web::test]
    async fn cached_keras_file_is_rejected_before_loading() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        std::fs::write(&config.path, KERAS_PAYLOAD).unwrap();

        let (source, fetches) = CountingSource::new();
        let (provider, loads) = build_provider(config, source);
        assert!(matches!(
            provider.ensure_model_available().await,
            Err(ModelUnavailableError::NotTorchScript { .. })
        ));
        assert_eq!(fetches.load(Ordering::SeqCst), 0);
        assert_eq!(loads.load(Ordering::SeqCst), 0);
    }

    #[actix_web::test]
    async fn missing_artifact_without_file_id_is_not_fetched() {
        let dir = tempfile::tempdir().unwrap();
        let config = ModelConfig {
            file_id: None,
            ..config_in(dir.path())
        };

        let (source, fetches) = CountingSource::new();
        let (provider, _) = build_provider(config, source);
        assert!(matches!(
            provider.ensure_model_available().await,
            Err(ModelUnavailableError::NoSource { .. })
        ));
        assert_eq!(fetches.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn drive_fetch_future_is_send() {
        fn assert_send<T: Send>(_: &T) {}
        let service = DriveService::new("https://drive.google.com/uc").unwrap();
        let dest = PathBuf::from("mdm_vgg_net16.pt");
        let fetch = service.fetch("abc", &dest);
        assert_send(&fetch);
    }
}
