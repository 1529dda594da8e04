use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = "config/app.yaml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub frontend_dir: String,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
            frontend_dir: "frontend/dist".to_string(),
            max_upload_bytes: 200 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorLayout {
    /// `[batch, height, width, channels]`, what the Keras export expects.
    #[default]
    Nhwc,
    Nchw,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Drive id of a TorchScript export. Only needed when `path` is absent.
    pub file_id: Option<String>,
    pub path: PathBuf,
    pub download_url: String,
    pub sha256: Option<String>,
    pub input_size: u32,
    pub layout: TensorLayout,
    pub apply_softmax: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            file_id: None,
            path: PathBuf::from("mdm_vgg_net16.pt"),
            download_url: "https://drive.google.com/uc".to_string(),
            sha256: None,
            input_size: 224,
            layout: TensorLayout::Nhwc,
            apply_softmax: false,
        }
    }
}

impl AppConfig {
    /// Reads `$MDM_CONFIG` (or `config/app.yaml`), then applies `PORT`.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path =
            std::env::var("MDM_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::from_file(Path::new(&config_path))?;

        if let Ok(port) = std::env::var("PORT") {
            config.server.port = port
                .parse()
                .map_err(|e| format!("Invalid PORT value {port:?}: {e}"))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if !path.exists() {
            log::warn!(
                "Config file {} not found, using built-in defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let config_str = std::fs::read_to_string(path)?;
        Self::from_yaml(&config_str)
    }

    pub fn from_yaml(config_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: AppConfig = serde_yaml::from_str(config_str)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(file_id) = &self.model.file_id {
            if file_id.trim().is_empty() {
                return Err(
                    "model.file_id must not be blank; omit it to use a local artifact".into(),
                );
            }
        }
        if self.model.input_size == 0 {
            return Err("model.input_size must be greater than zero".into());
        }
        url::Url::parse(&self.model.download_url)
            .map_err(|e| format!("model.download_url is not an absolute URL: {e}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_expect_a_local_artifact() {
        let config = AppConfig::default();
        assert_eq!(config.model.file_id, None);
        assert_eq!(config.model.path, PathBuf::from("mdm_vgg_net16.pt"));
        assert_eq!(config.model.input_size, 224);
        assert_eq!(config.model.layout, TensorLayout::Nhwc);
        assert_eq!(config.server.port, 8081);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = AppConfig::from_yaml(
            "model:\n  path: models/leaf.pt\n  layout: nchw\nserver:\n  port: 9000\n",
        )
        .unwrap();
        assert_eq!(config.model.path, PathBuf::from("models/leaf.pt"));
        assert_eq!(config.model.layout, TensorLayout::Nchw);
        assert_eq!(config.model.input_size, 224);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.model.file_id = Some("  ".to_string());
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.model.input_size = 0;
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.model.download_url = "drive/uc".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::from_file(&dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config.model.path, PathBuf::from("mdm_vgg_net16.pt"));
    }

    #[test]
    fn reads_the_file_on_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "model:\n  file_id: 1AbCdE\n  sha256: abc123\n  apply_softmax: true"
        )
        .unwrap();
        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.model.file_id.as_deref(), Some("1AbCdE"));
        assert_eq!(config.model.sha256.as_deref(), Some("abc123"));
        assert!(config.model.apply_softmax);
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        assert!(AppConfig::from_yaml("model: [unclosed").is_err());
    }
}
