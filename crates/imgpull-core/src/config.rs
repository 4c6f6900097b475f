use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Default input file, relative to the working directory.
pub const DEFAULT_INPUT_PATH: &str = "images.csv";

/// Default output directory, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "images_folder_python";

/// Global configuration loaded from `~/.config/imgpull/config.toml`.
///
/// Network timeout, per-record delay and chunk size are fixed in
/// [`crate::downloader::FetchOptions`] and intentionally absent here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImgpullConfig {
    /// CSV file listing the image records.
    pub input_path: PathBuf,
    /// Directory the images are written to; created if missing.
    pub output_dir: PathBuf,
}

impl Default for ImgpullConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from(DEFAULT_INPUT_PATH),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl ImgpullConfig {
    /// Replace configured paths with the ones given on the command line, if any.
    pub fn with_overrides(mut self, input: Option<PathBuf>, output_dir: Option<PathBuf>) -> Self {
        if let Some(input) = input {
            self.input_path = input;
        }
        if let Some(dir) = output_dir {
            self.output_dir = dir;
        }
        self
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("imgpull")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ImgpullConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ImgpullConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)
            .with_context(|| format!("failed to write default config: {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    let cfg: ImgpullConfig =
        toml::from_str(&data).with_context(|| format!("invalid config: {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn default_config_values() {
        let cfg = ImgpullConfig::default();
        assert_eq!(cfg.input_path, Path::new("images.csv"));
        assert_eq!(cfg.output_dir, Path::new("images_folder_python"));
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = ImgpullConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: ImgpullConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            input_path = "/data/products.csv"
            output_dir = "/data/images"
        "#;
        let cfg: ImgpullConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.input_path, Path::new("/data/products.csv"));
        assert_eq!(cfg.output_dir, Path::new("/data/images"));
    }

    #[test]
    fn config_toml_missing_keys_use_defaults() {
        let cfg: ImgpullConfig = toml::from_str(r#"output_dir = "out""#).unwrap();
        assert_eq!(cfg.input_path, Path::new(DEFAULT_INPUT_PATH));
        assert_eq!(cfg.output_dir, Path::new("out"));

        let empty: ImgpullConfig = toml::from_str("").unwrap();
        assert_eq!(empty, ImgpullConfig::default());
    }

    #[test]
    fn cli_overrides_replace_only_given_paths() {
        let cfg = ImgpullConfig::default().with_overrides(Some(PathBuf::from("rows.csv")), None);
        assert_eq!(cfg.input_path, Path::new("rows.csv"));
        assert_eq!(cfg.output_dir, Path::new(DEFAULT_OUTPUT_DIR));

        let cfg = ImgpullConfig::default().with_overrides(None, Some(PathBuf::from("pics")));
        assert_eq!(cfg.input_path, Path::new(DEFAULT_INPUT_PATH));
        assert_eq!(cfg.output_dir, Path::new("pics"));
    }
}
