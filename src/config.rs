use crate::error::{LesionVisionError, Result};
use lesion_vision_common::LesionCategory;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// 検出リクエストの発行方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// 全カテゴリを同時に発行（デフォルト）
    #[default]
    Concurrent,
    /// 1カテゴリずつ順番に発行
    Sequential,
}

/// アップロード先の設定
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub cloud_name: Option<String>,
    pub upload_preset: Option<String>,
    pub folder: Option<String>,
    /// APIのベースURL（省略時は公式エンドポイント）
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// カテゴリごとの検出サービスURL（未設定のカテゴリは常に失敗扱い）
    pub detectors: BTreeMap<LesionCategory, String>,
    pub timeout_seconds: u64,
    pub dispatch: DispatchMode,
    pub upload: UploadConfig,
    pub records_dir: Option<PathBuf>,
    pub bind: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            detectors: BTreeMap::new(),
            timeout_seconds: 120,
            dispatch: DispatchMode::Concurrent,
            upload: UploadConfig::default(),
            records_dir: None,
            bind: "127.0.0.1:5000".into(),
        }
    }
}

impl Config {
    /// 設定ファイル + 環境変数から読み込み（環境変数を優先）
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let config = Self::load_from(&config_path)?;
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// 指定パスから読み込み（存在しなければデフォルト）
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| LesionVisionError::Config("home directory not found".into()))?;
        Ok(home.join(".config").join("lesion-vision").join("config.json"))
    }

    /// 環境変数で上書き（空文字は未設定扱い）
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        for category in LesionCategory::ALL {
            if let Some(url) = get(category.env_var()) {
                self.detectors.insert(category, url);
            }
        }

        if let Some(cloud_name) = get("UPLOAD_CLOUD_NAME") {
            self.upload.cloud_name = Some(cloud_name);
        }
        if let Some(preset) = get("UPLOAD_PRESET") {
            self.upload.upload_preset = Some(preset);
        }
        if let Some(dir) = get("LESION_VISION_RECORDS_DIR") {
            self.records_dir = Some(PathBuf::from(dir));
        }
        if let Some(bind) = get("LESION_VISION_BIND") {
            self.bind = bind;
        }

        self
    }

    /// レコード保存先（未設定ならデータディレクトリ配下）
    pub fn records_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.records_dir {
            return Ok(dir.clone());
        }
        let base = dirs::data_dir()
            .ok_or_else(|| LesionVisionError::Config("data directory not found".into()))?;
        Ok(base.join("lesion-vision").join("records"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.detectors.is_empty());
        assert_eq!(config.timeout_seconds, 120);
        assert_eq!(config.dispatch, DispatchMode::Concurrent);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("STREAKS_API", "http://ml:8000/streaks"),
            ("MILIA_API", "http://ml:8000/milia"),
            ("GLOBULES_API", "   "),
            ("UPLOAD_CLOUD_NAME", "demo"),
        ]
        .into_iter()
        .collect();

        let config = Config::default()
            .with_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.detectors.len(), 2);
        assert_eq!(
            config.detectors.get(&LesionCategory::MiliaLikeCysts).map(String::as_str),
            Some("http://ml:8000/milia")
        );
        assert!(!config.detectors.contains_key(&LesionCategory::Globules));
        assert_eq!(config.upload.cloud_name.as_deref(), Some("demo"));
    }

    #[test]
    fn test_parse_partial_file() {
        let json = r#"{
            "detectors": { "pigment": "http://ml:8000/pigment" },
            "dispatch": "sequential"
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.dispatch, DispatchMode::Sequential);
        assert!(config.detectors.contains_key(&LesionCategory::PigmentNetwork));
        assert_eq!(config.bind, "127.0.0.1:5000");
    }

    #[test]
    fn test_load_from_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("none.json")).unwrap();
        assert_eq!(config, Config::default());
    }
}
