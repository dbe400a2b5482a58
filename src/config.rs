use crate::error::{FarmAssistError, Result};
use farm_assist_common::AdviceBook;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const MODEL_ENV: &str = "FARM_ASSIST_MODEL";
pub const LABELS_ENV: &str = "FARM_ASSIST_LABELS";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model_path: PathBuf,
    pub labels_path: PathBuf,
    /// 設定時のみモデルファイルのSHA-256を検証
    pub model_sha256: Option<String>,
    /// アドバイスルールの上書きJSON
    pub rules_path: Option<PathBuf>,
    pub top_k: usize,
    pub input_size: u32,
    pub apply_softmax: bool,
}

impl Default for Config {
    fn default() -> Self {
        let models = Self::config_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join("models");
        Self {
            model_path: models.join("mobilenetv2-12.onnx"),
            labels_path: models.join("imagenet_labels.txt"),
            model_sha256: None,
            rules_path: None,
            top_k: 3,
            input_size: 224,  // MobileNet入力サイズ
            apply_softmax: true,
        }
    }
}

impl Config {
    /// 既定パス（~/.config/farm-assist/config.json）から読み込み
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            Self::default()
        };

        // 環境変数を優先
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup(MODEL_ENV).filter(|v| !v.is_empty()) {
            self.model_path = PathBuf::from(model);
        }
        if let Some(labels) = lookup(LABELS_ENV).filter(|v| !v.is_empty()) {
            self.labels_path = PathBuf::from(labels);
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| FarmAssistError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("farm-assist"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(FarmAssistError::Config("top_k は1以上を指定してください".into()));
        }
        if self.input_size == 0 {
            return Err(FarmAssistError::Config("input_size は1以上を指定してください".into()));
        }
        Ok(())
    }

    /// ルールファイル指定があれば読み込み、なければ組み込み表
    pub fn advice_book(&self) -> Result<AdviceBook> {
        match &self.rules_path {
            Some(path) => Ok(AdviceBook::from_file(path)?),
            None => Ok(AdviceBook::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("none.json")).unwrap();
        assert_eq!(config.top_k, 3);
        assert_eq!(config.input_size, 224);
        assert!(config.apply_softmax);
        assert!(config.rules_path.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            top_k: 5,
            model_sha256: Some("abc".into()),
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.top_k, 5);
        assert_eq!(loaded.model_sha256.as_deref(), Some("abc"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "top_k": 4 }"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.top_k, 4);
        assert_eq!(config.input_size, 224);
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let mut config = Config {
            model_path: PathBuf::from("/from/file.onnx"),
            labels_path: PathBuf::from("/from/file.txt"),
            ..Config::default()
        };
        config.apply_overrides(|key| match key {
            MODEL_ENV => Some("/from/env.onnx".to_string()),
            _ => None,
        });
        assert_eq!(config.model_path, PathBuf::from("/from/env.onnx"));
        assert_eq!(config.labels_path, PathBuf::from("/from/file.txt"));

        // 空文字は未設定扱い
        config.apply_overrides(|_| Some(String::new()));
        assert_eq!(config.model_path, PathBuf::from("/from/env.onnx"));
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "top_k": 0 }"#).unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, FarmAssistError::Config(_)));
    }

    #[test]
    fn test_advice_book_from_rules_path() {
        let dir = tempdir().unwrap();
        let rules = dir.path().join("rules.json");
        std::fs::write(
            &rules,
            r#"{ "weather": { "rules": [], "fallback": "always this" } }"#,
        )
        .unwrap();

        let config = Config {
            rules_path: Some(rules),
            ..Config::default()
        };
        let book = config.advice_book().unwrap();
        assert_eq!(book.weather.fallback, "always this");
    }
}
