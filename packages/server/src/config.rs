//! Service configuration loaded from environment variables.
//!
//! Values are read from the process environment, optionally seeded from an
//! `app.env` (preferred) or `.env` file.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::{
    domain::{DEFAULT_HISTORY_CAPACITY, DEFAULT_MEMBER_CAPACITY},
    infrastructure::{
        blob_storage::{CloudinaryCredentials, cloudinary::DEFAULT_CLOUDINARY_BASE_URL},
        image_generator::openai::{DEFAULT_IMAGE_MODEL, DEFAULT_IMAGE_SIZE, DEFAULT_OPENAI_BASE_URL},
    },
};

/// External services and room limits
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// OpenAI API key
    pub open_ai_key: String,
    #[serde(default = "default_openai_image_model")]
    pub openai_image_model: String,
    #[serde(default = "default_openai_image_size")]
    pub openai_image_size: String,
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    pub cloudinary_cloud_name: String,
    pub cloudinary_api_key: String,
    pub cloudinary_secret_key: String,
    #[serde(default = "default_cloudinary_base_url")]
    pub cloudinary_base_url: String,

    /// Timeout for each external call of a generation (seconds)
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,
    #[serde(default = "default_room_max_members")]
    pub room_max_members: usize,
    #[serde(default = "default_room_history_capacity")]
    pub room_history_capacity: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable error: {0}")]
    Env(#[from] envy::Error),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

impl ServiceConfig {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            dotenvy::dotenv().ok();
        }

        let config = Self::from_iter(std::env::vars())?;
        tracing::info!("Configuration loaded");
        Ok(config)
    }

    /// Build configuration from key/value pairs (upper-case keys)
    pub fn from_iter<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Self = envy::from_iter(vars)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.generation_timeout_secs == 0 {
            return Err(ConfigError::Zero("GENERATION_TIMEOUT_SECS"));
        }
        if self.room_max_members == 0 {
            return Err(ConfigError::Zero("ROOM_MAX_MEMBERS"));
        }
        if self.room_history_capacity == 0 {
            return Err(ConfigError::Zero("ROOM_HISTORY_CAPACITY"));
        }
        Ok(())
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    pub fn cloudinary_credentials(&self) -> CloudinaryCredentials {
        CloudinaryCredentials {
            cloud_name: self.cloudinary_cloud_name.clone(),
            api_key: self.cloudinary_api_key.clone(),
            api_secret: self.cloudinary_secret_key.clone(),
        }
    }
}

fn default_openai_image_model() -> String {
    DEFAULT_IMAGE_MODEL.to_string()
}

fn default_openai_image_size() -> String {
    DEFAULT_IMAGE_SIZE.to_string()
}

fn default_openai_base_url() -> String {
    DEFAULT_OPENAI_BASE_URL.to_string()
}

fn default_cloudinary_base_url() -> String {
    DEFAULT_CLOUDINARY_BASE_URL.to_string()
}

fn default_generation_timeout_secs() -> u64 {
    60
}

fn default_room_max_members() -> usize {
    DEFAULT_MEMBER_CAPACITY
}

fn default_room_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required() -> Vec<(String, String)> {
        [
            ("OPEN_AI_KEY", "sk-test"),
            ("CLOUDINARY_CLOUD_NAME", "demo"),
            ("CLOUDINARY_API_KEY", "123456"),
            ("CLOUDINARY_SECRET_KEY", "s3cr3t"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_defaults_apply() {
        // テスト項目: 必須項目だけで読み込め、残りはデフォルト値になる
        // given (前提条件):
        let vars = required();

        // when (操作):
        let config = ServiceConfig::from_iter(vars).unwrap();

        // then (期待する結果):
        assert_eq!(config.openai_image_model, "dall-e-3");
        assert_eq!(config.openai_image_size, "1024x1024");
        assert_eq!(config.openai_base_url, "https://api.openai.com/v1");
        assert_eq!(config.cloudinary_base_url, "https://api.cloudinary.com/v1_1");
        assert_eq!(config.generation_timeout(), Duration::from_secs(60));
        assert_eq!(config.room_max_members, 4);
        assert_eq!(config.room_history_capacity, 20);
        assert_eq!(config.cloudinary_credentials().api_secret, "s3cr3t");
    }

    #[test]
    fn test_overrides_are_parsed() {
        // テスト項目: 環境変数で上書きした値が数値として読み込まれる
        // given (前提条件):
        let mut vars = required();
        vars.push(("GENERATION_TIMEOUT_SECS".to_string(), "15".to_string()));
        vars.push(("ROOM_HISTORY_CAPACITY".to_string(), "5".to_string()));

        // when (操作):
        let config = ServiceConfig::from_iter(vars).unwrap();

        // then (期待する結果):
        assert_eq!(config.generation_timeout(), Duration::from_secs(15));
        assert_eq!(config.room_history_capacity, 5);
    }

    #[test]
    fn test_missing_api_key_is_error() {
        // テスト項目: 必須項目が欠けていると読み込みに失敗する
        // given (前提条件):
        let vars: Vec<(String, String)> = required()
            .into_iter()
            .filter(|(k, _)| k != "OPEN_AI_KEY")
            .collect();

        // when (操作):
        let result = ServiceConfig::from_iter(vars);

        // then (期待する結果):
        assert!(matches!(result, Err(ConfigError::Env(_))));
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        // テスト項目: 0 の容量は拒否される
        // given (前提条件):
        let mut vars = required();
        vars.push(("ROOM_MAX_MEMBERS".to_string(), "0".to_string()));

        // when (操作):
        let result = ServiceConfig::from_iter(vars);

        // then (期待する結果):
        assert!(matches!(result, Err(ConfigError::Zero("ROOM_MAX_MEMBERS"))));
    }
}
