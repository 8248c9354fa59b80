use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_bind: String,
    pub model_path: String,
    pub assets_dir: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8050".into(),
            model_path: "models/finalmodel.json".into(),
            assets_dir: "assets".into(),
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("server.toml") {
        apply_file_config(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());

    settings
}

fn apply_file_config(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) else {
        return;
    };
    if let Some(v) = file_cfg.get("bind_addr") {
        settings.server_bind = v.clone();
    }
    if let Some(v) = file_cfg.get("model_path") {
        settings.model_path = v.clone();
    }
    if let Some(v) = file_cfg.get("assets_dir") {
        settings.assets_dir = v.clone();
    }
}

/// The `APP__` spelling wins over the plain one when both are set.
fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = lookup("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = lookup("MODEL_PATH") {
        settings.model_path = v;
    }
    if let Some(v) = lookup("APP__MODEL_PATH") {
        settings.model_path = v;
    }

    if let Some(v) = lookup("ASSETS_DIR") {
        settings.assets_dir = v;
    }
    if let Some(v) = lookup("APP__ASSETS_DIR") {
        settings.assets_dir = v;
    }
}

pub fn prepare_model_path(raw_model_path: &str) -> anyhow::Result<PathBuf> {
    let path = normalize_model_path(raw_model_path);
    ensure_artifact_exists(&path)?;
    Ok(path)
}

fn normalize_model_path(raw_model_path: &str) -> PathBuf {
    let raw_model_path = raw_model_path.trim();

    if raw_model_path.is_empty() {
        return PathBuf::from(Settings::default().model_path);
    }

    PathBuf::from(raw_model_path)
}

fn ensure_artifact_exists(path: &Path) -> anyhow::Result<()> {
    let metadata = fs::metadata(path)
        .with_context(|| format!("model artifact '{}' is not readable", path.display()))?;
    anyhow::ensure!(
        metadata.is_file(),
        "model artifact '{}' is not a regular file",
        path.display()
    );
    Ok(())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
