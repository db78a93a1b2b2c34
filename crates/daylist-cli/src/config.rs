// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use daylist_app::{Priority, TaskFilter};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_VERSION: i64 = 1;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            storage: Storage::default(),
            ui: Ui::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Storage {
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ui {
    pub default_priority: Option<String>,
    pub default_filter: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
            file: None,
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("DAYLIST_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set DAYLIST_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(daylist_db::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version; add `version = 1` at the top and keep values under [storage], [ui], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1 (run `daylist --print-example-config` for a template)",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(db_path) = &self.storage.db_path {
            daylist_db::validate_db_path(db_path)
                .with_context(|| format!("invalid storage.db_path in {}", path.display()))?;
        }

        if let Some(priority) = &self.ui.default_priority
            && Priority::parse(priority).is_none()
        {
            bail!(
                "ui.default_priority in {} must be one of Low, Medium, High; got {:?}",
                path.display(),
                priority
            );
        }

        if let Some(filter) = &self.ui.default_filter
            && TaskFilter::parse(filter).is_none()
        {
            bail!(
                "ui.default_filter in {} must be one of all, completed, pending; got {:?}",
                path.display(),
                filter
            );
        }

        if let Some(level) = &self.log.level
            && level.trim().is_empty()
        {
            bail!("log.level in {} must not be empty", path.display());
        }

        if let Some(file) = &self.log.file
            && file.trim().is_empty()
        {
            bail!(
                "log.file in {} must not be empty; remove it to use the default",
                path.display()
            );
        }

        Ok(())
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.storage.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => daylist_db::default_db_path(),
        }
    }

    pub fn default_priority(&self) -> Priority {
        self.ui
            .default_priority
            .as_deref()
            .and_then(Priority::parse)
            .unwrap_or_default()
    }

    pub fn default_filter(&self) -> TaskFilter {
        self.ui
            .default_filter
            .as_deref()
            .and_then(TaskFilter::parse)
            .unwrap_or_default()
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        match &self.log.file {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(daylist_db::data_dir()?.join("daylist.log")),
        }
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# daylist config\n# Place this file at: {}\n\nversion = 1\n\n[storage]\n# Optional. Default is platform data dir (for example ~/.local/share/daylist/daylist.db)\n# db_path = \"/absolute/path/to/daylist.db\"\n\n[ui]\n# Low | Medium | High\ndefault_priority = \"Medium\"\n# all | completed | pending\ndefault_filter = \"all\"\n\n[log]\n# tracing filter directive; DAYLIST_LOG overrides it\nlevel = \"{}\"\n# file = \"/absolute/path/to/daylist.log\"\n",
            path.display(),
            DEFAULT_LOG_LEVEL,
        )
    }
}
