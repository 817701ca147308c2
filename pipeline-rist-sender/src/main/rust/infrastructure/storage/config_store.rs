use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::errors::{DomainError, Result};
use crate::domain::value_objects::PipelineConfig;

/// Owns the YAML pipeline configuration document on disk
///
/// Writers are serialized on `write_lock` since they share one staging file.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the default document if none exists yet
    pub fn ensure_default(&self) -> Result<()> {
        let _guard = self.lock_writes();
        if self.path.exists() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let text = serialize_document(&PipelineConfig::default())?;
        fs::write(&self.path, text).map_err(|e| self.io_error(e))?;

        tracing::info!(path = ?self.path, "Wrote default configuration");
        Ok(())
    }

    /// Parse the document into the typed configuration and range check it
    pub fn load(&self) -> Result<PipelineConfig> {
        let text = self.read_raw()?;
        let config = parse_document(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn read_raw(&self) -> Result<String> {
        self.ensure_default()?;
        fs::read_to_string(&self.path).map_err(|e| self.io_error(e))
    }

    /// Persist `text` verbatim if it is well-formed YAML
    ///
    /// Only syntax is checked here; field values are checked by `load`. A
    /// rejected write leaves the existing document untouched.
    pub fn write_raw(&self, text: &str) -> Result<()> {
        check_syntax(text)?;

        let _guard = self.lock_writes();
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        // Readers never see a half-written document
        let staging = self.path.with_extension("yml.tmp");
        fs::write(&staging, text).map_err(|e| self.io_error(e))?;
        fs::rename(&staging, &self.path).map_err(|e| self.io_error(e))?;

        tracing::info!(path = ?self.path, bytes = text.len(), "Configuration replaced");
        Ok(())
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn io_error(&self, source: std::io::Error) -> DomainError {
        DomainError::ConfigIo {
            path: self.path.clone(),
            source,
        }
    }
}

fn check_syntax(text: &str) -> Result<serde_yaml::Value> {
    serde_yaml::from_str(text).map_err(|e| DomainError::ConfigFormat(e.to_string()))
}

fn parse_document(text: &str) -> Result<PipelineConfig> {
    match check_syntax(text)? {
        serde_yaml::Value::Null => Ok(PipelineConfig::default()),
        value => serde_yaml::from_value(value)
            .map_err(|e| DomainError::ConfigSemantic(e.to_string())),
    }
}

fn serialize_document(config: &PipelineConfig) -> Result<String> {
    serde_yaml::to_string(config).map_err(|e| DomainError::ConfigFormat(e.to_string()))
}
