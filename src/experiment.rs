//! Experiment metadata and where a session's log goes.
//!
//! The settings file holds one value per line, in this order:
//! subject number, subject sex, subject age, game scene, control mode.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::errors::{DriverError, Result};

pub const DEFAULT_SETTINGS_FILE: &str = "ExperimentSettings.txt";

const FIELDS: [&str; 5] = ["subject", "sex", "age", "scene", "control mode"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentSettings {
    pub subject: String,
    pub sex: String,
    pub age: String,
    pub scene: String,
    pub control_mode: String,
}

impl ExperimentSettings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            DriverError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines().map(str::trim_end);
        let mut next = |field: &str| {
            lines
                .next()
                .map(str::to_owned)
                .ok_or_else(|| DriverError::Config(format!("experiment settings missing {field}")))
        };

        Ok(Self {
            subject: next(FIELDS[0])?,
            sex: next(FIELDS[1])?,
            age: next(FIELDS[2])?,
            scene: next(FIELDS[3])?,
            control_mode: next(FIELDS[4])?,
        })
    }

    /// `<root>/S<subject>/GSR_PPG/S<subject>_<sex><age>_<scene>_<mode>.csv`
    pub fn log_path(&self, root: impl AsRef<Path>) -> PathBuf {
        let file = format!(
            "S{}_{}{}_{}_{}.csv",
            self.subject, self.sex, self.age, self.scene, self.control_mode
        );
        self.log_dir(root).join(file)
    }

    /// Resolve [`Self::log_path`] and create its directory if needed.
    pub fn prepare_log_path(&self, root: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = self.log_dir(&root);
        if !dir.exists() {
            debug!("creating log directory {}", dir.display());
            fs::create_dir_all(&dir)?;
        }
        Ok(self.log_path(root))
    }

    fn log_dir(&self, root: impl AsRef<Path>) -> PathBuf {
        root.as_ref()
            .join(format!("S{}", self.subject))
            .join("GSR_PPG")
    }
}
