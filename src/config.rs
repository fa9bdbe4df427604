use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;

use crate::{extract::embedded_state::DEFAULT_STATE_VARIABLE, fs_json_util::read_toml, website};

const DEFAULT_INPUT_FILE_NAME: &str =
    "Dr. Joanna Latek, OD, New York, NY _ Optometrist _ Get Virtual Care.html";

/// Settings for a run. Every key is optional in the TOML file.
#[derive(Clone, PartialEq, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// The saved profile page.
    pub input: PathBuf,
    pub output_dir: PathBuf,
    /// Provider name for the summary when the page does not expose one.
    pub provider: String,
    /// Name of the `window.<name> = JSON.parse("...")` assignment.
    pub state_variable: String,
    /// Location label for the website export.
    pub location: String,
}

impl Default for Config {
    fn default() -> Self {
        let downloads = std::env::var_os("HOME")
            .map_or_else(PathBuf::new, PathBuf::from)
            .join("Downloads");
        Self {
            input: downloads.join(DEFAULT_INPUT_FILE_NAME),
            output_dir: "data/reviews".into(),
            provider: "Dr. Joanna Latek, OD".to_owned(),
            state_variable: DEFAULT_STATE_VARIABLE.to_owned(),
            location: website::DEFAULT_LOCATION.to_owned(),
        }
    }
}

impl Config {
    /// Reads the file when given, otherwise uses the defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                debug!("Loading config from {path:?}");
                read_toml(path)
            }
            None => Ok(Self::default()),
        }
    }
}
