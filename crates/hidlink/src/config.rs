use std::fs;
use std::path::Path;

use hidlink_session::{ScanConfig, SessionConfig};
use serde::{Deserialize, Serialize};

use crate::exit::{io_error, CliError, CliResult, DATA_INVALID};

/// Contents of a `--config` file. Missing sections fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub scan: ScanConfig,
    pub session: SessionConfig,
}

impl FileConfig {
    pub fn from_json(text: &str) -> CliResult<Self> {
        serde_json::from_str(text)
            .map_err(|err| CliError::new(DATA_INVALID, format!("invalid config: {err}")))
    }
}

pub fn load(path: Option<&Path>) -> CliResult<FileConfig> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };
    let text = fs::read_to_string(path)
        .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
    FileConfig::from_json(&text).map_err(|err| {
        CliError::new(err.code, format!("{}: {}", path.display(), err.message))
    })
}
