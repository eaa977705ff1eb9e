//! Runtime configuration, read from the environment of the CGI process.
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::response::Framing;
use crate::{Error, Result};

pub const DIR_VAR: &str = "UPLOAD_CGI_DIR";
pub const FIELD_VAR: &str = "UPLOAD_CGI_FIELD";
pub const FILENAME_POLICY_VAR: &str = "UPLOAD_CGI_FILENAME_POLICY";
pub const FRAMING_VAR: &str = "UPLOAD_CGI_FRAMING";
/// Read by the binary to filter log output.
pub const LOG_VAR: &str = "UPLOAD_CGI_LOG";

/// What to do with the filename the client sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilenamePolicy {
    /// Use it verbatim as a path component, path separators included.
    Permissive,
    /// Refuse names with path separators, NUL, `.` or `..`.
    Reject,
    /// Keep only the last path component.
    Sanitize,
}

impl Default for FilenamePolicy {
    fn default() -> FilenamePolicy {
        FilenamePolicy::Permissive
    }
}

impl FromStr for FilenamePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<FilenamePolicy, String> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" => Ok(FilenamePolicy::Permissive),
            "reject" => Ok(FilenamePolicy::Reject),
            "sanitize" => Ok(FilenamePolicy::Sanitize),
            other => Err(format!(
                "unknown filename policy {:?}, expected permissive, reject or sanitize",
                other
            )),
        }
    }
}

impl fmt::Display for FilenamePolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FilenamePolicy::Permissive => f.write_str("permissive"),
            FilenamePolicy::Reject => f.write_str("reject"),
            FilenamePolicy::Sanitize => f.write_str("sanitize"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct UploadConfig {
    /// Where uploads are stored, relative to the working directory unless absolute.
    pub dir: PathBuf,
    /// The form field carrying the file.
    pub field: String,
    pub filename_policy: FilenamePolicy,
    pub framing: Framing,
}

impl Default for UploadConfig {
    fn default() -> UploadConfig {
        UploadConfig {
            dir: PathBuf::from("uploads"),
            field: "filename".to_string(),
            filename_policy: FilenamePolicy::default(),
            framing: Framing::default(),
        }
    }
}

impl UploadConfig {
    /// Reads the `UPLOAD_CGI_*` variables of this process.
    pub fn from_env() -> Result<UploadConfig> {
        UploadConfig::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a config from any variable source. Unset or empty variables
    /// keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<UploadConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = UploadConfig::default();

        if let Some(dir) = get(DIR_VAR) {
            config.dir = PathBuf::from(dir);
        }
        if let Some(field) = get(FIELD_VAR) {
            config.field = field;
        }
        if let Some(policy) = get(FILENAME_POLICY_VAR) {
            config.filename_policy = policy.parse().map_err(Error::Config)?;
        }
        if let Some(framing) = get(FRAMING_VAR) {
            config.framing = framing.parse().map_err(Error::Config)?;
        }
        debug!("config {:?}", config);
        Ok(config)
    }
}
