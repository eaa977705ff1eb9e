//! Error and Result module.
use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::multipart;

/// Result type often returned from methods that can have upload-cgi `Error`s.
pub type Result<T> = std::result::Result<T, Error>;

/// A set of errors that can occur while handling an upload.
///
/// None of these are turned into an HTTP response: the process reports them
/// on stderr and exits abnormally.
pub enum Error {
    /// A configuration variable held an unrecognized value.
    Config(String),
    /// A CGI meta-variable could not be interpreted.
    InvalidCgiVariable {
        name: &'static str,
        value: String,
    },
    /// The request body is not a valid `multipart/*` form.
    MalformedRequest(multipart::Error),
    /// The upload directory could not be created.
    DirectoryCreation {
        path: PathBuf,
        source: io::Error,
    },
    /// The target file could not be created or written.
    FileWrite {
        path: PathBuf,
        source: io::Error,
    },
    /// The client filename was refused by the `reject` policy.
    RejectedFilename(String),
    /// Writing the response failed.
    Io(io::Error),
}

impl Error {
    /// Whether the request itself (rather than the host) was at fault.
    pub fn is_malformed_request(&self) -> bool {
        matches!(
            self,
            Error::MalformedRequest(_) | Error::InvalidCgiVariable { .. }
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Config(ref msg) => write!(f, "invalid configuration: {}", msg),
            Error::InvalidCgiVariable { name, ref value } => {
                write!(f, "invalid CGI variable {}={:?}", name, value)
            }
            Error::MalformedRequest(ref e) => write!(f, "malformed request: {}", e),
            Error::DirectoryCreation { ref path, ref source } => {
                write!(f, "cannot create directory {}: {}", path.display(), source)
            }
            Error::FileWrite { ref path, ref source } => {
                write!(f, "cannot write {}: {}", path.display(), source)
            }
            Error::RejectedFilename(ref name) => write!(f, "rejected filename {:?}", name),
            Error::Io(ref e) => fmt::Display::fmt(e, f),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)?;
        if let Some(source) = self.source() {
            write!(f, ": {:?}", source)?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::MalformedRequest(ref e) => Some(e),
            Error::DirectoryCreation { ref source, .. } => Some(source),
            Error::FileWrite { ref source, .. } => Some(source),
            Error::Io(ref e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<multipart::Error> for Error {
    fn from(err: multipart::Error) -> Error {
        match err {
            // errors raised by a file hook travel through the parser untouched
            multipart::Error::Hook(inner) => *inner,
            other => Error::MalformedRequest(other),
        }
    }
}
