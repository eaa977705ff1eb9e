//! The upload handler.
//!
//! One request, two outcomes: the file named by the form field is stored
//! and acknowledged with `200 OK`, or there was no file and the client gets
//! `400 Bad Request`. Everything else is an `Error`.
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::cgi::CgiEnv;
use crate::config::{FilenamePolicy, UploadConfig};
use crate::multipart::mult_part::read_formdata;
use crate::multipart::{self, FilePart};
use crate::response::Response;
use crate::{Error, Result};

pub const SUCCESS_BODY: &str = "<html><p>Your file has been uploaded successfully!</p></html>";
pub const NO_FILE_BODY: &str = "<html><p>No file was uploaded</p></html>";

/// What a request ended up doing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The file was written to `path`.
    Stored { path: PathBuf, size: usize },
    /// The form carried no usable file.
    NoFile,
}

impl Outcome {
    pub fn status(&self) -> http::StatusCode {
        match self {
            Outcome::Stored { .. } => http::StatusCode::OK,
            Outcome::NoFile => http::StatusCode::BAD_REQUEST,
        }
    }

    pub fn body(&self) -> &'static str {
        match self {
            Outcome::Stored { .. } => SUCCESS_BODY,
            Outcome::NoFile => NO_FILE_BODY,
        }
    }
}

#[derive(Debug)]
pub struct UploadHandler {
    config: UploadConfig,
}

impl UploadHandler {
    pub fn new(config: UploadConfig) -> UploadHandler {
        UploadHandler { config }
    }

    /// Reads the form from `stdin`, stores the file if there is one, and
    /// writes the response to `stdout`. Nothing is written to `stdout` when
    /// an error is returned.
    pub fn handle<R: Read, W: Write>(&self, env: &CgiEnv, stdin: R, stdout: &mut W) -> Result<Outcome> {
        let outcome = self.receive(env, stdin)?;
        match outcome {
            Outcome::Stored { ref path, size } => info!("stored {} ({} bytes)", path.display(), size),
            Outcome::NoFile => warn!("no file in field {:?}", self.config.field),
        }

        let mut res = Response::new(stdout, self.config.framing);
        *res.status_mut() = outcome.status();
        res.send(outcome.body().as_bytes())?;
        Ok(outcome)
    }

    /// Parses the form and stores the first non-empty file of the configured
    /// field. Other file parts are read past and dropped.
    pub fn receive<R: Read>(&self, env: &CgiEnv, stdin: R) -> Result<Outcome> {
        if let Some(ref method) = env.request_method {
            if !method.eq_ignore_ascii_case("POST") {
                debug!("unexpected request method {}", method);
            }
        }
        let headers = env.headers()?;

        // The content goes to a temporary file next to the target and is only
        // moved into place once the whole form has parsed.
        let mut pending: Option<(PathBuf, NamedTempFile)> = None;
        let form = {
            let mut hook = |part: &mut FilePart| -> Result<()> {
                if pending.is_some() || part.key != self.config.field {
                    return Ok(());
                }
                let client_name = match part.filename()? {
                    Some(name) => name,
                    None => return Ok(()),
                };
                let name = match self.target_name(&client_name)? {
                    Some(name) => name,
                    None => return Ok(()),
                };
                self.ensure_dir()?;
                let path = self.target_path(&name);
                let (tmp, file) = self
                    .temp_file()
                    .map_err(|source| Error::FileWrite { path: path.clone(), source })?;
                debug!("writing {} through {}", path.display(), tmp.path().display());
                part.set_write(BufWriter::new(file));
                part.set_path(tmp.path().to_path_buf());
                pending = Some((path, tmp));
                Ok(())
            };
            read_formdata(&headers, env.body(stdin), &mut hook)
        };

        // Dropping `pending` on any error removes the temporary file.
        let form = match form {
            Ok(form) => form,
            Err(multipart::Error::FileWrite(source)) => {
                return Err(Error::FileWrite {
                    path: pending.map(|(path, _)| path).unwrap_or_default(),
                    source,
                })
            }
            Err(e) => return Err(e.into()),
        };

        let (path, tmp) = match pending {
            Some(pending) => pending,
            None => return Ok(Outcome::NoFile),
        };
        let size = form
            .files
            .iter()
            .map(|(_, part)| part)
            .find(|part| part.is_stored())
            .and_then(|part| part.size)
            .unwrap_or(0);
        tmp.persist(&path).map_err(|e| Error::FileWrite {
            path: path.clone(),
            source: e.error,
        })?;
        Ok(Outcome::Stored { path, size })
    }

    // Created in the upload directory so the final rename stays on one
    // filesystem.
    fn temp_file(&self) -> io::Result<(NamedTempFile, File)> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(".upload-");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            // same mode File::create would use, before the umask
            builder.permissions(fs::Permissions::from_mode(0o666));
        }
        let tmp = builder.tempfile_in(&self.config.dir)?;
        let file = tmp.reopen()?;
        Ok((tmp, file))
    }

    /// Applies the filename policy. `Ok(None)` means there is nothing to store.
    fn target_name(&self, client_name: &str) -> Result<Option<String>> {
        if client_name.is_empty() {
            return Ok(None);
        }
        match self.config.filename_policy {
            FilenamePolicy::Permissive => Ok(Some(client_name.to_string())),
            FilenamePolicy::Reject => {
                if is_plain_name(client_name) {
                    Ok(Some(client_name.to_string()))
                } else {
                    warn!("rejecting filename {:?}", client_name);
                    Err(Error::RejectedFilename(client_name.to_string()))
                }
            }
            FilenamePolicy::Sanitize => {
                let base = client_name
                    .rsplit(|c: char| c == '/' || c == '\\')
                    .next()
                    .unwrap_or_default()
                    .replace('\0', "");
                if is_plain_name(&base) {
                    Ok(Some(base))
                } else {
                    warn!("nothing left of filename {:?}", client_name);
                    Ok(None)
                }
            }
        }
    }

    // Joined as text rather than with `Path::join` so an absolute client name
    // still lands under the upload directory.
    fn target_path(&self, name: &str) -> PathBuf {
        let mut path = OsString::from(self.config.dir.as_os_str());
        path.push("/");
        path.push(name);
        PathBuf::from(path)
    }

    fn ensure_dir(&self) -> Result<()> {
        let dir: &Path = &self.config.dir;
        if dir.is_dir() {
            return Ok(());
        }
        info!("creating {}", dir.display());
        fs::create_dir_all(dir).map_err(|source| Error::DirectoryCreation {
            path: dir.to_path_buf(),
            source,
        })
    }
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(|c: char| c == '/' || c == '\\' || c == '\0')
}

/// Handles one request with `config`.
pub fn run<R: Read, W: Write>(config: UploadConfig, env: &CgiEnv, stdin: R, stdout: &mut W) -> Result<Outcome> {
    UploadHandler::new(config).handle(env, stdin, stdout)
}
