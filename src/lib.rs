//! # upload-cgi
//!
//! A CGI program that accepts one `multipart/form-data` file upload and
//! stores it on disk.
//!
//! The hosting web server starts the process once per request, hands it the
//! body on stdin and the request metadata in `CONTENT_TYPE` and
//! `CONTENT_LENGTH`, and relays whatever the process writes to stdout back
//! to the client. The response is raw HTTP: a status line, one
//! `Content-Length` header, a blank line and a short HTML body.
//!
//! ## Handling a request
//!
//! ```no_run
//! use std::io;
//! use upload_cgi::cgi::CgiEnv;
//! use upload_cgi::config::UploadConfig;
//! use upload_cgi::upload::UploadHandler;
//!
//! fn main() -> upload_cgi::Result<()> {
//!     let handler = UploadHandler::new(UploadConfig::from_env()?);
//!     let env = CgiEnv::from_env()?;
//!     handler.handle(&env, io::stdin().lock(), &mut io::stdout().lock())?;
//!     Ok(())
//! }
//! ```
//!
//! A file named by the `filename` field is written to `uploads/<filename>`,
//! creating the directory on first use and overwriting older files of the
//! same name. A form without a usable file gets `400 Bad Request`. Every
//! other failure is returned as an [`Error`] and nothing is written to
//! stdout.

#[macro_use]
extern crate log;

pub use crate::error::{Error, Result};

pub mod cgi;
pub mod config;
pub mod error;
pub mod multipart;
pub mod response;
pub mod upload;

pub(crate) const LINE_ENDING: &str = "\r\n";
