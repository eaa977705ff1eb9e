//! CGI meta-variables and the request body.
//!
//! The hosting server has already parsed the request line and headers. It
//! hands the body over on stdin and the interesting headers in
//! `CONTENT_TYPE` and `CONTENT_LENGTH`.
use std::env;
use std::io::{self, Read};

use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue};

use crate::{Error, Result};

pub const REQUEST_METHOD: &str = "REQUEST_METHOD";
pub const CONTENT_TYPE_VAR: &str = "CONTENT_TYPE";
pub const CONTENT_LENGTH_VAR: &str = "CONTENT_LENGTH";

/// The CGI variables this program cares about.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CgiEnv {
    pub request_method: Option<String>,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
}

impl CgiEnv {
    pub fn from_env() -> Result<CgiEnv> {
        CgiEnv::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_vars<'a, I>(vars: I) -> Result<CgiEnv>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let vars: Vec<(&str, &str)> = vars.into_iter().collect();
        CgiEnv::from_lookup(|name| {
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        })
    }

    /// Empty variables count as unset, which is how servers pass a
    /// request without a body.
    pub fn from_lookup<F>(lookup: F) -> Result<CgiEnv>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let content_length = match get(CONTENT_LENGTH_VAR) {
            Some(v) => Some(v.trim().parse::<u64>().map_err(|_| Error::InvalidCgiVariable {
                name: CONTENT_LENGTH_VAR,
                value: v.clone(),
            })?),
            None => None,
        };
        let env = CgiEnv {
            request_method: get(REQUEST_METHOD),
            content_type: get(CONTENT_TYPE_VAR),
            content_length,
        };
        debug!("cgi env {:?}", env);
        Ok(env)
    }

    /// The request headers carried by the meta-variables.
    pub fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::with_capacity(2);
        if let Some(ref ct) = self.content_type {
            let value = HeaderValue::from_str(ct).map_err(|_| Error::InvalidCgiVariable {
                name: CONTENT_TYPE_VAR,
                value: ct.clone(),
            })?;
            headers.insert(CONTENT_TYPE, value);
        }
        if let Some(len) = self.content_length {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
        }
        Ok(headers)
    }

    /// Bounds `stdin` by `CONTENT_LENGTH` when the server set it.
    pub fn body<R: Read>(&self, stdin: R) -> io::Take<R> {
        stdin.take(self.content_length.unwrap_or(u64::MAX))
    }
}
