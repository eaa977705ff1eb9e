//! CGI Responses
//!
//! The program speaks raw HTTP on stdout: a status line, a `Content-Length`
//! header, a blank line and the body. The hosting server relays these bytes
//! to the client unchanged.
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use crate::LINE_ENDING;

/// How the status line is terminated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Framing {
    /// Byte-compatible with the historical upload script, whose client error
    /// status line runs straight into the `Content-Length` header.
    Legacy,
    /// Every status line ends with CRLF.
    Strict,
}

impl Default for Framing {
    fn default() -> Framing {
        Framing::Legacy
    }
}

impl FromStr for Framing {
    type Err = String;

    fn from_str(s: &str) -> Result<Framing, String> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(Framing::Legacy),
            "strict" => Ok(Framing::Strict),
            other => Err(format!("unknown framing {:?}, expected legacy or strict", other)),
        }
    }
}

impl fmt::Display for Framing {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Framing::Legacy => f.write_str("legacy"),
            Framing::Strict => f.write_str("strict"),
        }
    }
}

/// The outgoing response, written once to `stream`.
///
/// The default `StatusCode` for a `Response` is `200 OK`.
pub struct Response<'a> {
    /// The HTTP version of this response.
    pub version: http::Version,
    /// The status code for the request.
    pub status: http::StatusCode,
    framing: Framing,
    stream: &'a mut (dyn Write + 'a),
}

impl<'a> Response<'a> {
    /// Creates a new Response that writes to `stream`.
    #[inline]
    pub fn new(stream: &'a mut (dyn Write + 'a), framing: Framing) -> Response<'a> {
        Response {
            version: http::Version::HTTP_11,
            status: http::StatusCode::OK,
            framing,
            stream,
        }
    }

    /// Get a mutable reference to the status.
    #[inline]
    pub fn status_mut(&mut self) -> &mut http::StatusCode {
        &mut self.status
    }

    /// The status line, without its terminator.
    pub fn status_line(&self) -> String {
        format!("{:?} {}", self.version, self.status)
    }

    fn write_head(&mut self, content_length: usize) -> io::Result<()> {
        debug!("writing head: {:?} {:?}", self.version, self.status);
        let status_line = self.status_line();
        self.stream.write_all(status_line.as_bytes())?;
        if self.terminates_status_line() {
            self.stream.write_all(LINE_ENDING.as_bytes())?;
        }
        write!(self.stream, "Content-Length: {}{}", content_length, LINE_ENDING)?;
        self.stream.write_all(LINE_ENDING.as_bytes())
    }

    fn terminates_status_line(&self) -> bool {
        match self.framing {
            Framing::Strict => true,
            Framing::Legacy => !self.status.is_client_error(),
        }
    }

    /// Writes the head and `body`, then flushes. `Content-Length` always
    /// equals `body.len()`.
    pub fn send(mut self, body: &[u8]) -> io::Result<()> {
        self.write_head(body.len())?;
        debug!("write {:?} bytes", body.len());
        self.stream.write_all(body)?;
        trace!("ending");
        self.stream.flush()
    }
}
