// Copyright 2016 mime-multipart Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::io;
use std::string::FromUtf8Error;

/// An error type for multipart parsing.
pub enum Error {
    /// The request did not have a Content-Type header.
    NoRequestContentType,
    /// The Content-Type header could not be parsed as a mime type.
    InvalidContentType(String),
    /// The request Content-Type top-level Mime was not `Multipart`.
    NotMultipart,
    /// The Content-Type header failed to specify boundary token.
    BoundaryNotSpecified,
    /// A multipart section contained only partial headers.
    PartialHeaders,
    EofBeforeFirstBoundary,
    NoCrLfAfterBoundary,
    EofInPartHeaders,
    EofInFile,
    EofInPart,
    /// An HTTP parsing error from a multipart section.
    Httparse(httparse::Error),
    /// A part header name or value was not acceptable.
    InvalidHeader(String),
    /// An I/O error while reading the body.
    Io(io::Error),
    /// Writing a file part to its destination failed.
    FileWrite(io::Error),
    /// An error returned from a file hook.
    Hook(Box<crate::Error>),
    /// An error occurred during UTF-8 processing.
    Utf8(FromUtf8Error),
    /// An error occurred during character decoding
    Decoding(Cow<'static, str>),

    MissingDisposition,
    NoName,
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<httparse::Error> for Error {
    fn from(err: httparse::Error) -> Error {
        Error::Httparse(err)
    }
}

impl From<FromUtf8Error> for Error {
    fn from(err: FromUtf8Error) -> Error {
        Error::Utf8(err)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Httparse(ref e) => Display::fmt(e, f),
            Error::Io(ref e) => Display::fmt(e, f),
            Error::FileWrite(ref e) => write!(f, "FileWrite: {}", e),
            Error::Hook(ref e) => Display::fmt(e, f),
            Error::Utf8(ref e) => Display::fmt(e, f),
            Error::Decoding(ref e) => Display::fmt(e, f),
            Error::InvalidContentType(ref ct) => write!(f, "InvalidContentType: {:?}", ct),
            Error::InvalidHeader(ref h) => write!(f, "InvalidHeader: {:?}", h),

            Error::NoRequestContentType => f.write_str("NoRequestContentType"),
            Error::NotMultipart => f.write_str("NotMultipart"),
            Error::BoundaryNotSpecified => f.write_str("BoundaryNotSpecified"),
            Error::PartialHeaders => f.write_str("PartialHeaders"),
            Error::EofBeforeFirstBoundary => f.write_str("EofBeforeFirstBoundary"),
            Error::NoCrLfAfterBoundary => f.write_str("NoCrLfAfterBoundary"),
            Error::EofInPartHeaders => f.write_str("EofInPartHeaders"),
            Error::EofInFile => f.write_str("EofInFile"),
            Error::EofInPart => f.write_str("EofInPart"),
            Error::MissingDisposition => f.write_str("MissingDisposition"),
            Error::NoName => f.write_str("NoName"),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)?;
        if let Some(source) = self.source() {
            write!(f, ": {:?}", source)?; // recurse
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Httparse(ref e) => Some(e),
            Error::Io(ref e) => Some(e),
            Error::FileWrite(ref e) => Some(e),
            Error::Utf8(ref e) => Some(e),
            _ => None,
        }
    }

    #[allow(deprecated)]
    fn description(&self) -> &str {
        match *self {
            Error::NoRequestContentType => "The request did not have a Content-Type header.",
            Error::InvalidContentType(_) => "The Content-Type header is not a valid mime type.",
            Error::NotMultipart => "The request Content-Type top-level Mime was not multipart.",
            Error::BoundaryNotSpecified =>
                "The Content-Type header failed to specify a boundary token.",
            Error::PartialHeaders => "A multipart section contained only partial headers.",
            Error::EofBeforeFirstBoundary =>
                "The request body ended prior to reaching the expected starting boundary.",
            Error::NoCrLfAfterBoundary => "Missing CRLF after boundary.",
            Error::EofInPartHeaders =>
                "The request body ended prematurely while parsing headers of a multipart part.",
            Error::EofInFile => "The request body ended prematurely while streaming a file part.",
            Error::EofInPart =>
                "The request body ended prematurely while reading a multipart part.",
            Error::Httparse(_) =>
                "A parse error occurred while parsing the headers of a multipart section.",
            Error::InvalidHeader(_) => "A multipart section carried an invalid header.",
            Error::Io(_) => "An I/O error occurred.",
            Error::FileWrite(_) => "Writing a file part failed.",
            Error::Hook(_) => "A file hook failed.",
            Error::Utf8(_) => "A UTF-8 error occurred.",
            Error::Decoding(_) => "A decoding error occurred.",
            Error::MissingDisposition => "MissingDisposition",
            Error::NoName => "no name",
        }
    }
}
