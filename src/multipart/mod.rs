// Copyright 2016-2020 mime-multipart Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Blocking `multipart/*` parsing and encoding.
//!
//! Parts are read from any `BufRead`. Text parts are kept in memory, file
//! parts are streamed into whatever writer a [`FileHook`] attaches to them,
//! or discarded when the hook attaches none.

pub mod error;
pub mod mult_part;

pub use error::Error;

use std::borrow::Cow;
use std::fmt::{Debug, Formatter};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::str::FromStr;

use buf_read_ext::BufReadExt;
use encoding::label::encoding_from_whatwg_label;
use encoding::{DecoderTrap, Encoding};
use http::header::{HeaderName, CONTENT_DISPOSITION, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue};
use mime::{Attr, Mime, TopLevel, Value};
use percent_encoding::percent_decode;

/// Called for every file part once its headers are parsed and before its
/// content is read. Attaching a writer with [`FilePart::set_write`] makes the
/// parser stream the content into it.
pub type FileHook<'a> = dyn FnMut(&mut FilePart) -> crate::Result<()> + 'a;

/// A multipart part which is not a file (stored in memory)
#[derive(Clone, Debug, PartialEq)]
pub struct Part {
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Part {
    /// A `form-data` text field.
    pub fn form_field(name: &str, value: &str) -> Result<Part, Error> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert(
            CONTENT_DISPOSITION,
            header_value(format!("form-data; name=\"{}\"", quote(name)).as_bytes())?,
        );
        Ok(Part { headers, body: value.as_bytes().to_vec() })
    }

    /// A `form-data` file field whose content is held in memory.
    pub fn form_file(name: &str, filename: &str, body: &[u8]) -> Result<Part, Error> {
        let mut headers = HeaderMap::with_capacity(2);
        headers.insert(
            CONTENT_DISPOSITION,
            header_value(
                format!("form-data; name=\"{}\"; filename=\"{}\"", quote(name), quote(filename))
                    .as_bytes(),
            )?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
        Ok(Part { headers, body: body.to_vec() })
    }
}

/// An uploaded file that was received as part of `multipart/*` parsing.
pub struct FilePart {
    /// The headers of the part
    pub headers: HeaderMap,
    /// The size of the file, filled once its content has been streamed.
    pub size: Option<usize>,
    /// Where the content lives on disk. Empty until a hook stores the part.
    pub path: PathBuf,
    /// The form field name from `Content-Disposition`.
    pub key: String,

    pub write: Option<Box<dyn Write>>,
}

impl Debug for FilePart {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilePart")
            .field("headers", &self.headers)
            .field("size", &self.size)
            .field("path", &self.path)
            .field("key", &self.key)
            .finish()
    }
}

impl FilePart {
    /// Build a `FilePart` from the headers of a part being parsed. The part
    /// must carry a `Content-Disposition` header.
    pub fn create(headers: HeaderMap) -> Result<FilePart, Error> {
        let key = {
            let cd = headers.get(CONTENT_DISPOSITION).ok_or(Error::MissingDisposition)?;
            ContentDisposition::parse(cd)?.name().map(str::to_string)
        };
        Ok(FilePart {
            headers,
            size: None,
            path: PathBuf::new(),
            key: key.unwrap_or_default(),
            write: None,
        })
    }

    /// set any Write impl struct to FilePart
    pub fn set_write<W: Write + 'static>(&mut self, w: W) {
        self.write = Some(Box::new(w));
    }

    pub fn set_path(&mut self, path: PathBuf) {
        self.path = path;
    }

    /// Whether a hook stored this part somewhere on disk.
    pub fn is_stored(&self) -> bool {
        !self.path.as_os_str().is_empty()
    }

    /// Filename that was specified when the file was uploaded. `Ok(None)` means the
    /// `Content-Disposition` carried no filename parameter; `Ok(Some(""))` means
    /// it carried an empty one.
    pub fn filename(&self) -> Result<Option<String>, Error> {
        let cd = self.headers.get(CONTENT_DISPOSITION).ok_or(Error::NoName)?;
        ContentDisposition::parse(cd)?.filename()
    }
}

/// A multipart part which could be either a file, in memory, or another multipart
/// container containing nested parts.
#[derive(Debug)]
pub enum Node {
    /// A part in memory
    Part(Part),
    /// A part streamed to a file
    File(FilePart),
    /// A container of nested multipart parts
    Multipart((HeaderMap, Vec<Node>)),
}

/// A parsed `Content-Disposition` header value, e.g.
/// `form-data; name="filename"; filename="a.txt"`.
#[derive(Clone, Debug, PartialEq)]
pub struct ContentDisposition {
    /// `form-data`, `attachment`, ... lowercased.
    pub kind: String,
    /// Parameters in order, names lowercased and values unquoted.
    pub params: Vec<(String, String)>,
}

impl ContentDisposition {
    pub fn parse(cd: &HeaderValue) -> Result<ContentDisposition, Error> {
        let raw = String::from_utf8(cd.as_bytes().to_vec())?;
        let mut segments = split_params(&raw).into_iter();
        let kind = segments.next().unwrap_or_default().trim().to_ascii_lowercase();
        let params = segments
            .filter_map(|segment| {
                let (name, value) = segment.split_once('=')?;
                Some((name.trim().to_ascii_lowercase(), unquote(value.trim())))
            })
            .collect();
        Ok(ContentDisposition { kind, params })
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// The form field name.
    pub fn name(&self) -> Option<&str> {
        self.param("name")
    }

    /// The client filename. `filename*` (RFC 5987) wins over `filename`.
    pub fn filename(&self) -> Result<Option<String>, Error> {
        if let Some(ext) = self.param("filename*") {
            return decode_ext_value(ext).map(Some);
        }
        Ok(self.param("filename").map(str::to_string))
    }

    /// Whether the part should be treated as a file upload.
    pub fn is_file(&self) -> bool {
        self.kind == "attachment"
            || self.param("filename").is_some()
            || self.param("filename*").is_some()
    }
}

/// Parse a MIME `multipart/*` from a `BufRead`able stream into a `Vec` of `Node`s, streaming
/// file parts through `hook` and keeping the rest in memory.  Recursive `multipart/*` parts
/// are parsed as well and returned within a `Node::Multipart` variant.
///
/// Parts with a `Content-Disposition` of `attachment` or otherwise carrying a filename
/// parameter are handed to the hook as files.
///
/// It is presumed that you have the headers already and the stream starts at the body.
pub fn read_multipart_body<S: BufRead>(
    stream: &mut S,
    headers: &HeaderMap,
    hook: &mut FileHook<'_>,
) -> Result<Vec<Node>, Error> {
    let mut nodes: Vec<Node> = Vec::new();
    inner(stream, headers, &mut nodes, hook)?;
    Ok(nodes)
}

fn inner<R: BufRead>(
    reader: &mut R,
    headers: &HeaderMap,
    nodes: &mut Vec<Node>,
    hook: &mut FileHook<'_>,
) -> Result<(), Error> {
    let mut buf: Vec<u8> = Vec::new();

    let boundary = get_multipart_boundary(headers)?;
    trace!("multipart boundary {:?}", String::from_utf8_lossy(&boundary));

    // Read past the preamble and the initial boundary
    let (_, found) = reader.stream_until_token(&boundary, &mut buf)?;
    if !found {
        return Err(Error::EofBeforeFirstBoundary);
    }

    // The rest of the line after the opening boundary is either the close
    // marker of an empty multipart or the first line terminator, which decides
    // between CRLF and LF for the whole body.
    buf.clear();
    let (_, found) = reader.stream_until_token(b"\n", &mut buf)?;
    if buf.starts_with(b"--") {
        return Ok(());
    }
    if !found {
        return Err(Error::NoCrLfAfterBoundary);
    }

    // Define the boundary, including the line terminator preceding it.
    let (lt, ltlt, lt_boundary) = if buf.last() == Some(&b'\r') {
        let mut output = Vec::with_capacity(2 + boundary.len());
        output.extend_from_slice(b"\r\n");
        output.extend_from_slice(&boundary);
        (b"\r\n".to_vec(), b"\r\n\r\n".to_vec(), output)
    } else {
        let mut output = Vec::with_capacity(1 + boundary.len());
        output.push(b'\n');
        output.extend_from_slice(&boundary);
        (b"\n".to_vec(), b"\n\n".to_vec(), output)
    };

    loop {
        // Read the headers (which end in 2 line terminators)
        buf.clear();
        let (_, found) = reader.stream_until_token(&ltlt, &mut buf)?;
        if !found {
            return Err(Error::EofInPartHeaders);
        }

        // Keep the 2 line terminators as httparse will expect it
        buf.extend_from_slice(&ltlt);
        let part_headers = parse_part_headers(&buf)?;
        debug!("multipart part headers {:?}", part_headers);

        // Check for a nested multipart
        let nested = header_mime(part_headers.get(CONTENT_TYPE))
            .map(|Mime(top_level, _, _)| top_level == TopLevel::Multipart)
            .unwrap_or(false);

        let is_file = !nested
            && match part_headers.get(CONTENT_DISPOSITION) {
                Some(cd) => ContentDisposition::parse(cd)?.is_file(),
                None => false,
            };

        if nested {
            let mut inner_nodes: Vec<Node> = Vec::new();
            inner(reader, &part_headers, &mut inner_nodes, hook)?;
            nodes.push(Node::Multipart((part_headers, inner_nodes)));
            // The nested close line is consumed with its terminator, so look for
            // our boundary without the leading line terminator.
            let (_, found) = reader.stream_until_token(&boundary, &mut io::sink())?;
            if !found {
                return Err(Error::EofInPart);
            }
        } else if is_file {
            let mut filepart = FilePart::create(part_headers)?;
            hook(&mut filepart).map_err(|e| Error::Hook(Box::new(e)))?;

            let read = match filepart.write.take() {
                Some(mut w) => {
                    let read = stream_file(reader, &lt_boundary, &mut w)?;
                    w.flush().map_err(Error::FileWrite)?;
                    read
                }
                None => stream_file(reader, &lt_boundary, &mut io::sink())?,
            };
            debug!("file part {:?}: {} bytes", filepart.key, read);
            filepart.size = Some(read);
            nodes.push(Node::File(filepart));
            // TODO: Handle Content-Transfer-Encoding.  RFC 7578 section 4.7 deprecated
            // this, and the authors state "Currently, no deployed implementations that
            // send such bodies have been discovered", so this is very low priority.
        } else {
            buf.clear();
            let (_, found) = reader.stream_until_token(&lt_boundary, &mut buf)?;
            if !found {
                return Err(Error::EofInPart);
            }

            nodes.push(Node::Part(Part {
                headers: part_headers,
                body: std::mem::take(&mut buf),
            }));
        }

        // After a delimiter comes either `--` (the close delimiter) or a line
        // terminator. The close delimiter may be the last bytes of the body.
        buf.clear();
        let (_, found) = reader.stream_until_token(&lt, &mut buf)?;
        if buf.starts_with(b"--") {
            return Ok(());
        }
        if !found {
            return Err(Error::NoCrLfAfterBoundary);
        }
    }
}

fn parse_part_headers(buf: &[u8]) -> Result<HeaderMap, Error> {
    let mut header_memory = [httparse::EMPTY_HEADER; 16];
    match httparse::parse_headers(buf, &mut header_memory)? {
        httparse::Status::Complete((_, raw_headers)) => {
            let mut h = HeaderMap::new();
            for x in raw_headers {
                let name = match HeaderName::from_bytes(x.name.as_bytes()) {
                    Ok(name) => name,
                    Err(_) => {
                        debug!("skipping part header {:?}", x.name);
                        continue;
                    }
                };
                h.append(name, header_value(x.value)?);
            }
            Ok(h)
        }
        httparse::Status::Partial => Err(Error::PartialHeaders),
    }
}

/// Streams a file part into `out` and returns the number of content bytes,
/// telling apart failures to read the body from failures to write the
/// destination.
fn stream_file<R: BufRead, W: Write>(
    reader: &mut R,
    token: &[u8],
    out: &mut W,
) -> Result<usize, Error> {
    let mut tracked = TrackedWrite { inner: out, written: 0, error: None };
    match reader.stream_until_token(token, &mut tracked) {
        Ok((_, true)) => Ok(tracked.written),
        Ok((_, false)) => Err(Error::EofInFile),
        Err(e) => Err(match tracked.error.take() {
            Some(write_err) => Error::FileWrite(write_err),
            None => Error::Io(e),
        }),
    }
}

struct TrackedWrite<'a, W> {
    inner: &'a mut W,
    written: usize,
    error: Option<io::Error>,
}

impl<'a, W: Write> TrackedWrite<'a, W> {
    fn record(&mut self, e: io::Error) -> io::Error {
        let kind = e.kind();
        self.error = Some(e);
        io::Error::from(kind)
    }
}

impl<'a, W: Write> Write for TrackedWrite<'a, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.inner.write(buf) {
            Ok(n) => {
                self.written += n;
                Ok(n)
            }
            Err(e) => Err(self.record(e)),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.inner.flush() {
            Ok(()) => Ok(()),
            Err(e) => Err(self.record(e)),
        }
    }
}

/// Get the `multipart/*` boundary, prefixed with `--`, from `http::HeaderMap`
pub fn get_multipart_boundary(headers: &HeaderMap) -> Result<Vec<u8>, Error> {
    // Verify that the request is 'Content-Type: multipart/*'.
    let ct = headers.get(CONTENT_TYPE).ok_or(Error::NoRequestContentType)?;
    let ct = ct
        .to_str()
        .map_err(|_| Error::InvalidContentType(String::from_utf8_lossy(ct.as_bytes()).into_owned()))?;
    let Mime(top_level, _, params) =
        Mime::from_str(ct).map_err(|_| Error::InvalidContentType(ct.to_string()))?;

    if top_level != TopLevel::Multipart {
        return Err(Error::NotMultipart);
    }

    for (attr, val) in params.iter() {
        if let (&Attr::Boundary, &Value::Ext(ref val)) = (attr, val) {
            let val = val.trim_matches('"');
            if val.is_empty() {
                break;
            }
            let mut boundary = Vec::with_capacity(2 + val.len());
            boundary.extend_from_slice(b"--");
            boundary.extend_from_slice(val.as_bytes());
            return Ok(boundary);
        }
    }
    Err(Error::BoundaryNotSpecified)
}

fn header_mime(ct: Option<&HeaderValue>) -> Option<Mime> {
    ct.and_then(|ct| ct.to_str().ok())
        .and_then(|ct| Mime::from_str(ct).ok())
}

fn header_value(bytes: &[u8]) -> Result<HeaderValue, Error> {
    HeaderValue::from_bytes(bytes)
        .map_err(|_| Error::InvalidHeader(String::from_utf8_lossy(bytes).into_owned()))
}

// Splits on ';' outside of quoted strings.
fn split_params(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            ';' if !quoted => {
                out.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&s[start..]);
    out
}

// Only `\\` and `\"` are unescaped, the way browsers and most servers agree on.
fn unquote(value: &str) -> String {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        value[1..value.len() - 1]
            .replace("\\\\", "\\")
            .replace("\\\"", "\"")
    } else {
        value.to_string()
    }
}

fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

// charset'language'percent-encoded-value
fn decode_ext_value(value: &str) -> Result<String, Error> {
    let mut pieces = value.splitn(3, '\'');
    match (pieces.next(), pieces.next(), pieces.next()) {
        (Some(charset), Some(_language), Some(encoded)) => {
            let bytes: Vec<u8> = percent_decode(encoded.as_bytes()).collect();
            charset_decode(charset, &bytes).map_err(Error::Decoding)
        }
        _ => Err(Error::Decoding(Cow::Owned(format!(
            "malformed extended parameter {:?}",
            value
        )))),
    }
}

// Decodes bytes in the named charset using the rust-encoding crate.
fn charset_decode(charset: &str, bytes: &[u8]) -> Result<String, Cow<'static, str>> {
    let encoding = encoding_from_whatwg_label(charset)
        .ok_or_else(|| Cow::Owned(format!("{} is not supported", charset)))?;
    encoding.decode(bytes, DecoderTrap::Strict)
}

// Convenience method, like write_all(), but returns the count of bytes written.
trait WriteAllCount {
    fn write_all_count(&mut self, buf: &[u8]) -> io::Result<usize>;
}

impl<T: Write> WriteAllCount for T {
    fn write_all_count(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_all(buf)?;
        Ok(buf.len())
    }
}

fn write_headers<S: Write>(stream: &mut S, headers: &HeaderMap) -> io::Result<usize> {
    let mut count = 0;
    for (name, value) in headers.iter() {
        count += stream.write_all_count(name.as_str().as_bytes())?;
        count += stream.write_all_count(b": ")?;
        count += stream.write_all_count(value.as_bytes())?;
        count += stream.write_all_count(b"\r\n")?;
    }
    // write the blank line
    count += stream.write_all_count(b"\r\n")?;
    Ok(count)
}

/// Stream a multipart body made up of `parts` to the output `stream` given.
/// `boundary` is given without its leading `--`. Top-level headers are NOT
/// included in this stream; the caller must send those prior to calling
/// write_multipart().
/// Returns the number of bytes written, or an error.
pub fn write_multipart<S: Write>(stream: &mut S, boundary: &[u8], parts: &[Part]) -> Result<usize, Error> {
    let mut count: usize = 0;

    for part in parts {
        // write a boundary
        count += stream.write_all_count(b"--")?;
        count += stream.write_all_count(boundary)?;
        count += stream.write_all_count(b"\r\n")?;

        count += write_headers(stream, &part.headers)?;
        count += stream.write_all_count(&part.body)?;

        // write a line terminator
        count += stream.write_all_count(b"\r\n")?;
    }

    // write a final boundary
    count += stream.write_all_count(b"--")?;
    count += stream.write_all_count(boundary)?;
    count += stream.write_all_count(b"--")?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io::{self, Write};
    use std::rc::Rc;

    use http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
    use http::{HeaderMap, HeaderValue};

    use super::*;

    fn form_headers(boundary: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(
            CONTENT_TYPE,
            HeaderValue::from_str(&format!("multipart/form-data; boundary={}", boundary)).unwrap(),
        );
        h
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct FailingWrite;

    impl Write for FailingWrite {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_boundary_from_content_type() {
        let h = form_headers("abc123");
        assert_eq!(get_multipart_boundary(&h).unwrap(), b"--abc123".to_vec());

        let h = form_headers("----WebKitFormBoundary7MA4YWxkTrZu0gW");
        assert_eq!(
            get_multipart_boundary(&h).unwrap(),
            b"------WebKitFormBoundary7MA4YWxkTrZu0gW".to_vec()
        );
    }

    #[test]
    fn test_boundary_errors() {
        match get_multipart_boundary(&HeaderMap::new()) {
            Err(Error::NoRequestContentType) => {}
            other => panic!("unexpected {:?}", other),
        }

        let mut h = HeaderMap::new();
        h.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        match get_multipart_boundary(&h) {
            Err(Error::NotMultipart) => {}
            other => panic!("unexpected {:?}", other),
        }

        let mut h = HeaderMap::new();
        h.insert(CONTENT_TYPE, HeaderValue::from_static("multipart/form-data"));
        match get_multipart_boundary(&h) {
            Err(Error::BoundaryNotSpecified) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_content_disposition_params() {
        let cd = HeaderValue::from_static("form-data; name=\"filename\"; filename=\"a;b.txt\"");
        let cd = ContentDisposition::parse(&cd).unwrap();
        assert_eq!(cd.kind, "form-data");
        assert_eq!(cd.name(), Some("filename"));
        assert_eq!(cd.filename().unwrap(), Some("a;b.txt".to_string()));
        assert!(cd.is_file());
    }

    #[test]
    fn test_content_disposition_without_filename() {
        let cd = HeaderValue::from_static("form-data; name=comment");
        let cd = ContentDisposition::parse(&cd).unwrap();
        assert_eq!(cd.name(), Some("comment"));
        assert_eq!(cd.filename().unwrap(), None);
        assert!(!cd.is_file());
    }

    #[test]
    fn test_content_disposition_empty_filename() {
        let cd = HeaderValue::from_static("form-data; name=\"filename\"; filename=\"\"");
        let cd = ContentDisposition::parse(&cd).unwrap();
        assert_eq!(cd.filename().unwrap(), Some(String::new()));
        assert!(cd.is_file());
    }

    #[test]
    fn test_content_disposition_escaped_quote() {
        let cd = HeaderValue::from_static(r#"form-data; name="f"; filename="say \"hi\".txt""#);
        let cd = ContentDisposition::parse(&cd).unwrap();
        assert_eq!(cd.filename().unwrap(), Some("say \"hi\".txt".to_string()));
    }

    #[test]
    fn test_extended_filename_wins() {
        let cd = HeaderValue::from_static(
            "form-data; name=\"f\"; filename=\"naive.txt\"; filename*=UTF-8''na%C3%AFve.txt",
        );
        let cd = ContentDisposition::parse(&cd).unwrap();
        assert_eq!(cd.filename().unwrap(), Some("na\u{ef}ve.txt".to_string()));
    }

    #[test]
    fn test_extended_filename_latin1() {
        let cd = HeaderValue::from_static("attachment; filename*=iso-8859-1'en'%E9t%E9.txt");
        let cd = ContentDisposition::parse(&cd).unwrap();
        assert_eq!(cd.filename().unwrap(), Some("\u{e9}t\u{e9}.txt".to_string()));
    }

    #[test]
    fn test_extended_filename_unknown_charset() {
        let cd = HeaderValue::from_static("attachment; filename*=klingon''x");
        let cd = ContentDisposition::parse(&cd).unwrap();
        match cd.filename() {
            Err(Error::Decoding(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_read_text_and_file_parts() {
        let body = b"preamble\r\n\
            --XyZ\r\n\
            Content-Disposition: form-data; name=\"comment\"\r\n\
            \r\n\
            hi there\r\n\
            --XyZ\r\n\
            Content-Disposition: form-data; name=\"filename\"; filename=\"a.txt\"\r\n\
            Content-Type: text/plain\r\n\
            \r\n\
            hello\r\n\
            --XyZ--\r\n";
        let captured = SharedBuf::default();
        let sink = captured.clone();
        let mut hook = move |part: &mut FilePart| -> crate::Result<()> {
            assert_eq!(part.key, "filename");
            assert_eq!(part.filename().unwrap(), Some("a.txt".to_string()));
            part.set_write(sink.clone());
            Ok(())
        };
        let nodes = read_multipart_body(&mut &body[..], &form_headers("XyZ"), &mut hook).unwrap();

        assert_eq!(nodes.len(), 2);
        match &nodes[0] {
            Node::Part(part) => assert_eq!(part.body, b"hi there".to_vec()),
            other => panic!("unexpected {:?}", other),
        }
        match &nodes[1] {
            Node::File(file) => {
                assert_eq!(file.size, Some(5));
                assert_eq!(file.headers.get(CONTENT_TYPE).unwrap(), "text/plain");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(*captured.0.borrow(), b"hello".to_vec());
    }

    #[test]
    fn test_file_without_writer_is_skipped() {
        let body = b"--XyZ\r\n\
            Content-Disposition: form-data; name=\"other\"; filename=\"x.bin\"\r\n\
            \r\n\
            ignored bytes\r\n\
            --XyZ\r\n\
            Content-Disposition: form-data; name=\"after\"\r\n\
            \r\n\
            still parsed\r\n\
            --XyZ--";
        let mut hook = |_: &mut FilePart| -> crate::Result<()> { Ok(()) };
        let nodes = read_multipart_body(&mut &body[..], &form_headers("XyZ"), &mut hook).unwrap();
        assert_eq!(nodes.len(), 2);
        match &nodes[1] {
            Node::Part(part) => assert_eq!(part.body, b"still parsed".to_vec()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_lf_line_endings() {
        let body = b"--XyZ\n\
            Content-Disposition: form-data; name=\"comment\"\n\
            \n\
            lf only\n\
            --XyZ--\n";
        let mut hook = |_: &mut FilePart| -> crate::Result<()> { Ok(()) };
        let nodes = read_multipart_body(&mut &body[..], &form_headers("XyZ"), &mut hook).unwrap();
        match &nodes[0] {
            Node::Part(part) => assert_eq!(part.body, b"lf only".to_vec()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_nested_multipart() {
        let body = b"--outer\r\n\
            Content-Disposition: form-data; name=\"files\"\r\n\
            Content-Type: multipart/mixed; boundary=inner\r\n\
            \r\n\
            --inner\r\n\
            Content-Disposition: file; filename=\"one.txt\"\r\n\
            \r\n\
            one\r\n\
            --inner--\r\n\
            --outer\r\n\
            Content-Disposition: form-data; name=\"tail\"\r\n\
            \r\n\
            end\r\n\
            --outer--";
        let mut hook = |_: &mut FilePart| -> crate::Result<()> { Ok(()) };
        let nodes = read_multipart_body(&mut &body[..], &form_headers("outer"), &mut hook).unwrap();
        assert_eq!(nodes.len(), 2);
        match &nodes[0] {
            Node::Multipart((_, inner)) => assert_eq!(inner.len(), 1),
            other => panic!("unexpected {:?}", other),
        }
        match &nodes[1] {
            Node::Part(part) => assert_eq!(part.body, b"end".to_vec()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_first_boundary() {
        let body = b"no boundary anywhere";
        let mut hook = |_: &mut FilePart| -> crate::Result<()> { Ok(()) };
        match read_multipart_body(&mut &body[..], &form_headers("XyZ"), &mut hook) {
            Err(Error::EofBeforeFirstBoundary) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_truncated_file_part() {
        let body = b"--XyZ\r\n\
            Content-Disposition: form-data; name=\"filename\"; filename=\"a.txt\"\r\n\
            \r\n\
            hel";
        let mut hook = |part: &mut FilePart| -> crate::Result<()> {
            part.set_write(io::sink());
            Ok(())
        };
        match read_multipart_body(&mut &body[..], &form_headers("XyZ"), &mut hook) {
            Err(Error::EofInFile) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_write_failure_is_reported() {
        let body = b"--XyZ\r\n\
            Content-Disposition: form-data; name=\"filename\"; filename=\"a.txt\"\r\n\
            \r\n\
            hello\r\n\
            --XyZ--";
        let mut hook = |part: &mut FilePart| -> crate::Result<()> {
            part.set_write(FailingWrite);
            Ok(())
        };
        match read_multipart_body(&mut &body[..], &form_headers("XyZ"), &mut hook) {
            Err(Error::FileWrite(e)) => assert_eq!(e.to_string(), "disk full"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_hook_error_is_wrapped() {
        let body = b"--XyZ\r\n\
            Content-Disposition: form-data; name=\"filename\"; filename=\"../a\"\r\n\
            \r\n\
            x\r\n\
            --XyZ--";
        let mut hook = |_: &mut FilePart| -> crate::Result<()> {
            Err(crate::Error::RejectedFilename("../a".to_string()))
        };
        match read_multipart_body(&mut &body[..], &form_headers("XyZ"), &mut hook) {
            Err(Error::Hook(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_written_body_parses_back() {
        let boundary = "----WebKitFormBoundaryq7LBUs5ghSTtS3Cd";
        let parts = vec![
            Part::form_field("comment", "x").unwrap(),
            Part::form_file("filename", "b.bin", b"\r\n--not-a-boundary\r\n").unwrap(),
        ];
        let mut body = Vec::new();
        let written = write_multipart(&mut body, boundary.as_bytes(), &parts).unwrap();
        assert_eq!(written, body.len());

        let ct = format!("multipart/form-data; boundary={}", boundary);
        let mut h = HeaderMap::new();
        h.insert(CONTENT_TYPE, HeaderValue::from_str(&ct).unwrap());

        let captured = SharedBuf::default();
        let sink = captured.clone();
        let mut hook = move |part: &mut FilePart| -> crate::Result<()> {
            part.set_write(sink.clone());
            Ok(())
        };
        let parsed = read_multipart_body(&mut &body[..], &h, &mut hook).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(*captured.0.borrow(), b"\r\n--not-a-boundary\r\n".to_vec());
    }

    #[test]
    fn test_form_file_headers() {
        let part = Part::form_file("filename", "a\"b.txt", b"").unwrap();
        let cd = ContentDisposition::parse(part.headers.get(CONTENT_DISPOSITION).unwrap()).unwrap();
        assert_eq!(cd.filename().unwrap(), Some("a\"b.txt".to_string()));
        assert_eq!(part.headers.get(CONTENT_TYPE).unwrap(), "application/octet-stream");
    }
}
