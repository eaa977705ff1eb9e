use std::io::{BufReader, Read};

use http::header::CONTENT_DISPOSITION;
use http::HeaderMap;

use crate::multipart::error::Error;
use crate::multipart::{ContentDisposition, FileHook, FilePart, Node};

/// The extracted text fields and uploaded files from a `multipart/form-data` request.
///
/// Use `read_formdata` to devise this object from a request.
#[derive(Debug, Default)]
pub struct FormData {
    /// Name-value pairs for plain text fields. Technically, these are form data parts with no
    /// filename specified in the part's `Content-Disposition`.
    pub fields: Vec<(String, String)>,
    /// Name-value pairs for file parts. Technically, these are form data parts with a filename
    /// specified in the part's `Content-Disposition`.
    pub files: Vec<(String, FilePart)>,
}

impl FormData {
    pub fn new() -> FormData {
        FormData { fields: vec![], files: vec![] }
    }
}

/// Parse MIME `multipart/form-data` information from a stream as a `FormData`.
pub fn read_formdata<S: Read>(headers: &HeaderMap, stream: S, hook: &mut FileHook<'_>) -> Result<FormData, Error> {
    let mut reader = BufReader::with_capacity(4096, stream);
    let nodes = crate::multipart::read_multipart_body(&mut reader, headers, hook)?;
    let mut formdata = FormData::new();
    fill_formdata(&mut formdata, nodes)?;
    Ok(formdata)
}

// order and nesting are irrelevant, so we interate through the nodes and put them
// into one of two buckets (fields and files);  If a multipart node is found, it uses
// the name in its headers as the key (rather than the name in the headers of the
// subparts), which is how multiple file uploads work.
fn fill_formdata(formdata: &mut FormData, nodes: Vec<Node>) -> Result<(), Error> {
    for node in nodes {
        match node {
            Node::Part(part) => {
                let key = disposition_name(&part.headers)?;
                let val = String::from_utf8(part.body)?;
                formdata.fields.push((key, val));
            }
            Node::File(part) => {
                let key = disposition_name(&part.headers)?;
                formdata.files.push((key, part));
            }
            Node::Multipart((headers, nodes)) => {
                let key = disposition_name(&headers)?;
                for node in nodes {
                    match node {
                        Node::Part(part) => {
                            let val = String::from_utf8(part.body)?;
                            formdata.fields.push((key.clone(), val));
                        }
                        Node::File(part) => {
                            formdata.files.push((key.clone(), part));
                        }
                        _ => {} // don't recurse deeper
                    }
                }
            }
        }
    }
    Ok(())
}

fn disposition_name(headers: &HeaderMap) -> Result<String, Error> {
    let cd = headers.get(CONTENT_DISPOSITION).ok_or(Error::MissingDisposition)?;
    ContentDisposition::parse(cd)?
        .name()
        .map(str::to_string)
        .ok_or(Error::NoName)
}
