//! Cache file writer

use std::io::{self, Write};

use bytes::Bytes;

use super::format::{CRLF, END_MARKER, FILE_MAGIC};
use crate::exchange::{Headers, Request, Response, CONTENT_LENGTH};

/// Encode a request: `<METHOD> <URI>`, headers, blank line, content
///
/// # Errors
///
/// Returns error if the sink fails or a header contains a line break
pub fn encode_request<W: Write>(out: &mut W, request: &Request) -> io::Result<()> {
    write!(out, "{} {}", request.method, request.uri)?;
    out.write_all(CRLF)?;
    write_message(
        out,
        &request.headers,
        &request.content_headers,
        request.body.as_ref(),
    )
}

/// Encode a response: `<status> <reason>`, headers, blank line, content
///
/// # Errors
///
/// Returns error if the sink fails or a header contains a line break
pub fn encode_response<W: Write>(out: &mut W, response: &Response) -> io::Result<()> {
    check_line(&response.reason)?;
    write!(out, "{} {}", response.status.as_u16(), response.reason)?;
    out.write_all(CRLF)?;
    write_message(
        out,
        &response.headers,
        &response.content_headers,
        response.body.as_ref(),
    )
}

/// Encode one record: the content is closed by a line break, then a blank
/// line separates it from whatever follows
///
/// # Errors
///
/// Returns error if either side fails to encode
pub fn write_record<W: Write>(out: &mut W, request: &Request, response: &Response) -> io::Result<()> {
    encode_request(out, request)?;
    encode_response(out, response)?;
    out.write_all(CRLF)?;
    out.write_all(CRLF)
}

/// Encode a whole cache file: magic, every record, then the end marker
///
/// # Errors
///
/// Returns error if any record fails to encode
pub fn write_cache_file<'a, W, I>(out: &mut W, records: I) -> io::Result<usize>
where
    W: Write,
    I: IntoIterator<Item = (&'a Request, &'a Response)>,
{
    out.write_all(FILE_MAGIC)?;

    let mut count = 0;
    for (request, response) in records {
        write_record(out, request, response)?;
        count += 1;
    }

    out.write_all(END_MARKER.as_bytes())?;
    out.write_all(CRLF)?;

    Ok(count)
}

fn write_message<W: Write>(
    out: &mut W,
    headers: &Headers,
    content_headers: &Headers,
    body: Option<&Bytes>,
) -> io::Result<()> {
    for (name, values) in headers.iter() {
        write_header(out, name, values)?;
    }

    // Content headers without a body are written as empty content so the
    // reader's "content headers imply content" rule still holds.
    let content = if body.is_some() || !content_headers.is_empty() {
        let len = body.map_or(0, Bytes::len).to_string();
        let mut content_headers = content_headers.clone();
        if content_headers.get_joined(CONTENT_LENGTH).as_deref() != Some(len.as_str()) {
            content_headers.set(CONTENT_LENGTH, len);
        }
        for (name, values) in content_headers.iter() {
            write_header(out, name, values)?;
        }
        body
    } else {
        None
    };

    out.write_all(CRLF)?;

    if let Some(body) = content {
        out.write_all(body)?;
    }

    Ok(())
}

fn write_header<W: Write>(out: &mut W, name: &str, values: &[String]) -> io::Result<()> {
    check_line(name)?;
    if name.contains(':') {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("header name contains a colon: {name:?}"),
        ));
    }

    let value = values.join(",");
    check_line(&value)?;

    write!(out, "{name}: {value}")?;
    out.write_all(CRLF)
}

fn check_line(text: &str) -> io::Result<()> {
    if text.contains(['\r', '\n']) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("line break inside header line: {text:?}"),
        ));
    }
    Ok(())
}
