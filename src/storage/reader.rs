//! Cache file reader
//!
//! Content follows its headers with nothing but `Content-Length` marking the
//! boundary, so every read here is line or byte granular over a [`BufRead`]
//! and never consumes past the end of the current item.

use std::io::{self, BufRead, Read};

use bytes::Bytes;
use hyper::{Method, StatusCode, Uri};

use super::format::{END_MARKER, FILE_MAGIC, MAX_LINE_LEN};
use super::Exchange;
use crate::exchange::{is_content_header, Headers, Request, Response, CONTENT_LENGTH};
use crate::{Result, VcrError};

/// Decode one request
///
/// Returns `Ok(None)` when the stream ends before a single byte of the
/// request line is read.
///
/// # Errors
///
/// Returns `BadCacheFile` if the request is malformed or truncated
pub fn decode_request<R: BufRead>(input: &mut R) -> Result<Option<Request>> {
    let Some(line) = read_line(input)? else {
        return Ok(None);
    };

    parse_request(&line, input).map(Some)
}

/// Decode the rest of a request whose start line is already read
fn parse_request<R: BufRead>(line: &str, input: &mut R) -> Result<Request> {
    let (method, uri) = line
        .split_once(' ')
        .ok_or_else(|| VcrError::bad_cache_file(format!("missing space in request line {line:?}")))?;

    let method = Method::from_bytes(method.as_bytes())
        .map_err(|_| VcrError::bad_cache_file(format!("invalid method in request line {line:?}")))?;
    let uri = parse_absolute_uri(uri)?;

    let (headers, content_headers) = read_headers(input)?;
    let body = read_content(input, &content_headers)?;

    Ok(Request {
        method,
        uri,
        headers,
        content_headers,
        body,
    })
}

/// Decode one response
///
/// # Errors
///
/// Returns `BadCacheFile` if the response is malformed or truncated
pub fn decode_response<R: BufRead>(input: &mut R) -> Result<Response> {
    let line = read_line(input)?
        .ok_or_else(|| VcrError::bad_cache_file("unexpected end of file before response"))?;

    let (code, reason) = line
        .split_once(' ')
        .ok_or_else(|| VcrError::bad_cache_file(format!("missing space in response line {line:?}")))?;

    let status = code
        .parse::<u16>()
        .ok()
        .and_then(|code| StatusCode::from_u16(code).ok())
        .ok_or_else(|| VcrError::bad_cache_file(format!("invalid status code {code:?}")))?;

    let (headers, content_headers) = read_headers(input)?;
    let body = read_content(input, &content_headers)?;

    Ok(Response {
        status,
        reason: reason.to_string(),
        headers,
        content_headers,
        body,
    })
}

/// Decode one record and the line break closing its content
///
/// Blank bytes before the record are skipped. Returns `Ok(None)` once the
/// end marker is read.
///
/// # Errors
///
/// Returns `BadCacheFile` if the record is malformed or truncated, or if the
/// stream ends before the end marker
pub fn read_record<R: BufRead>(input: &mut R) -> Result<Option<Exchange>> {
    skip_blank(input)?;

    let line = read_line(input)?.ok_or_else(|| {
        VcrError::bad_cache_file("unexpected end of file (missing end marker)")
    })?;
    if line == END_MARKER {
        return Ok(None);
    }

    let request = parse_request(&line, input)?;
    let response = decode_response(input)?;

    match read_line(input)? {
        Some(line) if line.is_empty() => Ok(Some((request, response))),
        Some(line) => Err(VcrError::bad_cache_file(format!(
            "expected line break after response content, found {line:?}"
        ))),
        None => Err(VcrError::bad_cache_file(
            "unexpected end of file after response content",
        )),
    }
}

/// Decode a whole cache file
///
/// # Errors
///
/// Returns `BadCacheFile` on a magic mismatch, any malformed record, a
/// missing end marker, data after the end marker, or when the file holds no
/// records at all
pub fn read_cache_file<R: BufRead>(input: &mut R) -> Result<Vec<Exchange>> {
    let mut magic = vec![0u8; FILE_MAGIC.len()];
    match input.read_exact(&mut magic) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            return Err(VcrError::bad_cache_file("file header is truncated"));
        }
        Err(e) => return Err(e.into()),
    }
    if magic != FILE_MAGIC {
        return Err(VcrError::bad_cache_file(
            "file header mismatch (line endings may have been normalized)",
        ));
    }

    let mut records = Vec::new();
    while let Some(record) = read_record(input)? {
        records.push(record);
    }

    skip_blank(input)?;
    if !input.fill_buf()?.is_empty() {
        return Err(VcrError::bad_cache_file("unexpected data after end marker"));
    }

    if records.is_empty() {
        return Err(VcrError::bad_cache_file("no cached responses found"));
    }

    Ok(records)
}

/// Consume any run of CR and LF bytes
///
/// # Errors
///
/// Returns error if the underlying reader fails
pub fn skip_blank<R: BufRead>(input: &mut R) -> Result<()> {
    loop {
        let buf = input.fill_buf()?;
        if buf.is_empty() {
            return Ok(());
        }

        let blank = buf.iter().take_while(|b| matches!(b, b'\r' | b'\n')).count();
        let exhausted = blank == buf.len();
        input.consume(blank);

        if !exhausted {
            return Ok(());
        }
    }
}

/// Read one line, accepting CRLF or bare LF
///
/// `Ok(None)` only when zero bytes were available.
fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut buf = Vec::new();
    let read = input
        .by_ref()
        .take(MAX_LINE_LEN as u64)
        .read_until(b'\n', &mut buf)?;

    if read == 0 {
        return Ok(None);
    }

    if buf.last() != Some(&b'\n') {
        return Err(if read >= MAX_LINE_LEN {
            VcrError::bad_cache_file(format!("line exceeds {MAX_LINE_LEN} bytes"))
        } else {
            VcrError::bad_cache_file("unexpected end of file in the middle of a line")
        });
    }

    buf.pop();
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }

    String::from_utf8(buf)
        .map(Some)
        .map_err(|_| VcrError::bad_cache_file("line is not valid UTF-8"))
}

fn read_headers<R: BufRead>(input: &mut R) -> Result<(Headers, Headers)> {
    let mut headers = Headers::new();
    let mut content_headers = Headers::new();

    loop {
        let line = read_line(input)?
            .ok_or_else(|| VcrError::bad_cache_file("unexpected end of file in headers"))?;

        if line.is_empty() {
            return Ok((headers, content_headers));
        }

        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| VcrError::bad_cache_file(format!("missing colon in header line {line:?}")))?;
        let (name, value) = (name.trim(), value.trim());

        if is_content_header(name) {
            content_headers.append(name, value);
        } else {
            headers.append(name, value);
        }
    }
}

fn read_content<R: BufRead>(input: &mut R, content_headers: &Headers) -> Result<Option<Bytes>> {
    if content_headers.is_empty() {
        return Ok(None);
    }

    let length = content_headers
        .get_joined(CONTENT_LENGTH)
        .ok_or_else(|| VcrError::bad_cache_file("content headers present but Content-Length is missing"))?;
    let length = length
        .trim()
        .parse::<u64>()
        .map_err(|_| VcrError::bad_cache_file(format!("invalid Content-Length {length:?}")))?;

    let mut body = Vec::new();
    input.by_ref().take(length).read_to_end(&mut body)?;

    if (body.len() as u64) < length {
        return Err(VcrError::bad_cache_file(format!(
            "unexpected end of file in content: expected {length} bytes, found {}",
            body.len()
        )));
    }

    Ok(Some(Bytes::from(body)))
}

fn parse_absolute_uri(text: &str) -> Result<Uri> {
    let uri = text
        .parse::<Uri>()
        .map_err(|e| VcrError::bad_cache_file(format!("invalid request URI {text:?}: {e}")))?;

    if uri.scheme().is_none() || uri.authority().is_none() {
        return Err(VcrError::bad_cache_file(format!(
            "request URI is not absolute: {text:?}"
        )));
    }

    Ok(uri)
}
