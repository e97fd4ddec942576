//! Raw HTTP/1.x message handling
//!
//! Requests and responses travel between the host and the check as raw bytes.
//! This module splits them into head and body, removes header lines, and
//! extracts the pieces the check and the replay client need. Everything works
//! on bytes so non-UTF-8 bodies pass through untouched.

use crate::error::MessageError;

/// A request split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    pub method: String,
    pub target: String,
    pub version: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// A response split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    pub version: String,
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ParsedRequest {
    pub fn parse(request: &[u8]) -> Result<Self, MessageError> {
        let line = start_line(request).ok_or(MessageError::Empty)?;

        let mut parts = line.split_whitespace();
        let (method, target, version) = match (parts.next(), parts.next(), parts.next()) {
            (Some(method), Some(target), Some(version)) if version.starts_with("HTTP/") => {
                (method.to_string(), target.to_string(), version.to_string())
            }
            _ => return Err(MessageError::MalformedRequestLine(line.clone())),
        };

        Ok(Self {
            method,
            target,
            version,
            headers: parse_headers(request),
            body: request[body_offset(request)..].to_vec(),
        })
    }

    /// Get a header value (case-insensitive, first match)
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Serialize back to raw bytes with CRLF line endings
    pub fn to_bytes(&self) -> Vec<u8> {
        let start = format!("{} {} {}", self.method, self.target, self.version);
        render(&start, &self.headers, &self.body)
    }
}

impl ParsedResponse {
    pub fn parse(response: &[u8]) -> Result<Self, MessageError> {
        let line = start_line(response).ok_or(MessageError::Empty)?;
        let status = parse_status_line(&line)?;

        let mut parts = line.splitn(3, ' ');
        let version = parts.next().unwrap_or_default().to_string();
        let reason = parts.nth(1).unwrap_or_default().trim().to_string();

        Ok(Self {
            version,
            status,
            reason,
            headers: parse_headers(response),
            body: response[body_offset(response)..].to_vec(),
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let start = if self.reason.is_empty() {
            format!("{} {}", self.version, self.status)
        } else {
            format!("{} {} {}", self.version, self.status, self.reason)
        };
        render(&start, &self.headers, &self.body)
    }
}

/// Extract the status code from a raw response's status line
pub fn status_code(response: &[u8]) -> Result<u16, MessageError> {
    let line = start_line(response).ok_or(MessageError::Empty)?;
    parse_status_line(&line)
}

/// Remove every header line named `name` (ASCII case-insensitive) from a raw
/// request.
///
/// Only the header block is touched: the request line, the body and all other
/// headers come back byte-for-byte. Folded continuation lines belonging to a
/// removed header are removed with it. Line endings are kept as found, so CRLF
/// and bare LF messages both work. Stripping an absent header returns the
/// input unchanged.
pub fn strip_header(request: &[u8], name: &str) -> Vec<u8> {
    let (head, body) = request.split_at(body_offset(request));
    let mut stripped = Vec::with_capacity(request.len());
    let mut removing = false;

    for (index, line) in lines(head).enumerate() {
        if index == 0 || is_blank(line) {
            removing = false;
            stripped.extend_from_slice(line);
            continue;
        }

        if is_continuation(line) {
            if !removing {
                stripped.extend_from_slice(line);
            }
            continue;
        }

        removing = header_name(line).is_some_and(|n| n.eq_ignore_ascii_case(name.as_bytes()));
        if !removing {
            stripped.extend_from_slice(line);
        }
    }

    stripped.extend_from_slice(body);
    stripped
}

/// Offset of the first body byte, just past the empty line that closes the
/// header block. A message without that empty line is all head.
pub fn body_offset(message: &[u8]) -> usize {
    let mut offset = 0;
    for (index, line) in lines(message).enumerate() {
        offset += line.len();
        if index > 0 && is_blank(line) {
            return offset;
        }
    }
    message.len()
}

fn lines(bytes: &[u8]) -> impl Iterator<Item = &[u8]> {
    bytes.split_inclusive(|b| *b == b'\n')
}

fn is_blank(line: &[u8]) -> bool {
    matches!(line, b"\n" | b"\r\n")
}

fn is_continuation(line: &[u8]) -> bool {
    matches!(line.first(), Some(b' ') | Some(b'\t'))
}

fn header_name(line: &[u8]) -> Option<&[u8]> {
    let colon = line.iter().position(|b| *b == b':')?;
    Some(&line[..colon])
}

fn trim_eol(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn start_line(message: &[u8]) -> Option<String> {
    let first = lines(message).next()?;
    let line = String::from_utf8_lossy(trim_eol(first)).trim().to_string();
    if line.is_empty() {
        None
    } else {
        Some(line)
    }
}

fn parse_status_line(line: &str) -> Result<u16, MessageError> {
    let mut parts = line.split_whitespace();
    let version = parts.next().unwrap_or_default();
    let code = parts.next().unwrap_or_default();

    if !version.starts_with("HTTP/") || code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MessageError::MalformedStatusLine(line.to_string()));
    }

    code.parse()
        .map_err(|_| MessageError::MalformedStatusLine(line.to_string()))
}

fn parse_headers(message: &[u8]) -> Vec<(String, String)> {
    let head = &message[..body_offset(message)];
    let mut headers: Vec<(String, String)> = Vec::new();

    for line in lines(head).skip(1) {
        if is_blank(line) {
            break;
        }

        let text = String::from_utf8_lossy(trim_eol(line)).to_string();

        if is_continuation(line) {
            if let Some((_, value)) = headers.last_mut() {
                value.push(' ');
                value.push_str(text.trim());
            }
            continue;
        }

        if let Some((name, value)) = text.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    headers
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

fn render(start: &str, headers: &[(String, String)], body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(start.len() + body.len() + 64 * headers.len());
    out.extend_from_slice(start.as_bytes());
    out.extend_from_slice(b"\r\n");
    for (name, value) in headers {
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(body);
    out
}
