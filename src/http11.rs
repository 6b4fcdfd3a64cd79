use crate::error::ProtocolError;
use crate::response::Response;
use std::collections::HashMap;
use std::io;
use std::io::Write;

/// The only protocol version token accepted in a status line.
pub const HTTP_11: &str = "HTTP/1.1";

/// Line terminator.
pub const CRLF: &[u8] = b"\r\n";

/// Write an http/1.1 GET request head to a buffer.
///
/// Returns the number of bytes appended.
#[allow(clippy::write_with_newline)]
pub fn write_http11_req(host: &str, uri: &str, buf: &mut Vec<u8>) -> Result<usize, io::Error> {
    let start = buf.len();

    write!(buf, "GET {} HTTP/1.1\r\n", uri)?;
    write!(buf, "Host: {}\r\n", host)?;
    write!(buf, "\r\n")?;

    debug!(
        "write_http11_req: {:?}",
        String::from_utf8_lossy(&buf[start..])
    );

    Ok(buf.len() - start)
}

/// Where the parser is in the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    StatusLine,
    Headers,
    Body,
}

/// Outcome of feeding one header line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderLine {
    /// More header lines follow.
    More,
    /// The blank line ending the header block was seen.
    End,
}

/// Incremental parser of an http/1.1 response.
///
/// The response is fed line by line: first the status line, then one header line at
/// a time until the blank line, and finally the body bytes. Feeding something in the
/// wrong order is a bug in the caller and panics.
#[derive(Debug)]
pub struct ResponseParser {
    expect: Expect,
    status_code: u16,
    status_message: String,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl Default for ResponseParser {
    fn default() -> Self {
        ResponseParser::new()
    }
}

impl ResponseParser {
    /// Create a parser waiting for a status line.
    pub fn new() -> Self {
        ResponseParser {
            expect: Expect::StatusLine,
            status_code: 0,
            status_message: String::new(),
            headers: HashMap::new(),
            body: vec![],
        }
    }

    /// Parse `<version> SP <status-code> SP <status-text> CRLF`.
    pub fn parse_status_line(&mut self, line: &[u8]) -> Result<(), ProtocolError> {
        assert_eq!(self.expect, Expect::StatusLine, "status line already parsed");

        trace!("parse_status_line: {:?}", String::from_utf8_lossy(line));

        let line = strip_line_end(line);

        let (version, rest) = split_at_space(line);

        if version != HTTP_11.as_bytes() {
            debug!(
                "Unsupported version token: {:?}",
                String::from_utf8_lossy(version)
            );
            return Err(ProtocolError::InvalidResponse);
        }

        let (code, message) = split_at_space(rest);

        self.status_code = parse_status_code(code).ok_or_else(|| {
            debug!("Bad status code: {:?}", String::from_utf8_lossy(code));
            ProtocolError::InvalidResponse
        })?;
        self.status_message = String::from_utf8_lossy(message).into_owned();

        self.expect = Expect::Headers;

        Ok(())
    }

    /// Parse one `<name>:<value> CRLF` line, or the bare CRLF ending the header block.
    ///
    /// Name and value are kept as sent, split at the first colon and untrimmed. Lines
    /// without a colon are skipped. A repeated name overwrites the earlier value.
    pub fn parse_header_line(&mut self, line: &[u8]) -> HeaderLine {
        assert_eq!(self.expect, Expect::Headers, "not expecting headers");

        let line = strip_line_end(line);

        if line.is_empty() {
            trace!("End of headers: {}", self.headers.len());
            self.expect = Expect::Body;
            return HeaderLine::End;
        }

        let colon = match line.iter().position(|b| *b == b':') {
            Some(i) => i,
            None => {
                trace!("Skipping header line: {:?}", String::from_utf8_lossy(line));
                return HeaderLine::More;
            }
        };

        let name = String::from_utf8_lossy(&line[..colon]).into_owned();
        let value = String::from_utf8_lossy(&line[colon + 1..]).into_owned();

        trace!("Header {:?}: {:?}", name, value);

        self.headers.insert(name, value);

        HeaderLine::More
    }

    /// Append body bytes.
    pub fn push_body(&mut self, bytes: &[u8]) {
        assert_eq!(self.expect, Expect::Body, "body before end of headers");
        self.body.extend_from_slice(bytes);
    }

    /// Tell if the header block has been completely parsed.
    pub fn is_headers_done(&self) -> bool {
        self.expect == Expect::Body
    }

    /// Status code parsed so far, `0` before the status line.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Headers parsed so far.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Turn the parsed parts into a `Response`.
    pub fn into_response(self) -> Response {
        Response::new(
            self.status_code,
            self.status_message,
            self.headers,
            self.body,
        )
    }
}

fn strip_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Split at the first space. The rest is empty if there is no space.
fn split_at_space(buf: &[u8]) -> (&[u8], &[u8]) {
    match buf.iter().position(|b| *b == b' ') {
        Some(i) => (&buf[..i], &buf[i + 1..]),
        None => (buf, &buf[buf.len()..]),
    }
}

fn parse_status_code(code: &[u8]) -> Option<u16> {
    if code.is_empty() || !code.iter().all(u8::is_ascii_digit) {
        return None;
    }
    // only ascii digits at this point.
    std::str::from_utf8(code).ok()?.parse().ok()
}
