//! HTTP/1.0 wire framing for the entropy service
//!
//! The request side emits the literal bytes of a `GET` with the service's
//! token headers. The response side parses headers one byte at a time into a
//! case-sensitive record: the status line is stored under the synthetic
//! `HTTP` key, split at the first `/`, every other line splits at the first
//! `:` with both sides trimmed.

use crate::{Error, Result};
use std::collections::HashMap;
use std::io::Read;

/// Fixed size of the response header line buffer
pub const HEADER_LINE_MAX: usize = 256;

/// Request header carrying the service authentication token
pub const AUTH_TOKEN_HEADER: &str = "tl-ent-sce-auth-token";

/// Request header carrying the wrapped session key
pub const CRYPTO_TOKEN_HEADER: &str = "tl-ent-sce-crypto-token";

/// Response header carrying the salted body fingerprint
pub const FINGERPRINT_HEADER: &str = "TL-RESP-BYTEHASH";

/// Synthetic key holding the status line remainder
pub const STATUS_KEY: &str = "HTTP";

/// Build the literal bytes of one HTTP/1.0 GET request.
///
/// The token headers are emitted only when present: the auth token when
/// non-empty, the crypto token when the stream is encrypted.
pub fn build_get_request(
    resource: &str,
    host: &str,
    auth_token: &str,
    crypto_token: Option<&str>,
) -> String {
    let mut request = String::new();
    request.push_str("GET ");
    request.push_str(resource);
    request.push_str(" HTTP/1.0\r\n");
    request.push_str("Host: ");
    request.push_str(host);
    request.push_str("\r\n");
    if !auth_token.is_empty() {
        request.push_str(AUTH_TOKEN_HEADER);
        request.push_str(": ");
        request.push_str(auth_token);
        request.push_str("\r\n");
    }
    if let Some(token) = crypto_token {
        request.push_str(CRYPTO_TOKEN_HEADER);
        request.push_str(": ");
        request.push_str(token);
        request.push_str("\r\n");
    }
    request.push_str("\r\n");
    request
}

/// Parsed response status line and headers
///
/// Header names are stored verbatim and lookups are case-sensitive: callers
/// must ask for exactly the casing the server emits.
#[derive(Debug, Default)]
pub struct HttpResponse {
    headers: HashMap<String, String>,
}

impl HttpResponse {
    /// Read and parse response headers from the transport.
    ///
    /// Consumes bytes one at a time until two consecutive line terminators;
    /// `\r` is tolerated anywhere and does not reset the end-of-headers
    /// detector. Lines longer than [`HEADER_LINE_MAX`] fail the response,
    /// as do read errors or EOF before the headers end.
    pub fn read_from(reader: &mut dyn Read) -> Result<Self> {
        let mut headers = HashMap::new();
        let mut line = Vec::with_capacity(HEADER_LINE_MAX);
        let mut terminators = 0;
        let mut first_line = true;
        let mut byte = [0u8; 1];

        loop {
            let n = reader.read(&mut byte).map_err(|_| Error::MalformedHeader)?;
            if n == 0 {
                return Err(Error::MalformedHeader);
            }
            if line.len() >= HEADER_LINE_MAX {
                return Err(Error::HeaderOverflow(HEADER_LINE_MAX));
            }

            let c = byte[0];
            line.push(c);
            if c == b'\n' {
                terminators += 1;
                let text = String::from_utf8_lossy(&line);
                let delimiter = if first_line { '/' } else { ':' };
                first_line = false;
                parse_line(&mut headers, &text, delimiter);
                if terminators > 1 {
                    break;
                }
                line.clear();
            } else if c != b'\r' {
                terminators = 0;
            }
        }

        Ok(Self { headers })
    }

    /// Look up a header value by its exact name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// The HTTP status code: the second whitespace-separated token of the
    /// status line, or 0 when absent or unparsable.
    pub fn status_code(&self) -> u16 {
        self.header(STATUS_KEY)
            .and_then(|status| status.split_whitespace().nth(1))
            .and_then(|code| code.parse().ok())
            .unwrap_or(0)
    }
}

fn is_lead_space(c: char) -> bool {
    matches!(c, ' ' | '\x0C' | '\t' | '\x0B')
}

fn is_trim_space(c: char) -> bool {
    matches!(c, ' ' | '\x0C' | '\t' | '\x0B' | '\r' | '\n')
}

/// Split one header line at the first `delimiter` and store the trimmed
/// pair. Blank, delimiter-less, and key-less lines define no header.
fn parse_line(headers: &mut HashMap<String, String>, line: &str, delimiter: char) {
    let begin = match line.find(|c| !is_lead_space(c)) {
        Some(i) => i,
        None => return,
    };
    let delim_idx = match line[begin..].find(delimiter) {
        Some(i) => begin + i,
        None => return,
    };

    let key = line[begin..delim_idx].trim_end_matches(is_trim_space);
    if key.is_empty() {
        return;
    }
    let value = line[delim_idx + delimiter.len_utf8()..].trim_matches(is_trim_space);

    headers.insert(key.to_string(), value.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(raw: &str) -> Result<HttpResponse> {
        HttpResponse::read_from(&mut Cursor::new(raw.as_bytes()))
    }

    #[test]
    fn test_request_with_all_headers() {
        let request = build_get_request("/api/v1/randbytes10", "random.example.com", "secret", Some("AABB"));
        assert_eq!(
            request,
            "GET /api/v1/randbytes10 HTTP/1.0\r\n\
             Host: random.example.com\r\n\
             tl-ent-sce-auth-token: secret\r\n\
             tl-ent-sce-crypto-token: AABB\r\n\
             \r\n"
        );
    }

    #[test]
    fn test_request_without_optional_headers() {
        let request = build_get_request("/rnd100", "host.example", "", None);
        assert_eq!(request, "GET /rnd100 HTTP/1.0\r\nHost: host.example\r\n\r\n");
    }

    #[test]
    fn test_status_line_and_headers() {
        let response = parse("HTTP/1.0 200 OK\r\nTL-RESP-BYTEHASH: ABCD\r\n\r\n").unwrap();
        assert_eq!(response.header("HTTP"), Some("1.0 200 OK"));
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.header("TL-RESP-BYTEHASH"), Some("ABCD"));
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let response = parse("HTTP/1.0 200 OK\r\nTL-RESP-BYTEHASH: ABCD\r\n\r\n").unwrap();
        assert_eq!(response.header("tl-resp-bytehash"), None);
        assert_eq!(response.header("http"), None);
    }

    #[test]
    fn test_bare_newlines_accepted() {
        let response = parse("HTTP/1.0 404 Not Found\nServer: mock\n\n").unwrap();
        assert_eq!(response.status_code(), 404);
        assert_eq!(response.header("Server"), Some("mock"));
    }

    #[test]
    fn test_value_whitespace_is_trimmed() {
        let response = parse("HTTP/1.0 200 OK\r\nX-Pad:   spaced value \t\r\n\r\n").unwrap();
        assert_eq!(response.header("X-Pad"), Some("spaced value"));
    }

    #[test]
    fn test_empty_value_parses() {
        let response = parse("HTTP/1.0 200 OK\r\nX-Empty:\r\n\r\n").unwrap();
        assert_eq!(response.header("X-Empty"), Some(""));
    }

    #[test]
    fn test_status_code_zero_when_unparsable() {
        let response = parse("HTTP/1.0 abc OK\r\n\r\n").unwrap();
        assert_eq!(response.status_code(), 0);

        let no_slash = parse("BOGUS STATUS LINE\r\n\r\n").unwrap();
        assert_eq!(no_slash.status_code(), 0);
    }

    #[test]
    fn test_reason_phrase_keeps_trailing_tokens() {
        let response = parse("HTTP/1.1 301 Moved: elsewhere\r\n\r\n").unwrap();
        assert_eq!(response.header("HTTP"), Some("1.1 301 Moved: elsewhere"));
        assert_eq!(response.status_code(), 301);
    }

    #[test]
    fn test_header_line_overflow() {
        let long_value = "v".repeat(HEADER_LINE_MAX);
        let raw = format!("HTTP/1.0 200 OK\r\nX-Long: {}\r\n\r\n", long_value);
        assert!(matches!(parse(&raw), Err(Error::HeaderOverflow(_))));
    }

    #[test]
    fn test_eof_before_end_of_headers() {
        assert!(matches!(parse("HTTP/1.0 200 OK\r\n"), Err(Error::MalformedHeader)));
        assert!(matches!(parse(""), Err(Error::MalformedHeader)));
    }
}
