//! HTTP exchange tests against in-process mock entropy services

use epf_core::fetcher::{fingerprint, EntropyFetcher};
use epf_core::token::SessionToken;
use epf_core::{hex, xor, Error};
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, OnceLock};
use std::thread::JoinHandle;

fn test_keypair() -> &'static (RsaPrivateKey, Arc<RsaPublicKey>) {
    static KEYPAIR: OnceLock<(RsaPrivateKey, Arc<RsaPublicKey>)> = OnceLock::new();
    KEYPAIR.get_or_init(|| {
        let private = RsaPrivateKey::new(&mut rand::thread_rng(), 2048).unwrap();
        let public = Arc::new(RsaPublicKey::from(&private));
        (private, public)
    })
}

/// Read one request off the stream, up to the blank line.
fn read_request(stream: &mut TcpStream) -> String {
    let mut request = Vec::new();
    let mut byte = [0u8; 1];
    while !request.ends_with(b"\r\n\r\n") {
        match stream.read(&mut byte) {
            Ok(1) => request.push(byte[0]),
            _ => break,
        }
    }
    String::from_utf8(request).unwrap()
}

fn request_header(request: &str, name: &str) -> Option<String> {
    request
        .lines()
        .find_map(|line| line.strip_prefix(&format!("{}: ", name)))
        .map(str::to_string)
}

/// Serve a single connection with a canned response.
fn serve_once(respond: impl FnOnce(String, &mut TcpStream) + Send + 'static) -> (u16, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let request = read_request(&mut stream);
        respond(request, &mut stream);
    });
    (port, handle)
}

#[test]
fn plain_exchange_returns_body() {
    let (port, server) = serve_once(|request, stream| {
        assert!(request.starts_with("GET /api/randbytes8 HTTP/1.0\r\n"));
        assert!(request.contains("Host: 127.0.0.1\r\n"));
        assert!(!request.contains("tl-ent-sce-auth-token"));
        assert!(!request.contains("tl-ent-sce-crypto-token"));

        stream.write_all(b"HTTP/1.0 200 OK\r\n\r\n").unwrap();
        stream.write_all(&[7u8; 8]).unwrap();
    });

    let fetcher = EntropyFetcher::new("127.0.0.1", port, false, "", false, None);
    let body = fetcher.fetch("/api/randbytes8", 8).unwrap();
    assert_eq!(body, vec![7u8; 8]);
    server.join().unwrap();
}

#[test]
fn auth_token_header_is_sent_when_configured() {
    let (port, server) = serve_once(|request, stream| {
        assert_eq!(
            request_header(&request, "tl-ent-sce-auth-token").as_deref(),
            Some("sekrit")
        );
        stream.write_all(b"HTTP/1.0 200 OK\r\n\r\n").unwrap();
        stream.write_all(&[0u8; 4]).unwrap();
    });

    let fetcher = EntropyFetcher::new("127.0.0.1", port, false, "sekrit", false, None);
    fetcher.fetch("/rnd4", 4).unwrap();
    server.join().unwrap();
}

#[test]
fn non_200_status_fails_the_exchange() {
    let (port, server) = serve_once(|_, stream| {
        stream
            .write_all(b"HTTP/1.0 500 Internal Server Error\r\n\r\n")
            .unwrap();
    });

    let fetcher = EntropyFetcher::new("127.0.0.1", port, false, "", false, None);
    assert!(matches!(
        fetcher.fetch("/rnd4", 4),
        Err(Error::HttpStatus(500))
    ));
    server.join().unwrap();
}

#[test]
fn short_body_fails_with_truncation() {
    let (port, server) = serve_once(|_, stream| {
        stream.write_all(b"HTTP/1.0 200 OK\r\n\r\n").unwrap();
        stream.write_all(&[1u8; 3]).unwrap();
        // connection closes with 3 of 16 bytes delivered
    });

    let fetcher = EntropyFetcher::new("127.0.0.1", port, false, "", false, None);
    assert!(matches!(fetcher.fetch("/rnd16", 16), Err(Error::Truncated)));
    server.join().unwrap();
}

/// Unwrap the session key the way the real service would.
fn unwrap_session_key(request: &str) -> [u8; 48] {
    let (private, public) = test_keypair();
    let wire = request_header(request, "tl-ent-sce-crypto-token").unwrap();
    let mut token = SessionToken::new(Arc::clone(public));
    token.accept(private, &wire).unwrap();
    *token.key()
}

#[test]
fn encrypted_exchange_verifies_and_decrypts() {
    let plaintext: Vec<u8> = (0u8..32).collect();
    let expected = plaintext.clone();

    let (port, server) = serve_once(move |request, stream| {
        let key = unwrap_session_key(&request);

        let mut body = plaintext.clone();
        xor::xor_inplace(&mut body, &key).unwrap();

        let headers = format!(
            "HTTP/1.0 200 OK\r\nTL-RESP-BYTEHASH: {}\r\n\r\n",
            fingerprint(&plaintext)
        );
        stream.write_all(headers.as_bytes()).unwrap();
        stream.write_all(&body).unwrap();
    });

    let (_, public) = test_keypair();
    let fetcher =
        EntropyFetcher::new("127.0.0.1", port, false, "", true, Some(Arc::clone(public)));
    let body = fetcher.fetch("/rnd32", 32).unwrap();
    assert_eq!(body, expected);
    server.join().unwrap();
}

#[test]
fn tampered_body_fails_fingerprint_verification() {
    let plaintext = vec![0x5A; 32];

    let (port, server) = serve_once(move |request, stream| {
        let key = unwrap_session_key(&request);

        let mut body = plaintext.clone();
        xor::xor_inplace(&mut body, &key).unwrap();
        body[5] ^= 0xFF;

        let headers = format!(
            "HTTP/1.0 200 OK\r\nTL-RESP-BYTEHASH: {}\r\n\r\n",
            fingerprint(&plaintext)
        );
        stream.write_all(headers.as_bytes()).unwrap();
        stream.write_all(&body).unwrap();
    });

    let (_, public) = test_keypair();
    let fetcher =
        EntropyFetcher::new("127.0.0.1", port, false, "", true, Some(Arc::clone(public)));
    assert!(matches!(
        fetcher.fetch("/rnd32", 32),
        Err(Error::FingerprintMismatch)
    ));
    server.join().unwrap();
}

#[test]
fn missing_fingerprint_fails_before_the_body_read() {
    let (port, server) = serve_once(|request, stream| {
        let key = unwrap_session_key(&request);
        let mut body = vec![0x11; 8];
        xor::xor_inplace(&mut body, &key).unwrap();

        stream.write_all(b"HTTP/1.0 200 OK\r\n\r\n").unwrap();
        // the client may hang up before the body goes out
        let _ = stream.write_all(&body);
    });

    let (_, public) = test_keypair();
    let fetcher =
        EntropyFetcher::new("127.0.0.1", port, false, "", true, Some(Arc::clone(public)));
    assert!(matches!(
        fetcher.fetch("/rnd8", 8),
        Err(Error::MissingFingerprint)
    ));
    server.join().unwrap();
}

#[test]
fn wire_token_is_uppercase_hex_of_fixed_width() {
    let (port, server) = serve_once(|request, stream| {
        let wire = request_header(&request, "tl-ent-sce-crypto-token").unwrap();
        assert_eq!(wire.len(), 512);
        assert!(hex::decode(&wire.to_lowercase()).is_ok());
        assert_eq!(wire, wire.to_uppercase());

        stream.write_all(b"HTTP/1.0 503 Unavailable\r\n\r\n").unwrap();
    });

    let (_, public) = test_keypair();
    let fetcher =
        EntropyFetcher::new("127.0.0.1", port, false, "", true, Some(Arc::clone(public)));
    assert!(matches!(
        fetcher.fetch("/rnd8", 8),
        Err(Error::HttpStatus(503))
    ));
    server.join().unwrap();
}
