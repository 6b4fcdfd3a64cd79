#![allow(dead_code)]

use async_std::net::{TcpListener, TcpStream};
use async_std::task;
use futures_util::io::{AsyncReadExt, AsyncWriteExt};
use h1_oneshot::{Error, Request, RequestHandle, Response};
use std::future::Future;
use std::sync::mpsc;
use std::sync::Once;
use std::time::Duration;

/// Max time to wait for a callback before failing a test.
pub const WAIT: Duration = Duration::from_secs(10);

/// What a callback received.
pub type Outcome = (Request, Result<Response, Error>);

/// Request head as received by a test peer.
#[derive(Debug, Clone)]
pub struct Head {
    pub method: String,
    pub path: String,
    pub version: u8,
    pub host: Option<String>,
    pub raw: String,
}

/// Start a peer accepting one connection on a random local port.
///
/// The request head is read before `f` is called with it.
pub fn serve_once<F, R>(f: F) -> u16
where
    F: FnOnce(Head, TcpStream) -> R + Send + 'static,
    R: Future<Output = ()> + Send + 'static,
{
    setup_logger();

    let l = task::block_on(TcpListener::bind("127.0.0.1:0")).expect("Bind failed");
    let port = l.local_addr().unwrap().port();

    task::spawn(async move {
        let (mut tcp, _) = l.accept().await.expect("Accept failed");

        let head = read_head(&mut tcp).await;

        f(head, tcp).await;
    });

    port
}

/// Peer that answers with `res` and closes. The head it got is sent over the receiver.
pub fn serve_response(res: &'static [u8]) -> (u16, mpsc::Receiver<Head>) {
    serve_chunks(vec![res])
}

/// Peer that writes the response in separate chunks, with a short pause in between.
pub fn serve_chunks(chunks: Vec<&'static [u8]>) -> (u16, mpsc::Receiver<Head>) {
    let (tx, rx) = mpsc::channel();

    let port = serve_once(move |head, mut tcp| async move {
        tx.send(head).ok();

        for chunk in chunks {
            tcp.write_all(chunk).await.unwrap();
            tcp.flush().await.unwrap();
            task::sleep(Duration::from_millis(20)).await;
        }
    });

    (port, rx)
}

/// Peer that reads the request and then neither answers nor closes.
pub fn serve_silent() -> (u16, mpsc::Receiver<Head>) {
    let (tx, rx) = mpsc::channel();

    let port = serve_once(move |head, tcp| async move {
        tx.send(head).ok();

        // hold on to the connection for longer than any test runs.
        task::sleep(Duration::from_secs(120)).await;
        drop(tcp);
    });

    (port, rx)
}

/// A local port nothing listens on.
pub fn closed_port() -> u16 {
    let l = std::net::TcpListener::bind("127.0.0.1:0").expect("Bind failed");
    l.local_addr().unwrap().port()
}

/// Configure a request to a local peer and collect its callback invocations.
pub fn local_request(req: &mut RequestHandle, port: u16, uri: &str) -> mpsc::Receiver<Outcome> {
    let (tx, rx) = mpsc::channel();

    req.set_host("127.0.0.1")
        .set_port(port)
        .set_uri(uri)
        .set_callback(move |req, res| {
            tx.send((req.clone(), res)).ok();
        });

    rx
}

pub async fn read_head(tcp: &mut TcpStream) -> Head {
    let mut buf: Vec<u8> = vec![];
    let mut chunk = [0_u8; 1024];

    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let amount = tcp.read(&mut chunk).await.expect("Read head failed");
        assert!(amount > 0, "EOF before complete request head");
        buf.extend_from_slice(&chunk[..amount]);
    }

    let mut headers = [httparse::EMPTY_HEADER; 16];
    let mut req = httparse::Request::new(&mut headers);

    let status = req.parse(&buf).expect("Parse head failed");
    assert!(status.is_complete());

    let host = req
        .headers
        .iter()
        .find(|h| h.name == "Host")
        .map(|h| String::from_utf8_lossy(h.value).into_owned());

    Head {
        method: req.method.unwrap().to_string(),
        path: req.path.unwrap().to_string(),
        version: req.version.unwrap(),
        host,
        raw: String::from_utf8_lossy(&buf).into_owned(),
    }
}

pub fn setup_logger() {
    static START: Once = Once::new();
    START.call_once(|| {
        let test_log = std::env::var("TEST_LOG")
            .map(|x| x != "0" && x.to_lowercase() != "false")
            .unwrap_or(false);
        let level = if test_log {
            log::LevelFilter::Trace
        } else {
            log::LevelFilter::Info
        };
        pretty_env_logger::formatted_builder()
            .filter_level(log::LevelFilter::Warn)
            .filter_module("h1_oneshot", level)
            .target(env_logger::Target::Stdout)
            .init();
    });
}
