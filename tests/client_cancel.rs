use h1_oneshot::{CancellationToken, Client, Error};
use std::time::Duration;

mod common;
use common::WAIT;

#[test]
fn token_is_monotonic() {
    let token = CancellationToken::new();
    let clone = token.clone();

    assert!(!token.is_cancelled());

    clone.cancel();
    clone.cancel();

    assert!(token.is_cancelled());
    assert!(clone.is_cancelled());
}

#[test]
fn cancel_before_execute() {
    let (port, _) = common::serve_response(b"HTTP/1.1 200 OK\r\n\r\nOK");

    let client = Client::new().unwrap();

    let mut req = client.create_request(1);
    let rx = common::local_request(&mut req, port, "/");

    req.cancel();
    assert!(req.is_cancelled());

    req.execute();

    let (req, res) = rx.recv_timeout(WAIT).unwrap();

    assert_eq!(req.id(), 1);
    assert!(matches!(res, Err(Error::Cancelled)));

    client.close();
    assert_eq!(client.in_flight(), 0);
}

#[test]
fn cancel_right_after_execute() {
    // the peer never answers, so however far the pipeline got, the
    // only possible outcome is cancelled.
    let (port, _) = common::serve_silent();

    let client = Client::new().unwrap();

    let mut req = client.create_request(1);
    let rx = common::local_request(&mut req, port, "/");

    req.execute();
    req.cancel();

    let (_, res) = rx.recv_timeout(WAIT).unwrap();
    let err = res.expect_err("cancelled");

    assert!(err.is_cancelled());
    assert_eq!(err.to_string(), "Request was cancelled");
}

#[test]
fn cancel_interrupts_pending_read() {
    let (port, head_rx) = common::serve_silent();

    let client = Client::new().unwrap();

    let mut req = client.create_request(1);
    let rx = common::local_request(&mut req, port, "/slow");
    req.execute();

    // the request is sent, the pipeline waits for the status line.
    let head = head_rx.recv_timeout(WAIT).unwrap();
    assert_eq!(head.path, "/slow");
    assert_eq!(client.in_flight(), 1);

    req.cancel();

    let (_, res) = rx.recv_timeout(WAIT).unwrap();
    assert!(matches!(res, Err(Error::Cancelled)));

    client.close();
    assert_eq!(client.in_flight(), 0);
}

#[test]
fn cancel_by_id() {
    let (port_1, head_rx_1) = common::serve_silent();
    let (port_2, head_rx_2) = common::serve_silent();

    let client = Client::new().unwrap();

    let mut req_1 = client.create_request(1);
    let rx_1 = common::local_request(&mut req_1, port_1, "/one");
    req_1.execute();

    let mut req_2 = client.create_request(2);
    let rx_2 = common::local_request(&mut req_2, port_2, "/two");
    req_2.execute();

    head_rx_1.recv_timeout(WAIT).unwrap();
    head_rx_2.recv_timeout(WAIT).unwrap();

    client.cancel_request(2);

    let (req, res) = rx_2.recv_timeout(WAIT).unwrap();
    assert_eq!(req.id(), 2);
    assert!(matches!(res, Err(Error::Cancelled)));

    // the other request is untouched.
    assert!(rx_1.recv_timeout(Duration::from_millis(200)).is_err());
    assert_eq!(client.in_flight(), 1);

    client.cancel_request(1);

    let (req, res) = rx_1.recv_timeout(WAIT).unwrap();
    assert_eq!(req.id(), 1);
    assert!(matches!(res, Err(Error::Cancelled)));
}

#[test]
fn cancel_after_finish_keeps_outcome() {
    let (port, _) = common::serve_response(b"HTTP/1.1 200 OK\r\n\r\ndone");

    let client = Client::new().unwrap();

    let mut req = client.create_request(1);
    let rx = common::local_request(&mut req, port, "/");
    req.execute();

    let (_, res) = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(res.unwrap().body(), b"done");

    // both are no-ops now.
    req.cancel();
    client.cancel_request(1);

    client.close();

    // exactly one callback.
    assert!(rx.try_recv().is_err());
}

#[test]
fn cancel_unknown_id() {
    common::setup_logger();

    let client = Client::new().unwrap();

    client.cancel_request(4711);

    assert_eq!(client.in_flight(), 0);
}

#[test]
fn drop_client_cancels_in_flight() {
    let (port, head_rx) = common::serve_silent();

    let client = Client::new().unwrap();

    let mut req = client.create_request(1);
    let rx = common::local_request(&mut req, port, "/");
    req.execute();

    head_rx.recv_timeout(WAIT).unwrap();

    drop(client);

    // drop has joined the workers, so the callback already ran.
    let (_, res) = rx.try_recv().unwrap();
    assert!(matches!(res, Err(Error::Cancelled)));
}
