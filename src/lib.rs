#![warn(missing_docs, missing_debug_implementations)]
#![warn(clippy::all)]

//! An asynchronous, cancellable, single request HTTP/1.1 client.
//!
//! Each request is one GET over one fresh connection. The library resolves the host,
//! connects to the first address that accepts, sends the request, parses the status
//! line and headers, and reads the body until the server closes the connection.
//! The outcome is handed to a callback exactly once.
//!
//! ## In scope
//!
//! * Running many requests concurrently on a small, fixed pool of worker threads.
//! * Cancelling a request at any point, by handle or by id.
//! * Graceful shutdown that lets every executed request call back.
//!
//! ## Out of scope
//!
//! * TLS
//! * Following redirects
//! * `Transfer-Encoding: chunked`, `Content-Length` delineation of the body.
//! * Connection reuse and pipelining.
//! * Request bodies and proxies.
//!
//! # Layout and API
//!
//! A [`Client`] owns the worker threads and a registry of requests in flight.
//! [`Client::create_request`] gives a [`RequestHandle`] to configure and
//! `execute()`. The callback receives the [`Request`] and either a [`Response`] or
//! an [`Error`].
//!
//! # Cancellation
//!
//! Cancellation is advisory. The pipeline checks the request's
//! [`CancellationToken`] before every network operation, and cancelling interrupts
//! the operation in progress. An operation that completed before the cancel was
//! seen keeps its outcome, so a request whose body fully arrived still succeeds.
//!
//! [`Client`]: client/struct.Client.html
//! [`Client::create_request`]: client/struct.Client.html#method.create_request
//! [`RequestHandle`]: request/struct.RequestHandle.html
//! [`Request`]: request/struct.Request.html
//! [`Response`]: response/struct.Response.html
//! [`Error`]: enum.Error.html
//! [`CancellationToken`]: cancel/struct.CancellationToken.html

#[macro_use]
extern crate log;

mod error;
mod registry;
mod worker;

#[doc(hidden)]
pub mod buf_reader;

#[doc(hidden)]
pub mod connect;

#[doc(hidden)]
pub mod http11;

pub(crate) use futures_io::{AsyncRead, AsyncWrite};

pub mod cancel;
pub mod client;
pub mod request;
pub mod response;

pub use cancel::CancellationToken;
pub use client::{Builder, Client};
pub use error::{Error, ProtocolError};
pub use request::{Request, RequestHandle, RequestId, ResponseFuture};
pub use response::Response;

pub(crate) fn err_closed<T>() -> Result<T, Error> {
    use std::io;
    Err(io::Error::new(io::ErrorKind::NotConnected, "Request dropped before completion").into())
}
