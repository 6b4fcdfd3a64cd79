//! Request configuration, execution and the per request pipeline.

use crate::buf_reader::BufIo;
use crate::cancel::CancellationToken;
use crate::client::{Config, Shared};
use crate::connect;
use crate::err_closed;
use crate::http11::{write_http11_req, HeaderLine, ResponseParser, CRLF};
use crate::registry::Registry;
use crate::response::Response;
use crate::Error;
use async_std::net::TcpStream;
use futures_channel::oneshot;
use futures_util::future::{Abortable, Aborted};
use futures_util::ready;
use std::fmt;
use std::future::Future;
use std::io;
use std::net::{Shutdown, SocketAddr};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Caller assigned request identifier, unique among requests in flight.
pub type RequestId = u32;

/// Port used unless `set_port` is called.
pub const DEFAULT_PORT: u16 = 80;

/// Size of the request head buffer. Grows if needed.
const HEAD_BUF_INIT_SIZE: usize = 256;

/// Completion callback, invoked exactly once per executed request.
pub type Callback = Box<dyn FnOnce(&Request, Result<Response, Error>) + Send + 'static>;

/// The target of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    id: RequestId,
    host: String,
    port: u16,
    uri: String,
}

impl Request {
    /// The request id.
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Host to resolve, also sent in the `Host` header.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port to connect to.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Path (and query) of the request line.
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

/// Caller side of a request, obtained from [`Client::create_request`].
///
/// Configure the target and a callback, then `execute()`. The handle can be kept to
/// `cancel()` the request while it is in flight.
///
/// [`Client::create_request`]: ../client/struct.Client.html#method.create_request
pub struct RequestHandle {
    request: Request,
    callback: Option<Callback>,
    token: CancellationToken,
    executed: bool,
    shared: Arc<Shared>,
}

impl RequestHandle {
    pub(crate) fn new(id: RequestId, shared: Arc<Shared>) -> Self {
        RequestHandle {
            request: Request {
                id,
                host: String::new(),
                port: DEFAULT_PORT,
                uri: String::new(),
            },
            callback: None,
            token: CancellationToken::new(),
            executed: false,
            shared,
        }
    }

    /// The request as configured so far.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// The request id.
    pub fn id(&self) -> RequestId {
        self.request.id
    }

    /// Set the host name (or address literal) to connect to.
    pub fn set_host(&mut self, host: impl Into<String>) -> &mut Self {
        self.request.host = host.into();
        self
    }

    /// Set the port to connect to.
    pub fn set_port(&mut self, port: u16) -> &mut Self {
        self.request.port = port;
        self
    }

    /// Set the path of the request line, i.e. `/index.html`.
    pub fn set_uri(&mut self, uri: impl Into<String>) -> &mut Self {
        self.request.uri = uri.into();
        self
    }

    /// Set the completion callback.
    ///
    /// It runs on a client worker thread and must not block it for long, nor call
    /// `Client::close()`.
    pub fn set_callback<F>(&mut self, callback: F) -> &mut Self
    where
        F: FnOnce(&Request, Result<Response, Error>) + Send + 'static,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Start the request.
    ///
    /// Panics if host, port, uri or callback are not set, if the request was already
    /// executed, if another request with the same id is in flight, or if the client
    /// is closed.
    pub fn execute(&mut self) {
        let id = self.request.id;

        assert!(!self.executed, "Request {} already executed", id);
        assert!(!self.request.host.is_empty(), "Request {} host is not set", id);
        assert!(self.request.port > 0, "Request {} port is not set", id);
        assert!(!self.request.uri.is_empty(), "Request {} uri is not set", id);

        let callback = match self.callback.take() {
            Some(c) => c,
            None => panic!("Request {} callback is not set", id),
        };

        self.executed = true;

        let registry = self.shared.registry.clone();

        let registered = registry.register(id, self.token.clone());
        assert!(registered, "Request id {} is already in flight", id);

        let state = RequestState::new(
            self.request.clone(),
            callback,
            self.token.clone(),
            registry.clone(),
            self.shared.config,
        );

        if !self.shared.schedule(Box::pin(state.run())) {
            registry.unregister(id, &self.token);
            panic!("Request {} executed on a closed client", id);
        }
    }

    /// Execute the request and get the outcome as a future instead of a callback.
    ///
    /// Any callback set before is replaced.
    pub fn send(&mut self) -> ResponseFuture {
        let (res_tx, res_rx) = oneshot::channel();

        self.set_callback(move |_, result| {
            if res_tx.send(result).is_err() {
                // the future was dropped, the caller isn't interested in the outcome.
                trace!("Failed to send outcome to ResponseFuture");
            }
        });

        self.execute();

        ResponseFuture(res_rx)
    }

    /// Cancel the request.
    ///
    /// Takes effect before the next network operation starts, and interrupts the one in
    /// progress. A request that has already finished keeps its outcome. Cancelling
    /// before `execute()` makes the request finish as cancelled without any I/O.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Tell if `cancel()` has been called.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl fmt::Debug for RequestHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHandle")
            .field("request", &self.request)
            .field("has_callback", &self.callback.is_some())
            .field("token", &self.token)
            .field("executed", &self.executed)
            .finish()
    }
}

/// Future for the outcome of [`RequestHandle::send`].
///
/// [`RequestHandle::send`]: struct.RequestHandle.html#method.send
#[derive(Debug)]
pub struct ResponseFuture(oneshot::Receiver<Result<Response, Error>>);

impl Future for ResponseFuture {
    type Output = Result<Response, Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        let res = ready!(Pin::new(&mut this.0).poll(cx));

        if let Ok(v) = res {
            v.into()
        } else {
            // the pipeline went away without calling back.
            err_closed().into()
        }
    }
}

/// Pipeline stages, in the order they are passed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Stage {
    Created,
    Resolving,
    Connecting,
    Sending,
    AwaitingStatusLine,
    /// One header line per round, until the blank line.
    AwaitingHeaders,
    AwaitingBody,
    Finished,
}

/// Result of the operation of one stage.
#[derive(Debug)]
enum Completion {
    Resolved(Vec<SocketAddr>),
    Connected(TcpStream),
    Sent(usize),
    Line(Vec<u8>),
    Body(Vec<u8>),
}

/// The pipeline of one executed request.
///
/// Owns the connection and the parser. Only the cancellation token is shared, with the
/// handle and the registry.
pub(crate) struct RequestState {
    request: Request,
    stage: Stage,
    callback: Callback,
    token: CancellationToken,
    registry: Arc<Registry>,
    config: Config,
    candidates: Vec<SocketAddr>,
    conn: Option<BufIo<TcpStream>>,
    parser: ResponseParser,
}

impl RequestState {
    fn new(
        request: Request,
        callback: Callback,
        token: CancellationToken,
        registry: Arc<Registry>,
        config: Config,
    ) -> Self {
        RequestState {
            request,
            stage: Stage::Created,
            callback,
            token,
            registry,
            config,
            candidates: vec![],
            conn: None,
            parser: ResponseParser::new(),
        }
    }

    /// Drive the pipeline to its terminal stage and call back.
    pub(crate) async fn run(mut self) {
        self.transition(Stage::Resolving);

        let outcome = loop {
            let completion = self.step().await;

            match self.on_stage_complete(completion) {
                Ok(Stage::Finished) => break Ok(()),
                Ok(next) => self.transition(next),
                Err(e) => break Err(e),
            }
        };

        self.finish(outcome);
    }

    fn transition(&mut self, next: Stage) {
        trace!(
            "Request {}: {:?} -> {:?}",
            self.request.id,
            self.stage,
            next
        );

        // invariant: stages only move forward.
        assert!(next >= self.stage, "Back transition to {:?}", next);

        self.stage = next;
    }

    /// Run the operation of the current stage, unless the request is cancelled.
    async fn step(&mut self) -> Result<Completion, Error> {
        let registration = match self.token.guard() {
            Some(r) => r,
            None => {
                debug!(
                    "Request {} cancelled before {:?}",
                    self.request.id, self.stage
                );
                return Err(Error::Cancelled);
            }
        };

        match Abortable::new(self.perform(), registration).await {
            Ok(v) => Ok(v?),
            Err(Aborted) => {
                debug!(
                    "Request {} interrupted in {:?}",
                    self.request.id, self.stage
                );
                Err(Error::Cancelled)
            }
        }
    }

    async fn perform(&mut self) -> io::Result<Completion> {
        let completion = match self.stage {
            Stage::Resolving => {
                let addrs = connect::resolve(&self.request.host, self.request.port).await?;
                Completion::Resolved(addrs)
            }

            Stage::Connecting => Completion::Connected(connect::connect(&self.candidates).await?),

            Stage::Sending => {
                let mut head = Vec::with_capacity(HEAD_BUF_INIT_SIZE);
                write_http11_req(&self.request.host, &self.request.uri, &mut head)?;

                Completion::Sent(self.conn().write(&head).await?)
            }

            Stage::AwaitingStatusLine | Stage::AwaitingHeaders => {
                Completion::Line(self.conn().read_until(CRLF).await?)
            }

            Stage::AwaitingBody => Completion::Body(self.conn().read_to_end().await?),

            Stage::Created | Stage::Finished => {
                // invariant: run() never steps outside the pipeline.
                panic!("No operation in stage {:?}", self.stage);
            }
        };

        Ok(completion)
    }

    fn conn(&mut self) -> &mut BufIo<TcpStream> {
        // invariant: the connection is set when leaving Connecting.
        self.conn.as_mut().expect("Connection missing after Connecting")
    }

    /// Decide the next stage from the outcome of the current one.
    ///
    /// An error finishes the request.
    fn on_stage_complete(&mut self, completion: Result<Completion, Error>) -> Result<Stage, Error> {
        let completion = completion?;

        let next = match (self.stage, completion) {
            (Stage::Resolving, Completion::Resolved(addrs)) => {
                self.candidates = addrs;
                Stage::Connecting
            }

            (Stage::Connecting, Completion::Connected(tcp)) => {
                self.conn = Some(BufIo::with_capacity(self.config.read_buffer_size, tcp));
                Stage::Sending
            }

            (Stage::Sending, Completion::Sent(amount)) => {
                trace!("Request {} sent: {}", self.request.id, amount);

                if self.config.half_close {
                    self.shutdown(Shutdown::Write);
                }

                Stage::AwaitingStatusLine
            }

            (Stage::AwaitingStatusLine, Completion::Line(line)) => {
                self.parser.parse_status_line(&line)?;
                Stage::AwaitingHeaders
            }

            (Stage::AwaitingHeaders, Completion::Line(line)) => {
                match self.parser.parse_header_line(&line) {
                    HeaderLine::More => Stage::AwaitingHeaders,
                    HeaderLine::End => Stage::AwaitingBody,
                }
            }

            (Stage::AwaitingBody, Completion::Body(body)) => {
                self.parser.push_body(&body);
                Stage::Finished
            }

            (stage, completion) => {
                panic!("Unexpected {:?} in stage {:?}", completion, stage);
            }
        };

        Ok(next)
    }

    /// Best effort shutdown. Errors are logged and otherwise ignored.
    fn shutdown(&self, how: Shutdown) {
        if let Some(conn) = &self.conn {
            if let Err(e) = conn.get_ref().shutdown(how) {
                trace!(
                    "Request {} shutdown {:?} failed: {}",
                    self.request.id,
                    how,
                    e
                );
            }
        }
    }

    /// The one terminal transition: teardown, unregister, call back.
    fn finish(mut self, outcome: Result<(), Error>) {
        self.transition(Stage::Finished);
        self.token.disarm();

        self.shutdown(Shutdown::Both);
        self.conn = None;

        self.registry.unregister(self.request.id, &self.token);

        let RequestState {
            request,
            callback,
            parser,
            ..
        } = self;

        let result = outcome.map(|_| parser.into_response());

        match &result {
            Ok(res) => debug!(
                "Request {} finished: {} {}",
                request.id,
                res.status_code(),
                res.status_message()
            ),
            Err(e) => debug!("Request {} failed: {}", request.id, e),
        }

        callback(&request, result);
    }
}
