//! Client, its builder and worker pool.

use crate::registry::Registry;
use crate::request::{RequestHandle, RequestId};
use crate::worker::{self, Job};
use futures_channel::mpsc;
use std::fmt;
use std::io;
use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle, ThreadId};

/// Size of buffer reading response status line and headers into.
const READ_BUF_INIT_SIZE: usize = 16_384;

/// Settings every request of a client runs with.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Config {
    /// Max bytes per socket read while looking for line ends.
    pub read_buffer_size: usize,
    /// Shut down the write half of the socket once the request is sent.
    pub half_close: bool,
}

/// Builder of a [`Client`].
///
/// [`Client`]: struct.Client.html
#[derive(Debug, Clone)]
pub struct Builder {
    worker_threads: usize,
    config: Config,
}

impl Default for Builder {
    fn default() -> Self {
        Builder::new()
    }
}

impl Builder {
    /// Default settings: one worker thread, 16KB reads, half-close after send.
    pub fn new() -> Self {
        Builder {
            worker_threads: 1,
            config: Config {
                read_buffer_size: READ_BUF_INIT_SIZE,
                half_close: true,
            },
        }
    }

    /// Number of worker threads driving requests. Must be at least 1.
    pub fn worker_threads(mut self, amount: usize) -> Self {
        self.worker_threads = amount;
        self
    }

    /// Max amount to read from the socket at a time while reading status line and headers.
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.read_buffer_size = size;
        self
    }

    /// Whether to shut down the sending side of the connection after the request is
    /// written. Some servers read this as the client going away, for those set `false`.
    pub fn half_close(mut self, enabled: bool) -> Self {
        self.config.half_close = enabled;
        self
    }

    /// Start the worker threads.
    pub fn build(self) -> io::Result<Client> {
        assert!(self.worker_threads > 0, "Client needs at least 1 worker thread");
        assert!(self.config.read_buffer_size > 0, "Read buffer size is 0");

        let mut queues = Vec::with_capacity(self.worker_threads);
        let mut workers = Vec::with_capacity(self.worker_threads);

        for index in 0..self.worker_threads {
            // on error, the queues already created are dropped and their threads end.
            let (tx, handle) = worker::spawn(index)?;
            queues.push(tx);
            workers.push(handle);
        }

        debug!("Client started: {:?}", self);

        let shared = Shared {
            registry: Arc::new(Registry::default()),
            config: self.config,
            queues: Mutex::new(Some(queues)),
            next_queue: AtomicUsize::new(0),
        };

        let worker_ids = workers.iter().map(|w| w.thread().id()).collect();

        Ok(Client {
            shared: Arc::new(shared),
            worker_ids,
            workers: Mutex::new(workers),
            closing: Mutex::new(()),
        })
    }
}

/// State shared between the client and its request handles.
pub(crate) struct Shared {
    pub registry: Arc<Registry>,
    pub config: Config,
    /// One queue per worker. `None` once closed.
    queues: Mutex<Option<Vec<mpsc::UnboundedSender<Job>>>>,
    next_queue: AtomicUsize,
}

impl Shared {
    fn is_open(&self) -> bool {
        self.queues.lock().unwrap().is_some()
    }

    /// Hand a pipeline to a worker, round robin. Returns `false` if the client is closed.
    pub fn schedule(&self, job: Job) -> bool {
        let lock = self.queues.lock().unwrap();

        let queues = match &*lock {
            Some(q) => q,
            None => return false,
        };

        let index = self.next_queue.fetch_add(1, Ordering::Relaxed) % queues.len();

        if queues[index].unbounded_send(job).is_err() {
            // a worker only goes away when its queue is closed.
            error!("Worker {} is gone", index);
            return false;
        }

        trace!("Scheduled on worker {}", index);

        true
    }

    /// Stop accepting work. Returns `false` if already closed.
    fn close_queues(&self) -> bool {
        // dropping the senders lets the workers drain and end.
        self.queues.lock().unwrap().take().is_some()
    }
}

/// An HTTP/1.1 client running single requests on its own worker threads.
///
/// Every request goes resolve, connect, send, read status line, read headers,
/// read body until the server closes. The outcome is delivered exactly once to the
/// request callback.
///
/// ```no_run
/// let client = h1_oneshot::Client::new()?;
///
/// let mut req = client.create_request(1);
/// req.set_host("localhost")
///     .set_port(3333)
///     .set_uri("/index.html")
///     .set_callback(|req, res| match res {
///         Ok(res) => println!("#{}: {}", req.id(), res.status_code()),
///         Err(e) => println!("#{} failed: {}", req.id(), e),
///     });
/// req.execute();
///
/// client.close();
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct Client {
    shared: Arc<Shared>,
    worker_ids: Vec<ThreadId>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    /// Held for the whole of `close()`, so concurrent callers all return after the join.
    closing: Mutex<()>,
}

impl Client {
    /// Start a client with default settings.
    pub fn new() -> io::Result<Client> {
        Builder::new().build()
    }

    /// Builder for a client with custom settings.
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Create a new request with the given id.
    ///
    /// Panics if a request with the same id is still in flight.
    pub fn create_request(&self, id: RequestId) -> RequestHandle {
        let in_flight = self.shared.registry.contains(id);
        assert!(!in_flight, "Request id {} is already in flight", id);

        RequestHandle::new(id, self.shared.clone())
    }

    /// Cancel the request with the given id.
    ///
    /// Unknown ids, and ids of requests that already finished, are ignored.
    pub fn cancel_request(&self, id: RequestId) {
        self.shared.registry.cancel(id);
    }

    /// Number of requests executed but not yet finished.
    pub fn in_flight(&self) -> usize {
        self.shared.registry.len()
    }

    /// Stop accepting requests, wait for every executed request to call back, and end
    /// the worker threads.
    ///
    /// Requests to a server that never answers nor closes keep this waiting, cancel them
    /// first if that is a concern. Calling `close()` again does nothing, and a call racing
    /// with another one returns once the workers are joined. Panics if called from a
    /// request callback.
    pub fn close(&self) {
        let current = thread::current().id();

        // joining would wait on ourselves.
        assert!(
            !self.worker_ids.contains(&current),
            "Client::close() called from a request callback"
        );

        let _closing = self.closing.lock().unwrap();

        let workers = mem::replace(&mut *self.workers.lock().unwrap(), vec![]);

        if self.shared.close_queues() {
            debug!("Client closing, in flight: {}", self.in_flight());
        }

        for worker in workers {
            if worker.join().is_err() {
                error!("Worker thread panicked");
            }
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        // dropping without close() cancels what is in flight, so drop
        // doesn't wait on unresponsive servers.
        if self.shared.is_open() {
            self.shared.registry.cancel_all();
        }
        self.close();
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.shared.config)
            .field("in_flight", &self.in_flight())
            .field("open", &self.shared.is_open())
            .finish()
    }
}
