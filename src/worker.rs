use futures_channel::mpsc;
use futures_util::future::{CatchUnwind, FutureExt};
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::io;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::thread::{self, JoinHandle};

/// A request pipeline scheduled on a worker.
pub(crate) type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Start a worker thread driving an event loop.
///
/// The loop runs every job sent over the returned queue to completion. Once all senders
/// of the queue are dropped, it finishes the jobs it has and the thread ends.
pub(crate) fn spawn(index: usize) -> io::Result<(mpsc::UnboundedSender<Job>, JoinHandle<()>)> {
    let (tx, rx) = mpsc::unbounded();

    let handle = thread::Builder::new()
        .name(format!("h1-oneshot-{}", index))
        .spawn(move || {
            trace!("Event loop {} start", index);
            async_std::task::block_on(EventLoop::new(rx));
            trace!("Event loop {} end", index);
        })?;

    Ok((tx, handle))
}

struct EventLoop {
    queue: Option<mpsc::UnboundedReceiver<Job>>,
    running: FuturesUnordered<CatchUnwind<AssertUnwindSafe<Job>>>,
}

impl EventLoop {
    fn new(queue: mpsc::UnboundedReceiver<Job>) -> Self {
        EventLoop {
            queue: Some(queue),
            running: FuturesUnordered::new(),
        }
    }

    /// Move queued jobs to the running set. Returns `true` if the queue is closed.
    fn poll_queue(&mut self, cx: &mut Context<'_>) -> bool {
        let queue = match &mut self.queue {
            Some(q) => q,
            None => return true,
        };

        loop {
            match queue.poll_next_unpin(cx) {
                Poll::Ready(Some(job)) => {
                    self.running.push(AssertUnwindSafe(job).catch_unwind());
                }
                Poll::Ready(None) => {
                    trace!("Queue closed, draining: {}", self.running.len());
                    break;
                }
                Poll::Pending => return false,
            }
        }

        self.queue = None;

        true
    }
}

impl Future for EventLoop {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        let closed = this.poll_queue(cx);

        loop {
            match this.running.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(()))) => {}
                Poll::Ready(Some(Err(_))) => {
                    // the pipeline (or a callback in it) panicked. the other
                    // requests on this loop are unaffected.
                    error!("Request pipeline panicked");
                }
                Poll::Ready(None) => {
                    // nothing running. done if no more work can arrive,
                    // the queue waker is registered otherwise.
                    return if closed { Poll::Ready(()) } else { Poll::Pending };
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
