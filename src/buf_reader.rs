use crate::{AsyncRead, AsyncWrite};
use futures_util::future::poll_fn;
use futures_util::io::{AsyncReadExt, AsyncWriteExt};
use futures_util::ready;
use std::io;
use std::mem;
use std::pin::Pin;
use std::task::{Context, Poll};

#[derive(Debug)]
/// Buffered connection.
///
/// Reading up to a multi byte delimiter means the socket is read in chunks that
/// can go past the delimiter. Whatever is read beyond it stays in the buffer for
/// the next `read_until` or `read_to_end`.
pub struct BufIo<S> {
    inner: S,
    buf: Vec<u8>,
    pos: usize,
    read_size: usize,
}

impl<S> BufIo<S> {
    /// Wrap `inner`, reading at most `read_size` bytes per socket read.
    pub fn with_capacity(read_size: usize, inner: S) -> Self {
        assert!(read_size > 0, "BufIo with 0 read size");
        BufIo {
            inner,
            buf: Vec::with_capacity(read_size),
            pos: 0,
            read_size,
        }
    }

    /// The wrapped connection.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Unwrap, dropping anything still buffered.
    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Bytes read from the connection but not yet handed out.
    pub fn buffered(&self) -> &[u8] {
        &self.buf[self.pos..]
    }

    fn consume(&mut self, amount: usize) {
        let new_pos = self.pos + amount;

        // can't consume more than we have.
        assert!(new_pos <= self.buf.len());

        if new_pos == self.buf.len() {
            // all was consumed, reset back to start.
            self.pos = 0;
            self.buf.clear();
        } else {
            self.pos = new_pos;
        }
    }

    fn take_buffered(&mut self) -> Vec<u8> {
        let mut buf = mem::replace(&mut self.buf, Vec::with_capacity(self.read_size));
        buf.drain(..self.pos);
        self.pos = 0;
        buf
    }
}

impl<S> BufIo<S>
where
    S: AsyncWrite + Unpin,
{
    /// Write all of `bytes` and flush. Returns the amount written.
    pub async fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.inner.write_all(bytes).await?;
        self.inner.flush().await?;

        trace!("write: {}", bytes.len());

        Ok(bytes.len())
    }
}

impl<S> BufIo<S>
where
    S: AsyncRead + Unpin,
{
    /// Read until `delim` is found. Returns everything up to and including the delimiter.
    ///
    /// Errors with `UnexpectedEof` if the connection closes before the delimiter.
    pub async fn read_until(&mut self, delim: &[u8]) -> io::Result<Vec<u8>> {
        poll_fn(|cx| self.poll_read_until(cx, delim)).await
    }

    /// Read everything until the peer closes, starting with what is already buffered.
    pub async fn read_to_end(&mut self) -> io::Result<Vec<u8>> {
        let mut out = self.take_buffered();

        let amount = self.inner.read_to_end(&mut out).await?;

        trace!("read_to_end: {} ({} from socket)", out.len(), amount);

        Ok(out)
    }

    /// Helper to poll for a delimiter.
    pub fn poll_read_until(
        &mut self,
        cx: &mut Context<'_>,
        delim: &[u8],
    ) -> Poll<io::Result<Vec<u8>>> {
        assert!(!delim.is_empty(), "read_until with empty delimiter");

        // move unconsumed bytes to the start before reading more.
        if self.pos > 0 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }

        // where to start looking in the buffer. everything before this
        // has been checked in a previous round.
        let mut search_from = 0;

        loop {
            if let Some(i) = find(&self.buf[search_from..], delim) {
                let end = search_from + i + delim.len();
                let found = self.buf[..end].to_vec();

                self.consume(end);

                trace!("read_until found: {}", found.len());

                return Ok(found).into();
            }

            // the delimiter might straddle the next read.
            search_from = self.buf.len().saturating_sub(delim.len() - 1);

            let amount = ready!(self.poll_fill_buf(cx))?;

            if amount == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "EOF before delimiter",
                ))
                .into();
            }
        }
    }

    /// Append one read from the connection to the buffer.
    fn poll_fill_buf(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<usize>> {
        let cur_len = self.buf.len();

        self.buf.resize(cur_len + self.read_size, 0);

        let read_into = &mut self.buf[cur_len..];

        match Pin::new(&mut self.inner).poll_read(cx, read_into) {
            Poll::Pending => {
                trace!("poll_read: Pending");
                self.buf.truncate(cur_len);
                Poll::Pending
            }
            Poll::Ready(Err(e)) => {
                trace!("poll_read err: {:?}", e);
                self.buf.truncate(cur_len);
                Err(e).into()
            }
            Poll::Ready(Ok(amount)) => {
                trace!("poll_read amount: {}", amount);
                self.buf.truncate(cur_len + amount);
                Ok(amount).into()
            }
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
