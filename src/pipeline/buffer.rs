use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

struct State {
    chunks: VecDeque<Vec<u8>>,
    producer_done: bool,
    consumer_gone: bool,
}

/// A small, blocking, bounded queue of byte chunks between one producer and one consumer.
///
/// The producer blocks while `capacity` chunks are waiting; this is the pipeline's backpressure.
pub(crate) struct ChunkQueue {
    state: Mutex<State>,
    capacity: usize,
    not_empty: Condvar,
    not_full: Condvar,
}

impl ChunkQueue {
    pub(crate) fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be > 0");
        Self {
            state: Mutex::new(State {
                chunks: VecDeque::with_capacity(capacity),
                producer_done: false,
                consumer_gone: false,
            }),
            capacity,
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueue one chunk, blocking while the queue is full.
    ///
    /// Returns `false` if the consumer has stopped reading.
    fn push(&self, chunk: Vec<u8>) -> bool {
        let mut g = self.lock();
        while g.chunks.len() >= self.capacity && !g.consumer_gone {
            g = self.not_full.wait(g).unwrap_or_else(PoisonError::into_inner);
        }
        if g.consumer_gone {
            return false;
        }
        g.chunks.push_back(chunk);
        self.not_empty.notify_one();
        true
    }

    /// Dequeue one chunk, blocking while the queue is empty.
    ///
    /// Returns `None` once the producer is done and everything has been consumed.
    fn pop(&self) -> Option<Vec<u8>> {
        let mut g = self.lock();
        loop {
            if let Some(chunk) = g.chunks.pop_front() {
                self.not_full.notify_one();
                return Some(chunk);
            }
            if g.producer_done {
                return None;
            }
            g = self.not_empty.wait(g).unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn close_producer(&self) {
        self.lock().producer_done = true;
        self.not_empty.notify_all();
    }

    fn close_consumer(&self) {
        let mut g = self.lock();
        g.consumer_gone = true;
        g.chunks.clear();
        self.not_full.notify_all();
    }
}

/// Producer half: collects whole lines and enqueues them in chunks of about `chunk_bytes`.
///
/// Dropping the writer marks the producer as done; call [`QueueWriter::finish`] to enqueue the
/// last partial chunk first.
pub(crate) struct QueueWriter<'q> {
    queue: &'q ChunkQueue,
    pending: Vec<u8>,
    chunk_bytes: usize,
}

impl<'q> QueueWriter<'q> {
    pub(crate) fn new(queue: &'q ChunkQueue, chunk_bytes: usize) -> Self {
        Self {
            queue,
            pending: Vec::with_capacity(chunk_bytes),
            chunk_bytes,
        }
    }

    fn send_pending(&mut self) -> io::Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let chunk = std::mem::replace(&mut self.pending, Vec::with_capacity(self.chunk_bytes));
        if self.queue.push(chunk) {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "encoder stopped consuming cleaned records",
            ))
        }
    }

    /// Enqueue any buffered bytes and mark the producer as done.
    pub(crate) fn finish(mut self) -> io::Result<()> {
        self.send_pending()
    }
}

impl Write for QueueWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        if self.pending.len() >= self.chunk_bytes && self.pending.last() == Some(&b'\n') {
            self.send_pending()?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.pending.last() == Some(&b'\n') {
            self.send_pending()?;
        }
        Ok(())
    }
}

impl Drop for QueueWriter<'_> {
    fn drop(&mut self) {
        self.queue.close_producer();
    }
}

/// Consumer half: a byte stream over the queued chunks.
///
/// Dropping the reader tells a blocked producer to give up.
pub(crate) struct QueueReader<'q> {
    queue: &'q ChunkQueue,
    current: Vec<u8>,
    pos: usize,
}

impl<'q> QueueReader<'q> {
    pub(crate) fn new(queue: &'q ChunkQueue) -> Self {
        Self {
            queue,
            current: Vec::new(),
            pos: 0,
        }
    }
}

impl Read for QueueReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.current.len() {
            match self.queue.pop() {
                Some(chunk) => {
                    self.current = chunk;
                    self.pos = 0;
                }
                None => return Ok(0),
            }
        }
        let n = buf.len().min(self.current.len() - self.pos);
        buf[..n].copy_from_slice(&self.current[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl Drop for QueueReader<'_> {
    fn drop(&mut self) {
        self.queue.close_consumer();
    }
}
