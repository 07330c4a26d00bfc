//! Readable event source with `data`, `end` and `error` events.
//!
//! A [`ReadableStream`] is either fed by hand ([`ReadableStream::push`],
//! [`ReadableStream::end`], [`ReadableStream::destroy`]) or backed by an
//! [`AsyncRead`] via [`ReadableStream::from_reader`]. Reader-backed streams
//! start flowing once the first `data` listener is attached, so listeners
//! registered together before that point never miss an event.

use std::fmt;
use std::io::ErrorKind;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt};
use vshelpers_commons::SharedError;

const READ_CHUNK_SIZE: usize = 8_192;

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// One unit of stream payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    Bytes(Bytes),
    Text(String),
}

impl Chunk {
    pub fn len(&self) -> usize {
        match self {
            Self::Bytes(bytes) => bytes.len(),
            Self::Text(text) => text.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub enum StreamEvent {
    Data(Chunk),
    End,
    Error(SharedError),
}

impl StreamEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Data(_) => EventKind::Data,
            Self::End => EventKind::End,
            Self::Error(_) => EventKind::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Data,
    End,
    Error,
}

/// Identifies one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type Listener = Arc<dyn Fn(&StreamEvent) + Send + Sync>;

struct Registration {
    id: ListenerId,
    kind: EventKind,
    once: bool,
    callback: Listener,
}

struct Inner {
    listeners: Mutex<Vec<Registration>>,
    next_id: AtomicU64,
    reader: Mutex<Option<BoxedReader>>,
}

#[derive(Clone)]
pub struct ReadableStream {
    inner: Arc<Inner>,
}

impl fmt::Debug for ReadableStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadableStream")
            .field("listeners", &self.inner.listeners.lock().len())
            .field("has_reader", &self.inner.reader.lock().is_some())
            .finish()
    }
}

impl Default for ReadableStream {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadableStream {
    /// Create a stream fed manually through `push`/`end`/`destroy`.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
                reader: Mutex::new(None),
            }),
        }
    }

    /// Create a stream that pumps `reader` once a `data` listener appears.
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let stream = Self::new();
        *stream.inner.reader.lock() = Some(Box::new(reader));
        stream
    }

    pub fn on<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&StreamEvent) + Send + Sync + 'static,
    {
        self.register(kind, false, Arc::new(listener))
    }

    /// Register a listener that is removed after its first invocation.
    pub fn once<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&StreamEvent) + Send + Sync + 'static,
    {
        self.register(kind, true, Arc::new(listener))
    }

    /// Remove a listener. Returns `false` when it was not registered (for
    /// example a `once` listener that already fired).
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.lock();
        let before = listeners.len();
        listeners.retain(|registration| registration.id != id);
        listeners.len() != before
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.inner
            .listeners
            .lock()
            .iter()
            .filter(|registration| registration.kind == kind)
            .count()
    }

    pub fn push(&self, bytes: impl Into<Bytes>) {
        self.emit(&StreamEvent::Data(Chunk::Bytes(bytes.into())));
    }

    pub fn push_text(&self, text: impl Into<String>) {
        self.emit(&StreamEvent::Data(Chunk::Text(text.into())));
    }

    pub fn end(&self) {
        self.emit(&StreamEvent::End);
    }

    /// Emit an `error` event carrying `error`.
    pub fn destroy(&self, error: SharedError) {
        self.emit(&StreamEvent::Error(error));
    }

    /// Deliver `event` to every listener registered for its kind, in
    /// registration order. Listeners may add or remove listeners while being
    /// called; such changes apply from the next event on.
    pub fn emit(&self, event: &StreamEvent) {
        let kind = event.kind();
        let targets: Vec<Listener> = {
            let mut listeners = self.inner.listeners.lock();
            let targets = listeners
                .iter()
                .filter(|registration| registration.kind == kind)
                .map(|registration| Arc::clone(&registration.callback))
                .collect();
            listeners.retain(|registration| !(registration.once && registration.kind == kind));
            targets
        };

        for listener in targets {
            listener(event);
        }
    }

    fn register(&self, kind: EventKind, once: bool, callback: Listener) -> ListenerId {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.listeners.lock().push(Registration {
            id,
            kind,
            once,
            callback,
        });

        if kind == EventKind::Data {
            self.start_flowing();
        }
        id
    }

    fn start_flowing(&self) {
        let Some(reader) = self.inner.reader.lock().take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let stream = self.clone();
                handle.spawn(pump(reader, stream));
            }
            Err(err) => {
                tracing::warn!(%err, "no Tokio runtime available to drive reader-backed stream");
                self.destroy(Arc::new(err));
            }
        }
    }
}

/// Read `reader` to completion, re-emitting what it yields as stream events.
async fn pump(mut reader: BoxedReader, stream: ReadableStream) {
    let mut buf = vec![0u8; READ_CHUNK_SIZE];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => {
                stream.end();
                break;
            }
            Ok(n) => stream.push(Bytes::copy_from_slice(&buf[..n])),
            Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::debug!(error = %e, "stream reader failed");
                stream.destroy(Arc::new(e));
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn once_listeners_fire_a_single_time() {
        let stream = ReadableStream::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        stream.once(EventKind::End, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        stream.end();
        stream.end();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(stream.listener_count(EventKind::End), 0);
    }

    #[test]
    fn removed_listeners_stop_receiving_events() {
        let stream = ReadableStream::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let id = stream.on(EventKind::Data, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        stream.push_text("a");
        assert!(stream.remove_listener(id));
        assert!(!stream.remove_listener(id));
        stream.push_text("b");

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn listener_may_remove_itself_while_emitting() {
        let stream = ReadableStream::new();
        let slot: Arc<Mutex<Option<ListenerId>>> = Arc::new(Mutex::new(None));
        let handle = stream.clone();
        let own_id = Arc::clone(&slot);
        let id = stream.on(EventKind::Data, move |_| {
            if let Some(id) = *own_id.lock() {
                handle.remove_listener(id);
            }
        });
        *slot.lock() = Some(id);

        stream.push_text("x");
        assert_eq!(stream.listener_count(EventKind::Data), 0);
    }

    #[tokio::test]
    async fn reader_backed_stream_flows_on_first_data_listener() {
        let stream = ReadableStream::from_reader(&b"hello world"[..]);
        let (tx, rx) = tokio::sync::oneshot::channel::<Vec<u8>>();
        let collected = Arc::new(Mutex::new(Vec::new()));
        let tx = Arc::new(Mutex::new(Some(tx)));

        let sink = Arc::clone(&collected);
        stream.once(EventKind::End, move |_| {
            if let Some(tx) = tx.lock().take() {
                let _ = tx.send(sink.lock().clone());
            }
        });
        let sink = Arc::clone(&collected);
        stream.on(EventKind::Data, move |event| {
            if let StreamEvent::Data(Chunk::Bytes(bytes)) = event {
                sink.lock().extend_from_slice(bytes);
            }
        });

        let bytes = rx.await.unwrap_or_default();
        assert_eq!(bytes, b"hello world");
    }
}
