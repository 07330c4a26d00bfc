//! Collect every chunk of a [`ReadableStream`] into one buffer.

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use vshelpers_commons::{CompletionGuard, Error, Result, encode_text};

use crate::stream::{Chunk, EventKind, ListenerId, ReadableStream, StreamEvent};

/// The listeners one aggregation attached, released together exactly once.
struct ListenerGroup {
    stream: ReadableStream,
    ids: Mutex<Vec<ListenerId>>,
}

impl ListenerGroup {
    fn new(stream: ReadableStream) -> Self {
        Self {
            stream,
            ids: Mutex::new(Vec::with_capacity(3)),
        }
    }

    fn add(&self, id: ListenerId) {
        self.ids.lock().push(id);
    }

    /// Detach every listener. Safe to call repeatedly; ids already gone
    /// (a fired `once` listener) are skipped.
    fn release(&self) {
        let ids: Vec<ListenerId> = self.ids.lock().drain(..).collect();
        for id in ids {
            if !self.stream.remove_listener(id) {
                tracing::trace!(?id, "listener already detached");
            }
        }
    }
}

/// Releases the listener group if the aggregation future is dropped before
/// the stream settles.
struct ReleaseOnDrop(Arc<ListenerGroup>);

impl Drop for ReleaseOnDrop {
    fn drop(&mut self) {
        self.0.release();
    }
}

/// Consume `stream` until it ends and return everything it emitted.
///
/// A `None` stream resolves to `None` without touching anything. Text chunks
/// are encoded with `encoding` (blank or absent means UTF-8) before they are
/// appended; zero-length chunks are skipped. An `error` event fails the call
/// with that same error. Whichever way the stream settles, the three
/// listeners attached here are removed before this function returns.
pub async fn aggregate(stream: Option<&ReadableStream>, encoding: Option<&str>) -> Result<Option<Bytes>> {
    let Some(stream) = stream else {
        return Ok(None);
    };

    let group = Arc::new(ListenerGroup::new(stream.clone()));
    let _release = ReleaseOnDrop(Arc::clone(&group));
    let (tx, rx) = tokio::sync::oneshot::channel::<Result<Bytes>>();
    let tx = Arc::new(Mutex::new(Some(tx)));

    let guard: Arc<CompletionGuard<Bytes, Error>> = {
        let on_success = {
            let group = Arc::clone(&group);
            let tx = Arc::clone(&tx);
            move |bytes: Bytes| {
                group.release();
                if let Some(tx) = tx.lock().take() {
                    let _ = tx.send(Ok(bytes));
                }
            }
        };
        let on_failure = {
            let group = Arc::clone(&group);
            move |error: Error| {
                group.release();
                if let Some(tx) = tx.lock().take() {
                    let _ = tx.send(Err(error));
                }
            }
        };
        Arc::new(CompletionGuard::new(on_success, Some(Box::new(on_failure))))
    };
    let buffer: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
    let encoding = encoding.map(str::to_string);

    // Error first so nothing emitted while the others attach is missed.
    group.add(stream.on(EventKind::Error, {
        let guard = Arc::clone(&guard);
        move |event| {
            if let StreamEvent::Error(error) = event {
                guard.fail(Error::Stream(Arc::clone(error)));
            }
        }
    }));

    group.add(stream.once(EventKind::End, {
        let guard = Arc::clone(&guard);
        let buffer = Arc::clone(&buffer);
        move |_| {
            let bytes = Bytes::from(std::mem::take(&mut *buffer.lock()));
            guard.succeed(bytes);
        }
    }));

    group.add(stream.on(EventKind::Data, {
        let guard = Arc::clone(&guard);
        let buffer = Arc::clone(&buffer);
        move |event| {
            let StreamEvent::Data(chunk) = event else {
                return;
            };
            // Late events may still arrive before the listeners are gone.
            if guard.has_fired() {
                return;
            }
            let appended = append_chunk(&mut buffer.lock(), chunk, encoding.as_deref());
            if let Err(error) = appended {
                guard.fail(error);
            }
        }
    }));

    rx.await.unwrap_or(Err(Error::Interrupted)).map(Some)
}

fn append_chunk(buffer: &mut Vec<u8>, chunk: &Chunk, encoding: Option<&str>) -> Result<()> {
    if chunk.is_empty() {
        return Ok(());
    }

    let encoded;
    let bytes: &[u8] = match chunk {
        Chunk::Bytes(bytes) => bytes,
        Chunk::Text(text) => {
            encoded = encode_text(text, encoding)?;
            &encoded
        }
    };

    buffer.try_reserve(bytes.len())?;
    buffer.extend_from_slice(bytes);
    tracing::trace!(appended = bytes.len(), total = buffer.len(), "aggregated stream chunk");
    Ok(())
}
