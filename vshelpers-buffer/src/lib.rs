//! Turn heterogeneous values into bytes.
//!
//! [`Normalizer`] accepts raw buffers, nil, deferred values, readable
//! streams, structured JSON and anything with a string form, and resolves
//! them to a single [`bytes::Bytes`]. Streams are drained through
//! [`aggregate`], which settles exactly once and always detaches its
//! listeners.

pub mod aggregator;
pub mod normalizer;
pub mod stream;
pub mod strings;
pub mod value;

pub use aggregator::aggregate;
pub use normalizer::{Normalizer, RecursionState, normalize};
pub use stream::{Chunk, EventKind, Listener, ListenerId, ReadableStream, StreamEvent};
pub use strings::{is_empty_string, normalize_string, to_string_safe, to_string_safe_or};
pub use value::{Deferred, DeferredContext, Value};
