use std::fmt;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;

use crate::stream::ReadableStream;

/// Arguments handed to a deferred value when it is invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredContext {
    /// Normalized encoding requested by the caller, `None` for the default.
    pub encoding: Option<String>,
    /// Number of deferred values already unwrapped in this chain.
    pub depth: usize,
    pub max_depth: usize,
}

type DeferredFn =
    dyn Fn(DeferredContext) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync;

/// A callable producing a value lazily, possibly another deferred value.
#[derive(Clone)]
pub struct Deferred {
    func: Arc<DeferredFn>,
}

impl Deferred {
    pub fn new<F, Fut>(func: F) -> Self
    where
        F: Fn(DeferredContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Self {
            func: Arc::new(move |ctx| func(ctx).boxed()),
        }
    }

    /// A deferred value that resolves to `value` on every invocation.
    pub fn ready(value: impl Into<Value> + Clone + Send + Sync + 'static) -> Self {
        Self::new(move |_| {
            let value = value.clone().into();
            async move { Ok(value) }
        })
    }

    pub async fn invoke(&self, ctx: DeferredContext) -> anyhow::Result<Value> {
        (self.func)(ctx).await
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Deferred")
    }
}

/// Any input accepted by the normalizer.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Nil,
    Buffer(Bytes),
    Deferred(Deferred),
    Stream(ReadableStream),
    /// Structured data. Objects serialize to JSON text, arrays join their
    /// elements with `,`, scalars behave like their plain string form and
    /// `null` is nil.
    Json(serde_json::Value),
    Text(String),
    /// An error value; its message is its string form.
    Error(Arc<dyn std::error::Error + Send + Sync>),
    /// A value with its own string representation.
    Display(Arc<dyn fmt::Display + Send + Sync>),
}

impl Value {
    pub fn deferred<F, Fut>(func: F) -> Self
    where
        F: Fn(DeferredContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Self::Deferred(Deferred::new(func))
    }

    pub fn display(value: impl fmt::Display + Send + Sync + 'static) -> Self {
        Self::Display(Arc::new(value))
    }

    pub fn error(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Error(Arc::new(error))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil | Self::Json(serde_json::Value::Null))
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Buffer(_) => "buffer",
            Self::Deferred(_) => "deferred",
            Self::Stream(_) => "stream",
            Self::Json(_) => "json",
            Self::Text(_) => "text",
            Self::Error(_) => "error",
            Self::Display(_) => "display",
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => f.write_str("Nil"),
            Self::Buffer(bytes) => f.debug_tuple("Buffer").field(bytes).finish(),
            Self::Deferred(_) => f.write_str("Deferred"),
            Self::Stream(stream) => f.debug_tuple("Stream").field(stream).finish(),
            Self::Json(json) => f.debug_tuple("Json").field(json).finish(),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Error(error) => f.debug_tuple("Error").field(&error.to_string()).finish(),
            Self::Display(_) => f.write_str("Display"),
        }
    }
}

impl From<Bytes> for Value {
    fn from(bytes: Bytes) -> Self {
        Self::Buffer(bytes)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Buffer(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for Value {
    fn from(bytes: &'static [u8]) -> Self {
        Self::Buffer(Bytes::from_static(bytes))
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Self::Json(json)
    }
}

impl From<ReadableStream> for Value {
    fn from(stream: ReadableStream) -> Self {
        Self::Stream(stream)
    }
}

impl From<Deferred> for Value {
    fn from(deferred: Deferred) -> Self {
        Self::Deferred(deferred)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Nil, Into::into)
    }
}

macro_rules! json_scalar {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Self::Json(serde_json::Value::from(value))
            }
        })*
    };
}

json_scalar!(bool, i32, i64, u32, u64, f64);
