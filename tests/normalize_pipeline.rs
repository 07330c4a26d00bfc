use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use pretty_assertions::assert_eq;
use vshelpers::{
    Bytes, CompletionGuard, Error, EventKind, Normalizer, NormalizerConfig, ReadableStream, Value,
    aggregate, normalize,
};

#[tokio::test]
async fn stream_of_text_chunks_aggregates_once_and_detaches() -> anyhow::Result<()> {
    let stream = ReadableStream::new();
    let feeder = stream.clone();
    tokio::spawn(async move {
        for chunk in ["ab", "cd", "ef"] {
            feeder.push_text(chunk);
        }
        feeder.end();
        // A second end after settlement reaches nobody.
        feeder.end();
    });

    let bytes = aggregate(Some(&stream), None).await?;
    assert_eq!(bytes, Some(Bytes::from_static(b"abcdef")));
    for kind in [EventKind::Data, EventKind::End, EventKind::Error] {
        assert_eq!(stream.listener_count(kind), 0);
    }
    Ok(())
}

#[tokio::test]
async fn missing_stream_is_a_noop_success() -> anyhow::Result<()> {
    assert_eq!(aggregate(None, None).await?, None);
    Ok(())
}

#[tokio::test]
async fn deferred_value_producing_a_stream() -> anyhow::Result<()> {
    let value = Value::deferred(|ctx| async move {
        assert_eq!(ctx.depth, 0);
        let stream = ReadableStream::from_reader(std::io::Cursor::new(b"from a reader".to_vec()));
        Ok(Value::Stream(stream))
    });
    let bytes = normalize(value, None).await?;
    assert_eq!(bytes.as_deref(), Some(&b"from a reader"[..]));
    Ok(())
}

#[tokio::test]
async fn object_normalizes_to_its_json_text() -> anyhow::Result<()> {
    let object = serde_json::json!({"repo": "vshelpers", "stars": 3, "nested": {"ok": true}});
    let bytes = normalize(object.clone(), None).await?.unwrap_or_default();
    assert_eq!(std::str::from_utf8(&bytes)?, serde_json::to_string(&object)?);
    Ok(())
}

#[tokio::test]
async fn depth_limit_is_configurable() {
    let normalizer = match Normalizer::new(&NormalizerConfig::default().with_max_depth(0)) {
        Ok(normalizer) => normalizer,
        Err(err) => panic!("valid config rejected: {err}"),
    };
    let one_link = Value::deferred(|_ctx| async { Ok(Value::from("x")) });
    let err = normalizer.normalize(one_link, None).await.unwrap_err();
    assert!(matches!(err, Error::RecursionLimit { max_depth: 0 }));
}

#[test]
fn guard_counts_only_the_first_call() {
    let calls = Arc::new(AtomicUsize::new(0));
    let on_success = Arc::clone(&calls);
    let on_failure = Arc::clone(&calls);
    let guard = CompletionGuard::new(
        move |_: u8| {
            on_success.fetch_add(1, Ordering::SeqCst);
        },
        Some(Box::new(move |_: &'static str| {
            on_failure.fetch_add(10, Ordering::SeqCst);
        })),
    );

    guard.fail("first");
    guard.succeed(1);
    assert_eq!(calls.load(Ordering::SeqCst), 10);
}
