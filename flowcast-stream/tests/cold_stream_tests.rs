// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use flowcast_core::{CancellationToken, Flow, FlowError, FlowExt};
use flowcast_stream::ColdStream;
use flowcast_test_utils::helpers::{assert_stream_ended, unwrap_stream};
use flowcast_test_utils::RecordingCollector;
use futures::stream;
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[tokio::test]
async fn test_each_collection_runs_the_producer_again() -> anyhow::Result<()> {
    // Arrange
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = runs.clone();
    let cold = ColdStream::new(move |_cancel| {
        counter.fetch_add(1, Ordering::SeqCst);
        stream::iter(vec![1, 2, 3]).map(Ok)
    });
    let cancel = CancellationToken::new();

    // Act
    let mut first = Vec::new();
    cold.collect_with(&cancel, |v| {
        first.push(v);
        async { Ok(()) }
    })
    .await?;

    let mut second = Vec::new();
    cold.collect_with(&cancel, |v| {
        second.push(v);
        async { Ok(()) }
    })
    .await?;

    // Assert
    assert_eq!(first, vec![1, 2, 3]);
    assert_eq!(second, vec![1, 2, 3]);
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn test_from_values_completes_after_last_value() -> anyhow::Result<()> {
    // Arrange
    let cold = ColdStream::from_values(vec!["a", "b"]);
    let (mut collector, mut received) = RecordingCollector::new();

    // Act
    cold.collect(&CancellationToken::new(), &mut collector).await?;
    drop(collector);

    // Assert
    assert_eq!(unwrap_stream(&mut received, 500).await, "a");
    assert_eq!(unwrap_stream(&mut received, 500).await, "b");
    assert_stream_ended(&mut received, 500).await;
    Ok(())
}

#[tokio::test]
async fn test_producer_error_is_returned_verbatim() {
    // Arrange
    let cold = ColdStream::new(|_cancel| {
        stream::iter(vec![Ok(1), Err(FlowError::stream_error("sensor offline")), Ok(2)])
    });
    let (mut collector, mut received) = RecordingCollector::new();

    // Act
    let result = cold.collect(&CancellationToken::new(), &mut collector).await;

    // Assert
    assert!(matches!(
        result,
        Err(FlowError::StreamProcessingError { ref context }) if context == "sensor offline"
    ));
    assert_eq!(unwrap_stream(&mut received, 500).await, 1);
}

#[tokio::test]
async fn test_collector_error_aborts_collection() {
    // Arrange
    let cold = ColdStream::from_values(1..=10);
    let (mut collector, mut received) = RecordingCollector::failing_after(2);

    // Act
    let result = cold.collect(&CancellationToken::new(), &mut collector).await;

    // Assert
    assert!(matches!(result, Err(FlowError::StreamProcessingError { .. })));
    assert_eq!(unwrap_stream(&mut received, 500).await, 1);
    assert_eq!(unwrap_stream(&mut received, 500).await, 2);
}

#[tokio::test]
async fn test_cancellation_ends_collection_and_cancels_producer() -> anyhow::Result<()> {
    // Arrange
    let producer_tokens: Arc<Mutex<Vec<CancellationToken>>> = Arc::new(Mutex::new(Vec::new()));
    let tokens = producer_tokens.clone();
    let cold = ColdStream::new(move |cancel| {
        tokens.lock().push(cancel);
        stream::iter(vec![Ok(1)]).chain(stream::pending())
    });
    let cancel = CancellationToken::new();
    let (mut collector, mut received) = RecordingCollector::new();

    let collection = {
        let cancel = cancel.clone();
        tokio::spawn(async move { cold.collect(&cancel, &mut collector).await })
    };
    assert_eq!(unwrap_stream(&mut received, 500).await, 1);

    // Act
    cancel.cancel();
    let result = collection.await?;

    // Assert
    assert!(matches!(result, Err(FlowError::Cancelled)));
    let tokens = producer_tokens.lock();
    assert_eq!(tokens.len(), 1);
    assert!(tokens[0].is_cancelled());
    Ok(())
}

#[tokio::test]
async fn test_concurrent_collections_do_not_share_producer_state() -> anyhow::Result<()> {
    // Arrange
    let cold = ColdStream::new(|_cancel| {
        let mut next = 0;
        stream::poll_fn(move |_| {
            next += 1;
            std::task::Poll::Ready((next <= 3).then_some(Ok(next)))
        })
    });
    let cancel = CancellationToken::new();
    let (mut left, mut left_received) = RecordingCollector::new();
    let (mut right, mut right_received) = RecordingCollector::new();

    // Act
    let (a, b) = futures::join!(
        cold.collect(&cancel, &mut left),
        cold.collect(&cancel, &mut right)
    );
    a?;
    b?;
    drop((left, right));

    // Assert
    let left: Vec<i32> = left_received.collect().await;
    let right: Vec<i32> = right_received.collect().await;
    assert_eq!(left, vec![1, 2, 3]);
    assert_eq!(right, vec![1, 2, 3]);
    Ok(())
}
