// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use futures::stream::StreamExt;
use futures::Stream;
use std::time::Duration;
use tokio::time::{sleep, timeout};

/// Wait up to `timeout_ms` for the next item.
///
/// # Panics
///
/// Panics if the stream ends or nothing arrives in time.
pub async fn unwrap_stream<S, T>(stream: &mut S, timeout_ms: u64) -> T
where
    S: Stream<Item = T> + Unpin,
{
    match timeout(Duration::from_millis(timeout_ms), stream.next()).await {
        Ok(Some(item)) => item,
        Ok(None) => panic!("Expected an item but the stream ended."),
        Err(_) => panic!("Expected an item within {timeout_ms}ms but none arrived."),
    }
}

/// Assert that nothing is emitted for `timeout_ms`.
///
/// # Panics
///
/// Panics if the stream yields an item or ends in the meantime.
pub async fn assert_no_element_emitted<S, T>(stream: &mut S, timeout_ms: u64)
where
    S: Stream<Item = T> + Unpin,
{
    tokio::select! {
        item = stream.next() => {
            match item {
                Some(_) => panic!("Unexpected item emitted, expected no output."),
                None => panic!("Stream ended, expected it to stay open."),
            }
        }
        () = sleep(Duration::from_millis(timeout_ms)) => {}
    }
}

/// Assert that the stream ends within `timeout_ms`.
///
/// # Panics
///
/// Panics if the stream yields an item or stays open.
pub async fn assert_stream_ended<S, T>(stream: &mut S, timeout_ms: u64)
where
    S: Stream<Item = T> + Unpin,
{
    match timeout(Duration::from_millis(timeout_ms), stream.next()).await {
        Ok(None) => {}
        Ok(Some(_)) => panic!("Expected the stream to end, but it emitted an item."),
        Err(_) => panic!("Expected the stream to end within {timeout_ms}ms."),
    }
}
