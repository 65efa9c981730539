// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

mod common;

use common::UpstreamProbe;
use flowcast_core::CancellationToken;
use flowcast_stream::{ColdStream, SharingStarted, StateInExt};
use flowcast_test_utils::helpers::unwrap_stream;
use std::time::Duration;
use tokio::time::{pause, sleep};

#[tokio::test]
async fn test_state_in_starts_from_initial_and_follows_upstream() {
    // Arrange
    let scope = CancellationToken::new();
    let state = ColdStream::from_values(vec![1, 2, 3]).state_in(&scope, SharingStarted::Eagerly, 0);

    // Act
    let mut subscriber = state.subscribe();
    let mut last = unwrap_stream(&mut subscriber, 500).await;
    while last != 3 {
        last = unwrap_stream(&mut subscriber, 500).await;
    }

    // Assert
    assert_eq!(state.value(), 3);
    scope.cancel();
}

#[tokio::test]
async fn test_lazily_keeps_initial_value_until_subscribed() {
    // Arrange
    pause();
    let probe = UpstreamProbe::default();
    let scope = CancellationToken::new();
    let state = probe.ticker().state_in(&scope, SharingStarted::Lazily, 100);

    // Act
    sleep(Duration::from_millis(500)).await;

    // Assert
    assert_eq!(state.value(), 100);
    assert_eq!(probe.starts(), 0);

    let mut subscriber = state.subscribe();
    assert_eq!(unwrap_stream(&mut subscriber, 500).await, 100);
    assert_eq!(unwrap_stream(&mut subscriber, 500).await, 0);
    scope.cancel();
}

#[tokio::test]
async fn test_stopping_keeps_last_value() {
    // Arrange
    pause();
    let probe = UpstreamProbe::default();
    let scope = CancellationToken::new();
    let state = probe
        .ticker()
        .state_in(&scope, SharingStarted::while_subscribed(Duration::ZERO, Duration::ZERO), 100);
    let mut subscriber = state.subscribe();
    assert_eq!(unwrap_stream(&mut subscriber, 500).await, 100);
    assert_eq!(unwrap_stream(&mut subscriber, 500).await, 0);

    // Act
    drop(subscriber);
    sleep(Duration::from_millis(500)).await;

    // Assert
    assert_eq!(probe.active(), 0);
    assert_eq!(state.value(), 0);
    assert_eq!(state.subscription_count().value(), 0);
    scope.cancel();
}

#[tokio::test]
async fn test_equal_upstream_values_are_conflated() {
    // Arrange
    let scope = CancellationToken::new();
    let state = ColdStream::from_values(vec!["on", "on", "on", "off"]).state_in(
        &scope,
        SharingStarted::Lazily,
        "off",
    );
    let mut subscriber = state.subscribe();

    // Act
    let mut observed = vec![unwrap_stream(&mut subscriber, 500).await];
    while observed.len() < 3 {
        observed.push(unwrap_stream(&mut subscriber, 500).await);
    }

    // Assert
    assert_eq!(observed, vec!["off", "on", "off"]);
    scope.cancel();
}
