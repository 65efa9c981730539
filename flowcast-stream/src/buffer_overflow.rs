// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

/// What a [`SharedStream`](crate::SharedStream) does when a subscriber's buffer is full.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferOverflow {
    /// `emit` waits until the subscriber makes room; `try_emit` refuses the value.
    #[default]
    Suspend,
    /// Evict the oldest buffered value for that subscriber and keep the new one.
    DropOldest,
    /// Keep the buffer as is and drop the new value for that subscriber.
    DropLatest,
}
