// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use flowcast_core::{CancellationToken, FlowCollector, FlowError, Result};
use futures::future::{select, Either};
use futures::{Stream, StreamExt};

/// Delivery loop shared by every `Flow` implementation in this crate.
///
/// Both waiting for the next value and handing it to the collector race the
/// cancellation token, so a stuck producer or collector cannot stall shutdown.
pub(crate) async fn collect_into<S, T>(
    mut source: S,
    cancel: &CancellationToken,
    collector: &mut (dyn FlowCollector<T> + '_),
) -> Result<()>
where
    S: Stream<Item = Result<T>> + Unpin,
    T: Send,
{
    loop {
        let item = match select(source.next(), cancel.cancelled()).await {
            Either::Left((item, _)) => item,
            Either::Right(((), _)) => return Err(FlowError::Cancelled),
        };

        let value = match item {
            Some(Ok(value)) => value,
            Some(Err(err)) => return Err(err),
            None => return Ok(()),
        };

        match select(collector.emit(value), cancel.cancelled()).await {
            Either::Left((result, _)) => result?,
            Either::Right(((), _)) => return Err(FlowError::Cancelled),
        }
    }
}
