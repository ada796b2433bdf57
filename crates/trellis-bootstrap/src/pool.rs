//! Bounded parallelism across machines
//!
//! Steps on one machine are strictly serial. Steps on different machines are
//! independent, so batches (reset N workers, label N nodes) run through here
//! with at most `limit` machines in flight.

use std::future::Future;

use futures::stream::{self, StreamExt};

/// Run `f` over every item with at most `limit` futures in flight
///
/// Results come back in input order. A `limit` of zero is treated as one.
pub async fn run_bounded<T, R, F, Fut>(items: impl IntoIterator<Item = T>, limit: usize, f: F) -> Vec<R>
where
    F: FnMut(T) -> Fut,
    Fut: Future<Output = R>,
{
    stream::iter(items)
        .map(f)
        .buffered(limit.max(1))
        .collect()
        .await
}
