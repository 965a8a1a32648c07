//! Sources, fan-in and sinks for chunk streams
//!
//! A [`ChunkStream`] is the readable end every stage consumes and produces.
//! It either closes (yields `None` after its chunks) or fails (yields exactly
//! one `Err` after its chunks, then `None`). Dropping a `ChunkStream` is how a
//! consumer cancels it; any resource the stream holds is released with it.

use async_stream::{stream, try_stream};
use futures_core::Stream;
use futures_util::pin_mut;
use futures_util::stream::{self, BoxStream, FuturesUnordered, StreamExt};
use std::future::Future;
use std::time::Duration;
use tokio::time::{interval_at, Instant};
use tokio_stream::wrappers::IntervalStream;

use crate::error::{StreamError, StreamResult};
use crate::stream_configuration::{BufferConfig, IntervalConfig};

/// A boxed, heap-allocated stream of fallible chunks
pub type ChunkStream<T> = BoxStream<'static, StreamResult<T>>;

// ================================
// Source Adapters
// ================================

/// Emit a single chunk, then close
pub fn emit<T>(item: T) -> ChunkStream<T>
where
    T: Send + 'static,
{
    stream::once(async move { Ok(item) }).boxed()
}

/// Create a stream that closes immediately
pub fn empty<T>() -> ChunkStream<T>
where
    T: Send + 'static,
{
    stream::empty().boxed()
}

/// Create a stream that fails immediately with `error`
pub fn raise<T>(error: StreamError) -> ChunkStream<T>
where
    T: Send + 'static,
{
    stream::once(async move { Err(error) }).boxed()
}

/// Create a stream from a synchronous iterable
///
/// Items are pulled one per poll, so nothing is read from `iter` until the
/// stream is consumed.
///
/// # Examples
/// ```
/// use chunkflow::*;
///
/// # async fn example() {
/// let items = to_array(from_iter(vec![1, 2, 3])).await.unwrap();
/// assert_eq!(items, vec![1, 2, 3]);
/// # }
/// ```
pub fn from_iter<I, T>(iter: I) -> ChunkStream<T>
where
    I: IntoIterator<Item = T> + Send + 'static,
    <I as IntoIterator>::IntoIter: Send,
    T: Send + 'static,
{
    stream::iter(iter.into_iter().map(Ok)).boxed()
}

/// Create a stream from an asynchronous iterable
pub fn from_stream<S, T>(source: S) -> ChunkStream<T>
where
    S: Stream<Item = T> + Send + 'static,
    T: Send + 'static,
{
    source.map(Ok).boxed()
}

/// Create a stream from an asynchronous iterable that can fail mid-iteration
///
/// The first `Err` is forwarded as the stream's error and `source` is dropped
/// without being polled again.
pub fn from_try_stream<S, T, E>(source: S) -> ChunkStream<T>
where
    S: Stream<Item = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Into<StreamError> + Send + 'static,
{
    try_stream! {
        pin_mut!(source);
        while let Some(item) = source.next().await {
            let value = item.map_err(Into::<StreamError>::into)?;
            yield value;
        }
    }
    .boxed()
}

/// Emit increasing integers starting at 0, one every `period`
///
/// The first value arrives after one `period`. The stream never closes on its
/// own; drop it (or bound it with `take` / `interrupt_when`) to release the
/// timer.
pub fn interval(period: Duration) -> StreamResult<ChunkStream<u64>> {
    interval_with(IntervalConfig::new(period))
}

/// Configurable form of [`interval`]
pub fn interval_with(config: IntervalConfig) -> StreamResult<ChunkStream<u64>> {
    config.validate()?;

    Ok(stream! {
        let _log = TimerLog { period: config.period };
        let mut timer = interval_at(Instant::now() + config.first_tick_after(), config.period);
        timer.set_missed_tick_behavior(config.missed_tick.into());
        log::trace!("interval timer started (period {:?})", config.period);

        let mut ticks = IntervalStream::new(timer);
        let mut counter: u64 = 0;
        while ticks.next().await.is_some() {
            yield Ok(counter);
            counter += 1;
        }
    }
    .boxed())
}

// Traces when the generator, and with it the timer, goes away
struct TimerLog {
    period: Duration,
}

impl Drop for TimerLog {
    fn drop(&mut self) {
        log::trace!("interval timer released (period {:?})", self.period);
    }
}

// ================================
// Fan-in
// ================================

/// Drain every source concurrently into one stream
///
/// Each source has at most one read pending at a time and whichever read
/// completes first is forwarded, so chunk order across sources is unspecified.
/// The output closes once every source has closed. The first error from any
/// source fails the output and every other source is dropped.
///
/// # Examples
/// ```
/// use chunkflow::*;
///
/// # async fn example() {
/// let merged = merge(vec![from_iter(vec![1, 2]), from_iter(vec![3])]);
/// let mut items = to_array(merged).await.unwrap();
/// items.sort();
/// assert_eq!(items, vec![1, 2, 3]);
/// # }
/// ```
pub fn merge<T>(sources: Vec<ChunkStream<T>>) -> ChunkStream<T>
where
    T: Send + 'static,
{
    try_stream! {
        let mut reads: FuturesUnordered<_> = sources
            .into_iter()
            .enumerate()
            .map(|(index, source)| read_next(index, source))
            .collect();

        while let Some((index, next, source)) = reads.next().await {
            match next {
                Some(Ok(chunk)) => {
                    reads.push(read_next(index, source));
                    yield chunk;
                }
                Some(Err(e)) => {
                    log::debug!(
                        "merge source {} failed, abandoning {} other source(s): {}",
                        index,
                        reads.len(),
                        e
                    );
                    Err::<(), _>(e)?;
                }
                None => {
                    log::trace!("merge source {} closed", index);
                }
            }
        }
    }
    .boxed()
}

async fn read_next<T>(
    index: usize,
    mut source: ChunkStream<T>,
) -> (usize, Option<StreamResult<T>>, ChunkStream<T>) {
    let next = source.next().await;
    (index, next, source)
}

/// Stop a stream once `signal` resolves
///
/// Chunks are forwarded until the signal fires, then the output closes and the
/// upstream is dropped.
pub fn interrupt_when<T, F>(s: ChunkStream<T>, signal: F) -> ChunkStream<T>
where
    T: Send + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    stream! {
        let mut s = s;
        pin_mut!(signal);

        loop {
            let maybe_item = tokio::select! {
                biased;
                _ = &mut signal => {
                    log::trace!("stream interrupted by signal");
                    None
                },
                maybe_item = s.next() => maybe_item,
            };

            match maybe_item {
                Some(Ok(item)) => yield Ok(item),
                Some(Err(e)) => {
                    yield Err(e);
                    break;
                }
                None => break,
            }
        }
    }
    .boxed()
}

// ================================
// Sinks
// ================================

/// Drain a stream into a vector, in arrival order
///
/// Resolves to the upstream error if the stream fails.
pub async fn to_array<S, T>(s: S) -> StreamResult<Vec<T>>
where
    S: Stream<Item = StreamResult<T>>,
{
    pin_mut!(s);
    let mut items = Vec::new();
    while let Some(item) = s.next().await {
        items.push(item?);
    }
    Ok(items)
}

/// Drain a stream into a vector with a bounded buffer
///
/// Fails with [`StreamError::ResourceExhausted`] rather than holding more than
/// `max_capacity` chunks.
pub async fn to_array_with_config<S, T>(s: S, config: BufferConfig) -> StreamResult<Vec<T>>
where
    S: Stream<Item = StreamResult<T>>,
{
    config.validate()?;
    pin_mut!(s);
    let mut items = Vec::with_capacity(config.initial_capacity);
    while let Some(item) = s.next().await {
        let item = item?;
        if let Some(max) = config.max_capacity {
            if items.len() >= max {
                log::warn!("to_array buffer limit of {} chunks reached", max);
                return Err(StreamError::ResourceExhausted);
            }
        }
        items.push(item);
    }
    Ok(items)
}
