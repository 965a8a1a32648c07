//! Transform stages
//!
//! Every function here returns a [`Pipe`]. State such as counters, buffers and
//! accumulators is created inside the stream built by [`Pipe::apply`], so two
//! applications never share it.
//!
//! All stages follow the same flow-control rules: a stage pulls its next input
//! only after its previous output has been taken, at most one callback is in
//! flight, and an upstream or callback error ends the output with that error
//! without running any close-time flush.
//!
//! The `eval_*` variants accept asynchronous, fallible callbacks. An `Err`
//! returned by a callback becomes the stage's error.

use async_stream::try_stream;
use futures_util::stream::StreamExt;
use std::future::Future;
use std::sync::Arc;

use crate::error::{StreamError, StreamResult};
use crate::flow::ChunkStream;
use crate::pipe::{compose, Pipe};

fn callback_failed(stage: &'static str) -> impl Fn(StreamError) -> StreamError {
    move |e| {
        log::debug!("{} callback failed: {}", stage, e);
        e
    }
}

/// Drop `None` chunks and unwrap the rest
///
/// # Examples
/// ```
/// use chunkflow::*;
///
/// # async fn example() {
/// let out = from_iter(vec![Some(1), None, Some(2)]).through(&compact());
/// assert_eq!(to_array(out).await.unwrap(), vec![1, 2]);
/// # }
/// ```
pub fn compact<T>() -> Pipe<Option<T>, T>
where
    T: Send + 'static,
{
    Pipe::new(|input: ChunkStream<Option<T>>| {
        try_stream! {
            let mut s = input;
            while let Some(item) = s.next().await {
                if let Some(value) = item? {
                    yield value;
                }
            }
        }
        .boxed()
    })
}

/// Transform each chunk with `f`; the output type may differ from the input
pub fn map<I, O, F>(f: F) -> Pipe<I, O>
where
    F: Fn(I) -> O + Send + Sync + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    let f = Arc::new(f);
    Pipe::new(move |input: ChunkStream<I>| {
        let f = Arc::clone(&f);
        try_stream! {
            let mut s = input;
            while let Some(item) = s.next().await {
                yield f(item?);
            }
        }
        .boxed()
    })
}

/// Like [`map`], with an asynchronous, fallible function
///
/// The next chunk is not pulled until the current future has resolved and its
/// result has been taken downstream.
pub fn eval_map<I, O, F, Fut>(f: F) -> Pipe<I, O>
where
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StreamResult<O>> + Send + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    let f = Arc::new(f);
    Pipe::new(move |input: ChunkStream<I>| {
        let f = Arc::clone(&f);
        try_stream! {
            let mut s = input;
            while let Some(item) = s.next().await {
                let mapped = f(item?).await.map_err(callback_failed("eval_map"))?;
                yield mapped;
            }
        }
        .boxed()
    })
}

/// Forward only the chunks for which `predicate` returns true
pub fn filter<T, F>(predicate: F) -> Pipe<T, T>
where
    F: Fn(&T) -> bool + Send + Sync + 'static,
    T: Send + 'static,
{
    let predicate = Arc::new(predicate);
    Pipe::new(move |input: ChunkStream<T>| {
        let predicate = Arc::clone(&predicate);
        try_stream! {
            let mut s = input;
            while let Some(item) = s.next().await {
                let item = item?;
                if predicate(&item) {
                    yield item;
                }
            }
        }
        .boxed()
    })
}

/// Like [`filter`], with an asynchronous, fallible predicate
pub fn eval_filter<T, F, Fut>(predicate: F) -> Pipe<T, T>
where
    F: Fn(&T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StreamResult<bool>> + Send + 'static,
    T: Send + 'static,
{
    let predicate = Arc::new(predicate);
    Pipe::new(move |input: ChunkStream<T>| {
        let predicate = Arc::clone(&predicate);
        try_stream! {
            let mut s = input;
            while let Some(item) = s.next().await {
                let item = item?;
                let keep = predicate(&item).await.map_err(callback_failed("eval_filter"))?;
                if keep {
                    yield item;
                }
            }
        }
        .boxed()
    })
}

/// Run a side effect for each chunk and forward the chunk unchanged
pub fn tap<T, F>(f: F) -> Pipe<T, T>
where
    F: Fn(&T) + Send + Sync + 'static,
    T: Send + 'static,
{
    let f = Arc::new(f);
    Pipe::new(move |input: ChunkStream<T>| {
        let f = Arc::clone(&f);
        try_stream! {
            let mut s = input;
            while let Some(item) = s.next().await {
                let item = item?;
                f(&item);
                yield item;
            }
        }
        .boxed()
    })
}

/// Like [`tap`], awaiting an asynchronous, fallible side effect before
/// forwarding
pub fn eval_tap<T, F, Fut>(f: F) -> Pipe<T, T>
where
    F: Fn(&T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StreamResult<()>> + Send + 'static,
    T: Send + 'static,
{
    let f = Arc::new(f);
    Pipe::new(move |input: ChunkStream<T>| {
        let f = Arc::clone(&f);
        try_stream! {
            let mut s = input;
            while let Some(item) = s.next().await {
                let item = item?;
                f(&item).await.map_err(callback_failed("eval_tap"))?;
                yield item;
            }
        }
        .boxed()
    })
}

/// Group chunks into vectors of `size`
///
/// A full batch is emitted as soon as it fills. On close, a non-empty
/// remainder is emitted once as a final, shorter batch.
///
/// Returns [`StreamError::InvalidArgument`] when `size` is zero.
///
/// # Examples
/// ```
/// use chunkflow::*;
///
/// # async fn example() {
/// let batches = from_iter(1..=5).through(&batch(2).unwrap());
/// assert_eq!(
///     to_array(batches).await.unwrap(),
///     vec![vec![1, 2], vec![3, 4], vec![5]]
/// );
/// # }
/// ```
pub fn batch<T>(size: usize) -> StreamResult<Pipe<T, Vec<T>>>
where
    T: Send + 'static,
{
    if size == 0 {
        return Err(StreamError::invalid_argument(
            "batch size must be a positive integer",
        ));
    }

    Ok(Pipe::new(move |input: ChunkStream<T>| {
        try_stream! {
            let mut s = input;
            let mut buf = Vec::new();
            while let Some(item) = s.next().await {
                buf.push(item?);
                if buf.len() == size {
                    yield std::mem::take(&mut buf);
                }
            }
            if !buf.is_empty() {
                yield buf;
            }
        }
        .boxed()
    }))
}

/// Emit the elements of each chunk in order
pub fn flatten<C>() -> Pipe<C, C::Item>
where
    C: IntoIterator + Send + 'static,
    C::IntoIter: Send,
    C::Item: Send + 'static,
{
    Pipe::new(|input: ChunkStream<C>| {
        try_stream! {
            let mut s = input;
            while let Some(item) = s.next().await {
                for element in item? {
                    yield element;
                }
            }
        }
        .boxed()
    })
}

/// Forward at most `limit` chunks, then close
///
/// The upstream is dropped as soon as the `limit`-th chunk has been pulled,
/// before that chunk is handed downstream, so a producer such as `interval`
/// stops right away. `take(0)` never polls its input.
pub fn take<T>(limit: usize) -> Pipe<T, T>
where
    T: Send + 'static,
{
    Pipe::new(move |input: ChunkStream<T>| {
        try_stream! {
            let mut upstream = input;
            let mut remaining = limit;
            while remaining > 0 {
                let item = match upstream.next().await {
                    Some(item) => item?,
                    None => break,
                };
                remaining -= 1;
                if remaining == 0 {
                    drop(upstream);
                    log::trace!("take limit of {} reached, upstream released", limit);
                    yield item;
                    break;
                }
                yield item;
            }
        }
        .boxed()
    })
}

/// Drop the first `count` chunks and forward the rest
pub fn skip<T>(count: usize) -> Pipe<T, T>
where
    T: Send + 'static,
{
    Pipe::new(move |input: ChunkStream<T>| {
        try_stream! {
            let mut s = input;
            let mut skipped = 0;
            while let Some(item) = s.next().await {
                let item = item?;
                if skipped < count {
                    skipped += 1;
                    continue;
                }
                yield item;
            }
        }
        .boxed()
    })
}

/// Map each chunk to a collection and emit its elements
///
/// Built as `map(f)` feeding `flatten()`.
pub fn flat_map<I, C, F>(f: F) -> Pipe<I, C::Item>
where
    F: Fn(I) -> C + Send + Sync + 'static,
    I: Send + 'static,
    C: IntoIterator + Send + 'static,
    C::IntoIter: Send,
    C::Item: Send + 'static,
{
    compose(map(f), flatten())
}

/// Async form of [`flat_map`]; a failed callback fails the stage
///
/// Built as `eval_map(f)` feeding `flatten()`.
pub fn eval_flat_map<I, C, F, Fut>(f: F) -> Pipe<I, C::Item>
where
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StreamResult<C>> + Send + 'static,
    I: Send + 'static,
    C: IntoIterator + Send + 'static,
    C::IntoIter: Send,
    C::Item: Send + 'static,
{
    compose(eval_map(f), flatten())
}

/// Running accumulation that emits the new accumulator after every chunk
///
/// # Examples
/// ```
/// use chunkflow::*;
///
/// # async fn example() {
/// let sums = from_iter(vec![1, 2, 3, 4]).through(&scan(|acc, x| acc + x, 0));
/// assert_eq!(to_array(sums).await.unwrap(), vec![1, 3, 6, 10]);
/// # }
/// ```
pub fn scan<T, R, F>(f: F, seed: R) -> Pipe<T, R>
where
    F: Fn(R, T) -> R + Send + Sync + 'static,
    T: Send + 'static,
    R: Clone + Send + Sync + 'static,
{
    let f = Arc::new(f);
    Pipe::new(move |input: ChunkStream<T>| {
        let f = Arc::clone(&f);
        let mut acc = seed.clone();
        try_stream! {
            let mut s = input;
            while let Some(item) = s.next().await {
                acc = f(acc, item?);
                yield acc.clone();
            }
        }
        .boxed()
    })
}

/// Async form of [`scan`]
///
/// The accumulator is only replaced once the callback succeeds. An `Err` from
/// the callback ends the stage with that error.
pub fn eval_scan<T, R, F, Fut>(f: F, seed: R) -> Pipe<T, R>
where
    F: Fn(R, T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StreamResult<R>> + Send + 'static,
    T: Send + 'static,
    R: Clone + Send + Sync + 'static,
{
    let f = Arc::new(f);
    Pipe::new(move |input: ChunkStream<T>| {
        let f = Arc::clone(&f);
        let mut acc = seed.clone();
        try_stream! {
            let mut s = input;
            while let Some(item) = s.next().await {
                acc = f(acc, item?).await.map_err(callback_failed("eval_scan"))?;
                yield acc.clone();
            }
        }
        .boxed()
    })
}

/// Accumulate like [`scan`] but emit only the final value, on close
///
/// Nothing is emitted when the input closes without any chunk, not even
/// `seed`.
pub fn reduce<T, R, F>(f: F, seed: R) -> Pipe<T, R>
where
    F: Fn(R, T) -> R + Send + Sync + 'static,
    T: Send + 'static,
    R: Clone + Send + Sync + 'static,
{
    let f = Arc::new(f);
    Pipe::new(move |input: ChunkStream<T>| {
        let f = Arc::clone(&f);
        let mut acc = seed.clone();
        try_stream! {
            let mut s = input;
            let mut seen = false;
            while let Some(item) = s.next().await {
                acc = f(acc, item?);
                seen = true;
            }
            if seen {
                yield acc;
            }
        }
        .boxed()
    })
}

/// Async form of [`reduce`]
pub fn eval_reduce<T, R, F, Fut>(f: F, seed: R) -> Pipe<T, R>
where
    F: Fn(R, T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StreamResult<R>> + Send + 'static,
    T: Send + 'static,
    R: Clone + Send + Sync + 'static,
{
    let f = Arc::new(f);
    Pipe::new(move |input: ChunkStream<T>| {
        let f = Arc::clone(&f);
        let mut acc = seed.clone();
        try_stream! {
            let mut s = input;
            let mut seen = false;
            while let Some(item) = s.next().await {
                acc = f(acc, item?).await.map_err(callback_failed("eval_reduce"))?;
                seen = true;
            }
            if seen {
                yield acc;
            }
        }
        .boxed()
    })
}

/// Forward every chunk, then emit `value` once when the input closes
pub fn append<T>(value: T) -> Pipe<T, T>
where
    T: Clone + Send + Sync + 'static,
{
    Pipe::new(move |input: ChunkStream<T>| {
        let value = value.clone();
        try_stream! {
            let mut s = input;
            while let Some(item) = s.next().await {
                yield item?;
            }
            yield value;
        }
        .boxed()
    })
}
