use futures_core::Stream;
use futures_util::stream::StreamExt;
use std::future::Future;

use crate::error::StreamResult;
use crate::flow::{self, ChunkStream};
use crate::pipe::Pipe;
use crate::stream_configuration::BufferConfig;

/// Extension trait providing chunkflow combinators on fallible streams
pub trait ChunkStreamExt<T>: Stream<Item = StreamResult<T>> + Sized + Send + 'static
where
    T: Send + 'static,
{
    /// Feed this stream into a new instance of `pipe`
    ///
    /// # Examples
    /// ```
    /// use chunkflow::*;
    ///
    /// # async fn example() {
    /// let evens = from_iter(1..=6)
    ///     .through(&filter(|x: &i32| x % 2 == 0))
    ///     .through(&map(|x: i32| x * 10));
    /// assert_eq!(to_array(evens).await.unwrap(), vec![20, 40, 60]);
    /// # }
    /// ```
    fn through<U>(self, pipe: &Pipe<T, U>) -> ChunkStream<U>
    where
        U: Send + 'static,
    {
        pipe.apply(self.boxed())
    }

    /// Merge this stream with another, see [`flow::merge`]
    fn merge_with(self, other: ChunkStream<T>) -> ChunkStream<T> {
        flow::merge(vec![self.boxed(), other])
    }

    /// Close this stream once `signal` resolves, see [`flow::interrupt_when`]
    fn interrupt_when<F>(self, signal: F) -> ChunkStream<T>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        flow::interrupt_when(self.boxed(), signal)
    }

    /// Drain this stream into a vector
    fn to_array(self) -> impl Future<Output = StreamResult<Vec<T>>> + Send {
        flow::to_array(self)
    }

    /// Drain this stream into a vector, bounded by `config`
    fn to_array_with_config(
        self,
        config: BufferConfig,
    ) -> impl Future<Output = StreamResult<Vec<T>>> + Send {
        flow::to_array_with_config(self, config)
    }
}

impl<S, T> ChunkStreamExt<T> for S
where
    S: Stream<Item = StreamResult<T>> + Sized + Send + 'static,
    T: Send + 'static,
{
}
