//! chunkflow - composable, backpressured stages over async chunk streams
//!
//! Sources produce a [`ChunkStream`], [`Pipe`]s transform it one stage at a
//! time, [`merge`] fans several streams into one and [`to_array`] drains the
//! result. Everything is pull-driven: nothing runs until the final consumer
//! polls.
//!
//! ```
//! use chunkflow::*;
//!
//! # async fn example() -> StreamResult<()> {
//! let pipeline = filter(|x: &i32| x % 2 == 1)
//!     .compose(map(|x: i32| x * x))
//!     .compose(take(3));
//! let squares = from_iter(1..100).through(&pipeline).to_array().await?;
//! assert_eq!(squares, vec![1, 9, 25]);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod flow;
pub mod flow_stream_ext;
pub mod pipe;
pub mod stages;
pub mod stream_configuration;

pub use error::{StreamError, StreamResult};
pub use flow::*;
pub use flow_stream_ext::ChunkStreamExt;
pub use pipe::{compose, identity, Pipe, PipeExt};
pub use stages::*;
pub use stream_configuration::{BufferConfig, IntervalConfig, MissedTickPolicy};
