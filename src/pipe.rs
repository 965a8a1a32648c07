//! Reusable stream transforms
//!
//! A [`Pipe`] is a function from `ChunkStream<I>` to `ChunkStream<O>`. Applying
//! it wires an upstream readable into a fresh stage and hands back the stage's
//! readable end. Stage state is created per application, so one `Pipe` value
//! can feed any number of independent pipelines.

use crate::flow::ChunkStream;
use std::sync::Arc;

/// A stage factory: each [`apply`](Pipe::apply) builds one live stage
///
/// Cloning is cheap and shares the factory, not any stage state.
pub struct Pipe<I, O> {
    f: Arc<dyn Fn(ChunkStream<I>) -> ChunkStream<O> + Send + Sync + 'static>,
}

impl<I, O> Clone for Pipe<I, O> {
    fn clone(&self) -> Self {
        Pipe {
            f: Arc::clone(&self.f),
        }
    }
}

impl<I, O> std::fmt::Debug for Pipe<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipe").finish_non_exhaustive()
    }
}

impl<I, O> Pipe<I, O> {
    /// Wrap a closure that builds a stage around its upstream
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(ChunkStream<I>) -> ChunkStream<O> + Send + Sync + 'static,
    {
        Pipe { f: Arc::new(f) }
    }

    /// Connect `input` to a new instance of this stage and return its output
    pub fn apply(&self, input: ChunkStream<I>) -> ChunkStream<O> {
        (self.f)(input)
    }
}

/// Compose two pipes: the output of `p1` privately feeds `p2`
///
/// Only `p1`'s input and `p2`'s output are exposed.
pub fn compose<I, M, O>(p1: Pipe<I, M>, p2: Pipe<M, O>) -> Pipe<I, O>
where
    I: Send + 'static,
    M: Send + 'static,
    O: Send + 'static,
{
    Pipe::new(move |input| p2.apply(p1.apply(input)))
}

/// Pass every chunk, error and close through untouched
pub fn identity<I>() -> Pipe<I, I>
where
    I: Send + 'static,
{
    Pipe::new(|input| input)
}

/// Method form of [`compose`], for left-to-right chains
pub trait PipeExt<I, O> {
    /// Feed this pipe's output into `other`
    fn compose<P>(self, other: Pipe<O, P>) -> Pipe<I, P>
    where
        P: Send + 'static;
}

impl<I, O> PipeExt<I, O> for Pipe<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn compose<P>(self, other: Pipe<O, P>) -> Pipe<I, P>
    where
        P: Send + 'static,
    {
        compose(self, other)
    }
}
