//! Iterators that report when they have been fully drained.

use std::fmt;
use std::iter::FusedIterator;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared "the stream returned `None`" flag.
///
/// Cloned between a [`TerminalTracking`] stream and whoever wants to observe
/// it (the sensor), so the answer is available after the stream moved away.
#[derive(Debug, Clone, Default)]
pub struct TerminalFlag(Arc<AtomicBool>);

impl TerminalFlag {
    /// Creates an unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once the tracked stream is exhausted.
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn set(&self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Wraps an iterator and records when it is exhausted.
///
/// When the inner iterator first returns `None` the wrapper drops it, which
/// releases whatever it owns (an open file for example), and sets the
/// terminal flag. Later calls keep returning `None`.
///
/// # Example
///
/// ```rust
/// use mokosh_sensor::stream::TerminalTracking;
///
/// let mut stream = TerminalTracking::new(vec![1, 2].into_iter());
/// let flag = stream.terminal_flag();
///
/// assert_eq!(stream.next(), Some(1));
/// assert!(!flag.is_set());
/// assert_eq!(stream.next(), Some(2));
/// assert_eq!(stream.next(), None);
/// assert!(flag.is_set());
/// ```
pub struct TerminalTracking<I> {
    inner: Option<I>,
    flag: TerminalFlag,
    yielded: usize,
}

impl<I> fmt::Debug for TerminalTracking<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TerminalTracking")
            .field("terminal", &self.is_terminal())
            .field("yielded", &self.yielded)
            .finish()
    }
}

impl<I: Iterator> TerminalTracking<I> {
    /// Wraps `inner` with a fresh flag.
    pub fn new(inner: I) -> Self {
        Self::with_flag(inner, TerminalFlag::new())
    }

    /// Wraps `inner`, reporting exhaustion through `flag`.
    pub fn with_flag(inner: I, flag: TerminalFlag) -> Self {
        Self {
            inner: Some(inner),
            flag,
            yielded: 0,
        }
    }
}

impl<I> TerminalTracking<I> {
    /// Returns a handle to this stream's terminal flag.
    pub fn terminal_flag(&self) -> TerminalFlag {
        self.flag.clone()
    }

    /// Returns true once the stream is exhausted.
    pub fn is_terminal(&self) -> bool {
        self.flag.is_set()
    }

    /// Number of items yielded so far.
    pub fn yielded(&self) -> usize {
        self.yielded
    }
}

impl<I: Iterator> Iterator for TerminalTracking<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        let inner = self.inner.as_mut()?;
        match inner.next() {
            Some(item) => {
                self.yielded += 1;
                Some(item)
            }
            None => {
                self.inner = None;
                self.flag.set();
                tracing::debug!(items = self.yielded, "stream drained, source released");
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.as_ref().map_or((0, Some(0)), Iterator::size_hint)
    }
}

impl<I: Iterator> FusedIterator for TerminalTracking<I> {}
