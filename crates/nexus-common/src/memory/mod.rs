//! Memory management for generator invocations.
//!
//! Every generator invocation owns one bounded [`Arena`] for its transient
//! string and byte storage. The arena is dropped when the invocation returns,
//! on success and error paths alike.

mod arena;

pub use arena::Arena;
