//! A Go-style wait group whose `wait` hands back a composable future.
//!
//! The coordinator registers outstanding work with [`WaitGroup::add`], each
//! worker reports completion with [`WaitGroup::done`], and any number of
//! observers obtain a completion future from [`WaitGroup::wait`] that they
//! can race against timeouts or shutdown signals with `tokio::select!`.

pub mod concurrent;

pub use concurrent::{WaitGroup, WaitGroupError};
