// --- File: crates/notifly_common/src/services.rs ---
//! Shared aliases for the platform and service traits of the Notifly crates.
//!
//! Traits at the platform seams (browser push manager, background agent host)
//! return boxed futures so they stay object safe and can be swapped for
//! test doubles.

use std::future::Future;
use std::pin::Pin;

/// Type alias for a boxed future that returns a Result
pub type BoxFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;
