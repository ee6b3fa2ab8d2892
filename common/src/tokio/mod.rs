//! Runtime helpers shared by the crates of the workspace
//!
//! Everything async goes through these re-exports so the runtime
//! features are configured in a single place.

use std::future::Future;

use log::trace;

pub use ::tokio::{sync, task, time};

use task::JoinHandle;

// Spawn a named task on the current runtime
// The name is only used for tracing, tasks are not registered anywhere
pub fn spawn_task<F, S>(name: S, future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
    S: Into<String>,
{
    let name = name.into();
    if log::log_enabled!(log::Level::Trace) {
        trace!("Spawning task: {}", name);
    }

    ::tokio::spawn(future)
}
