use std::io;
use std::thread::{self, JoinHandle};

/// Spawns an OS thread with a name, so panics and `tracing` spans are
/// attributable to the channel that raised them.
///
/// Every long-lived loop in this workspace (accept loops, the primary
/// receive loop, the RTSI poll loop) is spawned through this helper rather
/// than bare `thread::spawn`.
pub fn spawn_named<F>(name: &str, f: F) -> io::Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new().name(name.to_owned()).spawn(f)
}
