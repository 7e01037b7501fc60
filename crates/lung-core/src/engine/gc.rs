//! Deferred deallocation for sample buffers
//!
//! Sample buffers reach the render thread as `basedrop::Shared`. Dropping
//! the last reference there only enqueues the pointer; a background
//! collector thread frees the memory later. Rebinding a large sample
//! therefore never puts an allocator call on the render path.

use basedrop::{Collector, Handle};
use std::sync::{mpsc, OnceLock};
use std::thread;
use std::time::Duration;

/// How often the collector sweeps
const COLLECT_INTERVAL: Duration = Duration::from_millis(50);

static HANDLE: OnceLock<Handle> = OnceLock::new();

fn spawn_collector() -> Handle {
    let (tx, rx) = mpsc::sync_channel(1);

    // The collector is !Sync, so it lives and dies on its own thread
    thread::Builder::new()
        .name("lung-gc".to_string())
        .spawn(move || {
            let mut collector = Collector::new();
            if tx.send(collector.handle()).is_err() {
                return;
            }
            log::info!("Sample collector thread started");
            loop {
                collector.collect();
                thread::sleep(COLLECT_INTERVAL);
            }
        })
        .expect("failed to spawn sample collector thread");

    rx.recv().expect("sample collector thread exited before handing out its handle")
}

/// Handle for wrapping values in `Shared`, starting the collector on first use
pub fn gc_handle() -> Handle {
    HANDLE.get_or_init(spawn_collector).clone()
}
