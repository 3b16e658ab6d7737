//! Background heartbeat writer.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use super::status::StatusHandle;

/// Writes `heartbeat_at` every interval until stopped or dropped.
pub struct Heartbeat {
    stop: Arc<(Mutex<bool>, Condvar)>,
    thread: Option<JoinHandle<()>>,
}

impl Heartbeat {
    pub fn start(status: StatusHandle, interval: Duration) -> Self {
        let stop = Arc::new((Mutex::new(false), Condvar::new()));
        let signal = Arc::clone(&stop);

        let thread = thread::Builder::new()
            .name("dub-heartbeat".to_string())
            .spawn(move || {
                let (lock, cvar) = &*signal;
                let mut stopped = lock.lock();
                while !*stopped {
                    let timed_out = cvar.wait_for(&mut stopped, interval).timed_out();
                    if *stopped {
                        break;
                    }
                    if timed_out {
                        if let Err(e) = status.beat() {
                            tracing::warn!("Heartbeat write failed: {}", e);
                        }
                    }
                }
            });

        let thread = match thread {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!("Could not start heartbeat thread: {}", e);
                None
            }
        };

        Self { stop, thread }
    }

    pub fn stop(&mut self) {
        {
            let (lock, cvar) = &*self.stop;
            *lock.lock() = true;
            cvar.notify_all();
        }
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::status::{DubStatus, StatusStore};
    use tempfile::tempdir;

    #[test]
    fn beats_until_stopped() {
        let dir = tempdir().unwrap();
        let store = StatusStore::new(dir.path().join("status.json"));
        let handle = StatusHandle::new(store.clone(), DubStatus::new("job", "hi"));
        assert!(handle.snapshot().heartbeat_at.is_none());

        let mut heartbeat = Heartbeat::start(handle.clone(), Duration::from_millis(10));
        thread::sleep(Duration::from_millis(80));
        heartbeat.stop();

        let on_disk = store.load().unwrap().unwrap();
        assert!(on_disk.heartbeat_at.is_some());

        // no writes after stop
        let before = handle.snapshot().heartbeat_at;
        thread::sleep(Duration::from_millis(30));
        assert_eq!(handle.snapshot().heartbeat_at, before);
    }

    #[test]
    fn drop_stops_promptly_with_long_interval() {
        let dir = tempdir().unwrap();
        let handle = StatusHandle::new(
            StatusStore::new(dir.path().join("status.json")),
            DubStatus::new("job", "hi"),
        );
        let started = std::time::Instant::now();
        drop(Heartbeat::start(handle, Duration::from_secs(60)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
