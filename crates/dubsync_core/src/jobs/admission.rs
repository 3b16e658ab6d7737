//! Per-worker admission gates.

use parking_lot::{Condvar, Mutex};

/// Counting lock limiting how many jobs run a phase at once.
#[derive(Debug)]
pub struct AdmissionGate {
    name: &'static str,
    capacity: usize,
    in_use: Mutex<usize>,
    released: Condvar,
}

/// Held slot; released on drop.
#[derive(Debug)]
pub struct GatePermit<'a> {
    gate: &'a AdmissionGate,
}

impl AdmissionGate {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            capacity: capacity.max(1),
            in_use: Mutex::new(0),
            released: Condvar::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn in_use(&self) -> usize {
        *self.in_use.lock()
    }

    /// Block until a slot is free.
    pub fn acquire(&self) -> GatePermit<'_> {
        let mut in_use = self.in_use.lock();
        while *in_use >= self.capacity {
            self.released.wait(&mut in_use);
        }
        *in_use += 1;
        GatePermit { gate: self }
    }

    pub fn try_acquire(&self) -> Option<GatePermit<'_>> {
        let mut in_use = self.in_use.lock();
        if *in_use >= self.capacity {
            return None;
        }
        *in_use += 1;
        Some(GatePermit { gate: self })
    }

    fn release(&self) {
        let mut in_use = self.in_use.lock();
        *in_use = in_use.saturating_sub(1);
        self.released.notify_one();
    }
}

impl Drop for GatePermit<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}

/// The two gates of one worker instance.
#[derive(Debug)]
pub struct Admission {
    pub extraction: AdmissionGate,
    pub dubbing: AdmissionGate,
}

impl Admission {
    pub fn new() -> Self {
        Self {
            extraction: AdmissionGate::new("extraction", 1),
            dubbing: AdmissionGate::new("dubbing", 1),
        }
    }
}

impl Default for Admission {
    fn default() -> Self {
        Self::new()
    }
}
