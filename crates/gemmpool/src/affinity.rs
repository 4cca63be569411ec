//! Worker-to-core placement.

use crate::N_CORES;
use std::thread;

/// Logical core count, falling back to the default when detection fails.
pub(crate) fn core_count() -> usize {
    thread::available_parallelism().map_or(N_CORES, std::num::NonZeroUsize::get)
}

/// Pins the calling thread to one logical core.
#[cfg(target_os = "linux")]
pub(crate) fn pin_current_thread(core: usize) {
    // Safety: cpu_set_t is a plain bitmask; sched_setaffinity on the calling
    // thread (pid 0) cannot invalidate any Rust state. A failed call leaves
    // the thread unpinned, which is acceptable.
    unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut set);
        libc::CPU_SET(core, &mut set);
        libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set);
    }
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn pin_current_thread(_core: usize) {}
