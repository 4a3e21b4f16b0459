//! The runtime services a diagnostic program sees.

use core::mem;

use ivy_lock::CpuBarrier;
use spin::Mutex;

use crate::platform::{CPU_ID_MAP, NR_CPUS};

/// Codes a core reports when it halts.
pub mod halt_code {
    pub const OK: usize = 0;
    pub const ILLEGAL_MPIDR: usize = 1;
    /// The core cannot translate with 4 KiB pages.
    pub const PT_GRAN_UNSUPPORTED: usize = 2;
    /// Base of the codes passed to [`super::xrt_exit`].
    pub const USER: usize = 1000;
}

/// Codes the harness itself passes to [`xrt_exit`].
pub mod exit_code {
    pub const PCI_PROBE: usize = 1;
    pub const CPU_ON: usize = 2;
    pub const PANIC: usize = 3;
}

static BARRIER: CpuBarrier = CpuBarrier::new(NR_CPUS);

/// Held forever by the first core to fail.
static EXIT_LOCK: Mutex<()> = Mutex::new(());

/// Block until every core of the platform has called this the same number
/// of times.
pub fn cpu_barrier_wait() {
    BARRIER.wait();
}

/// Index of the calling core in the platform's CPU map.
///
/// A core missing from the map halts with [`halt_code::ILLEGAL_MPIDR`].
pub fn xrt_get_core_id() -> usize {
    let hw_id = ivy_hal::cpu::cpu_id();
    match CPU_ID_MAP.iter().position(|&id| id & 0xff == hw_id) {
        Some(core) => core,
        None => halt(halt_code::ILLEGAL_MPIDR),
    }
}

pub fn xrt_putchar(c: u8) {
    ivy_hal::console::console_putchar(c);
}

/// Report failure and stop the calling core.
///
/// Only the first failing core reports; later ones block on the exit lock
/// so the runner sees a single `$FAILED$`.
pub fn xrt_exit(code: usize) -> ! {
    mem::forget(EXIT_LOCK.lock());
    println!("halt code: {}", code);
    println!("$FAILED$");
    halt(halt_code::USER + code)
}

/// Stop the calling core with `code`.
pub fn halt(code: usize) -> ! {
    ivy_hal::cpu::halt(code);
    #[allow(clippy::empty_loop)]
    loop {}
}
