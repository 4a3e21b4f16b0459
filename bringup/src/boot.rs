//! What every core does between reset and halt.

use crate::platform::{BOOT_CPU, CPU_ID_MAP, NR_CPUS, PLATFORM};
use crate::xrt::{cpu_barrier_wait, exit_code, xrt_exit, xrt_putchar};

/// End-of-transmission, tells the runner the console is done.
const EOT: u8 = 0x04;

/// Runs on the boot core. `start_secondaries` must make every other core
/// enter [`secondary_main`].
pub fn primary_main(start_secondaries: impl FnOnce(), xmain: fn()) {
    println!("Copyright (c) The ivy bring-up authors");
    println!("$START$");
    info!("platform {}, {} cores", PLATFORM, NR_CPUS);

    start_secondaries();
    cpu_barrier_wait();
    xmain();
    cpu_barrier_wait();

    println!("$PASSED$");
    xrt_putchar(EOT);
}

pub fn secondary_main(xmain: fn()) {
    cpu_barrier_wait();
    xmain();
    cpu_barrier_wait();
}

/// Power on every core other than the boot core at `entry`.
pub fn bringup_secondary_cpus(entry: usize) {
    for (core, &hw_id) in CPU_ID_MAP.iter().enumerate() {
        if core == BOOT_CPU {
            continue;
        }
        debug!("cpu_on {} (mpidr {:#x}) @ {:#x}", core, hw_id, entry);
        if let Err(e) = ivy_hal::cpu::cpu_on(hw_id, entry) {
            error!("failed to start cpu {}: {:?}", core, e);
            xrt_exit(exit_code::CPU_ON);
        }
    }
}
