#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]
#![deny(warnings)]

#[cfg(target_os = "none")]
#[macro_use]
extern crate log;

#[cfg(target_os = "none")]
mod entry;
#[cfg(target_os = "none")]
mod lang;

#[cfg(not(target_os = "none"))]
fn main() {
    use ivy_bringup::platform::{hal_config, BOOT_CPU, CPU_ID_MAP, LOG_LEVEL, NR_CPUS};
    use ivy_bringup::{boot, logging, program};
    use std::thread;

    ivy_hal::init(hal_config());
    logging::init(LOG_LEVEL);

    let mut secondaries = Vec::new();
    ivy_hal::bind_cpu_id(CPU_ID_MAP[BOOT_CPU] & 0xff);
    boot::primary_main(
        || {
            for core in (0..NR_CPUS).filter(|&c| c != BOOT_CPU) {
                secondaries.push(thread::spawn(move || {
                    ivy_hal::bind_cpu_id(CPU_ID_MAP[core] & 0xff);
                    boot::secondary_main(program::xmain);
                }));
            }
        },
        program::xmain,
    );
    for t in secondaries {
        let _ = t.join();
    }
}
