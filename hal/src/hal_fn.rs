use core::time::Duration;

use crate::HalResult;

hal_fn_def! {
    pub mod cpu {
        /// Current CPU ID.
        pub fn cpu_id() -> usize { 0 }

        /// Start core `cpu` at physical address `entry`; the core receives
        /// `cpu` as its first argument.
        pub fn cpu_on(cpu: usize, entry: usize) -> HalResult;

        /// Stop the calling core and report `code` to whoever watches the
        /// machine. Does not return on bare metal.
        pub fn halt(code: usize);
    }

    pub mod vm {
        /// Build identity page tables for the calling platform. Memory in
        /// `normal_start..normal_end` is cacheable, everything else is
        /// device memory. Run once, on the boot core, before other cores
        /// are started.
        pub fn vm_init(normal_start: usize, normal_end: usize) -> HalResult { Ok(()) }

        /// Turn on translation and caches on the calling core with the
        /// tables built by `vm_init`.
        pub fn vm_enable() {}
    }

    pub mod timer {
        /// Get current time.
        pub fn timer_now() -> Duration;
    }

    pub(crate) mod serial {
        /// Write one byte to the console sink.
        pub fn serial_put(c: u8);
    }
}
