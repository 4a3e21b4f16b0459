/// A wake/sleep pair used by spinning waiters.
///
/// `wait` may return spuriously; callers always re-check their condition.
/// `signal` wakes every core currently in `wait`.
pub trait WaitEvent {
    fn wait();
    fn signal();
}

/// Busy-waits. Works everywhere.
pub struct SpinEvent;

impl WaitEvent for SpinEvent {
    #[inline(always)]
    fn wait() {
        core::hint::spin_loop();
    }

    #[inline(always)]
    fn signal() {}
}

/// Sleeps in `wfe` and wakes with `sev`.
#[cfg(target_arch = "aarch64")]
pub struct WfeEvent;

#[cfg(target_arch = "aarch64")]
impl WaitEvent for WfeEvent {
    #[inline(always)]
    fn wait() {
        cortex_a::asm::wfe();
    }

    #[inline(always)]
    fn signal() {
        cortex_a::asm::sev();
    }
}

cfg_if::cfg_if! {
    if #[cfg(all(target_arch = "aarch64", target_os = "none"))] {
        pub type DefaultEvent = WfeEvent;
    } else {
        pub type DefaultEvent = SpinEvent;
    }
}
