//! Platform abstraction for the bring-up diagnostics.
//!
//! Every platform service the diagnostics need is declared once in
//! [`hal_fn`] and implemented by exactly one backend:
//!
//! - `bare`: AArch64 without an OS (`target_os = "none"`).
//! - `libos`: the host, where every core is a thread. Used by tests.

#![cfg_attr(not(feature = "libos"), no_std)]
#![deny(warnings)]

#[cfg_attr(not(feature = "libos"), macro_use)]
extern crate log;

#[macro_use]
mod macros;

mod common;
mod config;
mod hal_fn;

cfg_if::cfg_if! {
    if #[cfg(feature = "libos")] {
        #[path = "libos/mod.rs"]
        mod imp;
    } else {
        #[path = "bare/mod.rs"]
        mod imp;
    }
}

pub use common::console;
pub use config::{HalConfig, PsciConduit};
pub use hal_fn::{cpu, timer, vm};
pub use imp::init;

#[cfg(feature = "libos")]
pub use imp::cpu::bind_cpu_id;

/// The error type which is returned from HAL functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalError {
    /// The firmware rejected the request (PSCI status code).
    Firmware(i32),
    /// The platform has no implementation of the request.
    NotSupported,
}

/// The result type returned by HAL functions.
pub type HalResult<T = ()> = core::result::Result<T, HalError>;
