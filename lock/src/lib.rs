//! Synchronization between cores that have no scheduler to block on.

#![cfg_attr(not(test), no_std)]
#![deny(warnings)]

mod barrier;
mod event;

pub use barrier::{CpuBarrier, DEFAULT_CEILING};
pub use event::{DefaultEvent, SpinEvent, WaitEvent};

#[cfg(target_arch = "aarch64")]
pub use event::WfeEvent;
