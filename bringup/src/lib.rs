//! Bring-up harness shared by every diagnostic program.
//!
//! The primary core starts the others, all cores meet at
//! [`xrt::cpu_barrier_wait`], run the program, meet again and halt. Status
//! markers (`$START$`, `$PASSED$`, `$FAILED$`) go to the console for the
//! test runner watching it.

#![cfg_attr(target_os = "none", no_std)]
#![deny(warnings)]

extern crate alloc;
#[macro_use]
extern crate log;

#[macro_use]
pub mod logging;

pub mod boot;
pub mod pci;
pub mod platform;
pub mod program;
pub mod xrt;

#[cfg(not(target_os = "none"))]
pub mod sim;
