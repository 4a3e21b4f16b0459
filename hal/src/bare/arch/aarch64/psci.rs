//! Power State Coordination Interface calls.

use core::arch::asm;
use numeric_enum_macro::numeric_enum;

use crate::config::{hal_config, PsciConduit};
use crate::{HalError, HalResult};

numeric_enum! {
    #[repr(usize)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum PsciFunction {
        CpuOn = 0xC400_0003,
        CpuOff = 0x8400_0002,
    }
}

const PSCI_SUCCESS: i32 = 0;
const PSCI_ALREADY_ON: i32 = -4;

/// Issue a PSCI call with three arguments through the configured conduit.
pub fn call(func: PsciFunction, arg0: usize, arg1: usize, arg2: usize) -> HalResult {
    let conduit = hal_config()
        .map(|c| c.psci_conduit)
        .ok_or(HalError::NotSupported)?;
    let mut ret = func as usize;
    unsafe {
        match conduit {
            PsciConduit::Hvc => asm!(
                "hvc #0",
                inout("x0") ret,
                in("x1") arg0,
                in("x2") arg1,
                in("x3") arg2,
            ),
            PsciConduit::Smc => asm!(
                "smc #0",
                inout("x0") ret,
                in("x1") arg0,
                in("x2") arg1,
                in("x3") arg2,
            ),
        }
    }
    match ret as i32 {
        PSCI_SUCCESS | PSCI_ALREADY_ON => Ok(()),
        err => Err(HalError::Firmware(err)),
    }
}
