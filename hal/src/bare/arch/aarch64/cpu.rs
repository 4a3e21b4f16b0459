//! CPU information and control.

use cortex_a::{asm, registers::*};
use tock_registers::interfaces::Readable;

use super::psci::{self, PsciFunction};
use crate::HalResult;

hal_fn_impl! {
    impl mod crate::hal_fn::cpu {
        fn cpu_id() -> usize {
            // Aff0 of a flat cluster.
            (MPIDR_EL1.get() & 0xff) as usize
        }

        fn cpu_on(cpu: usize, entry: usize) -> HalResult {
            psci::call(PsciFunction::CpuOn, cpu, entry, cpu)
        }

        fn halt(code: usize) {
            warn!("cpu {} halted with code {}", MPIDR_EL1.get() & 0xff, code);
            // Only returns if the firmware refuses; park the core then.
            let _ = psci::call(PsciFunction::CpuOff, 0, 0, 0);
            loop {
                asm::wfe();
            }
        }
    }
}
