//! ARM Generic Timer.

use core::time::Duration;
use cortex_a::{asm::barrier, registers::*};
use tock_registers::interfaces::Readable;

hal_fn_impl! {
    impl mod crate::hal_fn::timer {
        fn timer_now() -> Duration {
            unsafe { barrier::isb(barrier::SY) }
            let cnt = CNTPCT_EL0.get() as u128 * 1_000_000_000;
            let freq = CNTFRQ_EL0.get() as u128;
            Duration::from_nanos((cnt / freq) as u64)
        }
    }
}
