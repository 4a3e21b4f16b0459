use std::cell::Cell;

use crate::{HalError, HalResult};

thread_local! {
    static CPU_ID: Cell<usize> = Cell::new(0);
}

/// Make the calling thread report `id` from [`crate::cpu::cpu_id`].
pub fn bind_cpu_id(id: usize) {
    CPU_ID.with(|c| c.set(id));
}

hal_fn_impl! {
    impl mod crate::hal_fn::cpu {
        fn cpu_id() -> usize {
            CPU_ID.with(|c| c.get())
        }

        fn cpu_on(_cpu: usize, _entry: usize) -> HalResult {
            // Spawn a thread and call `bind_cpu_id` instead.
            Err(HalError::NotSupported)
        }

        fn halt(code: usize) {
            panic!("halt code: {}", code);
        }
    }
}
