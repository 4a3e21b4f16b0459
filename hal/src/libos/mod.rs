//! Host backend: every simulated core is a thread.

pub mod cpu;
mod serial;
mod timer;

use crate::config::{HalConfig, HAL_CONFIG};

/// Initialize the HAL. Later calls are ignored.
pub fn init(config: HalConfig) {
    HAL_CONFIG.call_once(|| config);
}

hal_fn_impl! {
    impl mod crate::hal_fn::vm {}
}
