cfg_if::cfg_if! {
    if #[cfg(target_arch = "aarch64")] {
        #[path = "arch/aarch64/mod.rs"]
        mod arch;
    } else {
        compile_error!("bare-metal ivy-hal only supports aarch64");
    }
}

use crate::config::{HalConfig, HAL_CONFIG};

/// Initialize the HAL.
///
/// Must be called once by the boot core before any console output.
pub fn init(config: HalConfig) {
    HAL_CONFIG.call_once(|| config);
    arch::init();
}
