//! Constants of the platform selected at build time (`IVY_PLATFORM`).

use ivy_hal::{HalConfig, PsciConduit};
use ivy_pci::PciHostConfig;

include!(concat!(env!("OUT_DIR"), "/platform.rs"));

/// HAL configuration of this platform.
pub const fn hal_config() -> HalConfig {
    HalConfig::new(UART_BASE, PSCI_CONDUIT)
}
