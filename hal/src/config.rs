//! Platform configuration handed to [`crate::init()`].

/// How PSCI calls reach the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsciConduit {
    /// `hvc #0`, firmware runs at EL2 (e.g. QEMU `virt` without EL3).
    Hvc,
    /// `smc #0`, firmware runs at EL3.
    Smc,
}

/// Platform configuration passed by the harness when it calls [`crate::init()`].
#[derive(Debug, Clone, Copy)]
pub struct HalConfig {
    /// Physical base of the PL011 used as the console byte sink.
    pub uart_base: usize,
    pub psci_conduit: PsciConduit,
}

impl HalConfig {
    pub const fn new(uart_base: usize, psci_conduit: PsciConduit) -> Self {
        Self {
            uart_base,
            psci_conduit,
        }
    }
}

pub(crate) static HAL_CONFIG: spin::Once<HalConfig> = spin::Once::new();

/// The configuration recorded by [`crate::init()`], if any.
#[cfg_attr(feature = "libos", allow(dead_code))]
pub(crate) fn hal_config() -> Option<&'static HalConfig> {
    HAL_CONFIG.get()
}
