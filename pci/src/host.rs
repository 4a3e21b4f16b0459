/// One PCI host controller, as described by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PciHostConfig {
    pub name: &'static str,
    /// ECAM window base.
    pub cfg_base: usize,
    /// First address handed out from each pool.
    pub io_base: u64,
    pub mem32_base: u64,
    pub mem64_base: u64,
}

impl PciHostConfig {
    pub const fn new(
        name: &'static str,
        cfg_base: usize,
        io_base: u64,
        mem32_base: u64,
        mem64_base: u64,
    ) -> Self {
        Self {
            name,
            cfg_base,
            io_base,
            mem32_base,
            mem64_base,
        }
    }
}
