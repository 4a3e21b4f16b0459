//! A simulated host controller laid out like QEMU `virt` with an NVMe
//! controller and a ZNI accelerator behind a root port.

use ivy_pci::mock::{MockBar, MockBus, MockEcam, MockFunction};
use ivy_pci::PciHostConfig;
use spin::Once;

pub static SIM_HOST: PciHostConfig =
    PciHostConfig::new("sim-pcie", 0, 0x1000, 0x1000_0000, 0x80_0000_0000);

const fn devfn(slot: u8, function: u8) -> u8 {
    slot << 3 | function
}

fn sim_bus() -> MockBus {
    let nvme = MockFunction::endpoint(devfn(0, 0), 0x1b36, 0x0010, 0x01_08_02)
        .with_revision(2)
        .with_bar(0, MockBar::Mem64 { size: 0x4000, prefetch: false });
    let zni = MockFunction::endpoint(devfn(1, 0), 0x1619, 0x6669, 0x12_00_00)
        .with_bar(0, MockBar::Mem32 { size: 0x10_0000, prefetch: false })
        .with_bar(2, MockBar::Mem64 { size: 0x20_0000, prefetch: true });
    MockBus::new(vec![
        // host bridge
        MockFunction::endpoint(devfn(0, 0), 0x1b36, 0x0008, 0x06_00_00),
        MockFunction::endpoint(devfn(1, 0), 0x1af4, 0x1000, 0x02_00_00)
            .with_revision(1)
            .with_bar(0, MockBar::Io { size: 0x20 })
            .with_bar(1, MockBar::Mem32 { size: 0x1000, prefetch: false })
            .with_bar(4, MockBar::Mem64 { size: 0x4000, prefetch: true }),
        MockFunction::bridge(devfn(2, 0), 0x1b36, 0x000c, MockBus::new(vec![nvme, zni])),
    ])
}

/// Configuration space of [`SIM_HOST`], built on first use.
pub fn sim_ecam() -> &'static MockEcam {
    static ECAM: Once<MockEcam> = Once::new();
    ECAM.call_once(|| MockEcam::new(sim_bus()))
}
