//! A software model of ECAM configuration space.
//!
//! Functions keep a 256-byte header with per-bit write masks, so BAR sizing
//! behaves as on hardware. A bus other than 0 is reachable only through a
//! bridge whose programmed secondary..subordinate range covers it.

use alloc::vec::Vec;
use spin::Mutex;

use crate::config::ConfigSpace;

const CONFIG_DWORDS: usize = 64;
const BAR_DWORD: usize = 4;
const BUS_NUMBERS_DWORD: usize = 6;

/// How one BAR slot answers a sizing probe. Sizes are powers of two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBar {
    Io { size: u32 },
    Mem32 { size: u32, prefetch: bool },
    /// Occupies this slot and the next.
    Mem64 { size: u64, prefetch: bool },
    /// Arbitrary writable and hard-wired bits.
    Raw { writable: u32, fixed: u32 },
}

#[derive(Debug, Clone)]
pub struct MockFunction {
    devfn: u8,
    regs: [u32; CONFIG_DWORDS],
    writable: [u32; CONFIG_DWORDS],
    downstream: Option<MockBus>,
}

impl MockFunction {
    fn new(devfn: u8, vendor: u16, device: u16, class: u32, header_type: u8) -> Self {
        let mut regs = [0; CONFIG_DWORDS];
        let mut writable = [0; CONFIG_DWORDS];
        regs[0] = vendor as u32 | (device as u32) << 16;
        // command
        writable[1] = 0x0000_ffff;
        regs[2] = class << 8;
        regs[3] = (header_type as u32) << 16;
        Self {
            devfn,
            regs,
            writable,
            downstream: None,
        }
    }

    /// A type 0 function with no BARs.
    pub fn endpoint(devfn: u8, vendor: u16, device: u16, class: u32) -> Self {
        Self::new(devfn, vendor, device, class, 0x00)
    }

    /// A PCI-to-PCI bridge leading to `downstream`.
    pub fn bridge(devfn: u8, vendor: u16, device: u16, downstream: MockBus) -> Self {
        let mut f = Self::new(devfn, vendor, device, 0x06_04_00, 0x01);
        f.writable[BUS_NUMBERS_DWORD] = 0x00ff_ffff;
        // I/O base and limit bytes
        f.writable[7] = 0x0000_ffff;
        // memory, prefetchable and I/O upper windows
        for w in &mut f.writable[8..=12] {
            *w = !0;
        }
        f.downstream = Some(downstream);
        f
    }

    pub fn with_revision(mut self, revision: u8) -> Self {
        self.regs[2] = (self.regs[2] & !0xff) | revision as u32;
        self
    }

    /// Override the raw header type byte.
    pub fn with_header_type(mut self, header_type: u8) -> Self {
        self.regs[3] = (self.regs[3] & !0x00ff_0000) | (header_type as u32) << 16;
        self
    }

    pub fn with_bar(mut self, index: usize, bar: MockBar) -> Self {
        let i = BAR_DWORD + index;
        match bar {
            MockBar::Io { size } => {
                self.regs[i] = 0x1;
                self.writable[i] = !(size - 1) & !0x3;
            }
            MockBar::Mem32 { size, prefetch } => {
                self.regs[i] = if prefetch { 0x8 } else { 0x0 };
                self.writable[i] = !(size - 1) & !0xf;
            }
            MockBar::Mem64 { size, prefetch } => {
                let mask = !(size - 1);
                self.regs[i] = 0x4 | if prefetch { 0x8 } else { 0x0 };
                self.writable[i] = mask as u32 & !0xf;
                self.regs[i + 1] = 0;
                self.writable[i + 1] = (mask >> 32) as u32;
            }
            MockBar::Raw { writable, fixed } => {
                self.regs[i] = fixed;
                self.writable[i] = writable;
            }
        }
        self
    }

    fn read(&self, offset: usize, width: usize) -> u32 {
        if offset >= CONFIG_DWORDS * 4 {
            return 0;
        }
        let shift = (offset & 3) * 8;
        (self.regs[offset >> 2] >> shift) & width_mask(width)
    }

    fn write(&mut self, offset: usize, width: usize, val: u32) {
        if offset >= CONFIG_DWORDS * 4 {
            return;
        }
        let i = offset >> 2;
        let shift = (offset & 3) * 8;
        let w = self.writable[i] & (width_mask(width) << shift);
        self.regs[i] = (self.regs[i] & !w) | ((val << shift) & w);
    }

    /// Programmed `(secondary, subordinate)` bus numbers.
    fn bus_range(&self) -> (u8, u8) {
        let r = self.regs[BUS_NUMBERS_DWORD];
        ((r >> 8) as u8, (r >> 16) as u8)
    }
}

fn width_mask(width: usize) -> u32 {
    match width {
        1 => 0xff,
        2 => 0xffff,
        _ => !0,
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockBus {
    functions: Vec<MockFunction>,
}

impl MockBus {
    pub fn new(functions: Vec<MockFunction>) -> Self {
        Self { functions }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    fn find(&mut self, number: u8, target: u8, devfn: u8) -> Option<&mut MockFunction> {
        if number == target {
            return self.functions.iter_mut().find(|f| f.devfn == devfn);
        }
        for f in self.functions.iter_mut() {
            let (secondary, subordinate) = f.bus_range();
            if let Some(downstream) = f.downstream.as_mut() {
                if secondary > number && secondary <= target && target <= subordinate {
                    return downstream.find(secondary, target, devfn);
                }
            }
        }
        None
    }
}

/// Configuration space of one simulated host controller.
pub struct MockEcam {
    root: Mutex<MockBus>,
}

impl MockEcam {
    pub fn new(root: MockBus) -> Self {
        Self {
            root: Mutex::new(root),
        }
    }

    fn with_function<R>(&self, bus: u8, devfn: u8, f: impl FnOnce(&mut MockFunction) -> R) -> Option<R> {
        self.root.lock().find(0, bus, devfn).map(f)
    }

    /// Whole header of a reachable function.
    pub fn header(&self, bus: u8, devfn: u8) -> Option<[u32; CONFIG_DWORDS]> {
        self.with_function(bus, devfn, |f| f.regs)
    }
}

impl ConfigSpace for MockEcam {
    fn read8(&self, bus: u8, devfn: u8, offset: usize) -> u8 {
        self.with_function(bus, devfn, |f| f.read(offset, 1))
            .unwrap_or(!0) as u8
    }
    fn read16(&self, bus: u8, devfn: u8, offset: usize) -> u16 {
        self.with_function(bus, devfn, |f| f.read(offset, 2))
            .unwrap_or(!0) as u16
    }
    fn read32(&self, bus: u8, devfn: u8, offset: usize) -> u32 {
        self.with_function(bus, devfn, |f| f.read(offset, 4))
            .unwrap_or(!0)
    }
    fn write8(&self, bus: u8, devfn: u8, offset: usize, val: u8) {
        self.with_function(bus, devfn, |f| f.write(offset, 1, val as u32));
    }
    fn write16(&self, bus: u8, devfn: u8, offset: usize, val: u16) {
        self.with_function(bus, devfn, |f| f.write(offset, 2, val as u32));
    }
    fn write32(&self, bus: u8, devfn: u8, offset: usize, val: u32) {
        self.with_function(bus, devfn, |f| f.write(offset, 4, val));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn absent_reads_all_ones() {
        let ecam = MockEcam::new(MockBus::empty());
        assert_eq!(ecam.read32(0, 0, 0), 0xffff_ffff);
        assert_eq!(ecam.read16(0, 8, 2), 0xffff);
        ecam.write32(0, 0, 0x10, 0);
    }

    #[test]
    fn bar_sizing_semantics() {
        let ecam = MockEcam::new(MockBus::new(vec![MockFunction::endpoint(0, 0x1234, 0x1, 0)
            .with_bar(0, MockBar::Mem32 { size: 0x4000, prefetch: true })
            .with_bar(1, MockBar::Io { size: 0x20 })]));
        ecam.write32(0, 0, 0x10, !0);
        assert_eq!(ecam.read32(0, 0, 0x10), 0xffff_c008);
        ecam.write32(0, 0, 0x14, !0);
        assert_eq!(ecam.read32(0, 0, 0x14), 0xffff_ffe1);
        // unimplemented BAR
        ecam.write32(0, 0, 0x18, !0);
        assert_eq!(ecam.read32(0, 0, 0x18), 0);
    }

    #[test]
    fn read_only_identity() {
        let ecam = MockEcam::new(MockBus::new(vec![
            MockFunction::endpoint(8, 0x1af4, 0x1001, 0x01_00_00).with_revision(3),
        ]));
        ecam.write32(0, 8, 0, 0);
        assert_eq!(ecam.read16(0, 8, 0), 0x1af4);
        assert_eq!(ecam.read16(0, 8, 2), 0x1001);
        assert_eq!(ecam.read8(0, 8, 8), 3);
        assert_eq!(ecam.read32(0, 8, 8) >> 8, 0x01_00_00);
        ecam.write16(0, 8, 4, 0x7);
        assert_eq!(ecam.read16(0, 8, 4), 0x7);
    }

    #[test]
    fn bridge_routing_follows_bus_numbers() {
        let below = MockBus::new(vec![MockFunction::endpoint(0, 0x1b36, 0x10, 0)]);
        let ecam = MockEcam::new(MockBus::new(vec![MockFunction::bridge(
            8, 0x1b36, 0x1, below,
        )]));
        // not routed until the bridge is numbered
        assert_eq!(ecam.read32(1, 0, 0), !0);
        ecam.write32(0, 8, 0x18, 0x00ff_0100);
        assert_eq!(ecam.read16(1, 0, 0), 0x1b36);
        ecam.write8(0, 8, 0x1a, 1);
        assert_eq!(ecam.read16(1, 0, 0), 0x1b36);
        assert_eq!(ecam.read32(2, 0, 0), !0);
    }
}
