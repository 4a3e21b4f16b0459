//! Depth-first bus walk: discovery, BAR assignment and bridge windows.

use bitflags::bitflags;

use crate::config::{ConfigSpace, PciReg16, PciReg32, PciReg8};
use crate::error::{PciError, PciResult};
use crate::host::PciHostConfig;
use crate::model::{BusId, DeviceId, HeaderType, PciTopology, RootId};
use crate::resource::{
    decode_bar, pci_size, AddressAllocator, ResourceFlags, ResourceKind, ResourceRange,
    IO_SPACE_LIMIT, PCI_BASE_ADDRESS_IO_MASK, PCI_BASE_ADDRESS_MEM_MASK,
};
use crate::PCI_NUM_BARS;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct PciCommand: u16 {
        const IO = 0x1;
        const MEMORY = 0x2;
        const MASTER = 0x4;
    }
}

/// Bridge I/O windows are 4 KiB granular.
const IO_WINDOW_ALIGN: u64 = 1 << 12;
/// Bridge memory windows are 1 MiB granular.
const MEM_WINDOW_ALIGN: u64 = 1 << 20;

const PCI_IO_RANGE_MASK: u64 = 0xf0;
const BRIDGE_BAR_SLOTS: usize = 2;

/// State of one probe pass over one host controller.
struct EnumerationContext<'a, C: ConfigSpace + ?Sized> {
    topo: &'a mut PciTopology,
    cfg: &'a C,
    /// Highest bus number handed out so far.
    busnr_max: u8,
    alloc: AddressAllocator,
}

impl PciTopology {
    /// Enumerate and configure everything below `host`.
    ///
    /// Bus numbers and addresses are assigned in discovery order, so a
    /// second pass over the same hardware reprograms it identically.
    pub fn probe_host<C: ConfigSpace + ?Sized>(
        &mut self,
        host: &PciHostConfig,
        cfg: &C,
    ) -> PciResult<RootId> {
        info!("probe pci host {} @ {:#x}", host.name, host.cfg_base);
        let root = self.alloc_root(*host)?;
        let root_bus = self.root(root).bus;
        let mut ctx = EnumerationContext {
            topo: self,
            cfg,
            busnr_max: 0,
            alloc: AddressAllocator::new(host.io_base, host.mem32_base, host.mem64_base),
        };
        ctx.scan_child_bus(root_bus)?;
        let busnr_max = ctx.busnr_max;
        self.bus_mut(root_bus).subordinate = busnr_max;
        Ok(root)
    }
}

impl<'a, C: ConfigSpace + ?Sized> EnumerationContext<'a, C> {
    fn location(&self, dev: DeviceId) -> (u8, u8) {
        let d = self.topo.device(dev);
        (d.bus_number, d.devfn)
    }

    fn read8(&self, dev: DeviceId, reg: usize) -> u8 {
        let (bus, devfn) = self.location(dev);
        self.cfg.read8(bus, devfn, reg)
    }

    fn read32(&self, dev: DeviceId, reg: usize) -> u32 {
        let (bus, devfn) = self.location(dev);
        self.cfg.read32(bus, devfn, reg)
    }

    fn write8(&self, dev: DeviceId, reg: usize, val: u8) {
        let (bus, devfn) = self.location(dev);
        self.cfg.write8(bus, devfn, reg, val)
    }

    fn write16(&self, dev: DeviceId, reg: usize, val: u16) {
        let (bus, devfn) = self.location(dev);
        self.cfg.write16(bus, devfn, reg, val)
    }

    fn write32(&self, dev: DeviceId, reg: usize, val: u32) {
        let (bus, devfn) = self.location(dev);
        self.cfg.write32(bus, devfn, reg, val)
    }

    /// Discover function 0 of every slot on `bus`, then descend into the
    /// bridges among them.
    fn scan_child_bus(&mut self, bus: BusId) -> PciResult {
        let number = self.topo.bus(bus).number;
        for devfn in (0..=u8::MAX).step_by(8) {
            let id = self.cfg.read32(number, devfn, PciReg32::VendorDevice as usize);
            let (vendor, device) = (id as u16, (id >> 16) as u16);
            if vendor == 0xffff || device == 0xffff {
                continue;
            }
            let dev = self.topo.alloc_device(bus, devfn)?;
            self.setup_device(dev)?;
        }

        let count = self.topo.bus(bus).devices.len();
        for i in 0..count {
            let dev = self.topo.bus(bus).devices[i];
            let d = self.topo.device(dev);
            info!(
                "device {:#x}, vendor {:#x}, class {:#x}, header {:#x}, devfn {:#x}",
                d.device, d.vendor, d.class, d.header_type, d.devfn
            );
            if d.is_bridge() {
                self.scan_bridge(bus, dev)?;
            }
        }
        Ok(())
    }

    fn setup_device(&mut self, dev: DeviceId) -> PciResult {
        let id = self.read32(dev, PciReg32::VendorDevice as usize);
        let class_rev = self.read32(dev, PciReg32::ClassRevision as usize);
        let header_type = self.read8(dev, PciReg8::HeaderType as usize);
        let d = self.topo.device_mut(dev);
        d.vendor = id as u16;
        d.device = (id >> 16) as u16;
        d.revision = class_rev as u8;
        d.class = class_rev >> 8;
        d.header_type = header_type;

        let bars = match d.header_kind() {
            Some(HeaderType::Normal) => PCI_NUM_BARS,
            Some(HeaderType::Bridge) | Some(HeaderType::CardBus) => BRIDGE_BAR_SLOTS,
            None => 0,
        };
        self.config_bases(dev, bars)?;

        let cmd = PciCommand::IO | PciCommand::MEMORY | PciCommand::MASTER;
        self.write16(dev, PciReg16::Command as usize, cmd.bits());
        Ok(())
    }

    fn config_bases(&mut self, dev: DeviceId, howmany: usize) -> PciResult {
        let mut pos = 0;
        while pos < howmany {
            let reg = PciReg32::BARBase as usize + (pos << 2);
            let res = self.config_base(dev, reg, pos + 1 < howmany)?;
            self.topo.device_mut(dev).resources[pos] = res;
            pos += if res.flags.contains(ResourceFlags::MEM_64) {
                2
            } else {
                1
            };
        }
        Ok(())
    }

    /// Write all-ones to a BAR, read back the writable bits, put the old
    /// value back.
    fn probe_bar(&self, dev: DeviceId, reg: usize) -> u32 {
        let orig = self.read32(dev, reg);
        self.write32(dev, reg, !0);
        let sz = self.read32(dev, reg);
        self.write32(dev, reg, orig);
        sz
    }

    /// Size the BAR at `reg` and assign it an address from the matching
    /// pool. `has_upper` tells whether the following slot may hold the high
    /// half of a 64-bit BAR.
    fn config_base(&mut self, dev: DeviceId, reg: usize, has_upper: bool) -> PciResult<ResourceRange> {
        let sz = self.probe_bar(dev, reg);
        let flags = decode_bar(sz) | ResourceFlags::SIZEALIGN;
        let (mut sz64, mut mask64) = if flags.contains(ResourceFlags::IO) {
            (
                (sz & PCI_BASE_ADDRESS_IO_MASK) as u64,
                (PCI_BASE_ADDRESS_IO_MASK & IO_SPACE_LIMIT) as u64,
            )
        } else {
            (
                (sz & PCI_BASE_ADDRESS_MEM_MASK) as u64,
                PCI_BASE_ADDRESS_MEM_MASK as u64,
            )
        };

        let (bus, devfn) = self.location(dev);
        if flags.contains(ResourceFlags::MEM_64) {
            if !has_upper {
                return Err(PciError::Bar64InLastSlot { bus, devfn, reg });
            }
            sz64 |= (self.probe_bar(dev, reg + 4) as u64) << 32;
            mask64 |= !0u64 << 32;
        }

        if sz64 == 0 {
            return Ok(ResourceRange::default());
        }
        let size = pci_size(sz64, mask64);
        if size == 0 {
            return Err(PciError::InvalidBar { bus, devfn, reg });
        }

        let kind = ResourceKind::of(flags).ok_or(PciError::InvalidBar { bus, devfn, reg })?;
        let start = self.alloc.allocate(kind, size)?;
        self.write32(dev, reg, start as u32);
        if kind == ResourceKind::Mem64 {
            self.write32(dev, reg + 4, (start >> 32) as u32);
        }
        let end = start + (size - 1);
        debug!(
            "{:02x}:{:02x}.{} reg {:#x}: {:?} [{:#x}-{:#x}]",
            bus,
            devfn >> 3,
            devfn & 7,
            reg,
            kind,
            start,
            end
        );
        Ok(ResourceRange { start, end, flags })
    }

    /// Number the bus behind `bridge`, scan it, and open the bridge's
    /// windows over whatever was assigned below it.
    fn scan_bridge(&mut self, parent: BusId, bridge: DeviceId) -> PciResult {
        let primary = self.topo.bus(parent).number;
        let number = self
            .busnr_max
            .checked_add(1)
            .ok_or(PciError::BusNumberOverflow)?;
        self.busnr_max = number;
        let child = self.topo.alloc_child_bus(parent, bridge, number)?;

        // Subordinate stays wide open until the buses below are numbered.
        let buses = primary as u32 | (number as u32) << 8 | 0xff << 16;
        self.write32(bridge, PciReg32::BusNumbers as usize, buses);

        self.alloc.align(ResourceKind::Io, IO_WINDOW_ALIGN)?;
        self.alloc.align(ResourceKind::Mem32, MEM_WINDOW_ALIGN)?;
        self.alloc.align(ResourceKind::Mem64, MEM_WINDOW_ALIGN)?;
        let start = self.alloc;

        self.scan_child_bus(child)?;

        let io = self.window(&start, ResourceKind::Io, IO_WINDOW_ALIGN)?;
        let mem32 = self.window(&start, ResourceKind::Mem32, MEM_WINDOW_ALIGN)?;
        let mem64 = self.window(&start, ResourceKind::Mem64, MEM_WINDOW_ALIGN)?;
        info!("setup bridge, bus id {}", primary);
        info!("io base {:#x} limit {:#x}", io.0, io.1);
        info!("mem32 base {:#x} limit {:#x}", mem32.0, mem32.1);
        info!("mem64 base {:#x} limit {:#x}", mem64.0, mem64.1);

        self.setup_bridge_io(bridge, io);
        self.setup_bridge_mmio(bridge, mem32);
        self.setup_bridge_mmio_64(bridge, mem64);

        self.write8(bridge, PciReg8::SubordinateBusId as usize, self.busnr_max);
        self.topo.bus_mut(child).subordinate = self.busnr_max;
        Ok(())
    }

    /// `(base, limit)` of the window covering everything assigned from
    /// `kind` since `start`, or `(0, 0)` if nothing was.
    fn window(&self, start: &AddressAllocator, kind: ResourceKind, align: u64) -> PciResult<(u64, u64)> {
        let base = start.base(kind);
        let now = self.alloc.base(kind);
        if now <= base {
            return Ok((0, 0));
        }
        let limit = crate::resource::align_up(now, align)? - 1;
        Ok((base, limit))
    }

    fn setup_bridge_io(&self, bridge: DeviceId, (base, limit): (u64, u64)) {
        let io_base_lo = (base >> 8) & PCI_IO_RANGE_MASK;
        let io_limit_lo = (limit >> 8) & PCI_IO_RANGE_MASK;
        let l = (io_limit_lo << 8 | io_base_lo) as u16;
        let io_upper16 = ((limit & 0xffff_0000) | (base >> 16)) as u32;
        // Close the window while the halves are inconsistent.
        self.write32(bridge, PciReg32::IoBaseLimitUpper as usize, 0x0000_ffff);
        self.write16(bridge, PciReg16::IoBaseLimit as usize, l);
        self.write32(bridge, PciReg32::IoBaseLimitUpper as usize, io_upper16);
    }

    fn setup_bridge_mmio(&self, bridge: DeviceId, (base, limit): (u64, u64)) {
        let l = ((base >> 16) & 0xfff0) as u32 | (limit & 0xfff0_0000) as u32;
        self.write32(bridge, PciReg32::MemoryBaseLimit as usize, l);
    }

    fn setup_bridge_mmio_64(&self, bridge: DeviceId, (base, limit): (u64, u64)) {
        self.write32(bridge, PciReg32::PrefetchableMemoryLimitUpper as usize, 0);
        let l = ((base >> 16) & 0xfff0) as u32 | (limit & 0xfff0_0000) as u32;
        self.write32(bridge, PciReg32::PrefetchableMemoryBaseLimit as usize, l);
        self.write32(
            bridge,
            PciReg32::PrefetchableMemoryBaseUpper as usize,
            (base >> 32) as u32,
        );
        self.write32(
            bridge,
            PciReg32::PrefetchableMemoryLimitUpper as usize,
            (limit >> 32) as u32,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockBar, MockBus, MockEcam, MockFunction};
    use crate::model::{Capacity, PciDevice};
    use alloc::vec;
    use alloc::vec::Vec;

    const HOST: PciHostConfig = PciHostConfig::new("mock", 0, 0x1000, 0x1000_0000, 0x80_0000_0000);

    fn mem32(size: u32) -> MockBar {
        MockBar::Mem32 {
            size,
            prefetch: false,
        }
    }

    fn probe(ecam: &MockEcam) -> PciTopology {
        let mut topo = PciTopology::new();
        topo.probe_host(&HOST, ecam).unwrap();
        topo
    }

    /// Bus 0: an endpoint and a bridge; bus 1 behind it: two endpoints.
    fn one_bridge() -> MockEcam {
        let below = MockBus::new(vec![
            MockFunction::endpoint(0x00, 0x1b36, 0x0010, 0x01_08_02)
                .with_bar(0, mem32(0x4000))
                .with_bar(1, MockBar::Io { size: 0x100 }),
            MockFunction::endpoint(0x08, 0x1619, 0x6669, 0x02_00_00).with_bar(
                0,
                MockBar::Mem64 {
                    size: 0x10_0000,
                    prefetch: true,
                },
            ),
        ]);
        MockEcam::new(MockBus::new(vec![
            MockFunction::endpoint(0x00, 0x1b36, 0x0008, 0x06_00_00).with_bar(0, mem32(0x1000)),
            MockFunction::bridge(0x08, 0x1b36, 0x000c, below),
        ]))
    }

    /// Three levels of bridges with devices of every resource kind.
    fn nested() -> MockEcam {
        let bus2 = MockBus::new(vec![
            MockFunction::endpoint(0x00, 0x8086, 0x0001, 0)
                .with_bar(0, mem32(0x200))
                .with_bar(1, MockBar::Io { size: 0x8 }),
            MockFunction::endpoint(0x10, 0x8086, 0x0002, 0).with_bar(
                0,
                MockBar::Mem64 {
                    size: 0x4000_0000,
                    prefetch: false,
                },
            ),
        ]);
        let bus1 = MockBus::new(vec![
            MockFunction::endpoint(0x00, 0x8086, 0x0003, 0)
                .with_bar(0, mem32(0x10_0000))
                .with_bar(
                    2,
                    MockBar::Mem64 {
                        size: 0x1000,
                        prefetch: true,
                    },
                ),
            MockFunction::bridge(0x08, 0x8086, 0x00b0, bus2),
        ]);
        let bus3 = MockBus::new(vec![MockFunction::endpoint(0x00, 0x8086, 0x0004, 0)
            .with_bar(0, MockBar::Io { size: 0x100 })
            .with_bar(1, mem32(0x2000))]);
        MockEcam::new(MockBus::new(vec![
            MockFunction::endpoint(0x00, 0x8086, 0x0005, 0)
                .with_bar(0, mem32(0x1000))
                .with_bar(1, MockBar::Io { size: 0x10 }),
            MockFunction::bridge(0x08, 0x8086, 0x00a0, bus1),
            MockFunction::bridge(0x10, 0x8086, 0x00c0, bus3),
        ]))
    }

    fn subtree_devices<'a>(topo: &'a PciTopology, bus: BusId, out: &mut Vec<&'a PciDevice>) {
        for &id in topo.bus(bus).devices.iter() {
            let dev = topo.device(id);
            out.push(dev);
            if let Some(sub) = dev.subordinate {
                subtree_devices(topo, sub, out);
            }
        }
    }

    fn descendant_buses(topo: &PciTopology, bus: BusId, out: &mut Vec<u8>) {
        for &child in topo.bus(bus).children.iter() {
            out.push(topo.bus(child).number);
            descendant_buses(topo, child, out);
        }
    }

    #[test]
    fn flat_bus() {
        let ecam = MockEcam::new(MockBus::new(vec![
            MockFunction::endpoint(0x00, 0x1af4, 0x1000, 0x02_00_00)
                .with_bar(0, MockBar::Io { size: 0x20 })
                .with_bar(1, mem32(0x1000)),
            MockFunction::endpoint(0x18, 0x1af4, 0x1001, 0x01_00_00).with_bar(5, mem32(0x80)),
            MockFunction::endpoint(0xf8, 0x1af4, 0x1002, 0x03_00_00),
        ]));
        let topo = probe(&ecam);
        let root_bus = topo.bus(topo.roots()[0].bus);
        assert_eq!(root_bus.devices.len(), 3);
        assert_eq!(root_bus.subordinate, 0);
        assert_eq!(topo.num_buses(), 1);
        assert!(topo.devices().all(|d| d.bus_number == 0));

        let devfns: Vec<_> = topo.devices().map(|d| d.devfn).collect();
        assert_eq!(devfns, [0x00, 0x18, 0xf8]);

        let first = topo.devices().next().unwrap();
        assert_eq!(first.resources[0].kind(), Some(ResourceKind::Io));
        assert_eq!((first.resources[0].start, first.resources[0].end), (0x1000, 0x101f));
        assert_eq!(first.resources[1].start, 0x1000_0000);
        assert_eq!(ecam.read32(0, 0x00, 0x10), 0x1001);
        assert_eq!(ecam.read32(0, 0x00, 0x14), 0x1000_0000);
        assert_eq!(ecam.read32(0, 0x18, 0x24), 0x1000_1000);
        assert!(topo.devices().last().unwrap().resources.iter().all(|r| !r.is_present()));
    }

    #[test]
    fn command_enables_decode_and_mastering() {
        let ecam = one_bridge();
        probe(&ecam);
        for (bus, devfn) in [(0, 0x00), (0, 0x08), (1, 0x00), (1, 0x08)] {
            assert_eq!(ecam.read16(bus, devfn, 0x4), 0x7);
        }
    }

    #[test]
    fn single_bridge() {
        let ecam = one_bridge();
        let topo = probe(&ecam);

        let bridge = topo.devices().find(|d| d.is_bridge()).unwrap();
        let bus1 = topo.bus(bridge.subordinate.unwrap());
        assert_eq!((bus1.primary, bus1.number, bus1.subordinate), (0, 1, 1));
        assert_eq!(bus1.devices.len(), 2);
        for &id in bus1.devices.iter() {
            assert_eq!(topo.device(id).bus_number, 1);
        }
        assert_eq!(topo.bus(topo.roots()[0].bus).subordinate, 1);

        let hdr = ecam.header(0, 0x08).unwrap();
        assert_eq!(hdr[6], 0x0001_0100);
        // I/O [0x1000-0x1fff]
        assert_eq!(hdr[7] & 0xffff, 0x1010);
        assert_eq!(hdr[12], 0);
        // mem32 [0x1010_0000-0x101f_ffff]
        assert_eq!(hdr[8], 0x1010_1010);
        // mem64 [0x80_0000_0000-0x80_000f_ffff]
        assert_eq!(hdr[9], 0);
        assert_eq!((hdr[10], hdr[11]), (0x80, 0x80));

        // devices behind the bridge are reachable and programmed
        assert_eq!(ecam.read32(1, 0x00, 0x10), 0x1010_0000);
        assert_eq!(ecam.read32(1, 0x00, 0x14), 0x1001);
        assert_eq!(ecam.read32(1, 0x08, 0x10), 0x0000_000c);
        assert_eq!(ecam.read32(1, 0x08, 0x14), 0x80);
    }

    #[test]
    fn empty_bus() {
        let ecam = MockEcam::new(MockBus::empty());
        let topo = probe(&ecam);
        assert_eq!(topo.num_devices(), 0);
        assert_eq!(topo.bus(topo.roots()[0].bus).devices.len(), 0);
        assert_eq!(topo.foreach_device(|_| true).map(|d| d.devfn), None);
    }

    #[test]
    fn empty_bridge_window_is_closed() {
        let ecam = MockEcam::new(MockBus::new(vec![MockFunction::bridge(
            0x00,
            0x1b36,
            0x000c,
            MockBus::empty(),
        )]));
        let topo = probe(&ecam);
        assert_eq!(topo.num_buses(), 2);
        let hdr = ecam.header(0, 0x00).unwrap();
        assert_eq!(hdr[6], 0x0001_0100);
        assert_eq!(hdr[7] & 0xffff, 0);
        assert_eq!(&hdr[8..=12], &[0, 0, 0, 0, 0]);
    }

    #[test]
    fn cardbus_is_a_bridge_with_two_bars() {
        let ecam = MockEcam::new(MockBus::new(vec![MockFunction::endpoint(
            0x00, 0x1180, 0x0476, 0x06_07_00,
        )
        .with_header_type(0x02)
        .with_bar(0, mem32(0x1000))
        .with_bar(1, mem32(0x1000))
        .with_bar(2, mem32(0x1000))]));
        let topo = probe(&ecam);

        let cardbus = topo.devices().next().unwrap();
        assert_eq!(cardbus.header_kind(), Some(HeaderType::CardBus));
        assert!(cardbus.is_bridge());
        assert!(cardbus.resources[0].is_present());
        assert!(cardbus.resources[1].is_present());
        assert!(cardbus.resources[2..].iter().all(|r| !r.is_present()));

        let below = topo.bus(cardbus.subordinate.unwrap());
        assert_eq!((below.primary, below.number, below.subordinate), (0, 1, 1));
        assert_eq!(topo.num_buses(), 2);
    }

    #[test]
    fn multifunction_bridge_is_still_a_bridge() {
        let below = MockBus::new(vec![
            MockFunction::endpoint(0x00, 0x8086, 0x0010, 0).with_bar(0, mem32(0x1000))
        ]);
        let ecam = MockEcam::new(MockBus::new(vec![
            MockFunction::bridge(0x00, 0x8086, 0x00a0, below)
                .with_header_type(0x81)
                .with_bar(0, mem32(0x100)),
        ]));
        let topo = probe(&ecam);

        let bridge = topo.devices().next().unwrap();
        assert!(bridge.is_multifunction());
        assert!(bridge.is_bridge());
        assert!(bridge.resources[0].is_present());
        let bus1 = topo.bus(bridge.subordinate.unwrap());
        assert_eq!((bus1.primary, bus1.number, bus1.subordinate), (0, 1, 1));
        let ids: Vec<_> = topo.devices().map(|d| (d.bus_number, d.device)).collect();
        assert_eq!(ids, [(0, 0x00a0), (1, 0x0010)]);
        assert_eq!(ecam.header(0, 0x00).unwrap()[6], 0x0001_0100);
    }

    #[test]
    fn mem32_pool_exhaustion_is_fatal() {
        let host = PciHostConfig::new("mock", 0, 0x1000, 0xffff_f000, 0x80_0000_0000);
        let ecam = MockEcam::new(MockBus::new(vec![
            MockFunction::endpoint(0x00, 0x1af4, 0x1000, 0).with_bar(0, mem32(0x2000))
        ]));
        let mut topo = PciTopology::new();
        assert_eq!(
            topo.probe_host(&host, &ecam),
            Err(PciError::AddressOverflow)
        );
        // The BAR was sized but never programmed.
        assert_eq!(ecam.read32(0, 0x00, 0x10), 0);
    }

    #[test]
    fn resources_never_overlap() {
        let ecam = nested();
        let topo = probe(&ecam);
        let ranges: Vec<_> = topo
            .devices()
            .flat_map(|d| d.resources.iter())
            .filter(|r| r.is_present())
            .collect();
        assert_eq!(ranges.len(), 9);
        for (i, a) in ranges.iter().enumerate() {
            assert_eq!(a.start % a.size(), 0, "{:?} not size-aligned", a);
            for b in &ranges[i + 1..] {
                if a.kind() == b.kind() {
                    assert!(!a.overlaps(b), "{:?} overlaps {:?}", a, b);
                }
            }
        }
    }

    #[test]
    fn bridge_windows_cover_their_subtree() {
        let ecam = nested();
        let topo = probe(&ecam);
        for bridge in topo.devices().filter(|d| d.is_bridge()) {
            let hdr = ecam.header(bridge.bus_number, bridge.devfn).unwrap();
            let base = ((hdr[8] & 0xfff0) as u64) << 16;
            let limit = (hdr[8] & 0xfff0_0000) as u64 | 0xf_ffff;
            let mut below = Vec::new();
            subtree_devices(&topo, bridge.subordinate.unwrap(), &mut below);
            for r in below.iter().flat_map(|d| d.resources.iter()) {
                if r.kind() == Some(ResourceKind::Mem32) {
                    assert!(base <= r.start && r.end <= limit, "{:?} outside window", r);
                }
            }
        }
    }

    #[test]
    fn bus_numbers_nest() {
        let ecam = nested();
        let topo = probe(&ecam);
        assert_eq!(topo.num_buses(), 4);
        let mut seen = Vec::new();
        for bridge in topo.devices().filter(|d| d.is_bridge()) {
            let bus = topo.bus(bridge.subordinate.unwrap());
            let regs = ecam.read32(bridge.bus_number, bridge.devfn, 0x18);
            let (primary, secondary, subordinate) = (regs as u8, (regs >> 8) as u8, (regs >> 16) as u8);
            assert!(primary < secondary && secondary <= subordinate);
            assert_eq!((primary, secondary, subordinate), (bus.primary, bus.number, bus.subordinate));
            let mut below = Vec::new();
            descendant_buses(&topo, bridge.subordinate.unwrap(), &mut below);
            assert!(below.iter().all(|&n| secondary < n && n <= subordinate));
            seen.push((bus.number, bus.subordinate));
        }
        // depth-first numbering
        assert_eq!(seen, [(1, 2), (3, 3), (2, 2)]);
    }

    #[test]
    fn traversal_visits_everything_once() {
        let ecam = nested();
        let topo = probe(&ecam);
        let mut visited = Vec::new();
        let found = topo.foreach_device(|d| {
            visited.push((d.bus_number, d.devfn));
            false
        });
        assert!(found.is_none());
        // breadth-first
        assert_eq!(
            visited,
            [(0, 0x00), (0, 0x08), (0, 0x10), (1, 0x00), (1, 0x08), (3, 0x00), (2, 0x00), (2, 0x10)]
        );
        let mut all: Vec<_> = topo.devices().map(|d| (d.bus_number, d.devfn)).collect();
        all.sort_unstable();
        visited.sort_unstable();
        assert_eq!(visited, all);
    }

    #[test]
    fn traversal_stops_at_match() {
        let ecam = one_bridge();
        let topo = probe(&ecam);
        let mut calls = 0;
        let nvme = topo.foreach_device(|d| {
            calls += 1;
            d.is_nvme()
        });
        assert_eq!(nvme.map(|d| (d.bus_number, d.devfn)), Some((1, 0x00)));
        assert_eq!(calls, 3);
        let zni = topo.foreach_device(|d| d.is_zni()).unwrap();
        assert_eq!(zni.resources[0].kind(), Some(ResourceKind::Mem64));
    }

    #[test]
    fn probing_again_is_idempotent() {
        let ecam = nested();
        let first = probe(&ecam);
        let headers: Vec<_> = first
            .devices()
            .map(|d| ecam.header(d.bus_number, d.devfn).unwrap())
            .collect();
        let second = probe(&ecam);
        for (a, b) in first.devices().zip(second.devices()) {
            assert_eq!(a.resources, b.resources);
        }
        let again: Vec<_> = second
            .devices()
            .map(|d| ecam.header(d.bus_number, d.devfn).unwrap())
            .collect();
        assert_eq!(headers, again);
    }

    #[test]
    fn sizing_restores_the_bar() {
        let ecam = MockEcam::new(MockBus::new(vec![
            MockFunction::endpoint(0, 0x1af4, 0x1000, 0).with_bar(0, mem32(0x1_0000)),
        ]));
        ecam.write32(0, 0, 0x10, 0x1234_0000);
        let mut topo = PciTopology::new();
        let root = topo.alloc_root(HOST).unwrap();
        let bus0 = topo.root(root).bus;
        let dev = topo.alloc_device(bus0, 0).unwrap();
        let ctx = EnumerationContext {
            topo: &mut topo,
            cfg: &ecam,
            busnr_max: 0,
            alloc: AddressAllocator::new(0, 0, 0),
        };
        let a = ctx.probe_bar(dev, 0x10);
        let b = ctx.probe_bar(dev, 0x10);
        assert_eq!(a, 0xffff_0000);
        assert_eq!(a, b);
        assert_eq!(ecam.read32(0, 0, 0x10), 0x1234_0000);
    }

    #[test]
    fn wide_bar_takes_two_slots() {
        let ecam = MockEcam::new(MockBus::new(vec![MockFunction::endpoint(0, 0x1af4, 0x1000, 0)
            .with_bar(
                0,
                MockBar::Mem64 {
                    size: 0x2_0000_0000,
                    prefetch: true,
                },
            )
            .with_bar(2, mem32(0x1000))]));
        let topo = probe(&ecam);
        let dev = topo.devices().next().unwrap();
        let wide = dev.resources[0];
        assert!(wide.flags.contains(ResourceFlags::MEM_64 | ResourceFlags::PREFETCH));
        assert_eq!((wide.start, wide.size()), (0x80_0000_0000, 0x2_0000_0000));
        assert!(!dev.resources[1].is_present());
        assert_eq!(dev.resources[2].kind(), Some(ResourceKind::Mem32));
        assert_eq!(ecam.read32(0, 0, 0x14), 0x80);
    }

    #[test]
    fn unsizable_bar_is_fatal() {
        let ecam = MockEcam::new(MockBus::new(vec![MockFunction::endpoint(0x10, 0x1af4, 0x1000, 0)
            .with_bar(
                1,
                MockBar::Raw {
                    writable: 0xff00_0000,
                    fixed: 0x1,
                },
            )]));
        let mut topo = PciTopology::new();
        assert_eq!(
            topo.probe_host(&HOST, &ecam),
            Err(PciError::InvalidBar {
                bus: 0,
                devfn: 0x10,
                reg: 0x14
            })
        );
    }

    #[test]
    fn wide_bar_in_last_slot_is_fatal() {
        let ecam = MockEcam::new(MockBus::new(vec![MockFunction::endpoint(0, 0x1af4, 0x1000, 0)
            .with_bar(
                5,
                MockBar::Mem64 {
                    size: 0x1000,
                    prefetch: false,
                },
            )]));
        let mut topo = PciTopology::new();
        assert_eq!(
            topo.probe_host(&HOST, &ecam),
            Err(PciError::Bar64InLastSlot {
                bus: 0,
                devfn: 0,
                reg: 0x24
            })
        );
    }

    #[test]
    fn too_many_devices_on_a_bus() {
        let ecam = MockEcam::new(MockBus::new(
            (0..3u8)
                .map(|i| MockFunction::endpoint(i * 8, 0x1af4, 0x1000, 0))
                .collect(),
        ));
        let mut topo = PciTopology::with_capacity(Capacity {
            children: 2,
            ..Capacity::default()
        });
        assert_eq!(
            topo.probe_host(&HOST, &ecam),
            Err(PciError::BusDevicesFull { bus: 0 })
        );
    }

    #[test]
    fn hosts_are_independent() {
        let a = one_bridge();
        let b = nested();
        let mut topo = PciTopology::new();
        topo.probe_host(&HOST, &a).unwrap();
        topo.probe_host(&HOST, &b).unwrap();
        assert_eq!(topo.roots().len(), 2);
        // bus numbering restarts per host
        let second = topo.bus(topo.roots()[1].bus);
        assert_eq!((second.number, second.subordinate), (0, 3));
        assert_eq!(topo.num_devices(), 4 + 8);
    }
}
