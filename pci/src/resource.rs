//! BAR decoding and the address pools resources are carved from.

use bitflags::bitflags;

use crate::error::{PciError, PciResult};

bitflags! {
    /// Resource type and attributes. The low byte keeps the raw BAR
    /// attribute bits.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct ResourceFlags: u32 {
        const IO = 0x0000_0100;
        const MEM = 0x0000_0200;
        const PREFETCH = 0x0000_2000;
        /// The size is also the required alignment.
        const SIZEALIGN = 0x0004_0000;
        const MEM_64 = 0x0010_0000;
    }
}

pub(crate) const PCI_BASE_ADDRESS_SPACE_IO: u32 = 0x01;
pub(crate) const PCI_BASE_ADDRESS_MEM_TYPE_MASK: u32 = 0x06;
pub(crate) const PCI_BASE_ADDRESS_MEM_TYPE_64: u32 = 0x04;
pub(crate) const PCI_BASE_ADDRESS_MEM_PREFETCH: u32 = 0x08;
pub(crate) const PCI_BASE_ADDRESS_IO_MASK: u32 = !0x03;
pub(crate) const PCI_BASE_ADDRESS_MEM_MASK: u32 = !0x0f;
/// Highest I/O port address a BAR can decode.
pub(crate) const IO_SPACE_LIMIT: u32 = 0x00ff_ffff;

/// Flags described by the read-only low bits of a BAR.
pub fn decode_bar(bar: u32) -> ResourceFlags {
    if bar & PCI_BASE_ADDRESS_SPACE_IO != 0 {
        return ResourceFlags::from_bits_retain(bar & !PCI_BASE_ADDRESS_IO_MASK)
            | ResourceFlags::IO;
    }
    let mut flags =
        ResourceFlags::from_bits_retain(bar & !PCI_BASE_ADDRESS_MEM_MASK) | ResourceFlags::MEM;
    if bar & PCI_BASE_ADDRESS_MEM_PREFETCH != 0 {
        flags |= ResourceFlags::PREFETCH;
    }
    // 32-bit, below-1M and reserved types all decode as 32-bit.
    if bar & PCI_BASE_ADDRESS_MEM_TYPE_MASK == PCI_BASE_ADDRESS_MEM_TYPE_64 {
        flags |= ResourceFlags::MEM_64;
    }
    flags
}

/// Decode size of a BAR from the value read back after writing all-ones.
///
/// Returns 0 if no bit under `mask` is writable.
pub fn pci_size(maxbase: u64, mask: u64) -> u64 {
    let size = mask & maxbase;
    size & size.wrapping_neg()
}

/// The pool a resource is carved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Io,
    Mem32,
    Mem64,
}

impl ResourceKind {
    pub fn of(flags: ResourceFlags) -> Option<Self> {
        if flags.contains(ResourceFlags::MEM_64) {
            Some(Self::Mem64)
        } else if flags.contains(ResourceFlags::MEM) {
            Some(Self::Mem32)
        } else if flags.contains(ResourceFlags::IO) {
            Some(Self::Io)
        } else {
            None
        }
    }

    /// Highest address a BAR of this kind can be programmed with.
    pub fn limit(self) -> u64 {
        match self {
            Self::Io => IO_SPACE_LIMIT as u64,
            Self::Mem32 => u32::MAX as u64,
            Self::Mem64 => u64::MAX,
        }
    }
}

/// An assigned address window, `end` inclusive. Empty flags mean the BAR
/// is not implemented.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResourceRange {
    pub start: u64,
    pub end: u64,
    pub flags: ResourceFlags,
}

impl ResourceRange {
    pub fn is_present(&self) -> bool {
        !self.flags.is_empty()
    }

    pub fn kind(&self) -> Option<ResourceKind> {
        ResourceKind::of(self.flags)
    }

    pub fn size(&self) -> u64 {
        if self.is_present() {
            self.end - self.start + 1
        } else {
            0
        }
    }

    pub fn overlaps(&self, other: &ResourceRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

pub(crate) fn align_up(addr: u64, align: u64) -> PciResult<u64> {
    debug_assert!(align.is_power_of_two());
    addr.checked_add(align - 1)
        .map(|a| a & !(align - 1))
        .ok_or(PciError::AddressOverflow)
}

/// Bump allocator over the three address pools of one host.
///
/// Every request is a power of two and is placed at the next multiple of
/// its size. Addresses are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressAllocator {
    io: u64,
    mem32: u64,
    mem64: u64,
}

impl AddressAllocator {
    pub const fn new(io: u64, mem32: u64, mem64: u64) -> Self {
        Self { io, mem32, mem64 }
    }

    /// Next free address of `kind`.
    pub fn base(&self, kind: ResourceKind) -> u64 {
        match kind {
            ResourceKind::Io => self.io,
            ResourceKind::Mem32 => self.mem32,
            ResourceKind::Mem64 => self.mem64,
        }
    }

    fn base_mut(&mut self, kind: ResourceKind) -> &mut u64 {
        match kind {
            ResourceKind::Io => &mut self.io,
            ResourceKind::Mem32 => &mut self.mem32,
            ResourceKind::Mem64 => &mut self.mem64,
        }
    }

    /// Reserve `size` bytes of `kind` aligned to `size` and return the start.
    ///
    /// The whole range must stay below [`ResourceKind::limit`]; the pool is
    /// left untouched otherwise.
    pub fn allocate(&mut self, kind: ResourceKind, size: u64) -> PciResult<u64> {
        let base = self.base_mut(kind);
        let start = align_up(*base, size)?;
        let end = start
            .checked_add(size - 1)
            .filter(|&end| end <= kind.limit())
            .ok_or(PciError::AddressOverflow)?;
        *base = end.checked_add(1).ok_or(PciError::AddressOverflow)?;
        Ok(start)
    }

    /// Skip forward to the next multiple of `align`.
    pub fn align(&mut self, kind: ResourceKind, align: u64) -> PciResult {
        let base = self.base_mut(kind);
        *base = align_up(*base, align)?;
        Ok(())
    }
}
