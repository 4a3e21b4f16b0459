//! Identity block mappings for a 4 KiB granule, 48-bit translation regime.

#![cfg_attr(feature = "libos", allow(dead_code))]

use core::ops::Range;

/// Bytes covered by one level 1 block.
pub(crate) const L1_BLOCK_SIZE: usize = 1 << 30;
pub(crate) const ENTRIES: usize = 512;

const MAIR_NORMAL_IDX: u64 = 0;
const MAIR_DEVICE_IDX: u64 = 1;
/// Attr0 normal write-back read/write-allocate, Attr1 Device-nGnRnE.
pub(crate) const MAIR_VALUE: u64 = 0x00ff;

const DESC_VALID: u64 = 1 << 0;
const DESC_TABLE: u64 = 1 << 1;
const DESC_SH_INNER: u64 = 0b11 << 8;
const DESC_AF: u64 = 1 << 10;
const DESC_PXN: u64 = 1 << 53;
const DESC_UXN: u64 = 1 << 54;

/// Entry pointing at the next-level table at `next`.
pub(crate) fn table_descriptor(next: usize) -> u64 {
    next as u64 | DESC_TABLE | DESC_VALID
}

/// Level 1 block `index` mapped onto itself. Blocks touching `normal` are
/// cacheable and executable, all others are device memory.
pub(crate) fn identity_block(index: usize, normal: &Range<usize>) -> u64 {
    let start = index * L1_BLOCK_SIZE;
    let desc = start as u64 | DESC_VALID | DESC_AF;
    if start < normal.end && normal.start < start + L1_BLOCK_SIZE {
        desc | MAIR_NORMAL_IDX << 2 | DESC_SH_INNER
    } else {
        desc | MAIR_DEVICE_IDX << 2 | DESC_PXN | DESC_UXN
    }
}
