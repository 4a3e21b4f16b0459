//! Identity-mapped translation with 1 GiB blocks over the low 512 GiB.

use core::ptr::addr_of_mut;
use cortex_a::{asm::barrier, registers::*};
use tock_registers::interfaces::{Readable, Writeable};

use crate::common::pagetable::{identity_block, table_descriptor, ENTRIES, MAIR_VALUE};
use crate::{HalError, HalResult};

#[repr(C, align(4096))]
struct PageTable([u64; ENTRIES]);

static mut L0_TABLE: PageTable = PageTable([0; ENTRIES]);
static mut L1_TABLE: PageTable = PageTable([0; ENTRIES]);

const TGRAN4_SHIFT: u64 = 28;
const TGRAN4_NOT_SUPPORTED: u64 = 0b1111;
const PARANGE_MASK: u64 = 0x7;

const TCR_T0SZ_48BIT: u64 = 16;
const TCR_IRGN0_WBWA: u64 = 0b01 << 8;
const TCR_ORGN0_WBWA: u64 = 0b01 << 10;
const TCR_SH0_INNER: u64 = 0b11 << 12;
const TCR_TG0_4K: u64 = 0b00 << 14;
const TCR_EPD1: u64 = 1 << 23;
const TCR_IPS_SHIFT: u64 = 32;

const SCTLR_M: u64 = 1 << 0;
const SCTLR_C: u64 = 1 << 2;
const SCTLR_I: u64 = 1 << 12;

hal_fn_impl! {
    impl mod crate::hal_fn::vm {
        fn vm_init(normal_start: usize, normal_end: usize) -> HalResult {
            if (ID_AA64MMFR0_EL1.get() >> TGRAN4_SHIFT) & 0xf == TGRAN4_NOT_SUPPORTED {
                return Err(HalError::NotSupported);
            }
            let normal = normal_start..normal_end;
            // Only the boot core runs this, before any other core is on.
            unsafe {
                let l1 = &mut *addr_of_mut!(L1_TABLE);
                for (index, entry) in l1.0.iter_mut().enumerate() {
                    *entry = identity_block(index, &normal);
                }
                (*addr_of_mut!(L0_TABLE)).0[0] = table_descriptor(l1 as *const _ as usize);
            }
            debug!("identity map, normal memory {:#x?}", normal);
            Ok(())
        }

        fn vm_enable() {
            let pa_range = ID_AA64MMFR0_EL1.get() & PARANGE_MASK;
            MAIR_EL1.set(MAIR_VALUE);
            TCR_EL1.set(
                TCR_T0SZ_48BIT
                    | TCR_IRGN0_WBWA
                    | TCR_ORGN0_WBWA
                    | TCR_SH0_INNER
                    | TCR_TG0_4K
                    | TCR_EPD1
                    | pa_range << TCR_IPS_SHIFT,
            );
            unsafe {
                TTBR0_EL1.set(addr_of_mut!(L0_TABLE) as u64);
                barrier::dsb(barrier::SY);
                core::arch::asm!("tlbi vmalle1", "dsb nsh");
                barrier::isb(barrier::SY);
            }
            SCTLR_EL1.set(SCTLR_EL1.get() | SCTLR_M | SCTLR_C | SCTLR_I);
            unsafe { barrier::isb(barrier::SY) }
        }
    }
}
