//! Reset vector and the Rust entry of every core.

use core::arch::global_asm;
use core::ptr::addr_of_mut;

use buddy_system_allocator::LockedHeap;
use ivy_bringup::platform::{hal_config, BOOT_CPU, CPU_ID_MAP, LOG_LEVEL};
use ivy_bringup::xrt::{halt, halt_code};
use ivy_bringup::{boot, logging, program};

const KERNEL_HEAP_SIZE: usize = 4 * 1024 * 1024;

#[global_allocator]
static HEAP_ALLOCATOR: LockedHeap<32> = LockedHeap::<32>::new();

// Cores enter with the MMU off. Each one takes the stack slot of its Aff0,
// cores beyond the configured count park. Everything is Device memory until
// `rust_entry` turns translation on, so nothing before that point may touch
// memory shared with another core; exclusives on Device memory are
// CONSTRAINED UNPREDICTABLE.
global_asm!(
    "
    .section .text.entry
    .globl _start
_start:
    mrs     x19, mpidr_el1
    and     x19, x19, #0xff
    ldr     x20, =__ivy_nr_cpus
    cmp     x19, x20
    b.lo    1f
0:  wfe
    b       0b

1:  mov     x20, #(3 << 20)
    msr     cpacr_el1, x20
    isb

    ldr     x20, =__ivy_stack_size
    ldr     x21, =boot_stack_top
    mul     x22, x19, x20
    sub     sp, x21, x22

    mov     x0, x19
    bl      rust_entry
2:  wfe
    b       2b
"
);

extern "C" {
    fn _start();
    fn start();
    fn end();
    fn sbss();
    fn ebss();
}

#[no_mangle]
extern "C" fn rust_entry(hw_id: usize) -> ! {
    if hw_id == CPU_ID_MAP[BOOT_CPU] & 0xff {
        unsafe { clear_bss() };
        if ivy_hal::vm::vm_init(start as usize, end as usize).is_err() {
            halt(halt_code::PT_GRAN_UNSUPPORTED);
        }
        ivy_hal::vm::vm_enable();
        init_heap();
        ivy_hal::init(hal_config());
        logging::init(LOG_LEVEL);
        boot::primary_main(
            || boot::bringup_secondary_cpus(_start as usize),
            program::xmain,
        );
    } else {
        ivy_hal::vm::vm_enable();
        boot::secondary_main(program::xmain);
    }
    halt(halt_code::OK)
}

/// Secondary cores must still be off, their statics live in here.
unsafe fn clear_bss() {
    let start = sbss as usize;
    let len = ebss as usize - start;
    core::slice::from_raw_parts_mut(start as *mut u8, len).fill(0);
}

fn init_heap() {
    static mut HEAP: [u8; KERNEL_HEAP_SIZE] = [0; KERNEL_HEAP_SIZE];
    unsafe {
        let start = addr_of_mut!(HEAP) as usize;
        HEAP_ALLOCATOR.lock().init(start, KERNEL_HEAP_SIZE);
    }
    info!("heap init end");
}
