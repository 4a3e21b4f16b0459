//! PL011 UART, used only as an output byte sink.

use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::register_structs;
use tock_registers::registers::{ReadOnly, ReadWrite};

use crate::config::hal_config;

register_structs! {
    Pl011UartRegs {
        /// Data Register.
        (0x00 => dr: ReadWrite<u32>),
        (0x04 => _reserved0),
        /// Flag Register.
        (0x18 => fr: ReadOnly<u32>),
        (0x1c => @END),
    }
}

/// Transmit FIFO full.
const FR_TXFF: u32 = 1 << 5;

struct Pl011Uart {
    base_vaddr: usize,
}

impl Pl011Uart {
    const fn new(base_vaddr: usize) -> Self {
        Self { base_vaddr }
    }

    const fn regs(&self) -> &Pl011UartRegs {
        unsafe { &*(self.base_vaddr as *const _) }
    }

    fn putchar(&self, c: u8) {
        while self.regs().fr.get() & FR_TXFF != 0 {
            core::hint::spin_loop();
        }
        self.regs().dr.set(c as u32);
    }
}

hal_fn_impl! {
    impl mod crate::hal_fn::serial {
        fn serial_put(c: u8) {
            // Output before `init()` is dropped.
            if let Some(config) = hal_config() {
                Pl011Uart::new(config.uart_base).putchar(c);
            }
        }
    }
}
