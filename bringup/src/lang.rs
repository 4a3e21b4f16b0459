// Rust language features implementations

use core::panic::PanicInfo;
use ivy_bringup::xrt::{exit_code, xrt_exit};

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    error!("\n\n{}", info);
    xrt_exit(exit_code::PANIC)
}
