//! Console output.

use crate::hal_fn::serial;
use core::fmt::{Arguments, Result, Write};
use spin::Mutex;

struct SerialWriter;

static SERIAL_WRITER: Mutex<SerialWriter> = Mutex::new(SerialWriter);

impl Write for SerialWriter {
    fn write_str(&mut self, s: &str) -> Result {
        for c in s.bytes() {
            serial::serial_put(c);
        }
        Ok(())
    }
}

/// Writes formatted data into the console.
pub fn console_write_fmt(fmt: Arguments) {
    // `SerialWriter::write_str` never fails.
    let _ = SERIAL_WRITER.lock().write_fmt(fmt);
}

/// Writes a raw byte, bypassing formatting (e.g. the EOT end-of-run marker).
pub fn console_putchar(c: u8) {
    let _guard = SERIAL_WRITER.lock();
    serial::serial_put(c);
}
