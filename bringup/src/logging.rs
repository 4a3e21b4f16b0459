use core::fmt;
use log::{self, Level, LevelFilter, Log, Metadata, Record};

/// Initialize logging with the max log level `level`, `warn` if it does
/// not parse.
pub fn init(level: &str) {
    static LOGGER: SimpleLogger = SimpleLogger;
    // A second call keeps the installed logger.
    let _ = log::set_logger(&LOGGER);
    set_max_level(level);
}

/// Reset max log level.
pub fn set_max_level(level: &str) {
    log::set_max_level(level.parse().unwrap_or(LevelFilter::Warn));
}

#[inline]
pub fn print(args: fmt::Arguments) {
    ivy_hal::console::console_write_fmt(args);
}

#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => {
        $crate::logging::print(core::format_args!($($arg)*))
    }
}

#[macro_export]
macro_rules! println {
    () => ($crate::print!("\n"));
    ($($arg:tt)*) => {
        $crate::logging::print(core::format_args!("{}\n", core::format_args!($($arg)*)))
    }
}

#[allow(dead_code)]
#[repr(u8)]
enum ColorCode {
    Red = 31,
    Green = 32,
    Yellow = 33,
    Cyan = 36,
    White = 37,
    BrightBlack = 90,
    BrightRed = 91,
    BrightGreen = 92,
    BrightYellow = 93,
    BrightCyan = 96,
}

/// Add escape sequence to print with color in Linux console
macro_rules! with_color {
    ($color_code:expr, $($arg:tt)*) => {{
        #[cfg(feature = "colorless-log")]
        { let _ = $color_code; format_args!($($arg)*) }
        #[cfg(not(feature = "colorless-log"))]
        { format_args!("\u{1B}[{}m{}\u{1B}[m", $color_code as u8, format_args!($($arg)*)) }
    }};
}

struct SimpleLogger;

impl Log for SimpleLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let micros = ivy_hal::timer::timer_now().as_micros();
        let cpu_id = ivy_hal::cpu::cpu_id();
        let level = record.level();
        let level_color = match level {
            Level::Error => ColorCode::BrightRed,
            Level::Warn => ColorCode::BrightYellow,
            Level::Info => ColorCode::BrightGreen,
            Level::Debug => ColorCode::BrightCyan,
            Level::Trace => ColorCode::BrightBlack,
        };
        let args_color = match level {
            Level::Error => ColorCode::Red,
            Level::Warn => ColorCode::Yellow,
            Level::Info => ColorCode::Green,
            Level::Debug => ColorCode::Cyan,
            Level::Trace => ColorCode::BrightBlack,
        };
        print(with_color!(
            ColorCode::White,
            "[{s:>3}.{us:06} {level} {cpu_id}] {data}\n",
            s = micros / 1_000_000,
            us = micros % 1_000_000,
            level = with_color!(level_color, "{:<5}", level),
            cpu_id = cpu_id,
            data = with_color!(args_color, "{}", record.args()),
        ));
    }

    fn flush(&self) {}
}
