mod cpu;
mod psci;
mod serial;
mod timer;
mod vm;

pub fn init() {
    trace!("aarch64 hal up on cpu {}", crate::cpu::cpu_id());
}
