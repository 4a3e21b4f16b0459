use ivy_config::{PlatformConfig, PsciConduit};
use std::{env, fmt::Write as _, fs, path::PathBuf};

/// Where QEMU `-kernel` and the simulators load the image.
const LOAD_ADDRESS: u64 = 0x4008_0000;
const STACK_SIZE_PER_CPU: usize = 64 * 1024;

fn main() {
    let platform = env::var("IVY_PLATFORM").unwrap_or_else(|_| "qemu-virt".into());
    println!("cargo:rerun-if-env-changed=IVY_PLATFORM");
    println!(
        "cargo:rerun-if-changed={}",
        PlatformConfig::default_file().display()
    );

    let config = PlatformConfig::select(&platform)
        .unwrap_or_else(|e| panic!("platform {}: {}", platform, e));
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    fs::write(out_dir.join("platform.rs"), render_platform(&config)).unwrap();

    let target = env::var("TARGET").unwrap();
    if target.starts_with("aarch64") && target.contains("-none") {
        let linker = out_dir.join("linker.ld");
        fs::write(&linker, render_linker(&config)).unwrap();
        println!("cargo:rustc-link-arg-bins=-T{}", linker.display());
    }
}

fn render_platform(config: &PlatformConfig) -> String {
    let mut s = String::new();
    writeln!(s, "// Generated from platform {:?}.", config.name).unwrap();
    writeln!(s, "pub const PLATFORM: &str = {:?};", config.name).unwrap();
    writeln!(s, "pub const NR_CPUS: usize = {};", config.nr_cpus).unwrap();
    writeln!(s, "pub const BOOT_CPU: usize = {};", config.boot_cpu).unwrap();
    writeln!(
        s,
        "pub const CPU_ID_MAP: [usize; NR_CPUS] = [{}];",
        config
            .cpu_map
            .iter()
            .map(|id| format!("{:#x}", id))
            .collect::<Vec<_>>()
            .join(", ")
    )
    .unwrap();
    writeln!(s, "pub const LOG_LEVEL: &str = {:?};", config.log_level).unwrap();
    writeln!(s, "pub const UART_BASE: usize = {:#x};", config.uart.base).unwrap();
    let conduit = match config.psci {
        PsciConduit::Hvc => "Hvc",
        PsciConduit::Smc => "Smc",
    };
    writeln!(s, "pub const PSCI_CONDUIT: PsciConduit = PsciConduit::{};", conduit).unwrap();
    writeln!(
        s,
        "pub static PCI_HOSTS: [PciHostConfig; {}] = [",
        config.pci_hosts.len()
    )
    .unwrap();
    for host in config.pci_hosts.iter() {
        writeln!(
            s,
            "    PciHostConfig::new({:?}, {:#x}, {:#x}, {:#x}, {:#x}),",
            host.name, host.ecam_base, host.io_base, host.mem32_base, host.mem64_base
        )
        .unwrap();
    }
    writeln!(s, "];").unwrap();
    s
}

fn render_linker(config: &PlatformConfig) -> String {
    format!(
        "\
OUTPUT_ARCH(aarch64)
ENTRY(_start)
BASE_ADDRESS = {LOAD_ADDRESS:#x};
__ivy_nr_cpus = {nr_cpus};
__ivy_stack_size = {STACK_SIZE_PER_CPU:#x};
{AARCH64_SECTIONS}",
        nr_cpus = config.nr_cpus,
        AARCH64_SECTIONS = AARCH64_SECTIONS.replace(
            "STACK_TOTAL",
            &format!("{:#x}", STACK_SIZE_PER_CPU * config.nr_cpus)
        ),
    )
}

const AARCH64_SECTIONS: &str = "
SECTIONS
{
    . = BASE_ADDRESS;
    start = .;

    .text : {
        stext = .;
        *(.text.entry)
        *(.text .text.*)
        etext = .;
    }

    .rodata ALIGN(4K) : {
        srodata = .;
        *(.rodata .rodata.*)
        erodata = .;
    }

    .data ALIGN(4K) : {
        sdata = .;
        *(.data .data.*)
        edata = .;
    }

    .bss ALIGN(4K) (NOLOAD) : {
        boot_stack = .;
        *(.bss.stack)
        . += STACK_TOTAL;
        boot_stack_top = .;

        . = ALIGN(4K);
        sbss = .;
        *(.bss .bss.*)
        *(COMMON)
        ebss = .;
    }

    PROVIDE(end = .);
}
";
