//! The pci-bringup diagnostic.

use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};

use ivy_pci::PciDevice;

use crate::pci::{pci_foreach_device, pci_host_probe_all};
use crate::platform::{BOOT_CPU, NR_CPUS};
use crate::xrt::{cpu_barrier_wait, xrt_exit, xrt_get_core_id};

/// Exit code of a barrier self-test mismatch.
pub const BARRIER_MISMATCH: usize = 10;

/// Rounds of [`barrier_selftest`] run before the PCI probe.
const SELFTEST_ROUNDS: usize = 64;

/// Entry of the program on every core.
pub fn xmain() {
    barrier_selftest(SELFTEST_ROUNDS);
    if xrt_get_core_id() == BOOT_CPU {
        pci_bringup_main();
    }
}

/// Enumerate the PCI hosts and report what was found.
pub fn pci_bringup_main() {
    let topo = pci_host_probe_all();
    for dev in topo.devices() {
        print_device(dev);
    }

    match find_nvme() {
        Some(dev) => println!("got a nvme @ {}", Bdf(dev)),
        None => println!("no nvme"),
    }
    match find_zni() {
        Some(dev) => println!("got a zni @ {}", Bdf(dev)),
        None => println!("no zni"),
    }
}

pub fn find_nvme() -> Option<&'static PciDevice> {
    pci_foreach_device(|d| d.is_nvme())
}

pub fn find_zni() -> Option<&'static PciDevice> {
    pci_foreach_device(|d| d.is_zni())
}

/// `bus:slot.function`
struct Bdf<'a>(&'a PciDevice);

impl fmt::Display for Bdf<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let d = self.0;
        write!(f, "{:02x}:{:02x}.{}", d.bus_number, d.slot(), d.function())
    }
}

fn print_device(dev: &PciDevice) {
    println!(
        "pci dev bus {:02x} devfn {:02x} device {:04x} vendor {:04x} class {:06x} rev {:02x}",
        dev.bus_number, dev.devfn, dev.device, dev.vendor, dev.class, dev.revision
    );
    for (i, res) in dev.resources.iter().enumerate().filter(|(_, r)| r.is_present()) {
        println!(
            "    res {} flags {:#x} start {:#x} end {:#x}",
            i,
            res.flags.bits(),
            res.start,
            res.end
        );
    }
}

#[allow(clippy::declare_interior_mutable_const)]
const SLOT_INIT: AtomicUsize = AtomicUsize::new(0);
static SLOTS: [AtomicUsize; NR_CPUS] = [SLOT_INIT; NR_CPUS];

/// Every core publishes the round number, then checks after the barrier
/// that all of the others have too.
pub fn barrier_selftest(rounds: usize) {
    let me = xrt_get_core_id();
    for round in 1..=rounds {
        SLOTS[me].store(round, Ordering::Relaxed);
        cpu_barrier_wait();
        if let Some((core, seen)) = first_stale_slot(&SLOTS, round) {
            error!(
                "barrier round {}: core {} sees {} from core {}",
                round, me, seen, core
            );
            xrt_exit(BARRIER_MISMATCH);
        }
        cpu_barrier_wait();
    }
    debug!("barrier selftest passed {} rounds", rounds);
}

/// The first core whose slot does not hold `round`, with what it holds.
fn first_stale_slot(slots: &[AtomicUsize], round: usize) -> Option<(usize, usize)> {
    slots
        .iter()
        .map(|slot| slot.load(Ordering::Relaxed))
        .enumerate()
        .find(|&(_, seen)| seen != round)
}
