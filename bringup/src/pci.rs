//! The platform's PCI topology, probed once and shared by every core.

use ivy_pci::{ConfigSpace, PciDevice, PciHostConfig, PciResult, PciTopology};
use spin::Once;

use crate::xrt::{exit_code, xrt_exit};

static TOPOLOGY: Once<PciTopology> = Once::new();

/// Enumerate every host, in order, into a fresh topology.
pub fn probe_hosts<'a, C, I>(hosts: I) -> PciResult<PciTopology>
where
    C: ConfigSpace + ?Sized + 'a,
    I: IntoIterator<Item = (&'a PciHostConfig, &'a C)>,
{
    let mut topo = PciTopology::new();
    for (host, cfg) in hosts {
        topo.probe_host(host, cfg)?;
    }
    info!(
        "pci: {} devices on {} buses",
        topo.num_devices(),
        topo.num_buses()
    );
    Ok(topo)
}

/// Probe `hosts` unless a topology is already installed. A failed probe
/// ends the run.
pub fn pci_host_probe_with<'a, C, I>(hosts: I) -> &'static PciTopology
where
    C: ConfigSpace + ?Sized + 'a,
    I: IntoIterator<Item = (&'a PciHostConfig, &'a C)>,
{
    TOPOLOGY.call_once(|| match probe_hosts(hosts) {
        Ok(topo) => topo,
        Err(e) => {
            error!("pci probe failed: {}", e);
            xrt_exit(exit_code::PCI_PROBE)
        }
    })
}

/// Probe every host controller of the platform.
pub fn pci_host_probe_all() -> &'static PciTopology {
    cfg_if::cfg_if! {
        if #[cfg(target_os = "none")] {
            use alloc::vec::Vec;
            use ivy_pci::EcamConfig;
            use crate::platform::PCI_HOSTS;

            let ecams: Vec<EcamConfig> = PCI_HOSTS
                .iter()
                // SAFETY: the platform file names real ECAM windows, identity mapped.
                .map(|h| unsafe { EcamConfig::new(h.cfg_base) })
                .collect();
            pci_host_probe_with(PCI_HOSTS.iter().zip(ecams.iter()))
        } else {
            use crate::sim::{sim_ecam, SIM_HOST};

            pci_host_probe_with([(&SIM_HOST, sim_ecam())])
        }
    }
}

/// Visit the probed devices breadth-first until `f` accepts one.
///
/// Nothing is visited before [`pci_host_probe_all`] has run.
pub fn pci_foreach_device<F>(f: F) -> Option<&'static PciDevice>
where
    F: FnMut(&PciDevice) -> bool,
{
    TOPOLOGY.get()?.foreach_device(f)
}
