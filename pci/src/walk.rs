use alloc::collections::VecDeque;

use crate::model::{PciDevice, PciTopology};

impl PciTopology {
    /// Visit every device breadth-first, root buses first, and stop at the
    /// first one `f` accepts.
    pub fn foreach_device<F>(&self, mut f: F) -> Option<&PciDevice>
    where
        F: FnMut(&PciDevice) -> bool,
    {
        let mut queue: VecDeque<_> = self.roots().iter().map(|r| r.bus).collect();
        while let Some(bus) = queue.pop_front() {
            let bus = self.bus(bus);
            trace!("traverse bus {}, num devices {}", bus.number, bus.devices.len());
            for &id in bus.devices.iter() {
                let dev = self.device(id);
                if f(dev) {
                    return Some(dev);
                }
                if let Some(sub) = dev.subordinate {
                    queue.push_back(sub);
                }
            }
        }
        None
    }

    /// All devices in discovery order.
    pub fn devices(&self) -> impl Iterator<Item = &PciDevice> + '_ {
        self.devices_slice().iter()
    }
}
