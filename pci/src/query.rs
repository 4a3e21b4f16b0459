use crate::model::PciDevice;

/// Mass storage, non-volatile memory controller, NVM Express.
pub const PCI_CLASS_STORAGE_EXPRESS: u32 = 0x01_08_02;

pub const ZNI_VENDOR_ID: u16 = 0x1619;
pub const ZNI_DEVICE_ID: u16 = 0x6669;

impl PciDevice {
    pub fn matches(&self, vendor: u16, device: u16) -> bool {
        self.vendor == vendor && self.device == device
    }

    pub fn is_class(&self, class: u32) -> bool {
        self.class == class
    }

    /// An NVMe controller.
    pub fn is_nvme(&self) -> bool {
        self.is_class(PCI_CLASS_STORAGE_EXPRESS)
    }

    /// The ZNI custom accelerator.
    pub fn is_zni(&self) -> bool {
        self.matches(ZNI_VENDOR_ID, ZNI_DEVICE_ID)
    }
}
