//! Boot disk selection for images that need a bigger disk.
//!
//! Older Bottlerocket images boot from two disks and keep their data on the
//! second one; newer ones use a single disk. The layout is recognised from
//! the device labels.

use vtmpl_govc::VirtualDevice;

pub const DISK_1: &str = "Hard disk 1";
pub const DISK_2: &str = "Hard disk 2";

/// Target sizes per disk layout, in GiB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskResizePolicy {
    pub dual_disk_gib: u32,
    pub single_disk_gib: u32,
}

impl Default for DiskResizePolicy {
    fn default() -> Self {
        Self {
            dual_disk_gib: 20,
            single_disk_gib: 22,
        }
    }
}

/// Disk layout of a deployed VM and the disk to grow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiskLayout {
    /// `Hard disk 2` is present; it is the one resized.
    DualDisk { disk: String },
    /// Only `Hard disk 1` is present.
    SingleDisk { disk: String },
}

impl DiskLayout {
    /// Detect the layout from a device inventory. `None` if the VM has
    /// neither expected disk.
    pub fn detect(devices: &[VirtualDevice]) -> Option<Self> {
        let find = |label: &str| {
            devices
                .iter()
                .find(|d| d.label.eq_ignore_ascii_case(label))
                .map(|d| d.name.clone())
        };

        if let Some(disk) = find(DISK_2) {
            return Some(DiskLayout::DualDisk { disk });
        }
        find(DISK_1).map(|disk| DiskLayout::SingleDisk { disk })
    }

    pub fn disk_name(&self) -> &str {
        match self {
            DiskLayout::DualDisk { disk } | DiskLayout::SingleDisk { disk } => disk,
        }
    }

    pub fn target_size_gib(&self, policy: &DiskResizePolicy) -> u32 {
        match self {
            DiskLayout::DualDisk { .. } => policy.dual_disk_gib,
            DiskLayout::SingleDisk { .. } => policy.single_disk_gib,
        }
    }
}
