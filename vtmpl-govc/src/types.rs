//! Decoded govc responses.
//!
//! govc has changed the casing of its JSON keys between releases, so the
//! structs accept both spellings.

use serde::Deserialize;

/// vSphere tag as returned by `tags.ls -json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Tag {
    #[serde(alias = "Id", default)]
    pub id: String,
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(alias = "CategoryId", alias = "categoryId", default)]
    pub category_id: String,
}

/// vSphere tag category as returned by `tags.category.ls -json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Category {
    #[serde(alias = "Id", default)]
    pub id: String,
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(alias = "Cardinality", default)]
    pub cardinality: String,
    #[serde(alias = "AssociableTypes", default)]
    pub associable_types: Vec<String>,
}

/// Object types a category can be associated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    VirtualMachine,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::VirtualMachine => "VirtualMachine",
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeviceInfoResponse {
    #[serde(alias = "Devices", default)]
    pub devices: Option<Vec<RawDevice>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawDevice {
    #[serde(alias = "Name", default)]
    pub name: String,
    #[serde(alias = "DeviceInfo", alias = "deviceInfo", default)]
    pub device_info: Option<RawDeviceInfo>,
    #[serde(alias = "CapacityInKB", alias = "capacityInKB", default)]
    pub capacity_in_kb: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawDeviceInfo {
    #[serde(alias = "Label", default)]
    pub label: String,
}

/// A virtual device attached to a VM.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualDevice {
    /// Opaque device name, e.g. `disk-1000-0`.
    pub name: String,
    /// Human label, e.g. `Hard disk 1`.
    pub label: String,
    pub capacity_in_kb: Option<f64>,
}

impl From<RawDevice> for VirtualDevice {
    fn from(raw: RawDevice) -> Self {
        Self {
            name: raw.name,
            label: raw.device_info.map(|i| i.label).unwrap_or_default(),
            capacity_in_kb: raw.capacity_in_kb,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct VmInfoResponse {
    #[serde(alias = "VirtualMachines", alias = "virtualMachines", default)]
    pub virtual_machines: Option<Vec<RawVm>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawVm {
    #[serde(alias = "Config", default)]
    pub config: Option<RawVmConfig>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawVmConfig {
    #[serde(alias = "Template", default)]
    pub template: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LibraryElementInfo {
    #[serde(alias = "ContentVersion", alias = "contentVersion", default)]
    pub content_version: String,
}

/// Deploy options file consumed by `library.deploy -options`.
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct DeployOptions {
    pub disk_provisioning: &'static str,
    pub network_mapping: Vec<NetworkMapping>,
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct NetworkMapping {
    pub name: &'static str,
    pub network: String,
}

impl DeployOptions {
    pub fn thin(network: &str) -> Self {
        Self {
            disk_provisioning: "thin",
            network_mapping: vec![
                // Ubuntu and RHEL images
                NetworkMapping {
                    name: "nic0",
                    network: network.to_string(),
                },
                // Bottlerocket images
                NetworkMapping {
                    name: "VM Network",
                    network: network.to_string(),
                },
            ],
        }
    }
}
