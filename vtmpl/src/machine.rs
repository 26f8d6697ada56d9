//! Machine template description.

use std::fmt;
use std::str::FromStr;

/// Operating system family of a node image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsFamily {
    Ubuntu,
    Bottlerocket,
    Redhat,
}

impl OsFamily {
    /// Bottlerocket images ship with a boot disk that is too small for a node
    /// and must be grown before the VM becomes a template.
    pub fn requires_boot_disk_resize(&self) -> bool {
        matches!(self, OsFamily::Bottlerocket)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OsFamily::Ubuntu => "ubuntu",
            OsFamily::Bottlerocket => "bottlerocket",
            OsFamily::Redhat => "redhat",
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OsFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ubuntu" => Ok(OsFamily::Ubuntu),
            "bottlerocket" => Ok(OsFamily::Bottlerocket),
            "redhat" => Ok(OsFamily::Redhat),
            other => Err(format!("unsupported os family: {}", other)),
        }
    }
}

/// The template a group of machines is cloned from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineTemplateSpec {
    /// Inventory path under the datacenter, e.g. `/DC/vm/Templates/ubuntu-1.19`.
    pub path: String,
    pub os_family: OsFamily,
    pub ova_url: String,
}

impl MachineTemplateSpec {
    pub fn new(path: impl Into<String>, os_family: OsFamily, ova_url: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            os_family,
            ova_url: ova_url.into(),
        }
    }
}

/// Split a template path into its folder and its name.
///
/// Returns `None` when either part would be empty.
pub(crate) fn split_template_path(path: &str) -> Option<(&str, &str)> {
    let (dir, name) = path.trim_end_matches('/').rsplit_once('/')?;
    if dir.is_empty() || name.is_empty() {
        return None;
    }
    Some((dir, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_family_parse() {
        assert_eq!("Bottlerocket".parse::<OsFamily>().unwrap(), OsFamily::Bottlerocket);
        assert_eq!("ubuntu".parse::<OsFamily>().unwrap(), OsFamily::Ubuntu);
        assert!("windows".parse::<OsFamily>().is_err());
    }

    #[test]
    fn test_only_bottlerocket_resizes() {
        assert!(OsFamily::Bottlerocket.requires_boot_disk_resize());
        assert!(!OsFamily::Ubuntu.requires_boot_disk_resize());
        assert!(!OsFamily::Redhat.requires_boot_disk_resize());
    }

    #[test]
    fn test_split_template_path() {
        assert_eq!(
            split_template_path("/DC/vm/Templates/ubuntu-1.19"),
            Some(("/DC/vm/Templates", "ubuntu-1.19"))
        );
        assert_eq!(split_template_path("ubuntu-1.19"), None);
        assert_eq!(split_template_path("/ubuntu-1.19"), None);
    }
}
