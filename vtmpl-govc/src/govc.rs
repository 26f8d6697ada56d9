//! govc operations
//!
//! One method per vSphere operation. Lookups that are known to be flaky
//! (template search, folder checks, attached tags) run under the [`Retrier`];
//! mutating calls are issued exactly once.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::config::GovcConfig;
use crate::error::{GovcError, Result};
use crate::exec::{Executable, GovcExecutable};
use crate::retry::Retrier;
use crate::types::{
    Category, DeployOptions, DeviceInfoResponse, LibraryElementInfo, ObjectType, Tag,
    VirtualDevice, VmInfoResponse,
};

pub const DEPLOY_OPTS_FILE: &str = "deploy-opts.json";

/// Parameters for `library.deploy`.
#[derive(Debug, Clone)]
pub struct DeployRequest<'a> {
    pub library: &'a str,
    pub template_name: &'a str,
    pub vm_name: &'a str,
    pub folder: &'a str,
    pub datacenter: &'a str,
    pub datastore: &'a str,
    pub network: &'a str,
    pub resource_pool: &'a str,
}

/// vSphere client backed by the govc CLI.
pub struct Govc<E = GovcExecutable> {
    executable: E,
    retrier: Retrier,
    state_dir: PathBuf,
}

impl Govc<GovcExecutable> {
    pub fn from_config(config: &GovcConfig) -> Self {
        Self::new(GovcExecutable::new(config), config.state_dir.clone())
    }
}

impl<E: Executable> Govc<E> {
    pub fn new(executable: E, state_dir: impl Into<PathBuf>) -> Self {
        Self {
            executable,
            retrier: Retrier::default(),
            state_dir: state_dir.into(),
        }
    }

    pub fn with_retrier(mut self, retrier: Retrier) -> Self {
        self.retrier = retrier;
        self
    }

    async fn exec(&self, args: &[&str]) -> Result<String> {
        self.executable.execute(args).await
    }

    // === Session ===

    /// Close the current session and the one used by insecure (`-k`) commands.
    pub async fn logout(&self) -> Result<()> {
        debug!("Logging out from current govc session");
        self.exec(&["session.logout"]).await?;
        self.exec(&["session.logout", "-k"]).await?;
        Ok(())
    }

    // === Templates ===

    /// Find every VM under the datacenter whose name equals the base name of
    /// `template`. Returns the full inventory paths, possibly empty.
    pub async fn search_template(&self, datacenter: &str, template: &str) -> Result<Vec<String>> {
        let root = format!("/{}", datacenter);
        let args = [
            "find",
            "-json",
            root.as_str(),
            "-type",
            "VirtualMachine",
            "-name",
            base_name(template),
        ];

        let response = self.retrier.retry(|| self.exec(&args)).await?;
        let response = response.trim();
        if response.is_empty() || response == "null" {
            debug!(template = %template, "Template not found");
            return Ok(Vec::new());
        }

        match serde_json::from_str::<Vec<String>>(response) {
            Ok(paths) => Ok(paths),
            Err(e) => {
                debug!(response = %response, error = %e, "Failed unmarshalling govc find response");
                Ok(Vec::new())
            }
        }
    }

    /// Turn a template back into a VM, drop its snapshots and destroy it.
    pub async fn delete_template(&self, resource_pool: &str, path: &str) -> Result<()> {
        info!(template = %path, "Deleting template");
        self.exec(&["vm.markasvm", "-pool", resource_pool, path]).await?;
        self.exec(&["snapshot.remove", "-vm", path, "*"]).await?;
        self.exec(&["vm.destroy", path]).await?;
        Ok(())
    }

    /// Whether the VM at `path` has already been converted to a template.
    pub async fn is_template(&self, datacenter: &str, path: &str) -> Result<bool> {
        let response = self.exec(&["vm.info", "-dc", datacenter, "-json", path]).await?;
        let info: VmInfoResponse =
            serde_json::from_str(&response).map_err(|source| GovcError::Decode {
                command: "vm.info",
                source,
            })?;

        info.virtual_machines
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(|vm| vm.config.is_some_and(|c| c.template))
            .ok_or_else(|| GovcError::MissingVm(path.to_string()))
    }

    /// Whether the VM at `path` has at least one snapshot.
    pub async fn has_snapshot(&self, path: &str) -> Result<bool> {
        let response = self.exec(&["snapshot.tree", "-vm", path]).await?;
        Ok(!response.trim().is_empty())
    }

    // === Content library ===

    pub async fn library_exists(&self, library: &str) -> Result<bool> {
        let response = self.exec(&["library.ls", library]).await?;
        Ok(!response.trim().is_empty())
    }

    pub async fn create_library(&self, datastore: &str, library: &str) -> Result<()> {
        info!(library = %library, datastore = %datastore, "Creating content library");
        self.exec(&["library.create", "-ds", datastore, library]).await?;
        Ok(())
    }

    /// Raw content version of a library element, `None` if it does not exist.
    pub async fn library_element_content_version(&self, element: &str) -> Result<Option<String>> {
        let response = self.exec(&["library.info", "-json", element]).await?;
        let response = response.trim();
        if response == "null" {
            return Ok(None);
        }

        let info: Vec<LibraryElementInfo> =
            serde_json::from_str(response).map_err(|source| GovcError::Decode {
                command: "library.info",
                source,
            })?;

        info.into_iter()
            .next()
            .map(|i| Some(i.content_version))
            .ok_or_else(|| GovcError::MissingElementInfo(element.to_string()))
    }

    pub async fn delete_library_element(&self, element: &str) -> Result<()> {
        info!(element = %element, "Deleting library element");
        self.exec(&["library.rm", element]).await?;
        Ok(())
    }

    pub async fn import_template(&self, library: &str, ova_url: &str, name: &str) -> Result<()> {
        info!(ova = %ova_url, template = %name, "Importing template");
        self.exec(&["library.import", "-k", "-pull", "-n", name, library, ova_url]).await?;
        Ok(())
    }

    // === Folders ===

    /// Check whether an inventory folder exists.
    ///
    /// A "not found" answer is final; any other failure is retried.
    pub async fn folder_exists(&self, path: &str) -> Result<bool> {
        self.retrier
            .retry(|| async {
                match self.exec(&["folder.info", path]).await {
                    Ok(_) => Ok(true),
                    Err(e) if e.is_not_found() => Ok(false),
                    Err(e) => Err(e),
                }
            })
            .await
    }

    /// Create an inventory folder. A folder that already exists is success.
    pub async fn create_folder(&self, path: &str) -> Result<()> {
        self.retrier
            .retry(|| async {
                match self.exec(&["folder.create", path]).await {
                    Ok(_) => Ok(()),
                    Err(e) if e.is_already_exists() => {
                        debug!(folder = %path, "Folder already exists");
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            })
            .await
    }

    // === VMs ===

    /// Deploy a VM from a library element with thin provisioned disks.
    pub async fn deploy_from_library(&self, request: &DeployRequest<'_>) -> Result<()> {
        let element = library_element_path(request.library, request.template_name);

        let options = serde_json::to_vec(&DeployOptions::thin(request.network))
            .map_err(GovcError::DeployOptions)?;
        let options_path = self.state_dir.join(DEPLOY_OPTS_FILE);
        tokio::fs::write(&options_path, options)
            .await
            .map_err(|source| GovcError::WriteDeployOptions {
                path: options_path.clone(),
                source,
            })?;
        let options_path = options_path.to_string_lossy();

        info!(
            element = %element,
            vm = %request.vm_name,
            folder = %request.folder,
            "Deploying template from library"
        );

        self.exec(&[
            "library.deploy",
            "-dc",
            request.datacenter,
            "-ds",
            request.datastore,
            "-pool",
            request.resource_pool,
            "-folder",
            request.folder,
            "-options",
            options_path.as_ref(),
            element.as_str(),
            request.vm_name,
        ])
        .await?;

        Ok(())
    }

    pub async fn devices_info(&self, datacenter: &str, vm: &str) -> Result<Vec<VirtualDevice>> {
        let response = self.exec(&["device.info", "-dc", datacenter, "-vm", vm, "-json"]).await?;

        let info: DeviceInfoResponse =
            serde_json::from_str(&response).map_err(|source| GovcError::Decode {
                command: "device.info",
                source,
            })?;

        Ok(info
            .devices
            .unwrap_or_default()
            .into_iter()
            .map(VirtualDevice::from)
            .collect())
    }

    pub async fn resize_disk(
        &self,
        datacenter: &str,
        vm: &str,
        disk_name: &str,
        size_gib: u32,
    ) -> Result<()> {
        let size = format!("{}G", size_gib);
        info!(vm = %vm, disk = %disk_name, size = %size, "Resizing disk");
        self.exec(&[
            "vm.disk.change",
            "-dc",
            datacenter,
            "-vm",
            vm,
            "-disk.name",
            disk_name,
            "-size",
            size.as_str(),
        ])
        .await?;
        Ok(())
    }

    /// Snapshot a VM without its memory state.
    pub async fn create_snapshot(&self, datacenter: &str, vm: &str, name: &str) -> Result<()> {
        self.exec(&["snapshot.create", "-dc", datacenter, "-m=false", "-vm", vm, name]).await?;
        Ok(())
    }

    pub async fn mark_as_template(&self, datacenter: &str, vm: &str) -> Result<()> {
        self.exec(&["vm.markastemplate", "-dc", datacenter, vm]).await?;
        Ok(())
    }

    // === Tags ===

    pub async fn list_categories(&self) -> Result<Vec<String>> {
        let response = self.exec(&["tags.category.ls", "-json"]).await?;
        let categories: Vec<Category> = decode_list("tags.category.ls", &response)?;
        Ok(categories.into_iter().map(|c| c.name).collect())
    }

    pub async fn create_category(&self, name: &str, object_types: &[ObjectType]) -> Result<()> {
        let mut args = vec!["tags.category.create"];
        for t in object_types {
            args.push("-t");
            args.push(t.as_str());
        }
        args.push(name);

        self.exec(&args).await?;
        Ok(())
    }

    pub async fn list_tags(&self) -> Result<Vec<Tag>> {
        let response = self.exec(&["tags.ls", "-json"]).await?;
        decode_list("tags.ls", &response)
    }

    pub async fn create_tag(&self, tag: &str, category: &str) -> Result<()> {
        self.exec(&["tags.create", "-c", category, tag]).await?;
        Ok(())
    }

    pub async fn attach_tag(&self, path: &str, tag: &str) -> Result<()> {
        self.exec(&["tags.attach", tag, path]).await?;
        Ok(())
    }

    /// Names of the tags attached to an inventory object.
    pub async fn attached_tags(&self, path: &str) -> Result<Vec<String>> {
        let response = self
            .retrier
            .retry(|| async { self.exec(&["tags.attached.ls", "-json", "-r", path]).await })
            .await?;
        decode_list("tags.attached.ls", &response)
    }
}

/// Decode a JSON list where govc prints `null` for "nothing".
fn decode_list<T: serde::de::DeserializeOwned>(
    command: &'static str,
    response: &str,
) -> Result<Vec<T>> {
    let response = response.trim();
    if response.is_empty() || response == "null" {
        return Ok(Vec::new());
    }
    serde_json::from_str(response).map_err(|source| GovcError::Decode { command, source })
}

fn base_name(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}

fn library_element_path(library: &str, name: &str) -> String {
    let library = library.trim_matches('/');
    format!("/{}/{}", library, name)
}
