//! Template factory - makes sure a VM template exists before machines are
//! cloned from it.
//!
//! Creating a template runs these steps in order:
//! 1. create the content library if it is missing
//! 2. import the OVA unless a valid element is already in the library
//!    (a corrupted element is deleted and imported again)
//! 3. deploy a VM from the library element into the template folder
//! 4. grow the boot disk for OS families that need it
//! 5. snapshot the VM and mark it as a template
//! 6. tag the template
//!
//! Nothing is rolled back on failure. Every step checks the current state
//! first, so calling [`TemplateFactory::create_if_missing`] again resumes
//! from whatever was left behind. A VM that was deployed but never converted
//! shows up in the template search; it is finished from its snapshot state
//! instead of being treated as an existing template.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};
use vtmpl_govc::{DeployRequest, GovcError};

use crate::client::VsphereClient;
use crate::disk::{DiskLayout, DiskResizePolicy};
use crate::library::{LibraryElementState, element_path};
use crate::machine::{MachineTemplateSpec, OsFamily, split_template_path};
use crate::tags::{TagError, TagFactory};

/// Snapshot every template carries; vSphere needs it for linked clones.
pub const ROOT_SNAPSHOT: &str = "root";

pub const DEFAULT_TEMPLATE_LIBRARY: &str = "eks-a-templates";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed checking if template exists: {0}")]
    Search(GovcError),

    #[error(
        "specified template '{template}' maps to multiple paths within the datacenter '{datacenter}': {}",
        .matches.join(", ")
    )]
    AmbiguousTemplate {
        template: String,
        datacenter: String,
        matches: Vec<String>,
    },

    #[error("failed inspecting existing vm {path}: {source}")]
    Inspect { path: String, source: GovcError },

    #[error("invalid template path '{0}', expected <folder>/<name>")]
    InvalidPath(String),

    #[error("failed to validate library for new template: {0}")]
    ValidateLibrary(GovcError),

    #[error("failed creating library for new template: {0}")]
    CreateLibrary(GovcError),

    #[error("failed to validate template in library: {0}")]
    ValidateElement(GovcError),

    #[error("failed deleting corrupted template: {0}")]
    DeleteCorrupted(GovcError),

    #[error("failed importing template into library: {0}")]
    Import(GovcError),

    #[error("failed creating template folder {folder}: {source}")]
    CreateFolder { folder: String, source: GovcError },

    #[error("failed deploying template: {0}")]
    Deploy(GovcError),

    #[error("failed getting template devices info: {0}")]
    DevicesInfo(GovcError),

    #[error("template {0} is not valid as there are no associated disks")]
    NoResizableDisk(String),

    #[error("failed resizing disk {disk} to {size_gib}G: {source}")]
    ResizeDisk {
        disk: String,
        size_gib: u32,
        source: GovcError,
    },

    #[error("failed taking template snapshot: {0}")]
    Snapshot(GovcError),

    #[error("failed marking vm as template: {0}")]
    MarkAsTemplate(GovcError),

    #[error("failed tagging template: {0}")]
    Tagging(#[from] TagError),

    #[error("failed deleting template: {0}")]
    Delete(GovcError),
}

pub type Result<T> = std::result::Result<T, TemplateError>;

/// Where new templates are placed.
#[derive(Debug, Clone)]
pub struct FactoryConfig {
    pub datacenter: String,
    pub datastore: String,
    pub network: String,
    pub resource_pool: String,
    pub library: String,
    pub disk_policy: DiskResizePolicy,
}

impl FactoryConfig {
    pub fn new(
        datacenter: impl Into<String>,
        datastore: impl Into<String>,
        network: impl Into<String>,
        resource_pool: impl Into<String>,
    ) -> Self {
        Self {
            datacenter: datacenter.into(),
            datastore: datastore.into(),
            network: network.into(),
            resource_pool: resource_pool.into(),
            library: DEFAULT_TEMPLATE_LIBRARY.to_string(),
            disk_policy: DiskResizePolicy::default(),
        }
    }

    pub fn with_library(mut self, library: impl Into<String>) -> Self {
        self.library = library.into();
        self
    }
}

/// Creates VM templates on demand.
pub struct TemplateFactory<C> {
    client: Arc<C>,
    tags: TagFactory<C>,
    config: FactoryConfig,
}

impl<C: VsphereClient> TemplateFactory<C> {
    pub fn new(client: Arc<C>, config: FactoryConfig) -> Self {
        Self {
            tags: TagFactory::new(Arc::clone(&client)),
            client,
            config,
        }
    }

    pub fn tags(&self) -> &TagFactory<C> {
        &self.tags
    }

    /// Make sure the template described by `spec` exists.
    ///
    /// If a single template with the same name already exists anywhere in
    /// the datacenter, `spec.path` is rewritten to its full path and nothing
    /// else happens. A match that is still a plain VM is finished and tagged.
    /// Otherwise the template is created at `spec.path` and tagged with
    /// `tags_by_category`.
    pub async fn create_if_missing(
        &self,
        datacenter: &str,
        spec: &mut MachineTemplateSpec,
        ova_url: &str,
        tags_by_category: &BTreeMap<String, Vec<String>>,
    ) -> Result<()> {
        let candidates = self
            .client
            .search_template(datacenter, &spec.path)
            .await
            .map_err(TemplateError::Search)?;

        match match_template(datacenter, &spec.path, candidates)? {
            Some(found) => {
                let is_template = self
                    .client
                    .is_template(datacenter, &found)
                    .await
                    .map_err(|source| TemplateError::Inspect {
                        path: found.clone(),
                        source,
                    })?;
                spec.path = found;

                if is_template {
                    info!(template = %spec.path, "Template already exists. Skipping creation");
                    return Ok(());
                }

                warn!(vm = %spec.path, "Resuming template creation from deployed vm");
                self.resume_template(&spec.path, spec.os_family).await?;
            }
            None => {
                info!(template = %spec.path, "Template not available. Creating");
                self.create_template(&spec.path, ova_url, spec.os_family).await?;
            }
        }

        self.tags.tag_template(&spec.path, tags_by_category).await?;
        Ok(())
    }

    /// Remove a template from the inventory.
    pub async fn delete_template(&self, path: &str) -> Result<()> {
        self.client
            .delete_template(&self.config.resource_pool, path)
            .await
            .map_err(TemplateError::Delete)
    }

    async fn create_template(&self, path: &str, ova_url: &str, os_family: OsFamily) -> Result<()> {
        let (folder, name) =
            split_template_path(path).ok_or_else(|| TemplateError::InvalidPath(path.to_string()))?;

        self.create_library_if_missing().await?;

        info!(template = %path, "Creating template. This might take a while.");
        self.import_ova_if_missing(name, ova_url).await?;
        self.deploy(folder, name).await?;

        self.finish_template(path, name, os_family, false).await
    }

    /// Finish a VM left behind by an earlier run that failed after deploy.
    async fn resume_template(&self, path: &str, os_family: OsFamily) -> Result<()> {
        let (_, name) =
            split_template_path(path).ok_or_else(|| TemplateError::InvalidPath(path.to_string()))?;

        let has_snapshot = self
            .client
            .has_snapshot(path)
            .await
            .map_err(|source| TemplateError::Inspect {
                path: path.to_string(),
                source,
            })?;

        self.finish_template(path, name, os_family, has_snapshot).await
    }

    /// Resize, snapshot and convert a deployed VM.
    ///
    /// A VM that already has a snapshot got past the resize, so only the
    /// conversion is left.
    async fn finish_template(
        &self,
        path: &str,
        name: &str,
        os_family: OsFamily,
        has_snapshot: bool,
    ) -> Result<()> {
        if !has_snapshot {
            if os_family.requires_boot_disk_resize() {
                self.resize_boot_disk(name).await?;
            }

            debug!(template = %path, "Taking template snapshot");
            self.client
                .create_snapshot(&self.config.datacenter, path, ROOT_SNAPSHOT)
                .await
                .map_err(TemplateError::Snapshot)?;
        }

        debug!(template = %path, "Marking vm as template");
        self.client
            .mark_as_template(&self.config.datacenter, path)
            .await
            .map_err(TemplateError::MarkAsTemplate)?;

        Ok(())
    }

    async fn create_library_if_missing(&self) -> Result<()> {
        let library = &self.config.library;
        let exists = self
            .client
            .library_exists(library)
            .await
            .map_err(TemplateError::ValidateLibrary)?;

        if !exists {
            info!(library = %library, "Creating library");
            self.client
                .create_library(&self.config.datastore, library)
                .await
                .map_err(TemplateError::CreateLibrary)?;
        }

        Ok(())
    }

    async fn import_ova_if_missing(&self, name: &str, ova_url: &str) -> Result<()> {
        let element = element_path(&self.config.library, name);
        let version = self
            .client
            .content_version(&element)
            .await
            .map_err(TemplateError::ValidateElement)?;

        let state = LibraryElementState::classify(version.as_deref());
        if state == LibraryElementState::Corrupted {
            warn!(element = %element, "Deleting corrupted library element");
            self.client
                .delete_library_element(&element)
                .await
                .map_err(TemplateError::DeleteCorrupted)?;
        }

        if !state.needs_import() {
            debug!(element = %element, "Template already in library");
            return Ok(());
        }

        info!(ova = %ova_url, "Importing template from ova url");
        self.client
            .import_template(&self.config.library, ova_url, name)
            .await
            .map_err(TemplateError::Import)
    }

    async fn deploy(&self, folder: &str, name: &str) -> Result<()> {
        self.ensure_folder(folder).await?;

        let request = DeployRequest {
            library: &self.config.library,
            template_name: name,
            vm_name: name,
            folder,
            datacenter: &self.config.datacenter,
            datastore: &self.config.datastore,
            network: &self.config.network,
            resource_pool: &self.config.resource_pool,
        };

        self.client
            .deploy_from_library(&request)
            .await
            .map_err(TemplateError::Deploy)
    }

    async fn ensure_folder(&self, folder: &str) -> Result<()> {
        match self.client.folder_exists(folder).await {
            Ok(true) => return Ok(()),
            Ok(false) => debug!(folder = %folder, "Template folder not found"),
            Err(e) => warn!(folder = %folder, error = %e, "Failed obtaining folder information"),
        }

        info!(folder = %folder, "Creating template folder");
        self.client
            .create_folder(folder)
            .await
            .map_err(|source| TemplateError::CreateFolder {
                folder: folder.to_string(),
                source,
            })
    }

    async fn resize_boot_disk(&self, name: &str) -> Result<()> {
        let datacenter = &self.config.datacenter;
        let devices = self
            .client
            .devices_info(datacenter, name)
            .await
            .map_err(TemplateError::DevicesInfo)?;

        let layout = DiskLayout::detect(&devices)
            .ok_or_else(|| TemplateError::NoResizableDisk(name.to_string()))?;
        let size_gib = layout.target_size_gib(&self.config.disk_policy);

        info!(template = %name, disk = %layout.disk_name(), size_gib, "Resizing boot disk");
        self.client
            .resize_disk(datacenter, name, layout.disk_name(), size_gib)
            .await
            .map_err(|source| TemplateError::ResizeDisk {
                disk: layout.disk_name().to_string(),
                size_gib,
                source,
            })
    }
}

/// Pick the template matching `template` out of the search results.
///
/// A candidate matches when its path ends with the requested path. More
/// than one match is a configuration error.
pub fn match_template(
    datacenter: &str,
    template: &str,
    candidates: Vec<String>,
) -> Result<Option<String>> {
    let mut matches: Vec<String> = candidates
        .into_iter()
        .filter(|c| c.ends_with(template))
        .collect();

    match matches.len() {
        0 => {
            debug!(template = %template, "Template not found");
            Ok(None)
        }
        1 => Ok(matches.pop()),
        _ => Err(TemplateError::AmbiguousTemplate {
            template: template.to_string(),
            datacenter: datacenter.to_string(),
            matches,
        }),
    }
}
