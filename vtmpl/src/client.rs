//! Capability traits over the vSphere client.
//!
//! The engine only talks to vSphere through these narrow traits. [`Govc`]
//! implements all of them; tests plug in in-memory fakes.

use async_trait::async_trait;
use vtmpl_govc::{DeployRequest, Executable, Govc, ObjectType, Result, Tag, VirtualDevice};

/// Template lookup.
#[async_trait]
pub trait TemplateFinder: Send + Sync {
    /// Inventory paths of every VM under the datacenter named like the base
    /// name of `template`.
    async fn search_template(&self, datacenter: &str, template: &str) -> Result<Vec<String>>;

    /// Whether the VM at `path` has been converted to a template.
    async fn is_template(&self, datacenter: &str, path: &str) -> Result<bool>;

    async fn has_snapshot(&self, path: &str) -> Result<bool>;
}

/// Content library operations.
#[async_trait]
pub trait LibraryClient: Send + Sync {
    async fn library_exists(&self, library: &str) -> Result<bool>;

    async fn create_library(&self, datastore: &str, library: &str) -> Result<()>;

    /// Raw content version of `library/element`, `None` when absent.
    async fn content_version(&self, element: &str) -> Result<Option<String>>;

    async fn delete_library_element(&self, element: &str) -> Result<()>;

    async fn import_template(&self, library: &str, ova_url: &str, name: &str) -> Result<()>;
}

/// Folder, VM and template operations.
#[async_trait]
pub trait DeployClient: Send + Sync {
    async fn folder_exists(&self, path: &str) -> Result<bool>;

    async fn create_folder(&self, path: &str) -> Result<()>;

    async fn deploy_from_library(&self, request: &DeployRequest<'_>) -> Result<()>;

    async fn devices_info(&self, datacenter: &str, vm: &str) -> Result<Vec<VirtualDevice>>;

    async fn resize_disk(
        &self,
        datacenter: &str,
        vm: &str,
        disk_name: &str,
        size_gib: u32,
    ) -> Result<()>;

    async fn create_snapshot(&self, datacenter: &str, vm: &str, name: &str) -> Result<()>;

    async fn mark_as_template(&self, datacenter: &str, vm: &str) -> Result<()>;

    async fn delete_template(&self, resource_pool: &str, path: &str) -> Result<()>;
}

/// Category and tag operations.
#[async_trait]
pub trait TagClient: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<String>>;

    async fn create_category(&self, name: &str, object_types: &[ObjectType]) -> Result<()>;

    async fn list_tags(&self) -> Result<Vec<Tag>>;

    async fn create_tag(&self, tag: &str, category: &str) -> Result<()>;

    async fn attach_tag(&self, path: &str, tag: &str) -> Result<()>;

    async fn attached_tags(&self, path: &str) -> Result<Vec<String>>;
}

/// Everything the template factory needs.
pub trait VsphereClient: TemplateFinder + LibraryClient + DeployClient + TagClient {}

impl<T> VsphereClient for T where T: TemplateFinder + LibraryClient + DeployClient + TagClient {}

#[async_trait]
impl<E: Executable> TemplateFinder for Govc<E> {
    async fn search_template(&self, datacenter: &str, template: &str) -> Result<Vec<String>> {
        Govc::search_template(self, datacenter, template).await
    }

    async fn is_template(&self, datacenter: &str, path: &str) -> Result<bool> {
        Govc::is_template(self, datacenter, path).await
    }

    async fn has_snapshot(&self, path: &str) -> Result<bool> {
        Govc::has_snapshot(self, path).await
    }
}

#[async_trait]
impl<E: Executable> LibraryClient for Govc<E> {
    async fn library_exists(&self, library: &str) -> Result<bool> {
        Govc::library_exists(self, library).await
    }

    async fn create_library(&self, datastore: &str, library: &str) -> Result<()> {
        Govc::create_library(self, datastore, library).await
    }

    async fn content_version(&self, element: &str) -> Result<Option<String>> {
        self.library_element_content_version(element).await
    }

    async fn delete_library_element(&self, element: &str) -> Result<()> {
        Govc::delete_library_element(self, element).await
    }

    async fn import_template(&self, library: &str, ova_url: &str, name: &str) -> Result<()> {
        Govc::import_template(self, library, ova_url, name).await
    }
}

#[async_trait]
impl<E: Executable> DeployClient for Govc<E> {
    async fn folder_exists(&self, path: &str) -> Result<bool> {
        Govc::folder_exists(self, path).await
    }

    async fn create_folder(&self, path: &str) -> Result<()> {
        Govc::create_folder(self, path).await
    }

    async fn deploy_from_library(&self, request: &DeployRequest<'_>) -> Result<()> {
        Govc::deploy_from_library(self, request).await
    }

    async fn devices_info(&self, datacenter: &str, vm: &str) -> Result<Vec<VirtualDevice>> {
        Govc::devices_info(self, datacenter, vm).await
    }

    async fn resize_disk(
        &self,
        datacenter: &str,
        vm: &str,
        disk_name: &str,
        size_gib: u32,
    ) -> Result<()> {
        Govc::resize_disk(self, datacenter, vm, disk_name, size_gib).await
    }

    async fn create_snapshot(&self, datacenter: &str, vm: &str, name: &str) -> Result<()> {
        Govc::create_snapshot(self, datacenter, vm, name).await
    }

    async fn mark_as_template(&self, datacenter: &str, vm: &str) -> Result<()> {
        Govc::mark_as_template(self, datacenter, vm).await
    }

    async fn delete_template(&self, resource_pool: &str, path: &str) -> Result<()> {
        Govc::delete_template(self, resource_pool, path).await
    }
}

#[async_trait]
impl<E: Executable> TagClient for Govc<E> {
    async fn list_categories(&self) -> Result<Vec<String>> {
        Govc::list_categories(self).await
    }

    async fn create_category(&self, name: &str, object_types: &[ObjectType]) -> Result<()> {
        Govc::create_category(self, name, object_types).await
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        Govc::list_tags(self).await
    }

    async fn create_tag(&self, tag: &str, category: &str) -> Result<()> {
        Govc::create_tag(self, tag, category).await
    }

    async fn attach_tag(&self, path: &str, tag: &str) -> Result<()> {
        Govc::attach_tag(self, path, tag).await
    }

    async fn attached_tags(&self, path: &str) -> Result<Vec<String>> {
        Govc::attached_tags(self, path).await
    }
}
