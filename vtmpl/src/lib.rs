//! vtmpl: VM template provisioning for vSphere
//!
//! Makes sure a named Kubernetes node template exists in a datacenter before
//! machines are cloned from it: imports the OVA into a content library,
//! deploys it, resizes the boot disk where the OS needs it, snapshots it,
//! converts it to a template and tags it.

pub mod client;
pub mod disk;
pub mod library;
pub mod machine;
pub mod tags;
pub mod templates;

pub use client::{DeployClient, LibraryClient, TagClient, TemplateFinder, VsphereClient};
pub use machine::{MachineTemplateSpec, OsFamily};
pub use tags::{TagError, TagFactory};
pub use templates::{FactoryConfig, TemplateError, TemplateFactory};
