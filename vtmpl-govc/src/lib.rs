//! vtmpl-govc: vSphere client for vtmpl
//!
//! Wraps the `govc` command line tool. Every operation is a single `govc`
//! invocation whose JSON output is decoded into the types in [`types`].

pub mod config;
pub mod error;
pub mod exec;
pub mod govc;
pub mod retry;
pub mod types;

pub use config::GovcConfig;
pub use error::{GovcError, Result};
pub use exec::{Executable, GovcExecutable};
pub use govc::{DeployRequest, Govc};
pub use retry::Retrier;
pub use types::{Category, ObjectType, Tag, VirtualDevice};
