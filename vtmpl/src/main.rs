use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tabled::{Table, Tabled};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vtmpl::templates::DEFAULT_TEMPLATE_LIBRARY;
use vtmpl::{FactoryConfig, MachineTemplateSpec, OsFamily, TemplateFactory};
use vtmpl_govc::{Govc, GovcConfig};

#[derive(Parser)]
#[command(name = "vtmpl")]
#[command(about = "Provision Kubernetes node VM templates in vSphere")]
struct Cli {
    /// Datacenter (defaults to GOVC_DATACENTER)
    #[arg(long)]
    datacenter: Option<String>,

    /// Datastore backing the content library and new templates
    #[arg(long, default_value = "")]
    datastore: String,

    /// Network the template NICs are mapped to
    #[arg(long, default_value = "")]
    network: String,

    /// Resource pool for deployed VMs
    #[arg(long, default_value = "*/Resources")]
    resource_pool: String,

    /// Content library holding imported OVAs
    #[arg(long, default_value = DEFAULT_TEMPLATE_LIBRARY)]
    library: String,

    /// Directory for files handed to govc
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// govc binary
    #[arg(long, default_value = "govc")]
    govc: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a template unless one with the same name exists
    Create {
        /// Template path, e.g. /Datacenter/vm/Templates/ubuntu-1.19
        template: String,

        /// OS family of the image: ubuntu, bottlerocket or redhat
        #[arg(long, default_value = "ubuntu")]
        os_family: OsFamily,

        /// OVA to import
        #[arg(long)]
        ova_url: String,

        /// Tag to attach, as <category>=<tag> (repeatable)
        #[arg(long = "tag", value_parser = parse_tag)]
        tags: Vec<(String, String)>,
    },

    /// Delete a template
    Delete {
        /// Template path
        template: String,
    },

    /// List the tags attached to a template
    Tags {
        /// Template path
        template: String,
    },
}

impl Cli {
    /// Placement flags that only `create` needs.
    fn validate(&self) -> Result<()> {
        if let Commands::Create { .. } = self.command {
            if self.datastore.is_empty() {
                anyhow::bail!("--datastore is required to create templates");
            }
            if self.network.is_empty() {
                anyhow::bail!("--network is required to create templates");
            }
        }
        Ok(())
    }
}

#[derive(Tabled)]
struct TagRow {
    #[tabled(rename = "TAG")]
    name: String,
}

fn parse_tag(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((category, tag)) if !category.is_empty() && !tag.is_empty() => {
            Ok((category.to_string(), tag.to_string()))
        }
        _ => Err(format!("expected <category>=<tag>, got '{}'", s)),
    }
}

fn group_tags(tags: Vec<(String, String)>) -> BTreeMap<String, Vec<String>> {
    let mut by_category: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (category, tag) in tags {
        by_category.entry(category).or_default().push(tag);
    }
    by_category
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("vtmpl=info".parse()?))
        .init();

    let cli = Cli::parse();
    cli.validate()?;

    let mut govc_config = GovcConfig::from_env()
        .context("Failed to load govc configuration")?
        .with_binary(&cli.govc);
    if let Some(state_dir) = &cli.state_dir {
        tokio::fs::create_dir_all(state_dir).await?;
        govc_config = govc_config.with_state_dir(state_dir);
    }

    let datacenter = cli
        .datacenter
        .clone()
        .unwrap_or_else(|| govc_config.datacenter.clone());

    let govc = Arc::new(Govc::from_config(&govc_config));
    let config = FactoryConfig::new(
        datacenter.clone(),
        cli.datastore.clone(),
        cli.network.clone(),
        cli.resource_pool.clone(),
    )
    .with_library(cli.library.clone());
    let factory = TemplateFactory::new(Arc::clone(&govc), config);

    let result = run(&factory, &datacenter, cli.command).await;

    if let Err(e) = govc.logout().await {
        warn!(error = %e, "Failed to log out from govc session");
    }

    result
}

async fn run(factory: &TemplateFactory<Govc>, datacenter: &str, command: Commands) -> Result<()> {
    match command {
        Commands::Create {
            template,
            os_family,
            ova_url,
            tags,
        } => {
            let mut spec = MachineTemplateSpec::new(template, os_family, ova_url);
            let tags_by_category = group_tags(tags);
            let ova_url = spec.ova_url.clone();

            factory
                .create_if_missing(datacenter, &mut spec, &ova_url, &tags_by_category)
                .await?;
            info!(template = %spec.path, "Template ready");
            println!("{}", spec.path);
        }
        Commands::Delete { template } => {
            factory.delete_template(&template).await?;
            info!(template = %template, "Template deleted");
        }
        Commands::Tags { template } => {
            let rows: Vec<TagRow> = factory
                .tags()
                .attached_tags(&template)
                .await?
                .into_iter()
                .map(|name| TagRow { name })
                .collect();
            println!("{}", Table::new(rows));
        }
    }

    Ok(())
}
