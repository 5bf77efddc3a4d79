//! Command line and environment configuration.
//!
//! Every setting can be given as a flag or through the environment variable
//! named next to it. A `.env` file in the working directory is loaded first.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use repo_host_core::{LocalRepoStorage, ResourceGateway, DEFAULT_STORAGE_ROOT};
use repo_host_policy::{
    FactStore, InMemoryFactStore, OsoCloudClient, OsoCloudConfig, PolicyEvaluator,
    RoleTableEvaluator, DEFAULT_OSO_URL,
};

pub const DEFAULT_BIND_ADDR: &str = "localhost:5000";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Parser)]
#[command(name = "repo-host", version, about = "Authorization-gated repository host")]
pub struct Cli {
    #[command(flatten)]
    pub settings: Settings,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Print the Polar policy rendered from the role table.
    PrintPolicy,
    /// Upload the rendered policy to the hosted policy service.
    PushPolicy,
    /// Delete every fact held by the hosted policy service.
    ClearData,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum PolicyBackend {
    /// In-process facts and the local role table.
    #[default]
    Local,
    /// A hosted Oso Cloud compatible service.
    OsoCloud,
}

#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Address to listen on.
    #[arg(long, env = "REPO_HOST_BIND", default_value = DEFAULT_BIND_ADDR)]
    pub bind: String,

    /// Directory holding every user's repositories.
    #[arg(long, env = "REPO_HOST_STORAGE_ROOT", default_value = DEFAULT_STORAGE_ROOT)]
    pub storage_root: PathBuf,

    #[arg(long, env = "REPO_HOST_POLICY_BACKEND", value_enum, default_value_t = PolicyBackend::Local)]
    pub policy_backend: PolicyBackend,

    #[arg(long, env = "OSO_URL", default_value = DEFAULT_OSO_URL)]
    pub oso_url: String,

    /// API key for the hosted policy service.
    #[arg(long, env = "OSO_AUTH", hide_env_values = true)]
    pub oso_auth: Option<String>,

    /// Timeout for each call to the hosted policy service.
    #[arg(long, env = "REPO_HOST_POLICY_TIMEOUT_SECS", default_value_t = 10)]
    pub policy_timeout_secs: u64,

    /// Push the rendered policy to the hosted service before serving.
    #[arg(long, env = "REPO_HOST_PUSH_POLICY")]
    pub push_policy: bool,

    #[arg(long, env = "REPO_HOST_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,
}

impl Settings {
    pub fn oso_client(&self) -> anyhow::Result<OsoCloudClient> {
        let api_key = self
            .oso_auth
            .clone()
            .filter(|k| !k.trim().is_empty())
            .context("OSO_AUTH must be set to use the hosted policy service")?;
        let config = OsoCloudConfig::new(api_key)
            .with_url(self.oso_url.clone())
            .with_timeout(Duration::from_secs(self.policy_timeout_secs));
        OsoCloudClient::new(config).context("failed to build policy service client")
    }

    /// Fact store and evaluator for the configured backend.
    pub fn policy(&self) -> anyhow::Result<(Arc<dyn FactStore>, Arc<dyn PolicyEvaluator>)> {
        match self.policy_backend {
            PolicyBackend::Local => {
                let facts: Arc<dyn FactStore> = Arc::new(InMemoryFactStore::new());
                let evaluator: Arc<dyn PolicyEvaluator> =
                    Arc::new(RoleTableEvaluator::new(facts.clone()));
                Ok((facts, evaluator))
            }
            PolicyBackend::OsoCloud => {
                let client = Arc::new(self.oso_client()?);
                let facts: Arc<dyn FactStore> = client.clone();
                let evaluator: Arc<dyn PolicyEvaluator> = client;
                Ok((facts, evaluator))
            }
        }
    }

    pub fn gateway(&self) -> anyhow::Result<ResourceGateway> {
        let (facts, evaluator) = self.policy()?;
        let storage = Arc::new(LocalRepoStorage::new(self.storage_root.clone()));
        Ok(ResourceGateway::new(facts, evaluator, storage))
    }
}
