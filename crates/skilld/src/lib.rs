//! skilld - skill repository resolver daemon
//!
//! Resolves GitHub repository references into skill listings or bundled
//! skill documents and serves them over a small HTTP API.

pub mod branch;
pub mod collector;
mod discovery;
pub mod github;
pub mod resolver;
pub mod server;
pub mod validate;
pub mod walker;

#[cfg(test)]
mod testing;

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use skill_core::config::ConfigError;
use skill_core::ResolverConfig;
use tracing::info;

use github::GitHubClient;
use resolver::Resolver;

pub use github::{HostError, RepoHost};
pub use resolver::{Resolution, ResolveRequest, ResolvedBundle};

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind (default: 127.0.0.1).
    pub bind: IpAddr,
    /// HTTP server port (default: 7710).
    pub port: u16,
    /// Resolver settings and classification tables.
    pub resolver: ResolverConfig,
    /// Token sent to the GitHub API, if any.
    pub github_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 7710,
            resolver: ResolverConfig::default(),
            github_token: std::env::var("GITHUB_TOKEN").ok(),
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

/// Get the default config path (~/.config/skilld/config).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("skilld").join("config"))
}

/// Load resolver settings from `explicit`, else from the default path if it
/// exists, else use defaults.
pub fn load_resolver_config(explicit: Option<&Path>) -> Result<ResolverConfig, ConfigError> {
    if let Some(path) = explicit {
        info!("config: {}", path.display());
        return ResolverConfig::from_file(path);
    }
    match default_config_path() {
        Some(path) if path.exists() => {
            info!("config: {}", path.display());
            ResolverConfig::from_file(&path)
        }
        _ => Ok(ResolverConfig::default()),
    }
}

/// Run the HTTP server until `shutdown` resolves.
pub async fn run<F>(config: ServerConfig, shutdown: F) -> eyre::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("skilld starting on {}", config.addr());
    info!("github api: {}", config.resolver.github_api_base);
    if config.github_token.is_some() {
        info!("github token: enabled");
    }

    let client = GitHubClient::new(&config.resolver, config.github_token.clone())?;
    let resolver = Resolver::new(client, config.resolver.clone());
    server::start_server(resolver, config.addr(), shutdown).await?;

    info!("skilld stopped");
    Ok(())
}
