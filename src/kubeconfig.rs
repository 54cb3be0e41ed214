//! Kubeconfig materialization from the environment
//!
//! The scaler is handed its cluster credentials as raw kubeconfig text in
//! `KUBECONFIG_CONTENT`. The text is parsed in memory and turned into a
//! kube [`Client`]; nothing is written to disk.

use std::time::Duration;

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::{debug, error};

use crate::Error;

/// Environment variable holding the raw kubeconfig text
pub const KUBECONFIG_CONTENT_ENV: &str = "KUBECONFIG_CONTENT";

/// Default connection timeout for kube clients
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default read timeout for kube clients
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Options for building a client from kubeconfig text
#[derive(Clone, Debug)]
pub struct ClientOptions {
    /// Kubeconfig context to use (defaults to current-context)
    pub context: Option<String>,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Read timeout
    pub read_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            context: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Read the kubeconfig text from `KUBECONFIG_CONTENT`
pub fn kubeconfig_content_from_env() -> Result<String, Error> {
    content_from_lookup(|key| std::env::var(key).ok())
}

/// Read the kubeconfig text through an arbitrary variable lookup.
///
/// A missing or empty variable is an error.
pub fn content_from_lookup<F>(lookup: F) -> Result<String, Error>
where
    F: FnOnce(&str) -> Option<String>,
{
    match lookup(KUBECONFIG_CONTENT_ENV) {
        Some(content) if !content.trim().is_empty() => Ok(content),
        _ => {
            error!(
                variable = KUBECONFIG_CONTENT_ENV,
                "Missing environmental variable"
            );
            Err(Error::MissingKubeconfig(KUBECONFIG_CONTENT_ENV))
        }
    }
}

/// Parse raw kubeconfig text
pub fn parse_kubeconfig(content: &str) -> Result<Kubeconfig, Error> {
    serde_yaml::from_str(content)
        .map_err(|e| Error::kubeconfig(format!("invalid kubeconfig YAML: {e}")))
}

/// Build a kube [`Config`] from raw kubeconfig text
pub async fn config_from_content(content: &str, options: &ClientOptions) -> Result<Config, Error> {
    let kubeconfig = parse_kubeconfig(content)?;
    let kube_options = KubeConfigOptions {
        context: options.context.clone(),
        ..Default::default()
    };

    let mut config = Config::from_custom_kubeconfig(kubeconfig, &kube_options)
        .await
        .map_err(|e| Error::kubeconfig(format!("failed to load kubeconfig: {e}")))?;
    config.connect_timeout = Some(options.connect_timeout);
    config.read_timeout = Some(options.read_timeout);

    debug!(cluster_url = %config.cluster_url, "loaded kubeconfig");
    Ok(config)
}

/// Build a kube [`Client`] from raw kubeconfig text
pub async fn client_from_content(content: &str, options: &ClientOptions) -> Result<Client, Error> {
    let config = config_from_content(content, options).await?;
    Client::try_from(config).map_err(|e| Error::kubeconfig(format!("failed to create client: {e}")))
}

/// Build a kube [`Client`] from `KUBECONFIG_CONTENT`
pub async fn client_from_env(options: &ClientOptions) -> Result<Client, Error> {
    let content = kubeconfig_content_from_env()?;
    client_from_content(&content, options).await
}
