use anyhow::{Context, Result, bail};
use std::time::Duration;

use gametaverns_api_client::ApiClient;

use crate::config::{CliConfig, save_config};

fn client(config: &CliConfig) -> Result<ApiClient> {
    let mut client = ApiClient::new(&config.server.url, Duration::from_secs(10))
        .context("building HTTP client")?;
    if let Some(key) = config.api_key() {
        client.set_api_key(key.to_string());
    }
    Ok(client)
}

/// Client that refuses to run without an API key.
pub fn authed_client(config: &CliConfig) -> Result<ApiClient> {
    if config.api_key().is_none() {
        bail!("API key not configured. Run: gametaverns register <name> --save, or pass --api-key");
    }
    client(config)
}

pub fn public_client(config: &CliConfig) -> Result<ApiClient> {
    client(config)
}

/// Check server health status
pub async fn run_health(config: &CliConfig) -> Result<()> {
    let client = public_client(config)?;
    match client.health().await {
        Ok(resp) => println!(
            "Server: {} (v{})  URL: {}",
            resp.status, resp.version, config.server.url
        ),
        Err(e) => println!("Server: offline  URL: {}  Error: {}", config.server.url, e),
    }
    Ok(())
}

pub async fn run_whoami(config: &CliConfig) -> Result<()> {
    let me = authed_client(config)?
        .me()
        .await
        .context("verifying API key")?;
    let role = if me.is_admin { " [admin]" } else { "" };
    println!("Authenticated as: {}{} (user_id: {})", me.display_name, role, me.user_id);
    Ok(())
}

/// Create an account. The key is printed once; `save` also writes it to the
/// config file together with the server URL it belongs to.
pub async fn run_register(config: &CliConfig, display_name: &str, save: bool) -> Result<()> {
    let resp = public_client(config)?
        .register(display_name)
        .await
        .context("registering account")?;
    println!("Registered {} (user_id: {})", resp.display_name, resp.user_id);
    println!("API key: {}", resp.api_key);

    if save {
        let mut saved = config.clone();
        saved.server.api_key = resp.api_key;
        save_config(&saved)?;
        println!("API key saved to config.");
    } else {
        println!("Store it now; it cannot be shown again.");
    }
    Ok(())
}
