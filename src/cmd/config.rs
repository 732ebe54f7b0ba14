//! Configuration view and validation commands: `addon-sign config`.

use anyhow::Result;

use super::super::ConfigCommands;

pub fn cmd_config(project_dir: &std::path::Path, command: Option<ConfigCommands>) -> Result<()> {
    use addon_sign::config::{CONFIG_FILE_NAME, CliOverrides, SignConfig, SignToml, mask};

    let config_path = project_dir.join(CONFIG_FILE_NAME);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Signing Configuration");
            println!("=====================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No sign.toml found at {}", config_path.display());
            }
            println!();

            let toml = SignToml::load_or_default(project_dir)?;

            println!("[api]");
            if let Some(url) = &toml.api.url {
                println!("  url = \"{}\"", url);
            }
            if let Some(key) = &toml.api.key {
                println!("  key = \"{}\"", key);
            }
            if let Some(secret) = &toml.api.secret {
                println!("  secret = \"{}\"", mask(secret));
            }
            if let Some(proxy) = &toml.api.proxy {
                println!("  proxy = \"{}\"", proxy);
            }
            println!();

            println!("[signing]");
            println!("  timeout_ms = {}", toml.signing.timeout_ms);
            println!("  poll_interval_ms = {}", toml.signing.poll_interval_ms);
            if let Some(channel) = toml.signing.channel {
                println!("  channel = \"{}\"", channel);
            }
            if let Some(dir) = &toml.signing.download_dir {
                println!("  download_dir = \"{}\"", dir.display());
            }
            println!();

            println!("Effective values (with env overrides):");
            match SignConfig::resolve(&toml, &CliOverrides::default()) {
                Ok(config) => {
                    println!("  api_url = \"{}\"", config.api_url);
                    println!("  api_key = \"{}\"", config.credentials.issuer());
                    println!("  timeout_ms = {}", config.poll.timeout.as_millis());
                    println!("  download_dir = \"{}\"", config.download_dir.display());
                }
                Err(e) => println!("  (incomplete) {}", e),
            }
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let toml = SignToml::load_or_default(project_dir)?;
            SignConfig::resolve(&toml, &CliOverrides::default())?;
            println!("Configuration is valid.");
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("sign.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            SignToml::default().save(&config_path)?;

            println!("Created sign.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [api] url, key, secret, proxy");
            println!("  - [signing] timeout_ms, poll_interval_ms, channel, download_dir");
            println!();
        }
    }

    Ok(())
}
