//! Identity commands (register, url, open)

use super::Backend;
use crate::config::Config;
use crate::qr::print_qr_code;
use crate::session::{self, Bootstrap};
use anyhow::{anyhow, Result};
use console::style;

/// Register a fresh identity, dropping captured requests
pub async fn register(mut config: Config, yes: bool) -> Result<()> {
    use cliclack::{confirm, intro, note, outro, outro_cancel};

    intro(style(" whreplay register ").on_cyan().black().to_string())?;

    if config.ident().is_some() && !yes {
        let proceed = confirm("Are you sure you want to reset? You will lose all your captured requests and replays")
            .initial_value(false)
            .interact()?;
        if !proceed {
            outro_cancel("Kept your current identity")?;
            return Ok(());
        }
    }

    let backend = Backend::connect(&config)?;

    let spinner = cliclack::spinner();
    spinner.start("Registering...");
    let ident = match session::register(&backend.client).await {
        Bootstrap::Registered(ident) | Bootstrap::Existing(ident) => ident,
        Bootstrap::Unavailable => {
            spinner.error("Registration failed");
            return Err(backend.failure());
        }
    };
    spinner.stop(format!("Registered as {}", style(&ident).green()));

    config.set_ident(ident);
    config.save()?;

    if let Some(url) = config.custom_url() {
        note("Custom URL", style(&url).green().bold().to_string())?;
    }
    outro("Send requests to your custom URL, then run `whreplay` to watch them")?;

    Ok(())
}

/// Print the custom capture URL
pub async fn url(mut config: Config) -> Result<()> {
    let backend = Backend::connect(&config)?;
    backend.ensure_identity(&mut config).await?;
    let url = config
        .custom_url()
        .ok_or_else(|| anyhow!("No identity registered"))?;

    println!("{}", url);
    if console::user_attended() {
        print_qr_code(&url);
    }

    Ok(())
}

/// Open the custom URL in the browser, which captures a GET request
pub async fn open(mut config: Config) -> Result<()> {
    let backend = Backend::connect(&config)?;
    backend.ensure_identity(&mut config).await?;
    let url = config
        .custom_url()
        .ok_or_else(|| anyhow!("No identity registered"))?;

    if let Err(e) = open::that(&url) {
        tracing::debug!("Failed to open browser: {}", e);
        cliclack::log::warning("Could not open browser automatically")?;
        cliclack::log::info(format!("Please visit: {}", style(&url).cyan().underlined()))?;
    } else {
        cliclack::log::success(format!("Opened {}", style(&url).cyan()))?;
    }

    Ok(())
}
