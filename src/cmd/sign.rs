//! Remote signing: `addon-sign sign`.

use anyhow::{Context, Result};
use console::style;
use std::path::Path;
use std::sync::Arc;

use super::super::SignArgs;

/// Run one signing job. Returns whether signed files were produced.
pub async fn cmd_sign(project_dir: &Path, args: &SignArgs) -> Result<bool> {
    use addon_sign::api::ReqwestTransport;
    use addon_sign::config::{CliOverrides, SignConfig, SignToml};
    use addon_sign::ui::TerminalProgress;
    use addon_sign::ui::icons::{CHECK, CROSS, REVIEW, UPLOAD, WARN};
    use addon_sign::{SignStatus, Signer, SigningRequest};

    let file = SignToml::load_or_default(project_dir)?;
    let overrides = CliOverrides {
        api_url: args.api_url.clone(),
        api_key: args.api_key.clone(),
        api_secret: args.api_secret.clone(),
        api_proxy: args.api_proxy.clone(),
        timeout_ms: args.timeout_ms,
        channel: args.channel,
        download_dir: args.download_dir.clone(),
    };
    let config = SignConfig::resolve(&file, &overrides)?;

    if !args.artifact.is_file() {
        anyhow::bail!("Artifact not found: {}", args.artifact.display());
    }
    std::fs::create_dir_all(&config.download_dir).with_context(|| {
        format!(
            "Failed to create download directory: {}",
            config.download_dir.display()
        )
    })?;

    let transport = ReqwestTransport::with_proxy(config.proxy.as_deref())
        .context("Failed to build HTTP client")?;
    let progress = Arc::new(TerminalProgress::new());
    let signer = Signer::new(Arc::new(transport), &config.api_url, config.credentials.clone())
        .with_progress(progress.clone())
        .with_poll_config(config.poll)
        .with_download_dir(&config.download_dir);

    let mut request = SigningRequest::new(&args.artifact, &args.id, &args.addon_version);
    if let Some(channel) = config.channel {
        request = request.with_channel(channel.to_string());
    }

    if !args.json {
        println!(
            "{}Signing {} {} via {}",
            UPLOAD,
            style(&args.id).bold(),
            args.addon_version,
            config.api_url
        );
    }

    let result = signer.sign(&request).await;
    progress.clear();
    let result = result?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(result.success);
    }

    match &result.status {
        SignStatus::Signed => {
            println!("{}{}", CHECK, style("Add-on signed").green().bold());
            for path in &result.downloaded_files {
                println!("    {}", path.display());
            }
        }
        SignStatus::SubmissionRejected { reason } => {
            println!("{}{} {}", CROSS, style("Submission rejected:").red().bold(), reason);
        }
        SignStatus::ValidationFailed { validation_url } => {
            println!("{}{}", CROSS, style("Validation failed").red().bold());
            if let Some(url) = validation_url {
                println!("    Details: {}", url);
            }
        }
        SignStatus::ManualReview => {
            println!(
                "{}{}",
                REVIEW,
                style("Passed validation; awaiting manual review").yellow()
            );
            println!(
                "{}No signed files yet. Re-run once the review is complete.",
                WARN
            );
        }
    }

    Ok(result.success)
}
