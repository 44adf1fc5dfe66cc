//! Configuration management commands.

use std::fs;

use anyhow::{bail, Result};
use dialoguer::Confirm;

use super::{ConfigArgs, ConfigCommand};
use crate::config::generate_default_config;
use crate::context::{Context, CONFIG_NAMES};

/// Run the config command.
pub fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx),
        ConfigCommand::Init { force } => init_config(force, ctx),
        ConfigCommand::Validate => validate_config(ctx),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    match ctx.config_path {
        Some(ref path) => ctx.output.kv("file", &path.display().to_string()),
        None => ctx.output.kv("file", "(defaults)"),
    }
    if let Some(ref url) = ctx.config.base_url {
        ctx.output.kv("base_url", url);
    }

    let cache = &ctx.config.cache;
    ctx.output.info("");
    ctx.output.info("[cache]");
    ctx.output.kv("enabled", &cache.enabled.to_string());
    ctx.output.kv("debug", &u8::from(cache.debug).to_string());
    if !cache.bypassed_context.is_empty() {
        ctx.output.kv("bypassed_context", &cache.bypassed_context.join(", "));
    }

    if !cache.esi.ignored.is_empty() {
        ctx.output.info("");
        ctx.output.info("[cache.esi]");
        ctx.output.kv("ignored", &cache.esi.ignored.join(", "));
    }

    if !cache.esi.translator.is_empty() {
        ctx.output.info("");
        ctx.output.info("[cache.esi.translator]");
        for (handle, code) in &cache.esi.translator {
            ctx.output.kv(handle, code);
        }
    }

    Ok(())
}

fn init_config(force: bool, ctx: &Context) -> Result<()> {
    let config_path = ctx.cwd.join(CONFIG_NAMES[0]);

    if config_path.exists() && !force {
        if !console::user_attended() {
            bail!(
                "Config file already exists: {}. Use --force to overwrite.",
                config_path.display()
            );
        }

        let confirmed = Confirm::new()
            .with_prompt(format!("Overwrite {}?", config_path.display()))
            .default(false)
            .interact()?;

        if !confirmed {
            ctx.output.info("Kept existing config");
            return Ok(());
        }
    }

    fs::write(&config_path, generate_default_config())?;

    ctx.output.success(&format!("Created: {}", config_path.display()));

    Ok(())
}

fn validate_config(ctx: &Context) -> Result<()> {
    ctx.output.header("Validating configuration");

    let mut warnings: Vec<String> = Vec::new();
    let cache = &ctx.config.cache;

    if ctx.config_path.is_none() {
        warnings.push("no config file found, validating defaults".to_string());
    }

    if !cache.enabled {
        warnings.push("cache.enabled is false, no surrogate headers will be emitted".to_string());
    }

    // Handles mapped to a code but also matched by an ignored substring never
    // make it into an encoded parameter.
    for handle in cache.esi.translator.keys() {
        if let Some(ignored) = cache.esi.ignored.iter().find(|s| handle.contains(s.as_str())) {
            warnings.push(format!(
                "cache.esi.translator.{} is translated before '{}' can end encoding",
                handle, ignored
            ));
        }
    }

    if let Err(e) = ctx.config.validate() {
        ctx.output.error(&format!("Error: {:#}", e));
        bail!("Configuration is invalid");
    }

    for warning in &warnings {
        ctx.output.warn(&format!("Warning: {}", warning));
    }

    if warnings.is_empty() {
        ctx.output.success("Configuration is valid");
    } else {
        ctx.output.success("Configuration is valid (with warnings)");
    }

    Ok(())
}
