use crate::output::{Output, OutputFormat};
use crate::ConfigCommands;
use cinewatch_config::{Config, PathManager};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use comfy_table::{Cell, Table};
use owo_colors::OwoColorize;
use serde_json::json;
use std::path::Path;

pub fn run_config(cmd: ConfigCommands, config: &Config, config_file: &Path, output: &Output) -> Result<()> {
    match cmd {
        ConfigCommands::Show { full } => show_config(config, config_file, full, output),
        ConfigCommands::Init { force } => init_config(config_file, force, output),
    }
}

/// Keep the first and last four characters of a secret
fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}{}", head, "*".repeat(chars.len() - 8), tail)
}

fn show_config(config: &Config, config_file: &Path, full: bool, output: &Output) -> Result<()> {
    let api_key = config
        .tmdb
        .resolved_api_key()
        .map(|k| if full { k } else { mask_secret(&k) });
    let history_file = PathManager::default().history_file(&config.history.storage_file);

    match output.format() {
        OutputFormat::Human => {
            if output.is_quiet() {
                return Ok(());
            }
            if !config_file.exists() {
                output.warn(format!(
                    "No config file at {}, showing defaults (run 'cinewatch config init' to create one)",
                    config_file.display()
                ));
            }

            println!("\n{}", "Configuration".bright_cyan().bold());
            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
            table.set_header(vec![
                Cell::new("Setting").add_attribute(comfy_table::Attribute::Bold),
                Cell::new("Value").add_attribute(comfy_table::Attribute::Bold),
            ]);
            table.add_row(vec![Cell::new("Config file"), Cell::new(config_file.display())]);
            table.add_row(vec![Cell::new("History file"), Cell::new(history_file.display())]);
            table.add_row(vec![
                Cell::new("TMDB API key"),
                Cell::new(api_key.unwrap_or_else(|| "(not set)".to_string())),
            ]);
            table.add_row(vec![Cell::new("TMDB base URL"), Cell::new(&config.tmdb.base_url)]);
            table.add_row(vec![
                Cell::new("TMDB timeout"),
                Cell::new(format!("{}s", config.tmdb.timeout_seconds)),
            ]);
            table.add_row(vec![
                Cell::new("Require trailer match"),
                Cell::new(config.history.require_trailer_match),
            ]);
            table.add_row(vec![Cell::new("Log level"), Cell::new(&config.logging.level)]);
            println!("{}", table);
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            output.json(&json!({
                "config_file": config_file.display().to_string(),
                "config_file_exists": config_file.exists(),
                "history_file": history_file.display().to_string(),
                "tmdb": {
                    "api_key": api_key,
                    "base_url": config.tmdb.base_url,
                    "timeout_seconds": config.tmdb.timeout_seconds,
                },
                "history": {
                    "require_trailer_match": config.history.require_trailer_match,
                    "storage_file": config.history.storage_file,
                },
                "logging": {
                    "level": config.logging.level,
                    "json": config.logging.json,
                    "file": config.logging.file,
                },
            }));
        }
    }
    Ok(())
}

fn init_config(config_file: &Path, force: bool, output: &Output) -> Result<()> {
    if config_file.exists() && !force {
        output.warn(format!(
            "Config file already exists at {} (use --force to overwrite)",
            config_file.display()
        ));
        return Ok(());
    }

    Config::default()
        .save_to_file(config_file)
        .map_err(|e| eyre!("Failed to write config to {}: {}", config_file.display(), e))?;
    output.success(format!("Wrote default config to {}", config_file.display()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("short"), "*****");
        assert_eq!(mask_secret("0123456789abcdef"), "0123********cdef");
    }

    #[test]
    fn test_init_respects_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let output = Output::new(OutputFormat::Json, true);

        init_config(&path, false, &output).unwrap();
        assert!(path.exists());

        std::fs::write(&path, "[history]\nrequire_trailer_match = true\n").unwrap();
        init_config(&path, false, &output).unwrap();
        assert!(Config::load_from_file(&path).unwrap().history.require_trailer_match);

        init_config(&path, true, &output).unwrap();
        assert!(!Config::load_from_file(&path).unwrap().history.require_trailer_match);
    }
}
