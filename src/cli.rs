use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

use crate::advisor_service::AdvisorService;
use crate::config_loader::AdvisorConfig;
use crate::exports::{to_css, to_token_document};

/// Top-level CLI interface for the style advisor
#[derive(Parser)]
#[command(
    name = "style-advisor",
    version,
    about = "Adaptive style recommendations learned from rated feedback"
)]
pub struct Cli {
    /// Configuration file (defaults to style_advisor.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a style package for a design (JSON text or a path to a JSON file)
    Generate {
        #[arg(short, long)]
        input: String,
    },

    /// Record a rating for a design
    Feedback {
        #[arg(short, long)]
        input: String,
        /// Rating in [0, 1]
        #[arg(short, long)]
        rating: f64,
        #[arg(short, long, default_value = "")]
        text: String,
    },

    /// Retrain on accumulated feedback (requires enough pending records)
    Retrain,

    /// Train on the whole dataset
    Train {
        /// Continue from the saved model instead of starting fresh
        #[arg(long)]
        incremental: bool,
    },

    /// Dataset and model status
    Stats,

    /// Rating distribution and class balance of the dataset
    Analyze,

    /// Export a generated style package
    Export {
        #[arg(short, long)]
        input: String,
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Css)]
        format: ExportFormat,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ExportFormat {
    Css,
    Tokens,
}

pub fn dispatch(cli: Cli, config: AdvisorConfig) -> Result<()> {
    let service = AdvisorService::from_config(config).context("initializing style advisor")?;

    match cli.command {
        Commands::Generate { input } => {
            let package = service.generate(&read_input(&input)?)?;
            print_json(&package)
        }
        Commands::Feedback {
            input,
            rating,
            text,
        } => {
            let pending = service.submit_feedback(&read_input(&input)?, rating, &text)?;
            print_json(&serde_json::json!({ "pending_count": pending }))
        }
        Commands::Retrain => print_json(&service.retrain()?),
        Commands::Train { incremental } => print_json(&service.train(incremental)?),
        Commands::Stats => print_json(&service.stats()?),
        Commands::Analyze => print_json(&service.report()?),
        Commands::Export { input, format } => {
            let package = service.generate(&read_input(&input)?)?;
            match format {
                ExportFormat::Css => print!("{}", to_css(&package)),
                ExportFormat::Tokens => print_json(&to_token_document(&package))?,
            }
            Ok(())
        }
    }
}

/// Inline JSON when the argument looks like an object, otherwise a file path.
fn read_input(arg: &str) -> Result<Value> {
    let text = if arg.trim_start().starts_with('{') {
        arg.to_string()
    } else {
        fs::read_to_string(arg).with_context(|| format!("reading input file {arg}"))?
    };
    let value: Value = serde_json::from_str(&text).context("parsing design input JSON")?;
    if !value.is_object() {
        bail!("design input must be a JSON object");
    }
    Ok(value)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_feedback_command() {
        let cli = Cli::try_parse_from([
            "style-advisor",
            "feedback",
            "--input",
            "{\"layout\": \"grid\"}",
            "--rating",
            "0.8",
        ])
        .unwrap();
        match cli.command {
            Commands::Feedback { rating, text, .. } => {
                assert_eq!(rating, 0.8);
                assert_eq!(text, "");
            }
            _ => panic!("expected feedback command"),
        }
    }

    #[test]
    fn test_parse_export_format() {
        let cli = Cli::try_parse_from([
            "style-advisor",
            "--config",
            "custom.toml",
            "export",
            "-i",
            "design.json",
            "--format",
            "tokens",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert!(matches!(
            cli.command,
            Commands::Export {
                format: ExportFormat::Tokens,
                ..
            }
        ));
    }

    #[test]
    fn test_read_input_inline_and_file() {
        assert_eq!(read_input("{\"mission\": \"x\"}").unwrap()["mission"], "x");

        let dir = tempdir().unwrap();
        let path = dir.path().join("design.json");
        fs::write(&path, "{\"layout\": \"flex\"}").unwrap();
        assert_eq!(
            read_input(path.to_str().unwrap()).unwrap()["layout"],
            "flex"
        );

        fs::write(&path, "[1, 2]").unwrap();
        assert!(read_input(path.to_str().unwrap()).is_err());
    }
}
