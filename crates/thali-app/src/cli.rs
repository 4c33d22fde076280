//! CLI argument definitions for the Thali application.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::{Path, PathBuf};

use thali_core::ThaliConfig;

/// Thali - chat with a restaurant menu and let the agent build your order.
#[derive(Parser, Debug)]
#[command(name = "thali", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Menu document (plain text export) to load at startup.
    #[arg(short = 'm', long = "menu")]
    pub menu: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Answer every message as a question; never touch the cart.
    #[arg(long = "no-agentic")]
    pub no_agentic: bool,

    /// Directory holding model.onnx and tokenizer.json for embeddings.
    #[arg(long = "model-dir")]
    pub model_dir: Option<PathBuf>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > THALI_CONFIG env var > ./thali.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        ThaliConfig::resolve_path(self.config.as_deref())
    }

    /// Overlay command-line overrides onto a loaded configuration.
    pub fn apply_overrides(&self, config: &mut ThaliConfig) {
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
        if self.no_agentic {
            config.agent.agentic_mode = false;
        }
        if let Some(ref dir) = self.model_dir {
            config.retrieval.model_dir = Some(dir.clone());
        }
    }

    pub fn menu_path(&self) -> Option<&Path> {
        self.menu.as_deref()
    }
}
