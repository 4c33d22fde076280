//! Thali application binary - composition root.
//!
//! 1. Parse CLI flags and load configuration from TOML
//! 2. Pick the embedding backend (ONNX model or hashing mock)
//! 3. Build the LLM client from the `[llm]` section
//! 4. Process the menu document into a knowledge base
//! 5. Run the interactive chat loop on stdin

mod cli;
mod repl;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use thali_chat::{
    build_llm_client, process_menu, AgenticOrchestrator, LlmClient, MenuKnowledgeBase,
    MenuSession, MockLlm,
};
use thali_core::ThaliConfig;
use thali_menu::{extract_file, PlainTextExtractor};
use thali_vector::{DynEmbeddingService, MockEmbedding, OnnxEmbeddingService};

use crate::cli::CliArgs;
use crate::repl::{render_cart, render_history, render_menu, render_turn, ReplCommand, HELP};

/// Choose the embedding backend: the ONNX model when configured and
/// loadable, the hashing mock otherwise.
fn build_embedder(config: &ThaliConfig) -> Arc<dyn DynEmbeddingService> {
    let Some(ref model_dir) = config.retrieval.model_dir else {
        tracing::info!("No embedding model configured, using hashing embedder");
        return Arc::new(MockEmbedding::new());
    };
    match OnnxEmbeddingService::from_directory(model_dir) {
        Ok(service) => {
            tracing::info!(dir = %model_dir.display(), "ONNX embedding model loaded");
            Arc::new(service)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Embedding model unavailable, using hashing embedder");
            Arc::new(MockEmbedding::new())
        }
    }
}

/// Build the configured LLM client. Without credentials every answer falls
/// back to the apology text; recommendations and ordering still work.
fn build_llm(config: &ThaliConfig) -> Arc<dyn LlmClient> {
    match build_llm_client(&config.llm) {
        Ok(client) => {
            tracing::info!(provider = client.name(), model = %config.llm.model, "LLM client ready");
            client
        }
        Err(e) => {
            tracing::warn!(error = %e, "LLM unavailable, answers will use the fallback text");
            Arc::new(MockLlm::failing("no LLM provider configured"))
        }
    }
}

/// Extract, parse and index a menu document.
async fn load_menu(
    path: &Path,
    embedder: Arc<dyn DynEmbeddingService>,
    config: &ThaliConfig,
) -> Result<MenuKnowledgeBase, Box<dyn std::error::Error>> {
    let text = extract_file(&PlainTextExtractor::new(), path).await?;
    let kb = process_menu(
        &text,
        embedder,
        &config.retrieval,
        config.agent.low_confidence_threshold,
    )
    .await?;
    if kb.is_low_confidence() {
        tracing::warn!(
            path = %path.display(),
            items = kb.items().len(),
            "Few menu items recognized; answers may be generic"
        );
    }
    Ok(kb)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = ThaliConfig::load_or_default(&config_file);
    args.apply_overrides(&mut config);

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting Thali v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        path = %config_file.display(),
        agentic = config.agent.agentic_mode,
        "Configuration resolved"
    );

    let embedder = build_embedder(&config);
    let llm = build_llm(&config);
    let orchestrator = Arc::new(AgenticOrchestrator::from_config(llm, &config));
    let mut session = MenuSession::new(orchestrator, config.pricing.clone());
    let currency = config.pricing.currency.clone();

    if let Some(path) = args.menu_path() {
        let kb = load_menu(path, Arc::clone(&embedder), &config).await?;
        session.install_menu(kb);
    }

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let greeting = if session.has_menu() {
        "Ask about the menu, or tell me your budget and I'll order for you. :help lists commands."
    } else {
        "No menu loaded yet. Use :load <file> to process one. :help lists commands."
    };
    stdout.write_all(format!("{greeting}\n").as_bytes()).await?;

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let output = match ReplCommand::parse(&line) {
            ReplCommand::Empty => continue,
            ReplCommand::Quit => break,
            ReplCommand::Help => HELP.to_string(),
            ReplCommand::Cart => render_cart(session.cart(), &currency),
            ReplCommand::Menu => match session.knowledge() {
                Some(kb) => render_menu(kb, &currency),
                None => "No menu loaded. Use :load <file>.".to_string(),
            },
            ReplCommand::History => render_history(session.memory().transcript()),
            ReplCommand::Reset => {
                session.reset_conversation();
                "Conversation cleared.".to_string()
            }
            ReplCommand::Load(path) => {
                match load_menu(&path, Arc::clone(&embedder), &config).await {
                    Ok(kb) => {
                        let count = kb.items().len();
                        session.install_menu(kb);
                        format!("Menu loaded: {} items.", count)
                    }
                    Err(e) => {
                        tracing::error!(path = %path.display(), error = %e, "Menu load failed");
                        format!("Could not load {}: {}", path.display(), e)
                    }
                }
            }
            ReplCommand::Unknown(input) => format!("Unknown command {input}. Try :help."),
            ReplCommand::Say(utterance) => match session.ask(&utterance).await {
                Ok(response) => render_turn(&response, &currency),
                Err(e) => {
                    tracing::debug!(error = %e, "Turn rejected");
                    format!("Sorry, {}.", e)
                }
            },
        };

        stdout.write_all(format!("{output}\n").as_bytes()).await?;
    }

    tracing::info!(session = %session.id(), "Session ended");
    Ok(())
}
