use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};

use super::settings::SUPPORTED_PROVIDERS;
use super::{Config, LlmConfig, RagConfig, get_config_dir};

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("🔧 Testcase Reviewer Setup").bold().cyan());
    eprintln!();

    let config_dir = get_config_dir()?;
    let mut config = load_existing_config(&config_dir);

    eprintln!("{}", style("Generation Backend").bold().yellow());
    configure_llm(&mut config.llm)?;

    eprintln!();
    eprintln!("{}", style("Guideline Retrieval").bold().yellow());
    configure_rag(&mut config.rag)?;

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config_dir = get_config_dir()?;
    let config = Config::load(&config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Generation Backend:").bold().yellow());
    eprintln!("  Provider: {}", style(&config.llm.provider).cyan());
    eprintln!("  Model: {}", style(&config.llm.model).cyan());
    eprintln!(
        "  OpenAI key: {}",
        style(mask_key(&config.llm.openai_api_key)).cyan()
    );
    eprintln!(
        "  Google key: {}",
        style(mask_key(&config.llm.google_api_key)).cyan()
    );
    eprintln!("  Ollama host: {}", style(&config.llm.ollama_host).cyan());
    eprintln!(
        "  Timeout: {}s",
        style(config.llm.timeout_seconds).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Embedding:").bold().yellow());
    eprintln!("  Model: {}", style(&config.embedding.model).cyan());
    eprintln!("  Batch size: {}", style(config.embedding.batch_size).cyan());

    eprintln!();
    eprintln!("{}", style("Retrieval:").bold().yellow());
    eprintln!(
        "  Guideline file: {}",
        style(config.rag.guideline_path.display()).cyan()
    );
    eprintln!("  Chunk size: {}", style(config.rag.chunk_size).cyan());
    eprintln!("  Chunk overlap: {}", style(config.rag.chunk_overlap).cyan());
    eprintln!("  Retrieval k: {}", style(config.rag.retrieval_k).cyan());

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );
    eprintln!(
        "Vector index: {}",
        style(config.vector_index_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config(config_dir: &std::path::Path) -> Config {
    Config::load(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Config {
                base_dir: config_dir.to_path_buf(),
                ..Config::default()
            }
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            config
        },
    )
}

fn configure_llm(llm: &mut LlmConfig) -> Result<()> {
    let default_index = SUPPORTED_PROVIDERS
        .iter()
        .position(|&p| p == llm.provider)
        .unwrap_or(0);

    let provider_index = Select::new()
        .with_prompt("LLM provider")
        .default(default_index)
        .items(SUPPORTED_PROVIDERS)
        .interact()?;
    llm.provider = SUPPORTED_PROVIDERS[provider_index].to_string();

    llm.model = Input::new()
        .with_prompt("Model")
        .default(llm.model.clone())
        .interact_text()?;

    match llm.provider.as_str() {
        "openai" => {
            llm.openai_api_key = Input::new()
                .with_prompt("OpenAI API key (blank to use OPENAI_API_KEY)")
                .default(llm.openai_api_key.clone())
                .allow_empty(true)
                .interact_text()?;
        }
        "google" => {
            llm.google_api_key = Input::new()
                .with_prompt("Google API key (blank to use GOOGLE_API_KEY)")
                .default(llm.google_api_key.clone())
                .allow_empty(true)
                .interact_text()?;
        }
        _ => {
            llm.ollama_host = Input::new()
                .with_prompt("Ollama host")
                .default(llm.ollama_host.clone())
                .interact_text()?;
        }
    }

    Ok(())
}

fn configure_rag(rag: &mut RagConfig) -> Result<()> {
    let guideline_path: String = Input::new()
        .with_prompt("Guideline file (.md or .txt)")
        .default(rag.guideline_path.display().to_string())
        .interact_text()?;
    rag.guideline_path = guideline_path.into();

    rag.chunk_size = Input::new()
        .with_prompt("Chunk size (characters)")
        .default(rag.chunk_size)
        .interact_text()?;

    let chunk_size = rag.chunk_size;
    rag.chunk_overlap = Input::new()
        .with_prompt("Chunk overlap (characters)")
        .default(rag.chunk_overlap)
        .validate_with(move |overlap: &usize| -> Result<(), String> {
            if *overlap < chunk_size {
                Ok(())
            } else {
                Err("overlap must be smaller than chunk size".to_string())
            }
        })
        .interact_text()?;

    rag.retrieval_k = Input::new()
        .with_prompt("Retrieved chunks per query (k)")
        .default(rag.retrieval_k)
        .interact_text()?;

    Ok(())
}

fn mask_key(key: &str) -> String {
    if key.is_empty() {
        "(not set)".to_string()
    } else {
        format!("{}…", &key.chars().take(4).collect::<String>())
    }
}
