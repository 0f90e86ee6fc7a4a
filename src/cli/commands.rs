//! Command implementations for the idiolink CLI.

use std::io::{self, IsTerminal};
use std::sync::Arc;

use log::{debug, info};

use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::{ApiKey, PipelineConfig};
use crate::embedding::openai_text_embedder::OpenAITextEmbedder;
use crate::embedding::text_embedder::TextEmbedder;
use crate::error::{IdiolinkError, Result};
use crate::pipeline;
use crate::synonym::openai_ranker::OpenAIRanker;

const API_KEY_PROMPT: &str = "Enter your OpenAI API key: ";

/// Execute a CLI command.
pub async fn execute_command(args: IdiolinkArgs) -> Result<()> {
    let config = effective_config(&args)?;
    debug!("Effective configuration: {config:?}");

    match &args.command {
        Command::ParseHtml(_) => parse_html(&config, &args),
        Command::CreateDb(_) => create_db(&config, &args).await,
        Command::Synonyms(_) => synonyms(&config, &args).await,
        Command::Refine(refine_args) => refine(refine_args, &config, &args).await,
        Command::Link(link_args) => link(link_args, &config, &args),
        Command::UpdateHtml(_) => update_html(&config, &args).await,
    }
}

/// Configuration file (or defaults) with the command's flags applied.
pub fn effective_config(args: &IdiolinkArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            PipelineConfig::load(path)?
        }
        None => PipelineConfig::default(),
    };
    args.command.apply(&mut config);
    config.validate()?;
    Ok(config)
}

/// Resolve the API key once: flag or environment first, then a hidden
/// interactive prompt when stdin is a terminal.
pub fn resolve_api_key(args: &IdiolinkArgs) -> Result<ApiKey> {
    resolve_api_key_with(args, io::stdin().is_terminal(), |prompt| {
        rpassword::prompt_password(prompt)
    })
}

fn resolve_api_key_with<F>(args: &IdiolinkArgs, interactive: bool, prompt: F) -> Result<ApiKey>
where
    F: FnOnce(&str) -> io::Result<String>,
{
    if let Some(key) = &args.api_key {
        return ApiKey::new(key.as_str());
    }
    if !interactive {
        return Err(IdiolinkError::invalid_config(
            "no API key: set OPENAI_API_KEY or pass --api-key",
        ));
    }
    ApiKey::new(prompt(API_KEY_PROMPT)?)
}

fn embedder(config: &PipelineConfig, api_key: ApiKey) -> Result<Arc<dyn TextEmbedder>> {
    Ok(Arc::new(OpenAITextEmbedder::new(
        api_key,
        config.embedding.clone(),
        config.request_timeout(),
    )?))
}

fn parse_html(config: &PipelineConfig, cli_args: &IdiolinkArgs) -> Result<()> {
    let summary = pipeline::parse_html(config)?;
    output_result("Idiom records extracted", &summary, cli_args)
}

async fn create_db(config: &PipelineConfig, cli_args: &IdiolinkArgs) -> Result<()> {
    let embedder = embedder(config, resolve_api_key(cli_args)?)?;
    let summary = pipeline::create_db(config, embedder).await?;
    output_result("Vector index created", &summary, cli_args)
}

async fn synonyms(config: &PipelineConfig, cli_args: &IdiolinkArgs) -> Result<()> {
    let embedder = embedder(config, resolve_api_key(cli_args)?)?;
    let index = pipeline::open_index(config, embedder)?;
    let summary = pipeline::synonyms(config, &index).await?;
    output_result("Synonyms retrieved", &summary, cli_args)
}

async fn refine(
    args: &RefineArgs,
    config: &PipelineConfig,
    cli_args: &IdiolinkArgs,
) -> Result<()> {
    let ranker = OpenAIRanker::new(
        resolve_api_key(cli_args)?,
        config.ranking.clone(),
        config.request_timeout(),
    )?;
    let summary = pipeline::refine(config, &ranker, args.restart).await?;
    output_result("Synonyms refined", &summary, cli_args)
}

fn link(args: &LinkArgs, config: &PipelineConfig, cli_args: &IdiolinkArgs) -> Result<()> {
    let synonyms = args.synonyms_path(config);
    let summary = pipeline::link(config, &synonyms)?;
    output_result("Links inserted", &summary, cli_args)
}

async fn update_html(config: &PipelineConfig, cli_args: &IdiolinkArgs) -> Result<()> {
    let embedder = embedder(config, resolve_api_key(cli_args)?)?;
    let index = pipeline::open_index(config, embedder)?;
    let summary = pipeline::update_html(config, &index).await?;
    output_result("Book updated with synonym links", &summary, cli_args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_flags_override_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("idiolink.json");
        fs::write(&config_path, r#"{"synonym_count": 3, "collection": "book"}"#).unwrap();

        let args = IdiolinkArgs::try_parse_from([
            "idiolink",
            "--config",
            config_path.to_str().unwrap(),
            "synonyms",
            "-k",
            "5",
        ])
        .unwrap();

        let config = effective_config(&args).unwrap();
        assert_eq!(config.synonym_count, 5);
        assert_eq!(config.collection, "book");
    }

    #[test]
    fn test_invalid_flag_values_are_rejected() {
        let args = IdiolinkArgs::try_parse_from(["idiolink", "synonyms", "-k", "0"]).unwrap();
        assert!(matches!(
            effective_config(&args),
            Err(IdiolinkError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_explicit_api_key_wins() {
        let args = IdiolinkArgs::try_parse_from([
            "idiolink",
            "--api-key",
            "sk-from-flag",
            "synonyms",
        ])
        .unwrap();
        assert_eq!(resolve_api_key(&args).unwrap().expose(), "sk-from-flag");
    }

    #[test]
    fn test_api_key_prompt_only_when_interactive() {
        let mut args = IdiolinkArgs::try_parse_from(["idiolink", "synonyms"]).unwrap();
        args.api_key = None;

        let key = resolve_api_key_with(&args, true, |prompt| {
            assert_eq!(prompt, API_KEY_PROMPT);
            Ok("sk-typed\n".to_string())
        })
        .unwrap();
        assert_eq!(key.expose(), "sk-typed");

        assert!(matches!(
            resolve_api_key_with(&args, false, |_| panic!("prompted without a terminal")),
            Err(IdiolinkError::InvalidConfig(_))
        ));
        assert!(matches!(
            resolve_api_key_with(&args, true, |_| Ok("  \n".to_string())),
            Err(IdiolinkError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_parse_html_command_writes_store() {
        let temp_dir = TempDir::new().unwrap();
        let book = temp_dir.path().join("book.html");
        let store = temp_dir.path().join("idioms.json");
        fs::write(
            &book,
            r#"<h2 id="a">1. kick the bucket</h2><p>to die</p><ul><li><span lang="en">He kicked the bucket.</span></li></ul>"#,
        )
        .unwrap();

        let args = IdiolinkArgs::try_parse_from([
            "idiolink",
            "-q",
            "parse-html",
            "--source",
            book.to_str().unwrap(),
            "--store",
            store.to_str().unwrap(),
        ])
        .unwrap();

        execute_command(args).await.unwrap();
        let content = fs::read_to_string(&store).unwrap();
        assert!(content.contains("\"kick the bucket\""));
    }
}
