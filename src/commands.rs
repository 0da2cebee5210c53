use anyhow::{Context, Result, bail};
use console::style;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::Config;
use crate::llm::GenerationClient;
use crate::parser::parse_zephyr_export;
use crate::rag::GuidelineRetriever;
use crate::reviewer::{ReviewReport, review_test_cases};

/// Bootstrap the persistent vector index from the configured guideline file.
///
/// With `force`, any existing index is removed first; this is the manual
/// rebuild path for when the guideline file changed after the index was
/// built.
#[inline]
pub async fn build_index(config: &Config, force: bool) -> Result<()> {
    let index_dir = config.vector_index_path();

    if force && index_dir.exists() {
        info!("Removing existing vector index at {}", index_dir.display());
        fs::remove_dir_all(&index_dir).context("Failed to remove existing vector index")?;
    }

    let retriever = GuidelineRetriever::initialize(config)
        .await
        .context("Failed to initialize guideline retriever")?;

    let count = retriever.chunk_count().await?;
    eprintln!(
        "{} Vector index ready at {} ({} chunks)",
        style("✓").green(),
        style(index_dir.display()).cyan(),
        style(count).cyan()
    );

    Ok(())
}

/// Review a Zephyr export file and write a markdown report.
#[inline]
pub async fn review_file(
    config: &Config,
    file: &Path,
    acceptance_criteria: Option<String>,
    user_story: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let raw = fs::read(file)
        .with_context(|| format!("Failed to read export file: {}", file.display()))?;
    let filename = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export.csv".to_string());

    let cases = parse_zephyr_export(&raw, &filename)?;
    if cases.is_empty() {
        bail!("No test cases found in export file: {}", file.display());
    }
    info!("Reviewing {} test cases from {}", cases.len(), filename);

    let acceptance_criteria = acceptance_criteria.unwrap_or_default();
    let user_story = user_story.unwrap_or_default();

    // Bootstrap failures (bad config, missing credentials, broken index) are
    // fatal; only retrieval and generation degrade once the index exists.
    let retriever = GuidelineRetriever::initialize(config)
        .await
        .context("Failed to initialize guideline retriever")?;
    let client = GenerationClient::new(config)?;

    let report = review_test_cases(
        &retriever,
        &client,
        &cases,
        &acceptance_criteria,
        &user_story,
        config.rag.retrieval_k,
    )
    .await;

    let output_path = output.unwrap_or_else(|| PathBuf::from("output.md"));
    let markdown = render_report_markdown(&filename, &acceptance_criteria, &user_story, &report);
    fs::write(&output_path, markdown)
        .with_context(|| format!("Failed to write report: {}", output_path.display()))?;

    eprintln!(
        "{} Review written to {}",
        style("✓").green(),
        style(output_path.display()).cyan()
    );
    eprintln!("  Coverage: {}%", style(report.coverage).cyan());
    if report.used_fallback {
        eprintln!(
            "  {}",
            style("Heuristic review used (no LLM output available)").yellow()
        );
    }
    eprintln!("{}", report.tree);

    Ok(())
}

fn render_report_markdown(
    filename: &str,
    acceptance_criteria: &str,
    user_story: &str,
    report: &ReviewReport,
) -> String {
    let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");

    format!(
        "# Testcase Review Output\n\n\
         - Generated at: {}\n\
         - Source file: {}\n\
         - Coverage: {}%\n\n\
         ## Acceptance Criteria\n\n{}\n\n\
         ## User Story\n\n{}\n\n\
         ## Review Comments\n\n{}\n\n\
         ## Coverage Tree\n\n```\n{}\n```\n",
        timestamp,
        filename,
        report.coverage,
        non_empty_or(acceptance_criteria, "_Not provided_"),
        non_empty_or(user_story, "_Not provided_"),
        report.review,
        report.tree
    )
}

fn non_empty_or<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    let trimmed = value.trim();
    if trimmed.is_empty() { placeholder } else { trimmed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reviewer::ReviewReport;

    #[test]
    fn report_markdown_contains_all_sections() {
        let report = ReviewReport {
            review: "- TC1: fine".to_string(),
            coverage: 67,
            tree: "    |||\n  🍃🍃🍃🍃🍃🍃\n    |||\n    |||".to_string(),
            used_fallback: true,
        };

        let markdown = render_report_markdown("export.csv", "- a\n- b\n- c", "", &report);

        assert!(markdown.contains("# Testcase Review Output"));
        assert!(markdown.contains("- Source file: export.csv"));
        assert!(markdown.contains("- Coverage: 67%"));
        assert!(markdown.contains("- TC1: fine"));
        assert!(markdown.contains("## User Story\n\n_Not provided_"));
        assert!(markdown.contains("```\n    |||"));
    }
}
