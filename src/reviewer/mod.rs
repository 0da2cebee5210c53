
use tracing::{debug, warn};

use crate::coverage::{compute_coverage, render_tree};
use crate::llm::{GenerationClient, GenerationOutcome};
use crate::parser::TestCase;
use crate::rag::GuidelineRetriever;

/// Placeholder used in the prompt when retrieval failed or found nothing
pub const NO_CONTEXT_PLACEHOLDER: &str = "No guideline context retrieved.";

const REVIEW_INSTRUCTIONS: &str = "You are a senior QA engineer reviewing a set of test cases.\n\
Judge the test cases against the QA guideline context and the acceptance criteria below.\n\
For each test case comment on clarity of the title, atomicity of the steps, presence of an\n\
expected result, and useful metadata (test type, preconditions, labels). Point out acceptance\n\
criteria with no covering test case. Answer as a concise bulleted list, one bullet per finding,\n\
and keep the tone constructive but direct.";

/// Final review produced for a set of test cases
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewReport {
    pub review: String,
    pub coverage: u32,
    pub tree: String,
    pub used_fallback: bool,
}

/// Review test cases using retrieved guideline context and the configured
/// generation backend.
///
/// This never fails for valid input: retrieval errors degrade to a prompt
/// without context, and any generation failure (or blank/no-backend outcome)
/// degrades to the deterministic heuristic review.
#[inline]
pub async fn review_test_cases(
    retriever: &GuidelineRetriever,
    client: &GenerationClient,
    cases: &[TestCase],
    acceptance_criteria: &str,
    user_story: &str,
    k: usize,
) -> ReviewReport {
    let query = retrieval_query(acceptance_criteria, user_story, cases);
    let context = match retriever.retrieve_context(&query, k).await {
        Ok(chunks) => chunks,
        Err(e) => {
            warn!("Proceeding without guideline context: {}", e);
            Vec::new()
        }
    };

    let prompt = build_prompt(&context, acceptance_criteria, user_story, cases);

    let (review, used_fallback) = match client.generate(&prompt) {
        Ok(GenerationOutcome::Generated(text)) if !text.trim().is_empty() => {
            (text.trim().to_string(), false)
        }
        Ok(GenerationOutcome::Generated(_)) => {
            warn!("Generation backend returned blank output, using heuristic review");
            (heuristic_review(cases), true)
        }
        Ok(GenerationOutcome::NoBackend) => {
            debug!("No generation backend configured, using heuristic review");
            (heuristic_review(cases), true)
        }
        Err(e) => {
            warn!("Generation failed ({}), using heuristic review", e);
            (heuristic_review(cases), true)
        }
    };

    let coverage = compute_coverage(cases.len(), acceptance_criteria);

    ReviewReport {
        review,
        coverage,
        tree: render_tree(coverage),
        used_fallback,
    }
}

/// Query text for guideline retrieval: the acceptance criteria and user
/// story when present, otherwise the test-case titles.
fn retrieval_query(acceptance_criteria: &str, user_story: &str, cases: &[TestCase]) -> String {
    let query = format!("{}\n{}", acceptance_criteria.trim(), user_story.trim())
        .trim()
        .to_string();
    if !query.is_empty() {
        return query;
    }

    cases
        .iter()
        .map(|case| case.title.as_str())
        .filter(|title| !title.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Assemble the review prompt, never persisted.
fn build_prompt(
    context: &[String],
    acceptance_criteria: &str,
    user_story: &str,
    cases: &[TestCase],
) -> String {
    let guideline_context = if context.is_empty() {
        NO_CONTEXT_PLACEHOLDER.to_string()
    } else {
        context.join("\n\n")
    };

    format!(
        "{}\n\nGuideline Context:\n{}\n\nAcceptance Criteria:\n{}\n\nUser Story:\n{}\n\nTest Cases:\n{}\n",
        REVIEW_INSTRUCTIONS,
        guideline_context,
        acceptance_criteria,
        user_story,
        format_test_cases(cases)
    )
}

fn format_test_cases(cases: &[TestCase]) -> String {
    let mut formatted = String::new();
    for (i, case) in cases.iter().enumerate() {
        formatted.push_str(&format!(
            "TC{}:\n  Title: {}\n  Steps: {}\n  Expected: {}\n  Type: {}\n  Preconditions: {}\n  Labels: {}\n",
            i + 1,
            case.title,
            case.steps,
            case.expected,
            case.test_type,
            case.preconditions,
            case.labels
        ));
    }
    formatted
}

/// Deterministic review built purely from structural properties of the test
/// cases. Guarantees the system always returns some review text, even with
/// every LLM backend down.
fn heuristic_review(cases: &[TestCase]) -> String {
    let mut bullets = Vec::new();

    for (i, case) in cases.iter().enumerate() {
        let n = i + 1;

        if case.title.chars().count() < 10 {
            bullets.push(format!(
                "- TC{}: Title is tiny; give it enough detail so future-you doesn't need detective mode.",
                n
            ));
        } else {
            bullets.push(format!(
                "- TC{}: Title is clear and readable—nice start.",
                n
            ));
        }

        if case.steps.lines().count() < 2 && case.steps.split('.').count() < 3 {
            bullets.push(format!(
                "- TC{}: Steps look compact; split actions into atomic steps for easier debugging.",
                n
            ));
        }
        if case.expected.is_empty() {
            bullets.push(format!(
                "- TC{}: Expected result is missing—this test currently grades itself on vibes.",
                n
            ));
        }
        if case.test_type.is_empty() {
            bullets.push(format!(
                "- TC{}: Add a test type so reports can separate smoke from full-course regression.",
                n
            ));
        }
        if case.preconditions.is_empty() {
            bullets.push(format!(
                "- TC{}: Preconditions are absent; setup context helps avoid flaky surprises.",
                n
            ));
        }
        if case.labels.is_empty() {
            bullets.push(format!(
                "- TC{}: Labels are empty; tags make triage and analytics way faster.",
                n
            ));
        }
    }

    bullets.push(
        "- Roast 1: These tests are close to greatness—they just need less mystery and more specificity."
            .to_string(),
    );
    bullets.push(
        "- Roast 2: Your coverage ambition is strong; your metadata just called asking for equal attention."
            .to_string(),
    );

    bullets.join("\n")
}
