
/// Estimate coverage as the share of acceptance-criteria lines that could be
/// covered by the given number of test cases, as a percentage.
#[inline]
pub fn compute_coverage(test_case_count: usize, acceptance_criteria: &str) -> u32 {
    let criteria_count = acceptance_criteria
        .lines()
        .filter(|line| !line.trim().is_empty())
        .count()
        .max(1);

    let estimated_covered = test_case_count.min(criteria_count);
    ((estimated_covered as f64 / criteria_count as f64) * 100.0).round() as u32
}

/// Render the coverage tree: one leaf per 10% of coverage, fruit at 100%.
#[inline]
pub fn render_tree(coverage: u32) -> String {
    let leaf_count = (coverage / 10).clamp(1, 10) as usize;
    let leaves = "🍃".repeat(leaf_count);
    let fruit = if coverage == 100 { " 🍎" } else { "" };

    format!("    |||\n  {}{}\n    |||\n    |||", leaves, fruit)
}
