//! Confidence scoring engine for ticket readiness.
//!
//! Analyzes an issue's title, body, and labels into a four-dimension
//! explainable score (each dimension 0-25, total 0-100), a root-issue
//! summary, and an action plan. Pure and deterministic: identical input
//! always yields identical output, and no input is an error -- an empty
//! body simply scores low and gets sentinel text.
//!
//! Each dimension starts from a fixed baseline and applies additive and
//! subtractive rules in a fixed order. The rules are independent, so
//! ordering only affects the explanation list, never the final score.
//! Every factor string is annotated with its point delta, e.g.
//! `"Has acceptance criteria (+5)"`, which keeps the score auditable.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Upper bound for a single dimension.
pub const DIMENSION_MAX: i32 = 25;

/// Sentinel returned when the body is too thin to summarize.
pub const INSUFFICIENT_DETAIL: &str = "Insufficient detail - please add description";

/// Titles from this closed vocabulary (under 30 chars) are considered vague.
const VAGUE_TITLES: &[&str] = &["bug", "issue", "fix", "problem", "error"];

/// Maximum number of items taken from an explicit numbered list.
const ACTION_PLAN_MAX_ITEMS: usize = 4;

/// Maximum number of distinct files turned into "Modify ..." plan steps.
const ACTION_PLAN_MAX_FILES: usize = 2;

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

/// A bare file extension reference anywhere in the body.
static FILE_EXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.(?:py|ts|js|tsx|jsx|css|html)\b").unwrap());

/// A backtick-quoted file path, e.g. `` `src/login.py` ``.
static BACKTICK_FILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`[^`]+\.(?:py|js|ts|tsx|jsx|css|html)`").unwrap());

/// Backtick-quoted file path with the path captured.
static BACKTICK_FILE_CAPTURE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]+\.(?:py|js|ts|tsx|jsx|css|html))`").unwrap());

/// A path with at least two directory components, e.g. `/src/services`.
static DIR_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:/[a-zA-Z_]+){2,}").unwrap());

/// Error/diagnostic language (matched against the lowercased body).
static ERROR_TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"error|exception|traceback|stack trace").unwrap());

/// A concrete function or class reference.
static FUNC_OR_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"`[a-zA-Z_][a-zA-Z0-9_]*\(`|def [a-zA-Z_]|function [a-zA-Z_]|class [A-Z]").unwrap()
});

/// One item of an explicit numbered list.
static NUMBERED_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\d+\.\s+(.+)$").unwrap());

/// The `## Description` heading (case-insensitive), including its newline.
static DESCRIPTION_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)## description[ \t]*\n").unwrap());

/// Leading markdown heading markers on a paragraph.
static HEADING_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#+\s*").unwrap());

/// Critical-system keyword families, evaluated in this order.
///
/// Matched against the lowercased body; each family that matches
/// subtracts its penalty from the system-sensitivity score.
static CRITICAL_KEYWORDS: LazyLock<Vec<(Regex, &'static str, i32)>> = LazyLock::new(|| {
    [
        (r"auth|authentication|login|password|token", "authentication", 7),
        (r"payment|billing|stripe|subscription", "payment/billing", 7),
        (r"database|migration|schema", "database/migration", 5),
        (r"delete|remove|drop", "delete/remove operations", 5),
        (r"dependency|package|upgrade", "dependency changes", 3),
        (r"api|endpoint", "API changes", 3),
    ]
    .into_iter()
    .map(|(pattern, name, penalty)| (Regex::new(pattern).unwrap(), name, penalty))
    .collect()
});

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Score for a single dimension with explanatory factors.
///
/// `factors` lists every rule that fired, in evaluation order, each
/// annotated with its point delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreFactors {
    /// Score for this dimension, clamped to `[0, 25]`.
    pub score: i32,
    pub factors: Vec<String>,
}

/// Breakdown of the confidence score into four auditable dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    /// Is the issue well-specified?
    pub requirement_clarity: ScoreFactors,
    /// How contained is the change?
    pub blast_radius: ScoreFactors,
    /// Does this touch critical systems?
    pub system_sensitivity: ScoreFactors,
    /// Can we verify the fix?
    pub testability: ScoreFactors,
}

/// Overall confidence score with detailed breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceScore {
    /// Sum of the four dimensions; within `[0, 100]` by construction.
    pub total: i32,
    pub breakdown: ConfidenceBreakdown,
}

/// Full analysis of a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketAnalysis {
    /// Summary of the core problem from the issue description.
    pub root_issue: String,
    /// Ordered steps to resolve the issue.
    pub action_plan: Vec<String>,
    pub confidence_score: ConfidenceScore,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Analyze a ticket: confidence score, root issue, and action plan.
///
/// Never fails; a missing or empty body is valid input and results in a
/// low score with sentinel text.
pub fn analyze(title: &str, body: &str, labels: &[String]) -> TicketAnalysis {
    let requirement_clarity = score_requirement_clarity(body, title);
    let blast_radius = score_blast_radius(body, labels);
    let system_sensitivity = score_system_sensitivity(body);
    let testability = score_testability(body);

    let total = requirement_clarity.score
        + blast_radius.score
        + system_sensitivity.score
        + testability.score;

    TicketAnalysis {
        root_issue: extract_root_issue(body),
        action_plan: generate_action_plan(body),
        confidence_score: ConfidenceScore {
            total,
            breakdown: ConfidenceBreakdown {
                requirement_clarity,
                blast_radius,
                system_sensitivity,
                testability,
            },
        },
    }
}

// ---------------------------------------------------------------------------
// Dimensions
// ---------------------------------------------------------------------------

fn clamp_dimension(score: i32) -> i32 {
    score.clamp(0, DIMENSION_MAX)
}

/// Requirement clarity (baseline 10): is the issue well-specified?
fn score_requirement_clarity(body: &str, title: &str) -> ScoreFactors {
    let mut score = 10;
    let mut factors = Vec::new();

    if body.contains("## Description") || body.contains("## Requirements") {
        score += 5;
        factors.push("Has markdown sections (+5)".to_string());
    }

    if body.contains("## Acceptance Criteria") || body.to_lowercase().contains("definition of done")
    {
        score += 5;
        factors.push("Has acceptance criteria (+5)".to_string());
    }

    let body_chars = body.chars().count();
    if body_chars > 200 {
        score += 3;
        factors.push("Detailed description (+3)".to_string());
    }

    if FILE_EXT_RE.is_match(body) {
        score += 2;
        factors.push("Specifies files to modify (+2)".to_string());
    }

    if body.is_empty() || body_chars < 50 {
        score -= 5;
        factors.push("Empty or minimal description (-5)".to_string());
    }

    let is_vague_title =
        title.chars().count() < 30 && VAGUE_TITLES.contains(&title.to_lowercase().as_str());
    if is_vague_title {
        score -= 3;
        factors.push("Vague title (-3)".to_string());
    }

    ScoreFactors {
        score: clamp_dimension(score),
        factors,
    }
}

/// Blast radius (baseline 20): how contained is the change?
fn score_blast_radius(body: &str, labels: &[String]) -> ScoreFactors {
    let mut score = 20;
    let mut factors = Vec::new();

    let file_count = BACKTICK_FILE_RE.find_iter(body).count();
    if file_count <= 1 {
        score += 5;
        factors.push("Single file or no files mentioned (+5)".to_string());
    } else if file_count > 2 {
        let penalty = (file_count as i32 - 2) * 3;
        score -= penalty;
        factors.push(format!("Multiple files mentioned ({file_count}) (-{penalty})"));
    }

    let has_bug_label = labels
        .iter()
        .any(|label| matches!(label.to_lowercase().as_str(), "bug" | "fix"));
    if has_bug_label {
        score += 3;
        factors.push("Bug/fix label - usually contained (+3)".to_string());
    }

    let body_lower = body.to_lowercase();
    if body_lower.contains("refactor") || body_lower.contains("restructure") {
        score -= 5;
        factors.push("Contains refactor/restructure (-5)".to_string());
    }

    if body_lower.contains(" all ") || body_lower.contains(" every ") {
        score -= 3;
        factors.push("Broad scope (all/every) (-3)".to_string());
    }

    if DIR_PATH_RE.find_iter(body).count() > 1 {
        score -= 5;
        factors.push("Mentions multiple directories (-5)".to_string());
    }

    ScoreFactors {
        score: clamp_dimension(score),
        factors,
    }
}

/// System sensitivity (baseline 20): does this touch critical systems?
fn score_system_sensitivity(body: &str) -> ScoreFactors {
    let mut score = 20;
    let mut factors = Vec::new();
    let body_lower = body.to_lowercase();

    let mut found_critical = false;
    for (pattern, name, penalty) in CRITICAL_KEYWORDS.iter() {
        if pattern.is_match(&body_lower) {
            score -= penalty;
            factors.push(format!("Touches {name} (-{penalty})"));
            found_critical = true;
        }
    }

    if !found_critical {
        score += 5;
        factors.push("No critical system keywords (+5)".to_string());
    }

    if body_lower.contains("non-breaking") || body_lower.contains("backwards compatible") {
        score += 3;
        factors.push("Explicitly non-breaking (+3)".to_string());
    }

    ScoreFactors {
        score: clamp_dimension(score),
        factors,
    }
}

/// Testability (baseline 15): can we verify the fix?
fn score_testability(body: &str) -> ScoreFactors {
    let mut score = 15;
    let mut factors = Vec::new();
    let body_lower = body.to_lowercase();

    if ERROR_TEXT_RE.is_match(&body_lower) {
        score += 5;
        factors.push("Contains error message/stack trace (+5)".to_string());
    }

    if body_lower.contains("test") {
        score += 5;
        factors.push("Mentions testing (+5)".to_string());
    }

    if body_lower.contains("steps to reproduce") || body_lower.contains("reproduction") {
        score += 3;
        factors.push("Has steps to reproduce (+3)".to_string());
    }

    if FUNC_OR_CLASS_RE.is_match(body) {
        score += 2;
        factors.push("References specific function/class (+2)".to_string());
    }

    if body_lower.contains("sometimes") || body_lower.contains("intermittent") {
        score -= 5;
        factors.push("Intermittent issue (-5)".to_string());
    }

    if body_lower.contains("not sure") || body_lower.contains("might be") {
        score -= 3;
        factors.push("Uncertainty in description (-3)".to_string());
    }

    ScoreFactors {
        score: clamp_dimension(score),
        factors,
    }
}

// ---------------------------------------------------------------------------
// Root issue extraction
// ---------------------------------------------------------------------------

/// Extract the root issue from the ticket body.
///
/// Priority:
/// 1. First two sentences of a `## Description` section (up to 300 chars).
/// 2. First paragraph of the body, stripped of heading markers (up to
///    200 chars).
/// 3. The [`INSUFFICIENT_DETAIL`] sentinel.
fn extract_root_issue(body: &str) -> String {
    if body.trim().chars().count() < 10 {
        return INSUFFICIENT_DETAIL.to_string();
    }

    if let Some(m) = DESCRIPTION_HEADING_RE.find(body) {
        let rest = &body[m.end()..];
        let section = match rest.find("\n##") {
            Some(idx) => &rest[..idx],
            None => rest,
        };
        let root = first_sentences(section.trim(), 2);
        if !root.is_empty() {
            return truncate_chars(&root, 300);
        }
    }

    let first_para = body.split("\n\n").next().unwrap_or("").trim();
    let first_para = HEADING_MARKER_RE.replace(first_para, "");
    if !first_para.is_empty() {
        return truncate_chars(&first_para, 200);
    }

    INSUFFICIENT_DETAIL.to_string()
}

/// Take the first `limit` sentences of `text`, joined by single spaces.
///
/// A sentence ends at `.`, `!`, or `?` followed by whitespace (or end of
/// input). Text with no terminator counts as one sentence.
fn first_sentences(text: &str, limit: usize) -> String {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut sentences: Vec<&str> = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < chars.len() && sentences.len() < limit {
        let (pos, c) = chars[i];
        let ends_sentence = matches!(c, '.' | '!' | '?')
            && chars.get(i + 1).is_none_or(|(_, next)| next.is_whitespace());
        if ends_sentence {
            let end = pos + c.len_utf8();
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            let mut j = i + 1;
            while j < chars.len() && chars[j].1.is_whitespace() {
                j += 1;
            }
            start = chars.get(j).map_or(text.len(), |(p, _)| *p);
            i = j;
        } else {
            i += 1;
        }
    }

    if sentences.len() < limit && start < text.len() {
        let tail = text[start..].trim();
        if !tail.is_empty() {
            sentences.push(tail);
        }
    }

    sentences.join(" ")
}

/// Truncate to at most `max` characters (not bytes).
fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        s.chars().take(max).collect()
    } else {
        s.to_string()
    }
}

// ---------------------------------------------------------------------------
// Action plan
// ---------------------------------------------------------------------------

/// Generate an action plan from the ticket body.
///
/// Prefers up to four items from an explicit numbered list; otherwise
/// synthesizes a plan from the files and testing language mentioned.
fn generate_action_plan(body: &str) -> Vec<String> {
    let numbered: Vec<String> = NUMBERED_ITEM_RE
        .captures_iter(body)
        .take(ACTION_PLAN_MAX_ITEMS)
        .map(|cap| cap[1].trim().to_string())
        .collect();
    if !numbered.is_empty() {
        return numbered;
    }

    let mut plan = Vec::new();

    let mut seen_files: Vec<&str> = Vec::new();
    for cap in BACKTICK_FILE_CAPTURE_RE.captures_iter(body) {
        let file = cap.get(1).unwrap().as_str();
        if !seen_files.contains(&file) {
            seen_files.push(file);
            if seen_files.len() == ACTION_PLAN_MAX_FILES {
                break;
            }
        }
    }
    for file in &seen_files {
        plan.push(format!("Modify {file}"));
    }

    plan.push("Implement fix".to_string());

    if body.to_lowercase().contains("test") {
        plan.push("Add/update tests".to_string());
    }

    plan.push("Verify solution".to_string());

    plan
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
