//! Changelog construction from pull request commit messages.
//!
//! A commit message may reference another pull request (`#123`). The labels
//! attached to the referenced pull request decide which changelog section the
//! commit lands in; commits with no reference, an unresolvable reference, or
//! no recognized label fall into the [`FALLBACK_LABEL`] section.

use std::collections::HashSet;
use std::future::Future;
use std::sync::LazyLock;

use anyhow::Result;
use futures::future::join_all;
use regex::Regex;
use tracing::{debug, warn};

/// Heading label for commits that match no recognized label.
pub const FALLBACK_LABEL: &str = "improvements";

#[allow(clippy::unwrap_used)] // Compile-time constant regex pattern
static PR_REFERENCE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(\d+)").unwrap());

/// Resolves the labels attached to a referenced pull request.
pub trait LabelLookup {
    /// Returns the label names attached to pull request `pull_number`.
    fn labels_of(
        &self,
        pull_number: u64,
    ) -> impl Future<Output = Result<Vec<String>>> + Send;
}

/// A commit message together with the recognized labels it was routed to.
///
/// An empty label set means the message belongs to the fallback section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedMessage {
    /// Raw commit message text.
    pub message: String,
    /// Recognized labels of the referenced pull request, if any.
    pub labels: Vec<String>,
}

/// One heading label with its rendered bullet lines, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Heading label as configured (lowercase in the common case).
    pub label: String,
    /// Bullet lines, one per classified commit message.
    pub bullets: Vec<String>,
}

/// Extracts the first pull request reference (`#<digits>`) from a message.
///
/// Later references are ignored; only the first one is significant.
pub fn extract_pr_reference(message: &str) -> Option<u64> {
    PR_REFERENCE_PATTERN
        .captures(message)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

/// Classifies a single commit message against the recognized heading labels.
///
/// Returns the intersection of the referenced pull request's labels with
/// `recognized`. A lookup failure is logged and degrades the message to
/// fallback routing so one unresolvable reference cannot abort the run.
pub async fn classify<L: LabelLookup>(
    message: &str,
    recognized: &[String],
    lookup: &L,
) -> ClassifiedMessage {
    let labels = match extract_pr_reference(message) {
        Some(referenced) => match lookup.labels_of(referenced).await {
            Ok(pr_labels) => {
                let attached: HashSet<&str> = pr_labels.iter().map(String::as_str).collect();
                recognized
                    .iter()
                    .filter(|label| attached.contains(label.as_str()))
                    .cloned()
                    .collect()
            }
            Err(err) => {
                warn!(
                    referenced,
                    error = %err,
                    "label lookup failed, routing message to fallback section"
                );
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    debug!(message, ?labels, "classified commit message");

    ClassifiedMessage {
        message: message.to_string(),
        labels,
    }
}

/// Classifies every message, resolving label lookups concurrently.
///
/// All lookups settle before anything is returned, and the output order
/// matches the input order, so downstream aggregation sees fully materialized
/// results in original message order.
pub async fn classify_all<L: LabelLookup + Sync>(
    messages: &[String],
    recognized: &[String],
    lookup: &L,
) -> Vec<ClassifiedMessage> {
    join_all(
        messages
            .iter()
            .map(|message| classify(message, recognized, lookup)),
    )
    .await
}

/// Folds classified messages into sections keyed by heading label.
///
/// Sections appear in first-insertion order: the order in which each label
/// was first matched across the message sequence. A message with an empty
/// label set contributes one bullet to the fallback section; a message with
/// several labels contributes the same bullet to each of them.
pub fn aggregate(classified: &[ClassifiedMessage]) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();

    for entry in classified {
        if entry.labels.is_empty() {
            push_bullet(&mut sections, FALLBACK_LABEL, &entry.message);
        } else {
            for label in &entry.labels {
                push_bullet(&mut sections, label, &entry.message);
            }
        }
    }

    sections
}

fn push_bullet(sections: &mut Vec<Section>, label: &str, message: &str) {
    let bullet = format!("* {message}");
    if let Some(section) = sections.iter_mut().find(|s| s.label == label) {
        section.bullets.push(bullet);
    } else {
        sections.push(Section {
            label: label.to_string(),
            bullets: vec![bullet],
        });
    }
}

/// Renders sections as markdown, preserving section order.
///
/// Each section is a `## Heading`, a blank line, then its bullets; sections
/// are separated by exactly one blank line.
pub fn render(sections: &[Section]) -> String {
    if sections.is_empty() {
        return String::new();
    }

    let blocks: Vec<String> = sections
        .iter()
        .map(|section| {
            format!(
                "## {}\n\n{}",
                capitalize(&section.label),
                section.bullets.join("\n")
            )
        })
        .collect();

    let mut rendered = blocks.join("\n\n");
    rendered.push('\n');
    rendered
}

/// Appends the rendered changelog to an existing body, if there is one.
pub fn merge(existing_body: Option<&str>, changelog: &str) -> String {
    match existing_body {
        Some(body) if !body.is_empty() => format!("{body}\n\n{changelog}"),
        _ => changelog.to_string(),
    }
}

/// Upper-cases the first character of a label, leaving the rest unchanged.
fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn msg(message: &str, labels: &[&str]) -> ClassifiedMessage {
        ClassifiedMessage {
            message: message.to_string(),
            labels: labels.iter().map(ToString::to_string).collect(),
        }
    }

    fn recognized(labels: &[&str]) -> Vec<String> {
        labels.iter().map(ToString::to_string).collect()
    }

    /// Lookup backed by a fixed map; records how often it was consulted.
    struct MapLookup {
        labels: HashMap<u64, Vec<String>>,
        calls: AtomicUsize,
    }

    impl MapLookup {
        fn new(entries: &[(u64, &[&str])]) -> Self {
            Self {
                labels: entries
                    .iter()
                    .map(|(number, labels)| {
                        (*number, labels.iter().map(ToString::to_string).collect())
                    })
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl LabelLookup for MapLookup {
        async fn labels_of(&self, pull_number: u64) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.labels.get(&pull_number).cloned().unwrap_or_default())
        }
    }

    /// Lookup that always fails, for degrade-to-fallback coverage.
    struct FailingLookup;

    impl LabelLookup for FailingLookup {
        async fn labels_of(&self, pull_number: u64) -> Result<Vec<String>> {
            anyhow::bail!("lookup for #{pull_number} failed")
        }
    }

    // --- extract_pr_reference ---

    #[test]
    fn reference_at_end() {
        assert_eq!(extract_pr_reference("Fix crash #10"), Some(10));
    }

    #[test]
    fn reference_mid_message() {
        assert_eq!(extract_pr_reference("See #42 for details"), Some(42));
    }

    #[test]
    fn first_reference_wins() {
        assert_eq!(extract_pr_reference("Merge #7 into #8"), Some(7));
    }

    #[test]
    fn no_reference() {
        assert_eq!(extract_pr_reference("Typo fix"), None);
    }

    #[test]
    fn hash_without_digits() {
        assert_eq!(extract_pr_reference("Fix #crash in parser"), None);
    }

    // --- classify ---

    #[tokio::test]
    async fn classify_single_label() {
        let lookup = MapLookup::new(&[(10, &["bug", "docs"])]);
        let result = classify("Fix crash #10", &recognized(&["bug", "feature"]), &lookup).await;
        assert_eq!(result.labels, vec!["bug".to_string()]);
        assert_eq!(result.message, "Fix crash #10");
    }

    #[tokio::test]
    async fn classify_multiple_labels() {
        let lookup = MapLookup::new(&[(11, &["feature", "bug"])]);
        let result = classify("Add widget #11", &recognized(&["bug", "feature"]), &lookup).await;
        assert_eq!(result.labels.len(), 2);
        assert!(result.labels.contains(&"bug".to_string()));
        assert!(result.labels.contains(&"feature".to_string()));
    }

    #[tokio::test]
    async fn classify_no_recognized_intersection() {
        let lookup = MapLookup::new(&[(12, &["docs"])]);
        let result = classify("Document api #12", &recognized(&["bug"]), &lookup).await;
        assert!(result.labels.is_empty());
    }

    #[tokio::test]
    async fn classify_without_reference_skips_lookup() {
        let lookup = MapLookup::new(&[]);
        let result = classify("Typo fix", &recognized(&["bug"]), &lookup).await;
        assert!(result.labels.is_empty());
        assert_eq!(lookup.call_count(), 0);
    }

    #[tokio::test]
    async fn classify_lookup_failure_degrades_to_fallback() {
        let result = classify("Fix crash #10", &recognized(&["bug"]), &FailingLookup).await;
        assert!(result.labels.is_empty());
    }

    #[tokio::test]
    async fn classify_all_preserves_message_order() {
        let lookup = MapLookup::new(&[(10, &["bug"]), (11, &["feature"])]);
        let messages = vec![
            "Add widget #11".to_string(),
            "Typo fix".to_string(),
            "Fix crash #10".to_string(),
        ];
        let classified = classify_all(&messages, &recognized(&["bug", "feature"]), &lookup).await;
        let order: Vec<&str> = classified.iter().map(|c| c.message.as_str()).collect();
        assert_eq!(order, vec!["Add widget #11", "Typo fix", "Fix crash #10"]);
        assert_eq!(lookup.call_count(), 2);
    }

    // --- aggregate ---

    #[test]
    fn aggregate_fallback_only() {
        let sections = aggregate(&[msg("First", &[]), msg("Second", &[])]);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].label, FALLBACK_LABEL);
        assert_eq!(sections[0].bullets, vec!["* First", "* Second"]);
    }

    #[test]
    fn aggregate_first_insertion_order() {
        let sections = aggregate(&[
            msg("B", &["feature"]),
            msg("A", &["bug"]),
            msg("C", &["feature"]),
        ]);
        let labels: Vec<&str> = sections.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["feature", "bug"]);
        assert_eq!(sections[0].bullets, vec!["* B", "* C"]);
    }

    #[test]
    fn aggregate_multi_label_message_appears_in_each_section() {
        let sections = aggregate(&[msg("Add widget #11", &["bug", "feature"])]);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].bullets, vec!["* Add widget #11"]);
        assert_eq!(sections[1].bullets, vec!["* Add widget #11"]);
    }

    #[test]
    fn aggregate_empty_input() {
        assert!(aggregate(&[]).is_empty());
    }

    proptest! {
        /// Messages with no reference always land in one fallback section,
        /// one bullet per message, in input order.
        #[test]
        fn unreferenced_messages_fill_fallback_in_order(
            messages in proptest::collection::vec("[a-zA-Z0-9 .,]{1,40}", 1..16)
        ) {
            let classified: Vec<ClassifiedMessage> =
                messages.iter().map(|m| msg(m, &[])).collect();
            let sections = aggregate(&classified);
            prop_assert_eq!(sections.len(), 1);
            prop_assert_eq!(sections[0].label.as_str(), FALLBACK_LABEL);
            let expected: Vec<String> =
                messages.iter().map(|m| format!("* {m}")).collect();
            prop_assert_eq!(&sections[0].bullets, &expected);
        }
    }

    // --- render ---

    #[test]
    fn render_matches_expected_layout() {
        let sections = aggregate(&[
            msg("Fix crash #10", &["bug"]),
            msg("Add widget #11", &["feature"]),
            msg("Typo fix", &[]),
        ]);
        let expected = "## Bug\n\n* Fix crash #10\n\n\
                        ## Feature\n\n* Add widget #11\n\n\
                        ## Improvements\n\n* Typo fix\n";
        assert_eq!(render(&sections), expected);
    }

    #[test]
    fn render_empty_sections() {
        assert_eq!(render(&[]), "");
    }

    #[test]
    fn render_single_section_multiple_bullets() {
        let sections = aggregate(&[msg("One", &["bug"]), msg("Two", &["bug"])]);
        assert_eq!(render(&sections), "## Bug\n\n* One\n* Two\n");
    }

    // --- capitalize ---

    #[test]
    fn capitalize_single_word() {
        assert_eq!(capitalize("bug"), "Bug");
    }

    #[test]
    fn capitalize_multi_word_first_char_only() {
        assert_eq!(capitalize("breaking change"), "Breaking change");
    }

    #[test]
    fn capitalize_empty() {
        assert_eq!(capitalize(""), "");
    }

    // --- merge ---

    #[test]
    fn merge_without_existing_body() {
        assert_eq!(merge(None, "X"), "X");
    }

    #[test]
    fn merge_with_empty_existing_body() {
        assert_eq!(merge(Some(""), "X"), "X");
    }

    #[test]
    fn merge_appends_after_blank_line() {
        assert_eq!(merge(Some("A"), "X"), "A\n\nX");
    }
}
