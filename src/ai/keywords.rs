//! Keyword extraction and summarization over plain token statistics. No
//! external service involved.

use std::collections::HashMap;

/// Top terms of a text: lowercased, split at non-alphanumeric boundaries,
/// single-character tokens dropped, ranked by frequency with an alphabetical
/// tie-break, capped at ten.
pub fn extract_keywords(content: &str) -> Vec<String> {
    if content.trim().is_empty() {
        return Vec::new();
    }

    let mut freq: HashMap<String, usize> = HashMap::new();
    for token in content.split(|c: char| !c.is_alphanumeric()) {
        if token.chars().count() < 2 {
            continue;
        }
        *freq.entry(token.to_lowercase()).or_insert(0) += 1;
    }

    let mut ranked: Vec<(String, usize)> = freq.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(10).map(|(word, _)| word).collect()
}

/// Markup-free leading 200 characters, with an ellipsis when something was
/// cut off.
pub fn generate_summary(content: &str) -> String {
    let stripped = strip_markup(content);
    let trimmed = stripped.trim();
    let summary: String = trimmed.chars().take(200).collect();
    if trimmed.chars().count() > 200 {
        summary + "..."
    } else {
        summary
    }
}

/// Drop everything between `<` and `>`.
fn strip_markup(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut in_tag = false;
    for c in content.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_rank_by_frequency_then_alphabetically() {
        let tags = extract_keywords("pear pear apple banana banana cherry");
        assert_eq!(tags, vec!["banana", "pear", "apple", "cherry"]);
    }

    #[test]
    fn keywords_drop_single_characters_and_lowercase() {
        let tags = extract_keywords("A b Rust RUST rust x");
        assert_eq!(tags, vec!["rust"]);
    }

    #[test]
    fn keywords_cap_at_ten() {
        let content = "alpha bravo charlie delta echo foxtrot golf hotel india juliett kilo lima";
        let tags = extract_keywords(content);
        assert_eq!(tags.len(), 10);
        assert!(!tags.contains(&"kilo".to_string()));
        assert!(!tags.contains(&"lima".to_string()));
    }

    #[test]
    fn keywords_of_blank_content_are_empty() {
        assert!(extract_keywords("").is_empty());
        assert!(extract_keywords("   \n\t ").is_empty());
    }

    #[test]
    fn summary_strips_markup() {
        assert_eq!(
            generate_summary("<p>Hello</p> <b>world</b>"),
            "Hello world"
        );
    }

    #[test]
    fn summary_truncates_long_content_by_characters() {
        let long = "中".repeat(250);
        let summary = generate_summary(&long);
        assert_eq!(summary.chars().count(), 203);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn summary_leaves_short_content_alone() {
        assert_eq!(generate_summary("  short note  "), "short note");
    }

    #[test]
    fn summary_at_exactly_200_characters_has_no_ellipsis() {
        let exact = "a".repeat(200);
        assert_eq!(generate_summary(&exact), exact);
    }
}
