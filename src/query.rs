//! Best-effort parameter extraction from free-text queries
//!
//! A convenience layer for callers that pass a raw user query without
//! explicit parameters. The engine itself never depends on these
//! heuristics: explicit parameters always win.
//!
//! Rules: a double-quoted phrase becomes `primary`; the phrase after
//! "about"/"for"/"on" becomes `topic` (quoted or bare); a capitalized
//! phrase after "in" becomes `location`, defaulting to "United States".

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// Default location when the query names none
pub const DEFAULT_LOCATION: &str = "United States";

static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]+)""#).expect("Invalid regex pattern"));

static TOPIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:about|for|on)\s+(?:"([^"]+)"|([^",.;!?]+))"#)
        .expect("Invalid regex pattern")
});

static LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bin\s+([A-Z][A-Za-z]*(?:\s+[A-Z][A-Za-z]*)*)").expect("Invalid regex pattern")
});

/// Derive workflow parameters from a free-text query
pub fn extract_parameters(user_query: &str) -> Map<String, Value> {
    let mut params = Map::new();

    if let Some(cap) = QUOTED.captures(user_query) {
        params.insert(
            "primary".to_string(),
            Value::String(cap[1].trim().to_string()),
        );
    }

    // Group 1 is a quoted phrase after the preposition, group 2 a bare one
    let topic = TOPIC.captures_iter(user_query).find_map(|cap| {
        let phrase = cap.get(1).or_else(|| cap.get(2))?.as_str().trim();
        (!phrase.is_empty()).then(|| phrase.to_string())
    });
    if let Some(topic) = topic {
        params.insert("topic".to_string(), Value::String(topic));
    }

    let place = LOCATION
        .captures(user_query)
        .map(|cap| cap[1].trim().to_string())
        .unwrap_or_else(|| DEFAULT_LOCATION.to_string());
    params.insert("location".to_string(), Value::String(place));

    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn quoted_phrase_becomes_primary() {
        let params = extract_parameters(r#"research "electric bikes" please"#);
        assert_eq!(params["primary"], json!("electric bikes"));
    }

    #[test]
    fn topic_follows_about_for_or_on() {
        assert_eq!(
            extract_parameters("write about solar panels")["topic"],
            json!("solar panels")
        );
        assert_eq!(
            extract_parameters("a report on supply chains, quickly")["topic"],
            json!("supply chains")
        );
        assert_eq!(
            extract_parameters("draft copy for local bakeries")["topic"],
            json!("local bakeries")
        );
    }

    #[test]
    fn quoted_topic_after_preposition_is_extracted() {
        assert_eq!(
            extract_parameters(r#"write about "home coffee roasting" today"#)["topic"],
            json!("home coffee roasting")
        );
    }

    #[test]
    fn location_defaults_to_united_states() {
        let params = extract_parameters("find plumbers");
        assert_eq!(params["location"], json!("United States"));
    }

    #[test]
    fn capitalized_location_after_in_is_extracted() {
        let params = extract_parameters("find plumbers in New York");
        assert_eq!(params["location"], json!("New York"));
    }

    #[test]
    fn combined_extraction() {
        let params = extract_parameters(r#"write a guide about "home coffee roasting" in Portland"#);
        assert_eq!(params["primary"], json!("home coffee roasting"));
        assert_eq!(params["topic"], json!("home coffee roasting"));
        assert_eq!(params["location"], json!("Portland"));
    }

    #[test]
    fn empty_query_still_yields_location() {
        let params = extract_parameters("");
        assert_eq!(params.len(), 1);
        assert_eq!(params["location"], json!("United States"));
    }
}
