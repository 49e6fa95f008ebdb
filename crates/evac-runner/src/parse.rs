//! Reply parsing into the three-part decision object.
//!
//! The reasoning service returns raw text (ideally JSON). This module
//! extracts it into a [`DecisionResponse`]. A few formatting slips are
//! recovered (a markdown code fence, trailing commas); anything that does
//! not match the schema, such as a missing `action` key, is an error the
//! cognition loop turns into the stay-still fallback.

use evac_types::actions::DecisionResponse;

use crate::error::RunnerError;

/// Parse a reply into a [`DecisionResponse`].
///
/// Attempts multiple recovery strategies if the raw text is not clean JSON:
/// 1. Direct `serde_json` deserialization
/// 2. Extract JSON from a markdown code block
/// 3. Strip trailing commas and retry
/// 4. Both of the above
pub fn parse_decision(raw: &str) -> Result<DecisionResponse, RunnerError> {
    let trimmed = raw.trim();

    // Strategy 1: direct parse. Its error is the one reported if every
    // strategy fails, since it describes the reply as sent.
    let direct_error = match serde_json::from_str::<DecisionResponse>(trimmed) {
        Ok(parsed) => return Ok(parsed),
        Err(e) => e,
    };

    // Strategy 2: extract from markdown code block
    let fenced = extract_json_from_codeblock(trimmed);
    if let Some(json_str) = fenced
        && let Ok(parsed) = serde_json::from_str::<DecisionResponse>(json_str)
    {
        return Ok(parsed);
    }

    // Strategy 3: strip trailing commas and retry
    if let Ok(parsed) = serde_json::from_str::<DecisionResponse>(&strip_trailing_commas(trimmed)) {
        return Ok(parsed);
    }

    // Strategy 4: extract from code block then strip commas
    if let Some(json_str) = fenced
        && let Ok(parsed) = serde_json::from_str::<DecisionResponse>(&strip_trailing_commas(json_str))
    {
        return Ok(parsed);
    }

    Err(RunnerError::Parse(format!("reply does not match the decision schema: {direct_error}")))
}

/// Extract JSON from a markdown code block.
fn extract_json_from_codeblock(text: &str) -> Option<&str> {
    // Content starts on the line after the opening fence.
    let after_fence = |tag: &str| {
        text.find(tag).map(|i| {
            let after_tag = i.checked_add(tag.len()).unwrap_or(i);
            text.get(after_tag..)
                .and_then(|s| s.find('\n'))
                .and_then(|nl| after_tag.checked_add(nl))
                .and_then(|pos| pos.checked_add(1))
                .unwrap_or(after_tag)
        })
    };

    let start = after_fence("```json").or_else(|| after_fence("```"))?;
    let remaining = text.get(start..)?;
    let end = remaining.find("```")?;
    remaining.get(..end).map(str::trim)
}

/// Strip trailing commas before closing braces and brackets.
///
/// Commas inside string literals are kept.
fn strip_trailing_commas(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            result.push(c);
            continue;
        }
        match c {
            '"' => in_string = true,
            ',' => {
                let rest = chars.clone().find(|n| !n.is_whitespace());
                if matches!(rest, Some('}' | ']')) {
                    continue;
                }
            }
            _ => {}
        }
        result.push(c);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "thought": "Shots nearby, I should leave.",
        "action": {"vocal_mode": "out_loud", "utterance": "Run!", "movement": "sprint", "action_id": "hallway1"},
        "update": {"mood": "terrified", "memory": "Heard gunshots and ran."}
    }"#;

    #[test]
    fn parse_valid_reply() {
        let Ok(decision) = parse_decision(VALID) else {
            panic!("valid reply should parse");
        };
        assert_eq!(decision.action.action_id, "hallway1");
        assert_eq!(decision.action.utterance, "Run!");
        assert_eq!(decision.update.mood, "terrified");
    }

    #[test]
    fn parse_from_codeblock() {
        let raw = format!("Here is my decision:\n\n```json\n{VALID}\n```\n\nStay safe.");
        assert!(parse_decision(&raw).is_ok());
    }

    #[test]
    fn parse_trailing_commas() {
        let raw = r#"{
            "thought": "hide, now",
            "action": {"vocal_mode": "silent", "utterance": "", "movement": "walk", "action_id": "hide_spot_desk",},
            "update": {"mood": "calm", "memory": "Hid under, the desk",},
        }"#;
        let Ok(decision) = parse_decision(raw) else {
            panic!("trailing commas should be recovered");
        };
        assert_eq!(decision.thought, "hide, now");
        assert_eq!(decision.update.memory, "Hid under, the desk");
    }

    #[test]
    fn parse_codeblock_with_trailing_commas() {
        let raw = "```\n{\"thought\": \"t\", \"action\": {\"vocal_mode\": \"silent\", \"utterance\": \"\", \
                   \"movement\": \"stay_still\", \"action_id\": \"stay_still\",}, \
                   \"update\": {\"mood\": \"m\", \"memory\": \"x\"},}\n```";
        assert!(parse_decision(raw).is_ok());
    }

    #[test]
    fn missing_action_key_is_rejected() {
        let raw = r#"{"thought": "hm", "update": {"mood": "x", "memory": "y"}}"#;
        assert!(matches!(parse_decision(raw), Err(RunnerError::Parse(_))));
    }

    #[test]
    fn garbage_and_empty_are_rejected() {
        assert!(parse_decision("I think I should run to the exit.").is_err());
        assert!(parse_decision("").is_err());
    }

    #[test]
    fn extract_json_from_markdown() {
        assert_eq!(
            extract_json_from_codeblock("```json\n{\"key\": \"value\"}\n```"),
            Some("{\"key\": \"value\"}")
        );
        assert_eq!(
            extract_json_from_codeblock("```\n{\"key\": \"value\"}\n```"),
            Some("{\"key\": \"value\"}")
        );
        assert_eq!(extract_json_from_codeblock("{\"key\": 1}"), None);
    }

    #[test]
    fn trailing_comma_inside_string_is_kept() {
        assert_eq!(strip_trailing_commas(r#"{"a": "x,}",}"#), r#"{"a": "x,}"}"#);
        assert_eq!(strip_trailing_commas("[1, 2, ]"), "[1, 2 ]");
    }
}
