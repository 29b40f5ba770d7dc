//! Profile compactor — reduces the full profile document to a short plain-text
//! digest for the system prompt.
//!
//! The upstream free tier rejects prompts above roughly 800 tokens, so every
//! section here is capped. The output is a pure function of the input.

use serde_json::{Map, Value};

const MAX_PROJECTS: usize = 6;
const OVERVIEW_CHARS: usize = 120;
const SKILLS_PER_CATEGORY: usize = 8;
const MAX_SKILLS: usize = 20;

const NAME_CHARS: usize = 80;
const SUMMARY_CHARS: usize = 400;
const FOCUS_CHARS: usize = 200;
const FIELD_CHARS: usize = 120;
const SKILL_CHARS: usize = 40;
const FALLBACK_CHARS: usize = 1000;

/// Keys accepted for the most recent role, with the label each renders under.
const ROLE_KEYS: &[(&str, &str)] = &[("internship", "Internship"), ("latest_role", "Latest role")];

/// Builds the digest. Non-object (or empty) input is rendered verbatim as JSON,
/// clipped to a fixed length.
pub fn compact_profile(profile: &Value) -> String {
    let data = match profile.as_object() {
        Some(data) if !data.is_empty() => data,
        _ => return clip(&profile.to_string(), FALLBACK_CHARS),
    };

    let mut parts = Vec::new();

    if let Some(name) = present(data, "name") {
        parts.push(format!("Name: {}", clip(&text(name), NAME_CHARS)));
    }
    if let Some(summary) = present(data, "summary") {
        parts.push(format!("Summary: {}", clip(&text(summary), SUMMARY_CHARS)));
    }
    if let Some(line) = education_line(data) {
        parts.push(line);
    }
    if let Some(line) = role_line(data) {
        parts.push(line);
    }
    if let Some(line) = projects_line(data) {
        parts.push(line);
    }
    if let Some(line) = skills_line(data) {
        parts.push(line);
    }
    if let Some(focus) = present(data, "focus") {
        parts.push(format!("Focus: {}", clip(&text(focus), FOCUS_CHARS)));
    }

    parts.join("\n")
}

fn education_line(data: &Map<String, Value>) -> Option<String> {
    let ed = present(data, "education")?.as_object()?;
    if present(ed, "degree").is_none() && present(ed, "institution").is_none() {
        return None;
    }
    Some(format!(
        "Education: {} from {} ({})",
        subfield(ed, "degree"),
        subfield(ed, "institution"),
        subfield(ed, "year"),
    ))
}

fn role_line(data: &Map<String, Value>) -> Option<String> {
    ROLE_KEYS.iter().find_map(|(key, label)| {
        let role = present(data, key)?.as_object()?;
        present(role, "company")?;
        Some(
            format!(
                "{label}: {} at {}, {}",
                subfield(role, "role"),
                subfield(role, "company"),
                subfield(role, "duration"),
            )
            .trim()
            .to_string(),
        )
    })
}

fn projects_line(data: &Map<String, Value>) -> Option<String> {
    let projects = present(data, "projects")?.as_array()?;
    // The cap counts entries, not rendered lines: unnamed projects still use a slot.
    let lines: Vec<String> = projects
        .iter()
        .take(MAX_PROJECTS)
        .filter_map(|p| {
            let p = p.as_object()?;
            let name = clip(&text(present(p, "name")?), FIELD_CHARS);
            let overview = p.get("overview").map(text).unwrap_or_default();
            let overview = clip(&overview, OVERVIEW_CHARS);
            Some(if overview.is_empty() {
                format!("- {name}")
            } else {
                format!("- {name}: {overview}")
            })
        })
        .collect();

    (!lines.is_empty()).then(|| format!("Projects: {}", lines.join(" ")))
}

fn skills_line(data: &Map<String, Value>) -> Option<String> {
    let skills = present(data, "skills")?.as_object()?;
    let mut all = Vec::new();
    for value in skills.values() {
        match value {
            Value::Array(items) => all.extend(
                items
                    .iter()
                    .take(SKILLS_PER_CATEGORY)
                    .map(text)
                    .filter(|s| !s.is_empty()),
            ),
            other if is_truthy(other) => all.push(text(other)),
            _ => {}
        }
    }
    if all.is_empty() {
        return None;
    }
    let shown: Vec<String> = all
        .iter()
        .take(MAX_SKILLS)
        .map(|s| clip(s, SKILL_CHARS))
        .collect();
    Some(format!("Skills: {}", shown.join(", ")))
}

/// A field counts as present only when it holds something non-empty.
fn present<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|v| is_truthy(v))
}

/// Subfields render empty when missing rather than suppressing the line.
fn subfield(map: &Map<String, Value>, key: &str) -> String {
    map.get(key)
        .map(|v| clip(&text(v), FIELD_CHARS))
        .unwrap_or_default()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Display text for a JSON value: strings unquoted, `null` empty.
fn text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Truncates to at most `max` characters (not bytes).
fn clip(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
