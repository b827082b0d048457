//! Deterministic badge colours.
//!
//! The same identifier always maps to the same palette entry so a garden or
//! volunteer keeps its colour across pages and reloads.

use serde_json::Value;

use crate::config::{BADGE_COLORS, DEFAULT_BADGE_COLOR};

/// Palette colour for an identifier; [`DEFAULT_BADGE_COLOR`] when there is none.
pub fn color_for_identifier(identifier: Option<&str>) -> &'static str {
    match identifier {
        Some(id) if !id.is_empty() => {
            let index = string_hash(id).unsigned_abs() as usize % BADGE_COLORS.len();
            BADGE_COLORS[index]
        }
        _ => DEFAULT_BADGE_COLOR,
    }
}

/// 32-bit `h * 31 + c` hash over UTF-16 code units.
fn string_hash(s: &str) -> i32 {
    s.encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

/// Colour for a garden: its own `color`, else one derived from slug, title or id.
pub fn garden_color(garden: &Value) -> String {
    entity_color(
        garden,
        &[
            &["attributes", "slug"],
            &["attributes", "title"],
            &["slug"],
            &["title"],
            &["id"],
            &["attributes", "id"],
        ],
    )
}

/// Colour for a volunteer: its own `color`, else one derived from username,
/// email or id.
pub fn volunteer_color(volunteer: &Value) -> String {
    entity_color(
        volunteer,
        &[
            &["username"],
            &["email"],
            &["attributes", "username"],
            &["attributes", "email"],
            &["id"],
            &["attributes", "id"],
        ],
    )
}

fn entity_color(entity: &Value, fallbacks: &[&[&str]]) -> String {
    if entity.is_null() {
        return DEFAULT_BADGE_COLOR.to_string();
    }
    if let Some(color) = entity.get("color").and_then(Value::as_str).filter(|c| !c.is_empty()) {
        return color.to_string();
    }
    let identifier = fallbacks
        .iter()
        .find_map(|path| identifier_at(entity, path));
    color_for_identifier(identifier.as_deref()).to_string()
}

fn identifier_at(entity: &Value, path: &[&str]) -> Option<String> {
    let value = path.iter().try_fold(entity, |value, key| value.get(key))?;
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_known_hashes() {
        assert_eq!(color_for_identifier(Some("a")), "green");
        assert_eq!(color_for_identifier(Some("ab")), "yellow");
        assert_eq!(color_for_identifier(None), DEFAULT_BADGE_COLOR);
        assert_eq!(color_for_identifier(Some("")), DEFAULT_BADGE_COLOR);
    }

    #[test]
    fn test_hash_is_stable() {
        let first = color_for_identifier(Some("oak-park"));
        assert_eq!(color_for_identifier(Some("oak-park")), first);
        assert!(BADGE_COLORS.contains(&first));
    }

    #[test]
    fn test_explicit_color_wins() {
        assert_eq!(garden_color(&json!({"color": "indigo", "slug": "a"})), "indigo");
        assert_eq!(garden_color(&Value::Null), DEFAULT_BADGE_COLOR);
    }

    #[test]
    fn test_fallback_fields() {
        assert_eq!(garden_color(&json!({"attributes": {"slug": "a"}})), "green");
        assert_eq!(garden_color(&json!({"title": "ab", "id": 3})), "yellow");
        assert_eq!(volunteer_color(&json!({"username": "", "email": "a"})), "green");
        assert_eq!(
            volunteer_color(&json!({"id": 3})),
            color_for_identifier(Some("3"))
        );
    }
}
