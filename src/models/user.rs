use serde::{Deserialize, Serialize};

use super::{Fields, RecordId};

/// Authenticated user, as returned by the CMS auth endpoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: RecordId,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(flatten)]
    pub extra: Fields,
}

impl User {
    /// Name shown in the UI: username, then email, then `user #<id>`.
    pub fn display_name(&self) -> String {
        if !self.username.is_empty() {
            self.username.clone()
        } else if !self.email.is_empty() {
            self.email.clone()
        } else {
            format!("user #{}", self.id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_keeps_unknown_fields() {
        let user: User = serde_json::from_value(json!({
            "id": 7,
            "username": "fern",
            "email": "fern@example.org",
            "confirmed": true
        }))
        .unwrap();
        assert_eq!(user.display_name(), "fern");
        assert_eq!(user.extra.get("confirmed"), Some(&json!(true)));
    }

    #[test]
    fn test_display_name_fallbacks() {
        let user: User = serde_json::from_value(json!({"id": 7})).unwrap();
        assert_eq!(user.display_name(), "user #7");

        let user: User = serde_json::from_value(json!({"id": 7, "email": "a@b.c"})).unwrap();
        assert_eq!(user.display_name(), "a@b.c");
    }
}
