use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub avatar_url: String,
    #[serde(default)]
    pub is_ai: bool,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>, avatar_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            avatar_url: avatar_url.into(),
            is_ai: false,
        }
    }

    pub fn ai(id: impl Into<String>, name: impl Into<String>, avatar_url: impl Into<String>) -> Self {
        Self {
            is_ai: true,
            ..Self::new(id, name, avatar_url)
        }
    }

    pub fn name_matches(&self, query: &str) -> bool {
        self.name.to_lowercase().contains(&query.to_lowercase())
    }
}

/// Users that can log in (AI participants are excluded)
pub fn login_candidates(users: &[User]) -> Vec<User> {
    users.iter().filter(|u| !u.is_ai).cloned().collect()
}

/// Everyone except `current_user_id` whose name contains `query`, case-insensitively
pub fn search_contacts(users: &[User], current_user_id: &str, query: &str) -> Vec<User> {
    users
        .iter()
        .filter(|u| u.id != current_user_id && u.name_matches(query))
        .cloned()
        .collect()
}
