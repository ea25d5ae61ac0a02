use uuid::Uuid;

use super::repo_types::User;

/// What the acting user may do with shared data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// May add and approve ingredients directly.
    Manager,
    Regular,
}

/// The authenticated user a request acts for.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl Principal {
    pub fn is_manager(&self) -> bool {
        self.role == Role::Manager
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: if user.can_manage_ingredients {
                Role::Manager
            } else {
                Role::Regular
            },
        }
    }
}
