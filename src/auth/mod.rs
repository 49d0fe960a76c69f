//! Caller identity and scoping. Token issuance and password checks live in
//! the authentication collaborator; the core only consumes the resolved
//! identity and role.

use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    Employee,
    Manager,
    Admin,
}

impl UserRole {
    /// Managers and admins may read analytics about other users.
    pub fn is_elevated(self) -> bool {
        matches!(self, Self::Manager | Self::Admin)
    }
}

impl From<&str> for UserRole {
    fn from(value: &str) -> Self {
        match value {
            "admin" => Self::Admin,
            "manager" => Self::Manager,
            _ => Self::Employee,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Employee => write!(f, "employee"),
            Self::Manager => write!(f, "manager"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Actor {
    user_id: Uuid,
    role: UserRole,
}

impl Actor {
    pub fn new(user_id: Uuid, role: UserRole) -> Self {
        Self { user_id, role }
    }

    pub fn admin() -> Self {
        Self {
            user_id: Uuid::max(), // admin ID
            role: UserRole::Admin,
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn role(&self) -> UserRole {
        self.role
    }

    /// Scoping predicate: own data is always visible, everyone else's only
    /// to elevated roles.
    pub fn can_view_user(&self, target: Uuid) -> bool {
        self.role.is_elevated() || self.user_id == target
    }
}
