//! The acting user of a request and the named permissions it may hold.

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entities::UserRecord;

/// Named permission grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "catalog.delete_product")]
    DeleteProduct,
    #[serde(rename = "catalog.unpublish_product")]
    UnpublishProduct,
    #[serde(rename = "blog.delete_post")]
    DeletePost,
    #[serde(rename = "blog.unpublish_post")]
    UnpublishPost,
}

impl Permission {
    pub const ALL: [Permission; 4] = [
        Permission::DeleteProduct,
        Permission::UnpublishProduct,
        Permission::DeletePost,
        Permission::UnpublishPost,
    ];

    /// Codename used in storage and API payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DeleteProduct => "catalog.delete_product",
            Self::UnpublishProduct => "catalog.unpublish_product",
            Self::DeletePost => "blog.delete_post",
            Self::UnpublishPost => "blog.unpublish_post",
        }
    }
}

impl Display for Permission {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|permission| permission.as_str() == s)
            .ok_or(())
    }
}

/// Permission bundle seeded for catalog moderators.
pub const PRODUCT_MODERATOR_GROUP: &str = "product_moderator";
pub const PRODUCT_MODERATOR_PERMISSIONS: &[Permission] =
    &[Permission::UnpublishProduct, Permission::DeleteProduct];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Actor {
    pub id: Option<Uuid>,
    pub email: Option<String>,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_authenticated: bool,
    pub permissions: BTreeSet<Permission>,
}

impl Actor {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Build the actor for an active user and its effective grants.
    pub fn for_user(user: &UserRecord, permissions: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            id: Some(user.id),
            email: Some(user.email.clone()),
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            is_authenticated: true,
            permissions: permissions.into_iter().collect(),
        }
    }

    /// Superusers implicitly hold every permission.
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.is_authenticated && (self.is_superuser || self.permissions.contains(&permission))
    }

    /// Staff visibility only applies to authenticated actors.
    pub fn sees_unpublished(&self) -> bool {
        self.is_authenticated && self.is_staff
    }

    pub fn label(&self) -> String {
        match (&self.id, &self.email) {
            (Some(id), Some(email)) => format!("user:{id}:{email}"),
            (Some(id), None) => format!("user:{id}"),
            _ => "anonymous".to_string(),
        }
    }
}
