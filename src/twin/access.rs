//! Category-level access control for the twin document.
//!
//! The first path segment names a category. Each category carries a fixed
//! table of read/write/generate flags per role. Paths outside the four known
//! categories are denied for every role.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::path::TwinPath;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Guide,
    System,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::User, Role::Guide, Role::System];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Guide => "guide",
            Role::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "guide" => Ok(Role::Guide),
            "system" => Ok(Role::System),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Category {
    #[serde(rename = "1_declarative")]
    Declarative,
    #[serde(rename = "2_collected")]
    Collected,
    #[serde(rename = "3_derived")]
    Derived,
    #[serde(rename = "4_generated")]
    Generated,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Declarative,
        Category::Collected,
        Category::Derived,
        Category::Generated,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Category::Declarative => "1_declarative",
            Category::Collected => "2_collected",
            Category::Derived => "3_derived",
            Category::Generated => "4_generated",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    pub fn access(self, role: Role) -> Access {
        use Category::*;
        use Role::*;

        match (self, role) {
            (Declarative, User) => Access::READ_WRITE,
            (Declarative, Guide) => Access::READ,
            (Declarative, System) => Access::READ_WRITE,
            (Collected | Derived, User | Guide) => Access::READ,
            (Collected | Derived, System) => Access::WRITE,
            (Generated, User) => Access::READ,
            (Generated, Guide) => Access::READ_GENERATE,
            (Generated, System) => Access::GENERATE,
        }
    }

    /// Whether `role` may perform `operation` on paths under this category.
    ///
    /// Stored content under `4_generated` is produced by generation, so
    /// writes there require the generate flag rather than write.
    pub fn allows(self, role: Role, operation: Operation) -> bool {
        let access = self.access(role);
        match operation {
            Operation::Read => access.read,
            Operation::Write if self == Category::Generated => access.generate,
            Operation::Write => access.write,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Explicit permission flags for one role on one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
pub struct Access {
    pub read: bool,
    pub write: bool,
    pub generate: bool,
}

impl Access {
    const READ: Access = Access {
        read: true,
        write: false,
        generate: false,
    };
    const WRITE: Access = Access {
        read: false,
        write: true,
        generate: false,
    };
    const READ_WRITE: Access = Access {
        read: true,
        write: true,
        generate: false,
    };
    const GENERATE: Access = Access {
        read: false,
        write: false,
        generate: true,
    };
    const READ_GENERATE: Access = Access {
        read: true,
        write: false,
        generate: true,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Write => "write",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Access denied: role '{role}' cannot {} '{target}'", .operation.as_str())]
pub struct AccessDenied {
    pub role: Role,
    pub operation: Operation,
    pub target: String,
}

/// Check `operation` on a non-root path and return the category it falls in.
pub fn authorize(path: &TwinPath, role: Role, operation: Operation) -> Result<Category, AccessDenied> {
    let denied = |target: &str| AccessDenied {
        role,
        operation,
        target: target.to_string(),
    };

    let head = path.head().ok_or_else(|| denied(""))?;
    let category = Category::from_code(head).ok_or_else(|| denied(head))?;

    if category.allows(role, operation) {
        Ok(category)
    } else {
        Err(denied(category.code()))
    }
}

/// Categories `role` may read, in canonical order.
pub fn readable_categories(role: Role) -> Vec<Category> {
    Category::ALL
        .into_iter()
        .filter(|c| c.allows(role, Operation::Read))
        .collect()
}
