use std::fmt::{Display, Formatter};
use std::str::FromStr;

use lendgate_core::AppError;
use serde::{Deserialize, Serialize};

/// Breadth of a permission grant, ordered from narrowest to broadest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scope {
    /// Resources owned by the actor.
    Own,
    /// Resources belonging to the actor's team.
    Team,
    /// Resources belonging to the actor's department.
    Department,
    /// Resources belonging to the actor's branch.
    Branch,
    /// Any resource.
    Global,
}

impl Scope {
    /// Returns a stable storage value for this scope.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Own => "OWN",
            Self::Team => "TEAM",
            Self::Department => "DEPARTMENT",
            Self::Branch => "BRANCH",
            Self::Global => "GLOBAL",
        }
    }

    /// Returns all scopes from narrowest to broadest.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Scope] = &[
            Scope::Own,
            Scope::Team,
            Scope::Department,
            Scope::Branch,
            Scope::Global,
        ];

        ALL
    }

    /// Returns whether a grant at this scope covers a requirement at `required`.
    #[must_use]
    pub fn covers(&self, required: Scope) -> bool {
        *self >= required
    }
}

impl Display for Scope {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "OWN" => Ok(Self::Own),
            "TEAM" => Ok(Self::Team),
            "DEPARTMENT" => Ok(Self::Department),
            "BRANCH" => Ok(Self::Branch),
            "GLOBAL" => Ok(Self::Global),
            _ => Err(AppError::Validation(format!(
                "unknown scope value '{value}'"
            ))),
        }
    }
}
