use std::str::FromStr;

use crate::error::CoreError;

/// An operation a caller performs on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    Find,
    Search,
    Save,
    Destroy,
}

impl Operation {
    /// Every operation, in declaration order.
    pub const ALL: [Self; 4] = [Self::Find, Self::Search, Self::Save, Self::Destroy];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Find => "find",
            Self::Search => "search",
            Self::Save => "save",
            Self::Destroy => "destroy",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "find" => Ok(Self::Find),
            "search" => Ok(Self::Search),
            "save" => Ok(Self::Save),
            "destroy" => Ok(Self::Destroy),
            other => Err(CoreError::InvalidOperation(other.to_string())),
        }
    }
}
