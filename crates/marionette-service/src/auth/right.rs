use std::collections::BTreeSet;
use std::net::IpAddr;

use marionette_core::types::Operation;

use super::pattern::AccessList;
use crate::error::AclError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RightKind {
    Name,
    Path,
}

/// Outcome of evaluating a single right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
    /// The right does not cover the requested operation.
    Undecided,
}

/// A named access list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Right {
    name: String,
    shortname: char,
    access: AccessList,
}

impl Right {
    /// ## Summary
    /// Creates an empty right. The shortname defaults to the first character
    /// of the name, ignoring a leading `/`.
    #[must_use]
    pub fn new(name: &str) -> Self {
        let shortname = name
            .trim_start_matches('/')
            .chars()
            .next()
            .unwrap_or('/')
            .to_ascii_lowercase();
        Self::with_shortname(name, shortname)
    }

    #[must_use]
    pub fn with_shortname(name: &str, shortname: char) -> Self {
        Self {
            name: name.to_string(),
            shortname,
            access: AccessList::default(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn shortname(&self) -> char {
        self.shortname
    }

    #[must_use]
    pub const fn access(&self) -> &AccessList {
        &self.access
    }

    pub const fn access_mut(&mut self) -> &mut AccessList {
        &mut self.access
    }

    #[must_use]
    pub fn allowed(&self, identity: &str, address: IpAddr) -> bool {
        self.access.is_allowed(identity, address)
    }
}

impl std::fmt::Display for Right {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "access[{}]", self.name)
    }
}

/// A right governing every resource path that starts with its path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRight {
    right: Right,
    /// `None` until the first `method` restriction.
    methods: Option<BTreeSet<Operation>>,
}

impl PathRight {
    /// ## Errors
    /// Returns `InvalidPath` unless the path starts with `/`.
    pub fn new(path: &str) -> Result<Self, AclError> {
        if !path.starts_with('/') {
            return Err(AclError::InvalidPath(path.to_string()));
        }
        Ok(Self {
            right: Right::new(path),
            methods: None,
        })
    }

    #[must_use]
    pub fn path(&self) -> &str {
        self.right.name()
    }

    #[must_use]
    pub fn length(&self) -> usize {
        self.path().len()
    }

    #[must_use]
    pub const fn right(&self) -> &Right {
        &self.right
    }

    pub const fn right_mut(&mut self) -> &mut Right {
        &mut self.right
    }

    /// Raw byte prefix: `/file` also governs `/filesystem`.
    #[must_use]
    pub fn matches(&self, resource_path: &str) -> bool {
        resource_path.starts_with(self.path())
    }

    #[must_use]
    pub fn permits(&self, operation: Operation) -> bool {
        self.methods
            .as_ref()
            .is_none_or(|methods| methods.contains(&operation))
    }

    /// Allowed operations, in a stable order.
    #[must_use]
    pub fn methods(&self) -> Vec<Operation> {
        Operation::ALL
            .into_iter()
            .filter(|op| self.permits(*op))
            .collect()
    }

    /// ## Summary
    /// Narrows the right to an explicit operation list. The first call
    /// replaces the implicit "all operations" set.
    ///
    /// ## Errors
    /// Returns `DuplicateMethod` if the operation is already listed.
    pub fn restrict_method(&mut self, operation: Operation) -> Result<(), AclError> {
        let methods = self.methods.get_or_insert_with(BTreeSet::new);
        if !methods.insert(operation) {
            return Err(AclError::DuplicateMethod {
                right: self.right.name().to_string(),
                method: operation,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn evaluate(&self, identity: &str, address: IpAddr, operation: Operation) -> Decision {
        if !self.permits(operation) {
            return Decision::Undecided;
        }
        if self.right.allowed(identity, address) {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }
}

impl std::fmt::Display for PathRight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.right.fmt(f)
    }
}
