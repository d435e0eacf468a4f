//! The registry of named and path-scoped rights.

use std::collections::HashMap;
use std::net::IpAddr;

use marionette_core::types::Operation;

use super::right::{Decision, PathRight, Right, RightKind};
use crate::error::AclError;

/// A borrowed view over either kind of right.
#[derive(Debug, Clone, Copy)]
pub enum RightRef<'a> {
    Name(&'a Right),
    Path(&'a PathRight),
}

impl RightRef<'_> {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Name(right) => right.name(),
            Self::Path(right) => right.path(),
        }
    }
}

impl std::fmt::Display for RightRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name(right) => right.fmt(f),
            Self::Path(right) => right.fmt(f),
        }
    }
}

/// Name-rights are looked up exactly; path-rights are kept in descending
/// path length so the longest matching prefix is consulted first.
#[derive(Debug, Clone, Default)]
pub struct Rights {
    name_rights: HashMap<String, Right>,
    /// Names in declaration order, for stable iteration.
    name_order: Vec<String>,
    path_rights: Vec<PathRight>,
}

impl Rights {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// ## Summary
    /// Declares a right with its derived shortname.
    ///
    /// ## Errors
    /// Returns `DuplicateRight` if the name is already declared in its
    /// namespace, or `InvalidPath` for a path-right not starting with `/`.
    pub fn new_right(&mut self, name: &str, kind: RightKind) -> Result<(), AclError> {
        match kind {
            RightKind::Name => self.insert_name_right(Right::new(name)),
            RightKind::Path => self.insert_path_right(PathRight::new(name)?),
        }
    }

    /// ## Summary
    /// Declares a name-right with an explicit shortname.
    ///
    /// ## Errors
    /// Returns `DuplicateShortname` if another name-right already carries the
    /// shortname, or `DuplicateRight` if the name is taken.
    pub fn new_right_with_shortname(&mut self, name: &str, shortname: char) -> Result<(), AclError> {
        if self
            .name_rights
            .values()
            .any(|right| right.shortname() == shortname)
        {
            return Err(AclError::DuplicateShortname {
                name: name.to_string(),
                shortname,
            });
        }
        self.insert_name_right(Right::with_shortname(name, shortname))
    }

    fn insert_name_right(&mut self, right: Right) -> Result<(), AclError> {
        if self.name_rights.contains_key(right.name()) {
            return Err(AclError::DuplicateRight(right.name().to_string()));
        }
        self.name_order.push(right.name().to_string());
        self.name_rights.insert(right.name().to_string(), right);
        Ok(())
    }

    fn insert_path_right(&mut self, right: PathRight) -> Result<(), AclError> {
        if self.path_rights.iter().any(|r| r.path() == right.path()) {
            return Err(AclError::DuplicateRight(right.path().to_string()));
        }
        self.path_rights.push(right);
        // Stable: equal lengths keep declaration order.
        self.path_rights
            .sort_by(|a, b| b.length().cmp(&a.length()));
        Ok(())
    }

    /// ## Errors
    /// Returns `UnknownRight` if nothing is declared under `name`, or
    /// `InvalidPattern` for a malformed pattern.
    pub fn allow(&mut self, name: &str, pattern: &str) -> Result<(), AclError> {
        self.declared_right_mut(name)?.access_mut().allow(pattern)
    }

    /// ## Errors
    /// Returns `UnknownRight` if nothing is declared under `name`, or
    /// `InvalidPattern` for a malformed pattern.
    pub fn deny(&mut self, name: &str, pattern: &str) -> Result<(), AclError> {
        self.declared_right_mut(name)?.access_mut().deny(pattern)
    }

    /// ## Errors
    /// Returns `NotAPathRight` when `name` is a name-right, `UnknownRight`
    /// when it is not declared at all, or `DuplicateMethod`.
    pub fn restrict_method(&mut self, name: &str, operation: Operation) -> Result<(), AclError> {
        if let Some(right) = self.path_rights.iter_mut().find(|r| r.path() == name) {
            return right.restrict_method(operation);
        }
        if self.name_rights.contains_key(name) {
            return Err(AclError::NotAPathRight(name.to_string()));
        }
        Err(AclError::UnknownRight(name.to_string()))
    }

    fn declared_right_mut(&mut self, name: &str) -> Result<&mut Right, AclError> {
        if let Some(right) = self.name_rights.get_mut(name) {
            return Ok(right);
        }
        self.path_rights
            .iter_mut()
            .find(|r| r.path() == name)
            .map(PathRight::right_mut)
            .ok_or_else(|| AclError::UnknownRight(name.to_string()))
    }

    /// ## Summary
    /// Decides whether the requester may perform `operation` on `resource_path`.
    ///
    /// An exact name-right decides outright. Otherwise path-rights are scanned
    /// longest first; a right not covering the operation passes the decision
    /// on to the next one. Nothing applicable means deny.
    #[must_use]
    pub fn is_allowed(
        &self,
        resource_path: &str,
        identity: &str,
        address: IpAddr,
        operation: Operation,
    ) -> bool {
        if let Some(right) = self.name_rights.get(resource_path) {
            return right.allowed(identity, address);
        }

        for right in self.path_rights.iter().filter(|r| r.matches(resource_path)) {
            match right.evaluate(identity, address, operation) {
                Decision::Allow => return true,
                Decision::Deny => return false,
                Decision::Undecided => {
                    tracing::trace!(
                        right = right.path(),
                        %operation,
                        "Right does not cover operation, trying next"
                    );
                }
            }
        }

        false
    }

    /// ## Summary
    /// The right that would govern `name`: the exact name-right, else the
    /// first path-right whose path prefixes `name`.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<RightRef<'_>> {
        if let Some(right) = self.name_rights.get(name) {
            return Some(RightRef::Name(right));
        }
        self.path_rights
            .iter()
            .find(|r| r.matches(name))
            .map(RightRef::Path)
    }

    /// Exact declaration in either namespace.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.name_rights.contains_key(name) || self.path_rights.iter().any(|r| r.path() == name)
    }

    /// Name-rights in declaration order, then path-rights in evaluation order.
    pub fn entries(&self) -> impl Iterator<Item = RightRef<'_>> {
        self.name_order
            .iter()
            .filter_map(|name| self.name_rights.get(name))
            .map(RightRef::Name)
            .chain(self.path_rights.iter().map(RightRef::Path))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.name_rights.len() + self.path_rights.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
