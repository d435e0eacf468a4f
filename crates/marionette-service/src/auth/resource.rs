//! A request against a REST resource, as seen by authorization.

use std::net::IpAddr;

use marionette_core::types::Operation;

/// Who wants to do what to which resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    /// Resource kind, e.g. `catalog` or `file_content`.
    pub kind: String,
    /// Key inside the kind; empty for searches.
    pub key: String,
    /// Authenticated or resolved node name of the requester.
    pub node: String,
    pub address: IpAddr,
    pub operation: Operation,
}

impl ResourceRequest {
    #[must_use]
    pub fn new(kind: &str, key: &str, node: &str, address: IpAddr, operation: Operation) -> Self {
        Self {
            kind: kind.to_string(),
            key: key.to_string(),
            node: node.to_string(),
            address,
            operation,
        }
    }

    /// ## Summary
    /// The path rights are matched against: `/<kind>/<key>`.
    #[must_use]
    pub fn canonical_path(&self) -> String {
        format!("/{}/{}", self.kind, self.key)
    }
}

impl std::fmt::Display for ResourceRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}({}) access to {} [{}]",
            self.node,
            self.address,
            self.canonical_path(),
            self.operation
        )
    }
}
