//! Authorization of REST requests.
//!
//! ## Module Organization
//!
//! - `authconfig`: rule file parsing, default rules and lazy reloading
//! - `depot`: peer and authorization context in the Salvo depot
//! - `pattern`: allow/deny patterns and ordered access lists
//! - `resource`: the request being authorized and its canonical path
//! - `right`: name and path rights
//! - `rights`: the registry evaluating rights longest prefix first

pub mod authconfig;
pub mod depot;
pub mod pattern;
pub mod resource;
pub mod right;
pub mod rights;

pub use authconfig::{AuthorizationConfig, bootstrap_defaults, insert_missing_defaults, parse_rights};
pub use depot::{AuthorizationHandler, Peer, get_authorization_from_depot, get_peer_from_depot};
pub use pattern::{Access, AccessList, Pattern};
pub use resource::ResourceRequest;
pub use right::{Decision, PathRight, Right, RightKind};
pub use rights::{RightRef, Rights};
