//! The REST authorization rule file and its lazily reloaded rule set.
//!
//! ```text
//! # comment
//! path /catalog
//! method find
//! allow *.example.com, 10.0.0.0/8
//! deny evil.example.com
//!
//! [fileserver]
//! allow *
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::{Mutex, RwLock};

use marionette_core::types::Operation;

use super::resource::ResourceRequest;
use super::right::RightKind;
use super::rights::Rights;
use crate::error::{AclError, ServiceError, ServiceResult};

/// Baseline rules guaranteed to exist after every load.
/// An empty method list covers every operation.
const DEFAULT_ACLS: [(&str, &[Operation]); 5] = [
    ("/facts", &[Operation::Save]),
    ("/catalog", &[Operation::Find]),
    ("/file", &[]),
    ("/certificate", &[Operation::Find]),
    ("/report", &[Operation::Save]),
];

/// ## Summary
/// Parses rule file contents into a fresh registry. Defaults are not added.
///
/// ## Errors
/// Returns `AuthConfigParse` naming `source` and the offending line.
pub fn parse_rights(contents: &str, source: &str) -> ServiceResult<Rights> {
    let mut rights = Rights::new();
    let mut current: Option<(RightKind, String)> = None;

    for (index, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        parse_line(&mut rights, &mut current, line).map_err(|source_err| {
            ServiceError::AuthConfigParse {
                path: source.to_string(),
                line: index + 1,
                source: source_err,
            }
        })?;
    }

    Ok(rights)
}

fn parse_line(
    rights: &mut Rights,
    current: &mut Option<(RightKind, String)>,
    line: &str,
) -> Result<(), AclError> {
    if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
        let name = name.trim();
        if name.is_empty() {
            return Err(AclError::InvalidLine(line.to_string()));
        }
        rights.new_right(name, RightKind::Name)?;
        *current = Some((RightKind::Name, name.to_string()));
        return Ok(());
    }

    let Some((directive, value)) = line.split_once(char::is_whitespace) else {
        return Err(AclError::InvalidLine(line.to_string()));
    };
    let value = value.trim();

    match directive {
        "path" => {
            rights.new_right(value, RightKind::Path)?;
            *current = Some((RightKind::Path, value.to_string()));
        }
        "allow" | "deny" => {
            let (_, name) = current
                .as_ref()
                .ok_or_else(|| AclError::NoOpenRight(directive.to_string()))?;
            if directive == "allow" {
                rights.allow(name, value)?;
            } else {
                rights.deny(name, value)?;
            }
        }
        "method" => {
            let (kind, name) = current
                .as_ref()
                .ok_or_else(|| AclError::NoOpenRight(directive.to_string()))?;
            if *kind == RightKind::Name {
                return Err(AclError::MethodOnNameRight(name.clone()));
            }
            for method in value.split(',').map(str::trim) {
                let operation = method
                    .parse::<Operation>()
                    .map_err(|_err| AclError::InvalidMethod(method.to_string()))?;
                rights.restrict_method(name, operation)?;
            }
        }
        _ => return Err(AclError::InvalidLine(line.to_string())),
    }

    Ok(())
}

fn install_default(rights: &mut Rights, path: &str, methods: &[Operation]) -> Result<(), AclError> {
    rights.new_right(path, RightKind::Path)?;
    for operation in methods {
        rights.restrict_method(path, *operation)?;
    }
    rights.allow(path, "*")
}

/// ## Summary
/// Adds an "allow everyone" right for each baseline path no existing rule
/// governs, and returns the paths that were added.
///
/// ## Errors
/// Returns an error only if the registry rejects a default right.
pub fn insert_missing_defaults(rights: &mut Rights) -> Result<Vec<&'static str>, AclError> {
    let mut inserted = Vec::new();
    for (path, methods) in DEFAULT_ACLS {
        if rights.lookup(path).is_some() {
            continue;
        }
        tracing::warn!(path, methods = ?methods, "Inserting default ACL");
        install_default(rights, path, methods)?;
        inserted.push(path);
    }
    Ok(inserted)
}

/// ## Summary
/// The rule set used when no rule file exists: the baseline rights plus a
/// catch-all `/` that allows nobody.
///
/// ## Errors
/// Returns an error only if the registry rejects a default right.
pub fn bootstrap_defaults() -> Result<Rights, AclError> {
    let mut rights = Rights::new();
    insert_missing_defaults(&mut rights)?;
    rights.new_right("/", RightKind::Path)?;
    Ok(rights)
}

fn modified_time(path: &Path) -> ServiceResult<Option<SystemTime>> {
    match std::fs::metadata(path) {
        Ok(metadata) => Ok(Some(metadata.modified()?)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn read_rights(path: &Path) -> ServiceResult<Rights> {
    let contents = std::fs::read_to_string(path)?;
    let mut rights = parse_rights(&contents, &path.display().to_string())?;
    insert_missing_defaults(&mut rights)?;
    Ok(rights)
}

struct Snapshot {
    rights: Arc<Rights>,
    /// Modification time of the last parse attempt, successful or not.
    seen_mtime: Option<SystemTime>,
}

/// The active rule set, re-read whenever the rule file's modification time
/// changes.
///
/// Readers always see a complete registry: a reload builds a new one and
/// swaps it in, and a failed reload keeps the previous one.
pub struct AuthorizationConfig {
    path: PathBuf,
    snapshot: RwLock<Snapshot>,
    reload: Mutex<()>,
}

impl AuthorizationConfig {
    /// ## Summary
    /// Loads the rule file at `path`, or the bootstrap defaults if it does not
    /// exist.
    ///
    /// ## Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> ServiceResult<Self> {
        let path = path.as_ref().to_path_buf();

        let (rights, seen_mtime) = match modified_time(&path)? {
            Some(mtime) => {
                let rights = read_rights(&path)?;
                tracing::info!(rights = rights.len(), "Loaded authorization config");
                (rights, Some(mtime))
            }
            None => {
                tracing::warn!("No authorization config found, using default ACLs");
                (bootstrap_defaults()?, None)
            }
        };

        Ok(Self::with_snapshot(path, rights, seen_mtime))
    }

    /// ## Summary
    /// Wraps an already built registry. The file at `path` is only consulted
    /// once it exists.
    #[must_use]
    pub fn from_rights(path: impl AsRef<Path>, rights: Rights) -> Self {
        Self::with_snapshot(path.as_ref().to_path_buf(), rights, None)
    }

    fn with_snapshot(path: PathBuf, rights: Rights, seen_mtime: Option<SystemTime>) -> Self {
        Self {
            path,
            snapshot: RwLock::new(Snapshot {
                rights: Arc::new(rights),
                seen_mtime,
            }),
            reload: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The registry currently in force.
    #[must_use]
    pub fn rights(&self) -> Arc<Rights> {
        Arc::clone(&self.snapshot.read().rights)
    }

    /// ## Summary
    /// Re-parses the rule file if its modification time differs from the last
    /// attempt. Returns whether a new registry was installed.
    ///
    /// A missing file keeps the current registry. A broken file is not retried
    /// until it changes again.
    ///
    /// ## Errors
    /// Returns the read or parse error; the previous registry stays active.
    pub fn reload_if_stale(&self) -> ServiceResult<bool> {
        let Some(mtime) = modified_time(&self.path)? else {
            return Ok(false);
        };
        if self.snapshot.read().seen_mtime == Some(mtime) {
            return Ok(false);
        }

        let _reloading = self.reload.lock();
        if self.snapshot.read().seen_mtime == Some(mtime) {
            return Ok(false);
        }

        let result = read_rights(&self.path);
        let mut snapshot = self.snapshot.write();
        snapshot.seen_mtime = Some(mtime);
        let rights = result?;
        tracing::info!(
            path = %self.path.display(),
            rights = rights.len(),
            "Reloaded authorization config"
        );
        snapshot.rights = Arc::new(rights);
        Ok(true)
    }

    /// ## Summary
    /// Decides a request against the current rules, reloading them first if
    /// the file changed.
    #[tracing::instrument(skip(self), fields(path = %request.canonical_path()))]
    pub fn authorize(&self, request: &ResourceRequest) -> bool {
        self.report_reload(self.reload_if_stale());
        self.decide(request)
    }

    /// ## Summary
    /// Same as [`Self::authorize`], with the stat and re-parse of the rule
    /// file run on the blocking pool.
    #[tracing::instrument(skip(self), fields(path = %request.canonical_path()))]
    pub async fn authorize_async(self: &Arc<Self>, request: &ResourceRequest) -> bool {
        let config = Arc::clone(self);
        match tokio::task::spawn_blocking(move || config.reload_if_stale()).await {
            Ok(result) => self.report_reload(result),
            Err(err) => tracing::error!(error = %err, "Authorization config reload task failed"),
        }
        self.decide(request)
    }

    fn report_reload(&self, result: ServiceResult<bool>) {
        if let Err(err) = result {
            tracing::error!(
                error = %err,
                path = %self.path.display(),
                "Rejected authorization config reload, keeping previous rules"
            );
        }
    }

    fn decide(&self, request: &ResourceRequest) -> bool {
        let rights = self.rights();
        let allowed = rights.is_allowed(
            &request.canonical_path(),
            &request.node,
            request.address,
            request.operation,
        );

        if allowed {
            tracing::debug!(decision = "allow", "Authorized {request}");
        } else {
            tracing::info!(decision = "deny", kind = "policy", "Forbidden {request}");
        }
        allowed
    }
}
