// This is free and unencumbered software released into the public domain.

//! Runtime permission boundary.
//!
//! Requests are fire-and-forget; the answer comes back later as a
//! [`PermissionResult`] carrying the same request code.

use std::{
    collections::BTreeSet,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

pub type RequestCode = i32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Permission {
    Camera,
}

impl Permission {
    pub const fn name(self) -> &'static str {
        match self {
            Permission::Camera => "viewfinder.permission.CAMERA",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "viewfinder.permission.CAMERA" => Some(Permission::Camera),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PermissionResult {
    pub request_code: RequestCode,
    pub permissions: Vec<Permission>,
    pub grant_results: Vec<PermissionStatus>,
}

impl PermissionResult {
    pub fn uniform(request_code: RequestCode, permissions: &[Permission], status: PermissionStatus) -> Self {
        Self {
            request_code,
            permissions: permissions.to_vec(),
            grant_results: vec![status; permissions.len()],
        }
    }

    pub fn is_granted(&self, permission: Permission) -> bool {
        self.permissions
            .iter()
            .zip(&self.grant_results)
            .any(|(p, s)| *p == permission && *s == PermissionStatus::Granted)
    }
}

/// How a desktop session answers permission requests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PermissionPolicy {
    /// Ask on the terminal.
    #[default]
    Prompt,
    Grant,
    Deny,
}

pub trait PermissionService {
    fn check_self_permission(&self, permission: Permission) -> PermissionStatus;

    /// Starts an asynchronous request. The outcome is delivered once, later,
    /// keyed by `request_code`.
    fn request_permissions(&mut self, request_code: RequestCode, permissions: &[Permission]);
}

/// Remembered grants, optionally persisted one permission name per line.
#[derive(Clone, Debug, Default)]
pub struct ConsentStore {
    path: Option<PathBuf>,
    granted: BTreeSet<Permission>,
}

impl ConsentStore {
    pub const FILE_NAME: &'static str = "permissions";

    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads grants from `<data_dir>/permissions`. A missing file means
    /// nothing has been granted yet.
    pub fn load(data_dir: impl AsRef<Path>) -> io::Result<Self> {
        let path = data_dir.as_ref().join(Self::FILE_NAME);
        let granted = match fs::read_to_string(&path) {
            Ok(text) => text.lines().filter_map(Permission::from_name).collect(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeSet::new(),
            Err(e) => return Err(e),
        };
        Ok(Self {
            path: Some(path),
            granted,
        })
    }

    pub fn status(&self, permission: Permission) -> PermissionStatus {
        if self.granted.contains(&permission) {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        }
    }

    pub fn grant(&mut self, permission: Permission) -> io::Result<()> {
        if self.granted.insert(permission) {
            self.save()?;
        }
        Ok(())
    }

    fn save(&self) -> io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(path)?;
        for permission in &self.granted {
            writeln!(file, "{}", permission.name())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_reports_per_permission_grants() {
        let granted = PermissionResult::uniform(10, &[Permission::Camera], PermissionStatus::Granted);
        assert!(granted.is_granted(Permission::Camera));
        let denied = PermissionResult::uniform(10, &[Permission::Camera], PermissionStatus::Denied);
        assert!(!denied.is_granted(Permission::Camera));
        let empty = PermissionResult::uniform(10, &[], PermissionStatus::Granted);
        assert!(!empty.is_granted(Permission::Camera));
    }

    #[test]
    fn grants_survive_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ConsentStore::load(dir.path()).unwrap();
        assert_eq!(store.status(Permission::Camera), PermissionStatus::Denied);
        store.grant(Permission::Camera).unwrap();

        let reloaded = ConsentStore::load(dir.path()).unwrap();
        assert_eq!(reloaded.status(Permission::Camera), PermissionStatus::Granted);
    }

    #[test]
    fn in_memory_store_never_touches_disk() {
        let mut store = ConsentStore::in_memory();
        store.grant(Permission::Camera).unwrap();
        assert_eq!(store.status(Permission::Camera), PermissionStatus::Granted);
    }
}
