// This is free and unencumbered software released into the public domain.

use std::{
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

/// Ordered list of directories that receive captured photos. Only the first
/// entry is ever written to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MediaDirs(Vec<PathBuf>);

impl MediaDirs {
    pub fn new(dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        Self(dirs.into_iter().collect())
    }

    /// `$VIEWFINDER_MEDIA_DIR`, then `$HOME/Pictures/viewfinder`.
    pub fn from_env() -> Self {
        let mut dirs = Vec::new();
        if let Some(dir) = std::env::var_os("VIEWFINDER_MEDIA_DIR").filter(|d| !d.is_empty()) {
            dirs.push(PathBuf::from(dir));
        }
        if let Some(home) = std::env::var_os("HOME").filter(|d| !d.is_empty()) {
            dirs.push(Path::new(&home).join("Pictures").join("viewfinder"));
        }
        Self(dirs)
    }

    pub fn first(&self) -> Option<&Path> {
        self.0.first().map(PathBuf::as_path)
    }

    pub fn as_slice(&self) -> &[PathBuf] {
        &self.0
    }
}

pub fn photo_file_name(epoch_millis: u128) -> String {
    format!("{epoch_millis}.jpg")
}

pub fn photo_file(dir: &Path, epoch_millis: u128) -> PathBuf {
    dir.join(photo_file_name(epoch_millis))
}

pub fn epoch_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn photos_are_named_by_epoch_millis() {
        let file = photo_file(Path::new("/ext/media"), 1_234_567_890_123);
        assert_eq!(file, PathBuf::from("/ext/media/1234567890123.jpg"));
    }

    #[test]
    fn only_the_first_dir_is_used() {
        let dirs = MediaDirs::new([PathBuf::from("/a"), PathBuf::from("/b")]);
        assert_eq!(dirs.first(), Some(Path::new("/a")));
        assert_eq!(MediaDirs::default().first(), None);
    }
}
