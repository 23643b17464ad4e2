//! Scratch document roots for the server tests.

use tempfile::TempDir;

use crate::server::config::RootDir;

/// Create a temporary root holding `files`, given as `(relative path, contents)`.
///
/// The directory is removed when the returned [`TempDir`] is dropped, so keep
/// it alive for as long as the root is served.
pub(crate) fn scratch_root(files: &[(&str, &str)]) -> (TempDir, RootDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    for (file, contents) in files {
        let path = dir.path().join(file);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create fixture directory");
        }
        std::fs::write(path, contents).expect("write fixture file");
    }
    let root = RootDir::new(dir.path().to_string_lossy());
    (dir, root)
}
