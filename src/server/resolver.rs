//! Maps resource paths onto files under the root directory.

use log::{debug, warn};

use crate::parser::ResourcePath;
use crate::server::config::RootDir;

/// Outcome of looking a resource up on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The file's full contents.
    Found(Vec<u8>),
    /// Missing, unreadable, a directory, or outside the root.
    NotFound,
}

/// Read the file a resource path names under `root`.
///
/// All open and read failures collapse into [`Resolution::NotFound`]. Paths
/// with a `..` segment are refused without touching the filesystem.
pub async fn resolve(root: &RootDir, path: &ResourcePath) -> Resolution {
    if path.has_parent_segment() {
        warn!("Refusing path outside root: {path}");
        return Resolution::NotFound;
    }

    let full_path = root.join(path.as_str());
    match tokio::fs::read(&full_path).await {
        Ok(contents) => {
            debug!("Read {len} bytes from {full_path}", len = contents.len());
            Resolution::Found(contents)
        }
        Err(e) => {
            debug!("Cannot read {full_path}: {e}");
            Resolution::NotFound
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_request;
    use crate::server::fixtures::scratch_root;

    fn path_of(request: &str) -> ResourcePath {
        parse_request(request.as_bytes()).unwrap()
    }

    #[test]
    fn test_join_inserts_single_separator() {
        assert_eq!(RootDir::new("/srv/www").join("index.html"), "/srv/www/index.html");
        assert_eq!(RootDir::new("/srv/www/").join("index.html"), "/srv/www/index.html");
        assert_eq!(RootDir::new("").join("index.html"), "index.html");
    }

    #[tokio::test]
    async fn test_resolve_existing_file() {
        let (_dir, root) = scratch_root(&[("index.html", "hi")]);

        let resolution = resolve(&root, &path_of("GET / HTTP/1.0\r\n\r\n")).await;
        assert_eq!(resolution, Resolution::Found(b"hi".to_vec()));
    }

    #[tokio::test]
    async fn test_resolve_nested_file_with_trailing_slash_root() {
        let (_dir, root) = scratch_root(&[("css/site.css", "body{}")]);
        let root = RootDir::new(format!("{root}/"));

        let resolution = resolve(&root, &path_of("GET /css/site.css HTTP/1.0\r\n\r\n")).await;
        assert_eq!(resolution, Resolution::Found(b"body{}".to_vec()));
    }

    #[tokio::test]
    async fn test_resolve_missing_file() {
        let (_dir, root) = scratch_root(&[]);

        let resolution = resolve(&root, &path_of("GET /missing.html HTTP/1.0\r\n\r\n")).await;
        assert_eq!(resolution, Resolution::NotFound);
    }

    #[tokio::test]
    async fn test_resolve_directory_is_not_found() {
        let (_dir, root) = scratch_root(&[("sub/inner.html", "inner")]);

        let resolution = resolve(&root, &path_of("GET /sub HTTP/1.0\r\n\r\n")).await;
        assert_eq!(resolution, Resolution::NotFound);
    }

    #[tokio::test]
    async fn test_resolve_refuses_parent_segments() {
        let (_dir, root) = scratch_root(&[("public/index.html", "hi"), ("secret.txt", "nope")]);
        let public = RootDir::new(format!("{root}/public"));

        let resolution = resolve(&public, &path_of("GET /../secret.txt HTTP/1.0\r\n\r\n")).await;
        assert_eq!(resolution, Resolution::NotFound);
    }
}
