//! Page store module
//!
//! Persists wiki pages as individual files: a page titled `T` lives at
//! `<data_dir>/T.txt`, raw bytes, no metadata. Titles are validated
//! against an allow-list before any filesystem access.

use std::path::PathBuf;

use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Longest accepted title. Keeps filenames well under any filesystem limit.
pub const MAX_TITLE_LEN: usize = 128;

const PAGE_EXTENSION: &str = "txt";

/// Errors that can occur while loading or saving pages
#[derive(Debug, Error)]
pub enum StoreError {
    /// Title failed allow-list validation
    #[error("invalid title '{title}': {reason}")]
    InvalidTitle { title: String, reason: &'static str },

    /// No file exists for this title
    #[error("no page titled '{0}'")]
    NotFound(String),

    /// Underlying filesystem failure (permissions, disk full, ...)
    #[error("page storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single wiki page
///
/// The body is kept as raw bytes; it is decoded only at render time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub title: String,
    pub body: Vec<u8>,
}

impl Page {
    pub fn new(title: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    /// Empty page used to seed the edit form for a not-yet-created title
    pub fn empty(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: Vec::new(),
        }
    }

    /// Page body as text for template rendering (lossy for non-UTF-8 files)
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Filesystem-backed page store
///
/// No caching and no locking: every load re-reads the file, and two
/// concurrent saves of the same title may interleave (last writer wins).
#[derive(Debug, Clone)]
pub struct PageStore {
    data_dir: PathBuf,
}

impl PageStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Write the page body to `<data_dir>/<title>.txt`
    ///
    /// The file is created with owner-only read/write permission. A crash
    /// mid-write can leave a truncated file; there is no atomicity
    /// guarantee.
    pub async fn save(&self, page: &Page) -> Result<(), StoreError> {
        validate_title(&page.title)?;
        let path = self.page_path(&page.title);

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&path).await?;
        file.write_all(&page.body).await?;
        file.flush().await?;
        Ok(())
    }

    /// Read `<data_dir>/<title>.txt` back into a page
    pub async fn load(&self, title: &str) -> Result<Page, StoreError> {
        validate_title(title)?;
        let path = self.page_path(title);

        match fs::read(&path).await {
            Ok(body) => Ok(Page::new(title, body)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(title.to_string()))
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn page_path(&self, title: &str) -> PathBuf {
        self.data_dir.join(format!("{title}.{PAGE_EXTENSION}"))
    }
}

/// Check a path-derived title against the allow-list
///
/// Accepted: 1 to `MAX_TITLE_LEN` characters from `[A-Za-z0-9_-]`. This
/// keeps `.`, `/` and `\` out of filenames, so traversal sequences such as
/// `..` are unrepresentable.
pub fn validate_title(title: &str) -> Result<(), StoreError> {
    let invalid = |reason| StoreError::InvalidTitle {
        title: title.to_string(),
        reason,
    };

    if title.is_empty() {
        return Err(invalid("title is empty"));
    }
    if title.len() > MAX_TITLE_LEN {
        return Err(invalid("title is too long"));
    }
    if !title
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
    {
        return Err(invalid(
            "only ASCII letters, digits, '_' and '-' are allowed",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let dir = tempdir().unwrap();
        let store = PageStore::new(dir.path());

        let page = Page::new("TestPage", b"hello wiki".to_vec());
        store.save(&page).await.unwrap();

        let loaded = store.load("TestPage").await.unwrap();
        assert_eq!(loaded, page);
    }

    #[tokio::test]
    async fn test_round_trip_empty_body() {
        let dir = tempdir().unwrap();
        let store = PageStore::new(dir.path());

        store.save(&Page::new("Empty", Vec::new())).await.unwrap();
        let loaded = store.load("Empty").await.unwrap();
        assert!(loaded.body.is_empty());
    }

    #[tokio::test]
    async fn test_load_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let store = PageStore::new(dir.path());

        match store.load("NoSuchPage").await {
            Err(StoreError::NotFound(title)) => assert_eq!(title, "NoSuchPage"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_save_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = PageStore::new(dir.path());

        let page = Page::new("Twice", b"same content".to_vec());
        store.save(&page).await.unwrap();
        store.save(&page).await.unwrap();

        let on_disk = std::fs::read(dir.path().join("Twice.txt")).unwrap();
        assert_eq!(on_disk, b"same content");
    }

    #[tokio::test]
    async fn test_save_overwrites_previous_body() {
        let dir = tempdir().unwrap();
        let store = PageStore::new(dir.path());

        store
            .save(&Page::new("P", b"first version, quite long".to_vec()))
            .await
            .unwrap();
        store.save(&Page::new("P", b"second".to_vec())).await.unwrap();

        assert_eq!(store.load("P").await.unwrap().body, b"second");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_save_sets_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let store = PageStore::new(dir.path());
        store.save(&Page::new("Secret", b"x".to_vec())).await.unwrap();

        let meta = std::fs::metadata(dir.path().join("Secret.txt")).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_traversal_title_rejected_before_fs() {
        let store = PageStore::new("/definitely/does/not/exist");

        // InvalidTitle, not an I/O error: the store never touched the path
        match store.load("../../etc/passwd").await {
            Err(StoreError::InvalidTitle { .. }) => {}
            other => panic!("expected InvalidTitle, got {other:?}"),
        }
        match store.save(&Page::new("../x", b"".to_vec())).await {
            Err(StoreError::InvalidTitle { .. }) => {}
            other => panic!("expected InvalidTitle, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_title() {
        assert!(validate_title("FrontPage").is_ok());
        assert!(validate_title("page-2_draft").is_ok());
        assert!(validate_title("x").is_ok());

        assert!(validate_title("").is_err());
        assert!(validate_title("..").is_err());
        assert!(validate_title("a/b").is_err());
        assert!(validate_title("a\\b").is_err());
        assert!(validate_title("with space").is_err());
        assert!(validate_title("dotted.name").is_err());
        assert!(validate_title(&"a".repeat(MAX_TITLE_LEN + 1)).is_err());
    }

    #[test]
    fn test_body_text_lossy() {
        let page = Page::new("Bin", vec![0x68, 0x69, 0xFF]);
        assert_eq!(page.body_text(), "hi\u{FFFD}");
    }
}
