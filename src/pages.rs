//! Page files: `PageView` JSON documents under a root directory.

use crate::error::AppError;
use crate::generator::PageView;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// File name the page listing looks for.
pub const PAGE_FILE: &str = "page.json";

#[derive(Clone, Debug)]
pub struct PageStore {
    root: PathBuf,
}

fn skipped_dir(name: &str) -> bool {
    name == "api" || name.starts_with('_') || name.starts_with('.')
}

impl PageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        PageStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path for a caller-supplied relative path. Rejects absolute paths and `..`.
    fn resolve(&self, rel: &str) -> Result<PathBuf, AppError> {
        let p = Path::new(rel);
        let safe = !rel.trim().is_empty() && p.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !safe {
            return Err(AppError::BadRequest(format!("Invalid page path: {}", rel)));
        }
        Ok(self.root.join(p))
    }

    fn encode(content: &serde_json::Value) -> Result<String, AppError> {
        let view: PageView = serde_json::from_value(content.clone())
            .map_err(|e| AppError::BadRequest(format!("Invalid page content: {}", e)))?;
        view.check()?;
        Ok(serde_json::to_string_pretty(&view)?)
    }

    pub async fn create(&self, rel: &str, content: &serde_json::Value, overwrite: bool) -> Result<(), AppError> {
        let path = self.resolve(rel)?;
        let body = Self::encode(content)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await?;
        }
        if !overwrite && fs::try_exists(&path).await? {
            return Err(AppError::Conflict("File already exists".into()));
        }
        fs::write(&path, body).await?;
        tracing::info!(path = %rel, "page written");
        Ok(())
    }

    pub async fn update(&self, rel: &str, content: &serde_json::Value) -> Result<(), AppError> {
        let path = self.resolve(rel)?;
        let body = Self::encode(content)?;
        if !fs::try_exists(&path).await? {
            return Err(AppError::NotFound("File not found".into()));
        }
        fs::write(&path, body).await?;
        Ok(())
    }

    /// Remove a page and its directory when that leaves it empty.
    pub async fn delete(&self, rel: &str) -> Result<(), AppError> {
        let path = self.resolve(rel)?;
        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::NotFound("File not found".into()));
            }
            Err(e) => return Err(e.into()),
        }
        if let Some(dir) = path.parent().filter(|d| *d != self.root.as_path()) {
            let mut entries = fs::read_dir(dir).await?;
            if entries.next_entry().await?.is_none() {
                fs::remove_dir(dir).await?;
            }
        }
        Ok(())
    }

    pub async fn read(&self, rel: &str) -> Result<Option<PageView>, AppError> {
        let path = self.resolve(rel)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Relative paths of every page file, sorted. A missing root lists nothing.
    pub async fn list(&self) -> Result<Vec<String>, AppError> {
        let mut pages = Vec::new();
        if !fs::try_exists(&self.root).await? {
            return Ok(pages);
        }
        let mut pending = vec![self.root.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().into_owned();
                let ty = entry.file_type().await?;
                if ty.is_dir() {
                    if !skipped_dir(&name) {
                        pending.push(entry.path());
                    }
                } else if name == PAGE_FILE {
                    if let Ok(rel) = entry.path().strip_prefix(&self.root) {
                        let parts: Vec<String> = rel.components().map(|c| c.as_os_str().to_string_lossy().into_owned()).collect();
                        pages.push(parts.join("/"));
                    }
                }
            }
        }
        pages.sort();
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn view() -> serde_json::Value {
        json!({"title": "Suppliers", "template": "crud", "dataSource": "suppliers"})
    }

    #[tokio::test]
    async fn create_list_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = PageStore::new(dir.path());
        store.create("suppliers/page.json", &view(), false).await.unwrap();
        store.create("reports/daily/page.json", &view(), false).await.unwrap();
        store.create("_drafts/page.json", &view(), false).await.unwrap();
        store.create("api/page.json", &view(), false).await.unwrap();

        assert_eq!(store.list().await.unwrap(), ["reports/daily/page.json", "suppliers/page.json"]);

        store.delete("suppliers/page.json").await.unwrap();
        assert!(!dir.path().join("suppliers").exists());
        assert!(matches!(store.delete("suppliers/page.json").await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn create_refuses_existing_file_without_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = PageStore::new(dir.path());
        store.create("a/page.json", &view(), false).await.unwrap();
        let err = store.create("a/page.json", &view(), false).await.unwrap_err();
        assert_eq!(err.to_string(), "File already exists");
        store.create("a/page.json", &view(), true).await.unwrap();
        let page = store.read("a/page.json").await.unwrap().unwrap();
        assert_eq!(page.title, "Suppliers");
    }

    #[tokio::test]
    async fn update_missing_page_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = PageStore::new(dir.path());
        assert!(matches!(store.update("x/page.json", &view()).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn traversal_and_bad_content_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = PageStore::new(dir.path());
        assert!(matches!(store.create("../x/page.json", &view(), false).await, Err(AppError::BadRequest(_))));
        assert!(matches!(store.create("/etc/page.json", &view(), false).await, Err(AppError::BadRequest(_))));
        let bad = json!({"title": 5});
        assert!(matches!(store.create("b/page.json", &bad, false).await, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn missing_root_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = PageStore::new(dir.path().join("none"));
        assert!(store.list().await.unwrap().is_empty());
    }
}
