use crate::error::Result;
use std::path::{Path, PathBuf};

const INDEX_FILE_SUFFIX: &str = ".index.md";

/// On-disk store for area index documents, one `<area>.index.md` per area
/// under the index root. The content is an opaque blob; matching never
/// interprets it.
pub struct IndexStore {
    index_root: PathBuf,
}

impl IndexStore {
    pub fn new(index_root: impl AsRef<Path>) -> Self {
        Self {
            index_root: index_root.as_ref().to_path_buf(),
        }
    }

    pub fn index_root(&self) -> &Path {
        &self.index_root
    }

    pub fn index_path(&self, area: &str) -> PathBuf {
        let file_name = format!("{}{INDEX_FILE_SUFFIX}", area.replace('/', "-"));
        self.index_root.join(file_name)
    }

    pub async fn save(&self, area: &str, content: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.index_root).await?;
        let path = self.index_path(area);
        let tmp = path.with_extension("md.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(path)
    }

    pub async fn load(&self, area: &str) -> Result<Option<String>> {
        let path = self.index_path(area);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Load every built index, sorted by area name.
    pub async fn load_all(&self) -> Result<Vec<(String, String)>> {
        let mut indexes = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.index_root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(indexes),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            let Some(area) = name.strip_suffix(INDEX_FILE_SUFFIX) else {
                continue;
            };
            let content = tokio::fs::read_to_string(entry.path()).await?;
            indexes.push((area.to_string(), content));
        }

        indexes.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(indexes)
    }
}
