use ignore::WalkBuilder;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File extensions treated as documentation.
pub const DOC_EXTENSIONS: &[&str] = &["md", "rst", "adoc"];

/// A named documentation area: one top-level folder under the docs root.
///
/// Rediscovered by scanning on every run; only its derived index is
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocArea {
    pub name: String,
    /// Relative paths of the area's doc files, sorted and deduplicated.
    pub files: Vec<PathBuf>,
}

/// Scanner that discovers documentation areas under a docs root.
pub struct AreaScanner {
    docs_root: PathBuf,
    index_dir_name: String,
}

impl AreaScanner {
    pub fn new(docs_root: impl AsRef<Path>, index_dir_name: impl Into<String>) -> Self {
        Self {
            docs_root: docs_root.as_ref().to_path_buf(),
            index_dir_name: index_dir_name.into(),
        }
    }

    pub fn docs_root(&self) -> &Path {
        &self.docs_root
    }

    /// Discover all documentation areas, sorted by name.
    pub fn scan(&self) -> Vec<DocArea> {
        let mut areas: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();

        for rel in self.walk_doc_files() {
            let mut components = rel.components();
            let Some(std::path::Component::Normal(top)) = components.next() else {
                continue;
            };
            // Root-level files belong to no area.
            if components.next().is_none() {
                continue;
            }
            let top = top.to_string_lossy().to_string();
            areas.entry(top).or_default().push(rel);
        }

        areas
            .into_iter()
            .map(|(name, mut files)| {
                files.sort();
                files.dedup();
                DocArea { name, files }
            })
            .collect()
    }

    /// Stage-2 candidate set: every doc file in the selected areas plus the
    /// root-level docs, which overview-style changes frequently affect.
    /// Derived from a single walk.
    pub fn candidate_files(&self, selected: &[String]) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = Vec::new();
        for rel in self.walk_doc_files() {
            let mut components = rel.components();
            let Some(std::path::Component::Normal(top)) = components.next() else {
                continue;
            };
            let is_root_doc = components.next().is_none();
            if is_root_doc || selected.iter().any(|name| top.to_string_lossy() == name.as_str()) {
                files.push(rel);
            }
        }
        files.sort();
        files.dedup();
        files
    }

    fn walk_doc_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();

        let mut builder = WalkBuilder::new(&self.docs_root);
        builder
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true);

        for result in builder.build() {
            match result {
                Ok(entry) => {
                    let Some(file_type) = entry.file_type() else {
                        continue;
                    };
                    if !file_type.is_file() {
                        continue;
                    }
                    if !is_doc_file(entry.path()) {
                        continue;
                    }
                    let Ok(rel) = entry.path().strip_prefix(&self.docs_root) else {
                        continue;
                    };
                    if self.is_internal(rel) {
                        continue;
                    }
                    files.push(rel.to_path_buf());
                }
                Err(e) => log::warn!("Failed to read entry: {e}"),
            }
        }

        files
    }

    /// Skip hidden components, underscore-prefixed internals, and the index
    /// cache directory itself.
    fn is_internal(&self, rel: &Path) -> bool {
        rel.components().any(|component| {
            let std::path::Component::Normal(name) = component else {
                return false;
            };
            let name = name.to_string_lossy();
            name.starts_with('.') || name.starts_with('_') || name == self.index_dir_name
        })
    }
}

pub(crate) fn is_doc_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            DOC_EXTENSIONS.iter().any(|candidate| candidate == &ext)
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn groups_doc_files_by_top_level_folder() {
        let temp = tempdir().unwrap();
        write(temp.path(), "guides/setup.md", "setup");
        write(temp.path(), "guides/nested/advanced.rst", "advanced");
        write(temp.path(), "reference/api.adoc", "api");
        write(temp.path(), "reference/ignored.txt", "not a doc");

        let scanner = AreaScanner::new(temp.path(), ".doc-index");
        let areas = scanner.scan();

        assert_eq!(areas.len(), 2);
        assert_eq!(areas[0].name, "guides");
        assert_eq!(
            areas[0].files,
            vec![
                PathBuf::from("guides/nested/advanced.rst"),
                PathBuf::from("guides/setup.md"),
            ]
        );
        assert_eq!(areas[1].name, "reference");
        assert_eq!(areas[1].files, vec![PathBuf::from("reference/api.adoc")]);
    }

    #[test]
    fn skips_internal_and_index_directories() {
        let temp = tempdir().unwrap();
        write(temp.path(), "_templates/layout.md", "internal");
        write(temp.path(), ".doc-index/guides.index.md", "cached index");
        write(temp.path(), "guides/setup.md", "setup");

        let scanner = AreaScanner::new(temp.path(), ".doc-index");
        let areas = scanner.scan();

        assert_eq!(areas.len(), 1);
        assert_eq!(areas[0].name, "guides");
    }

    #[test]
    fn root_docs_are_not_areas() {
        let temp = tempdir().unwrap();
        write(temp.path(), "README.md", "readme");
        write(temp.path(), "guides/setup.md", "setup");

        let scanner = AreaScanner::new(temp.path(), ".doc-index");
        assert_eq!(scanner.scan().len(), 1);
        // With no areas selected, only root-level docs remain candidates.
        assert_eq!(
            scanner.candidate_files(&[]),
            vec![PathBuf::from("README.md")]
        );
    }

    #[test]
    fn candidate_files_include_selected_areas_and_root_docs() {
        let temp = tempdir().unwrap();
        write(temp.path(), "README.md", "readme");
        write(temp.path(), "guides/setup.md", "setup");
        write(temp.path(), "reference/api.md", "api");

        let scanner = AreaScanner::new(temp.path(), ".doc-index");
        let files = scanner.candidate_files(&["guides".to_string()]);

        assert_eq!(
            files,
            vec![PathBuf::from("README.md"), PathBuf::from("guides/setup.md")]
        );
    }

    #[test]
    fn candidate_files_cover_nested_files_of_selected_areas() {
        let temp = tempdir().unwrap();
        write(temp.path(), "overview.md", "overview");
        write(temp.path(), "guides/setup.md", "setup");
        write(temp.path(), "guides/nested/deep.md", "deep");
        write(temp.path(), "reference/api.md", "api");

        let scanner = AreaScanner::new(temp.path(), ".doc-index");
        let files = scanner.candidate_files(&["guides".to_string()]);

        assert_eq!(
            files,
            vec![
                PathBuf::from("guides/nested/deep.md"),
                PathBuf::from("guides/setup.md"),
                PathBuf::from("overview.md"),
            ]
        );
    }
}
