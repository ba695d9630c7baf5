//! The persisted fact document.
//!
//! The store is one growing file made of RDF/XML documents separated by a
//! blank line. Writers to the same path are serialised in-process and every
//! write replaces the file atomically.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
};

use dashmap::DashMap;
use oxrdf::{Term, Triple};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

use crate::{
    ontology::vocab::rdfs,
    reasoner::{World, WorldError},
};

static WRITE_LOCKS: OnceLock<DashMap<PathBuf, Arc<Mutex<()>>>> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum FactStoreError {
    #[error("cannot access fact store `{path}`: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] WorldError),
}

impl FactStoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Handle on a fact document addressed by path.
#[derive(Clone, Debug)]
pub struct FactStore {
    path: PathBuf,
}

impl FactStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Acquires the write lock for this path. Held for the whole
    /// read-check-write sequence of a commit.
    pub async fn lock(&self) -> OwnedMutexGuard<()> {
        let locks = WRITE_LOCKS.get_or_init(DashMap::new);
        let lock = Arc::clone(locks.entry(lock_key(&self.path)).or_default().value());
        lock.lock_owned().await
    }

    /// Reads the current document; `None` when nothing was committed yet.
    ///
    /// # Errors
    ///
    /// Fails when the file exists but cannot be read.
    pub async fn read(&self) -> Result<Option<String>, FactStoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(FactStoreError::io(&self.path, err)),
        }
    }

    /// Replaces the document through a temporary file and a rename.
    ///
    /// # Errors
    ///
    /// Fails when the directory or file cannot be written; the previous
    /// document is left untouched in that case.
    pub async fn write(&self, content: &str) -> Result<(), FactStoreError> {
        let directory = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        tokio::fs::create_dir_all(directory)
            .await
            .map_err(|err| FactStoreError::io(directory, err))?;

        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let staging = directory.join(format!(".{file_name}.{}.tmp", Uuid::new_v4()));
        if let Err(err) = tokio::fs::write(&staging, content).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(FactStoreError::io(&staging, err));
        }
        if let Err(err) = tokio::fs::rename(&staging, &self.path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(FactStoreError::io(&self.path, err));
        }
        debug!(path = %self.path.display(), bytes = content.len(), "fact store written");
        Ok(())
    }

    /// Loads the committed facts into `world`, one document per segment.
    ///
    /// # Errors
    ///
    /// Returns the first segment's parse error.
    pub fn load_into(content: &str, world: &mut World, label: &str) -> Result<usize, WorldError> {
        let parts = segments(content);
        let mut loaded = 0;
        for (index, part) in parts.iter().enumerate() {
            let document = if parts.len() == 1 {
                label.to_string()
            } else {
                format!("{label} #{}", index + 1)
            };
            loaded += world.load_rdf_xml(part, &document)?;
        }
        Ok(loaded)
    }

    /// Finds resources whose `rdfs:label` contains `term`, ignoring case.
    ///
    /// # Errors
    ///
    /// Fails when the store cannot be read or does not parse.
    pub async fn search_labels(
        &self,
        term: &str,
        limit: usize,
    ) -> Result<Vec<(String, String)>, FactStoreError> {
        let Some(content) = self.read().await? else {
            return Ok(Vec::new());
        };
        let mut world = World::new("");
        Self::load_into(&content, &mut world, "fact store")?;
        let needle = term.to_lowercase();
        let mut found: Vec<(String, String)> = world
            .triples()
            .iter()
            .filter(|triple| triple.predicate.as_str() == rdfs::LABEL)
            .filter_map(label_of)
            .filter(|(_, label)| label.to_lowercase().contains(&needle))
            .collect();
        found.sort();
        found.dedup();
        if limit > 0 {
            found.truncate(limit);
        }
        Ok(found)
    }
}

fn lock_key(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
}

fn label_of(triple: &Triple) -> Option<(String, String)> {
    let Term::NamedNode(subject) = Term::from(triple.subject.clone()) else {
        return None;
    };
    let Term::Literal(label) = &triple.object else {
        return None;
    };
    Some((subject.into_string(), label.value().to_string()))
}

/// Splits a committed document into its RDF/XML documents.
///
/// Each part ends with a closing `RDF` root element; trailing text without
/// one is kept as a final part so that it still gets reported by the parser.
#[must_use]
pub fn segments(content: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for (index, _) in content.match_indices("</") {
        if index < start {
            continue;
        }
        let rest = &content[index + 2..];
        let Some(close) = rest.find('>') else {
            break;
        };
        let name = rest[..close].trim_end();
        if name == "RDF" || name.ends_with(":RDF") {
            let end = index + 2 + close + 1;
            parts.push(content[start..end].trim());
            start = end;
        }
    }
    let tail = content[start..].trim();
    if !tail.is_empty() {
        parts.push(tail);
    }
    parts.retain(|part| !part.is_empty());
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:rdfs="http://www.w3.org/2000/01/rdf-schema#">
  <rdf:Description rdf:about="https://example.org/people/clark">
    <rdfs:label>Clark Kent</rdfs:label>
  </rdf:Description>
</rdf:RDF>"#;

    #[test]
    fn splits_concatenated_documents() {
        let merged = format!("{DOCUMENT}\n\n{}", DOCUMENT.replace("Clark Kent", "Lois Lane"));
        let parts = segments(&merged);
        assert_eq!(parts.len(), 2);
        assert!(parts[1].contains("Lois Lane"));
        assert_eq!(segments(DOCUMENT), vec![DOCUMENT]);
        assert!(segments("  \n").is_empty());
        assert_eq!(segments("<rdf:RDF>").len(), 1);
    }

    #[tokio::test]
    async fn writes_atomically_and_reads_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FactStore::new(dir.path().join("output").join("data.xml"));
        assert_eq!(store.read().await.expect("read"), None);

        store.write(DOCUMENT).await.expect("write");
        assert_eq!(store.read().await.expect("read").as_deref(), Some(DOCUMENT));

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("output"))
            .expect("listing")
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn searches_labels_case_insensitively() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FactStore::new(dir.path().join("data.xml"));
        assert!(store.search_labels("clark", 10).await.expect("empty").is_empty());

        let merged = format!("{DOCUMENT}\n\n{}", DOCUMENT.replace("clark", "lois").replace("Clark Kent", "Lois Lane"));
        store.write(&merged).await.expect("write");
        assert_eq!(
            store.search_labels("KENT", 10).await.expect("search"),
            vec![(
                "https://example.org/people/clark".to_string(),
                "Clark Kent".to_string()
            )]
        );
        assert_eq!(store.search_labels("a", 1).await.expect("search").len(), 1);
    }

    #[tokio::test]
    async fn lock_is_shared_per_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.xml");
        let first = FactStore::new(&path);
        let second = FactStore::new(&path);
        let guard = first.lock().await;
        let pending = tokio::time::timeout(std::time::Duration::from_millis(50), second.lock()).await;
        assert!(pending.is_err());
        drop(guard);
        let _relocked = second.lock().await;
    }
}
