//! Flat scratch area for intermediate artifacts (schema drafts, data files).
//!
//! The store is backed by an [`opendal::Operator`] so the same code runs over
//! a local directory or an in-memory service in tests.

use std::path::Path;

use opendal::{services, ErrorKind, Operator};
use tracing::{debug, info};

use crate::config::ProjectConfig;

/// Errors raised by [`WorkingStore`] operations.
#[derive(Debug, thiserror::Error)]
pub enum WorkdirError {
    /// Names are single segments; nested paths are rejected.
    #[error("invalid file name `{0}`: the working store is flat")]
    InvalidName(String),
    #[error("file `{0}` does not exist")]
    NotFound(String),
    #[error("file `{0}` is not valid UTF-8")]
    NotText(String),
    #[error("working store operation on `{name}` failed: {source}")]
    Storage {
        name: String,
        #[source]
        source: opendal::Error,
    },
}

impl WorkdirError {
    fn storage(name: &str, source: opendal::Error) -> Self {
        if source.kind() == ErrorKind::NotFound {
            Self::NotFound(name.to_string())
        } else {
            Self::Storage {
                name: name.to_string(),
                source,
            }
        }
    }
}

/// Namespaced, flat key-value file area.
#[derive(Clone, Debug)]
pub struct WorkingStore {
    operator: Operator,
}

impl WorkingStore {
    /// Creates a store rooted at a local directory.
    ///
    /// # Errors
    ///
    /// Fails when the backend cannot be initialised.
    pub fn at_dir(root: impl AsRef<Path>) -> Result<Self, WorkdirError> {
        let root = root.as_ref().to_string_lossy().into_owned();
        let builder = services::Fs::default().root(&root);
        let operator = Operator::new(builder)
            .map_err(|err| WorkdirError::storage(&root, err))?
            .finish();
        debug!(root, "opened filesystem working store");
        Ok(Self { operator })
    }

    /// Creates a store that lives only in memory.
    ///
    /// # Errors
    ///
    /// Fails when the backend cannot be initialised.
    pub fn in_memory() -> Result<Self, WorkdirError> {
        let operator = Operator::new(services::Memory::default())
            .map_err(|err| WorkdirError::storage("memory", err))?
            .finish();
        Ok(Self { operator })
    }

    /// Builds the store described by the project configuration.
    ///
    /// # Errors
    ///
    /// Fails when the backend cannot be initialised.
    pub fn from_config(config: &ProjectConfig) -> Result<Self, WorkdirError> {
        match &config.workdir {
            Some(dir) => Self::at_dir(dir),
            None => Self::in_memory(),
        }
    }

    /// Reads a file for display, logging the access.
    ///
    /// # Errors
    ///
    /// See [`WorkingStore::read`].
    pub async fn inspect(&self, name: &str) -> Result<String, WorkdirError> {
        info!(file = name, "inspecting file");
        self.read(name).await
    }

    /// Reads a file as text.
    ///
    /// # Errors
    ///
    /// Returns [`WorkdirError::NotFound`] for missing files and
    /// [`WorkdirError::NotText`] for binary content.
    pub async fn read(&self, name: &str) -> Result<String, WorkdirError> {
        let name = checked(name)?;
        let buffer = self
            .operator
            .read(name)
            .await
            .map_err(|err| WorkdirError::storage(name, err))?;
        String::from_utf8(buffer.to_vec()).map_err(|_| WorkdirError::NotText(name.to_string()))
    }

    /// Creates or replaces a file.
    ///
    /// # Errors
    ///
    /// Fails on invalid names or backend errors.
    pub async fn write(&self, name: &str, content: &str) -> Result<(), WorkdirError> {
        let name = checked(name)?;
        self.operator
            .write(name, content.as_bytes().to_vec())
            .await
            .map_err(|err| WorkdirError::storage(name, err))?;
        debug!(file = name, bytes = content.len(), "wrote file");
        Ok(())
    }

    /// Returns `true` if a file with `name` exists.
    ///
    /// # Errors
    ///
    /// Fails on invalid names or backend errors.
    pub async fn exists(&self, name: &str) -> Result<bool, WorkdirError> {
        let name = checked(name)?;
        self.operator
            .exists(name)
            .await
            .map_err(|err| WorkdirError::storage(name, err))
    }

    /// Deletes a file.
    ///
    /// # Errors
    ///
    /// Returns [`WorkdirError::NotFound`] when there is nothing to delete.
    pub async fn delete(&self, name: &str) -> Result<(), WorkdirError> {
        if !self.exists(name).await? {
            return Err(WorkdirError::NotFound(name.to_string()));
        }
        self.operator
            .delete(name)
            .await
            .map_err(|err| WorkdirError::storage(name, err))
    }

    /// Lists the names of all files, sorted. The listing is not recursive.
    ///
    /// # Errors
    ///
    /// Fails on backend errors.
    pub async fn list(&self) -> Result<Vec<String>, WorkdirError> {
        let entries = self
            .operator
            .list("/")
            .await
            .map_err(|err| WorkdirError::storage("/", err))?;
        let mut names: Vec<String> = entries
            .into_iter()
            .filter(|entry| entry.metadata().is_file())
            .map(|entry| entry.name().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        names.sort();
        Ok(names)
    }
}

fn checked(name: &str) -> Result<&str, WorkdirError> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed.contains(['/', '\\'])
        || trimmed == "."
        || trimmed == ".."
    {
        return Err(WorkdirError::InvalidName(name.to_string()));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[tokio::test]
    async fn round_trips_files() {
        let store = WorkingStore::in_memory().expect("store");
        assert!(!store.exists("test.txt").await.expect("exists"));
        store.write("test.txt", "Hello, world!").await.expect("write");
        assert!(store.exists("test.txt").await.expect("exists"));
        assert_eq!(store.inspect("test.txt").await.expect("read"), "Hello, world!");

        store.write("b.yaml", "id: x").await.expect("write");
        assert_eq!(
            store.list().await.expect("list"),
            vec!["b.yaml".to_string(), "test.txt".to_string()]
        );

        store.delete("test.txt").await.expect("delete");
        assert!(matches!(
            store.read("test.txt").await,
            Err(WorkdirError::NotFound(_))
        ));
        assert!(matches!(
            store.delete("test.txt").await,
            Err(WorkdirError::NotFound(_))
        ));
    }

    #[rstest]
    #[case("")]
    #[case("nested/file.txt")]
    #[case("..")]
    #[tokio::test]
    async fn rejects_nested_names(#[case] name: &str) {
        let store = WorkingStore::in_memory().expect("store");
        assert!(matches!(
            store.write(name, "x").await,
            Err(WorkdirError::InvalidName(_))
        ));
    }

    #[tokio::test]
    async fn persists_to_a_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = WorkingStore::at_dir(dir.path()).expect("store");
        store.write("schema.yaml", "name: s").await.expect("write");
        let on_disk = std::fs::read_to_string(dir.path().join("schema.yaml")).expect("on disk");
        assert_eq!(on_disk, "name: s");
    }
}
