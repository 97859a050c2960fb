use async_trait::async_trait;
use model::EndpointRecord;
use state::{EndpointStore, StateError, StateOperation};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Endpoint store persisted as a single JSON file, surviving process restarts.
///
/// Records are written to a uniquely named temporary file in the same directory which
/// is then renamed over the target, so readers see either the previous record or the new one.
#[derive(Debug, Clone)]
pub struct FileEndpointStore {
    path: PathBuf,
}

impl FileEndpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileEndpointStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn state_key(&self) -> String {
        self.path.display().to_string()
    }

    fn directory(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    async fn write_atomically(&self, bytes: Vec<u8>) -> std::io::Result<()> {
        let directory: PathBuf = self.directory();
        tokio::fs::create_dir_all(&directory).await?;

        let path: PathBuf = self.path.clone();

        // Dropped without persisting, the temp file is deleted
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut file: NamedTempFile = NamedTempFile::new_in(&directory)?;
            file.write_all(&bytes)?;
            file.as_file().sync_all()?;
            file.persist(&path).map_err(|err| err.error)?;

            Ok(())
        })
        .await
        .map_err(std::io::Error::other)?
    }
}

#[async_trait]
impl EndpointStore for FileEndpointStore {
    async fn get(&self) -> Result<Option<EndpointRecord>, StateError> {
        let bytes: Vec<u8> = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StateError::backend(self.state_key(), StateOperation::Get, err)),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|err| StateError::corrupt(self.state_key(), err))
    }

    async fn set(&self, record: EndpointRecord) -> Result<(), StateError> {
        let bytes: Vec<u8> = serde_json::to_vec_pretty(&record)
            .map_err(|err| StateError::backend(self.state_key(), StateOperation::Set, err))?;

        self.write_atomically(bytes)
            .await
            .map_err(|err| StateError::backend(self.state_key(), StateOperation::Set, err))?;

        tracing::debug!(path = %self.path.display(), "Stored endpoint record");

        Ok(())
    }

    async fn clear(&self) -> Result<(), StateError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StateError::backend(
                self.state_key(),
                StateOperation::Clear,
                err,
            )),
        }
    }
}
