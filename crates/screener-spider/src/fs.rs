use crate::error::Error;
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use tracing::trace;

/// Reads a `.json` file from `path`.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Error> {
    trace!("reading file path: {}", path.display());
    let file = tokio::fs::read(path).await?;
    trace!("file read; deserializing bytes ...");
    let data: T = serde_json::from_slice(&file)?;
    Ok(data)
}

/// Writes `data` as pretty `.json` to `path`, creating parent directories as needed.
pub async fn write_json<T: Serialize>(path: &Path, data: &T) -> Result<(), Error> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        trace!("checking directory path: {}", dir.display());
        tokio::fs::create_dir_all(dir).await?;
    }

    let bytes = serde_json::to_vec_pretty(data)?;
    tokio::fs::write(path, bytes).await?;
    trace!("wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn writes_into_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.json");

        let data = BTreeMap::from([("P/E", "35.10")]);
        write_json(&path, &data).await.unwrap();

        let back: BTreeMap<String, String> = read_json(&path).await.unwrap();
        assert_eq!(back["P/E"], "35.10");
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_json::<serde_json::Value>(&dir.path().join("none.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
