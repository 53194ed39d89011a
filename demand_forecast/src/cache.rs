//! File-backed forecast cache
//!
//! The cache lets a restarted process serve the last computed forecast
//! without fitting the model again. Reads never fail: anything that is not a
//! complete, valid forecast is treated as a miss. Writes go to a temporary
//! file in the same directory and are renamed into place, so a torn write
//! can never be read back as a valid cache.

use crate::error::{ForecastError, Result};
use crate::forecast::ForecastResult;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// JSON forecast cache at a fixed path
#[derive(Debug, Clone)]
pub struct FileCache {
    path: PathBuf,
}

impl FileCache {
    /// Create a cache backed by the file at `path`
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Path of the cache file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cached forecast, or `None` if there is no usable cache
    pub fn load(&self) -> Option<ForecastResult> {
        match self.try_load() {
            Ok(Some(result)) => {
                info!(
                    path = %self.path.display(),
                    days = result.summary.horizon_days,
                    "Loaded forecast from file cache"
                );
                Some(result)
            }
            Ok(None) => {
                debug!(path = %self.path.display(), "No forecast cache file");
                None
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring unusable forecast cache");
                None
            }
        }
    }

    fn try_load(&self) -> Result<Option<ForecastResult>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ForecastError::CacheReadInvalid(e.to_string())),
        };

        let result: ForecastResult = serde_json::from_slice(&bytes)
            .map_err(|e| ForecastError::CacheReadInvalid(e.to_string()))?;
        result.validate()?;

        Ok(Some(result))
    }

    /// Write the forecast, replacing any previous cache atomically
    pub fn save(&self, result: &ForecastResult) -> Result<()> {
        self.write_atomically(result)
            .map_err(|e| ForecastError::CacheWrite(format!("{}: {}", self.path.display(), e)))?;

        info!(path = %self.path.display(), "Forecast saved to file cache");
        Ok(())
    }

    fn write_atomically(&self, result: &ForecastResult) -> io::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let json = serde_json::to_vec_pretty(result)?;

        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(&json)?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| e.error)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::dates_after;
    use tempfile::TempDir;

    fn sample() -> ForecastResult {
        let dates = dates_after("2024-06-30".parse().unwrap(), 3).unwrap();
        ForecastResult::from_values(&dates, &[10.0, 11.5, 12.25]).unwrap()
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path().join("nested").join("forecast.json"));

        cache.save(&sample()).unwrap();
        assert_eq!(cache.load(), Some(sample()));
    }

    #[test]
    fn test_save_leaves_no_temporary_files() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path().join("forecast.json"));
        cache.save(&sample()).unwrap();
        cache.save(&sample()).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_save_into_file_path_fails() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"not a directory").unwrap();

        let cache = FileCache::new(blocker.join("forecast.json"));
        assert!(matches!(
            cache.save(&sample()),
            Err(ForecastError::CacheWrite(_))
        ));
    }
}
