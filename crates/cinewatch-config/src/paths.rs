use anyhow::Result;
use std::path::{Path, PathBuf};

/// Get the container base path from environment variable, defaulting to "/app"
pub fn container_base_path() -> PathBuf {
    std::env::var("CINEWATCH_BASE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/app"))
}

#[derive(Debug, Clone)]
pub struct PathManager {
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl PathManager {
    pub fn new() -> Result<Self> {
        let base_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join("cinewatch");

        Ok(Self::from_base(base_dir))
    }

    pub fn from_docker_env() -> Self {
        Self::from_base(container_base_path())
    }

    /// Lay out config and data under a single base directory
    pub fn from_base(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            data_dir: base.join("data"),
            config_dir: base,
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Location of the persisted history record
    pub fn history_file(&self, file_name: &str) -> PathBuf {
        self.data_dir.join(file_name)
    }

    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}

impl Default for PathManager {
    fn default() -> Self {
        // The container base directory only exists inside the image
        let base = container_base_path();
        if base.exists() {
            return Self::from_docker_env();
        }

        Self::new().unwrap_or_else(|_| Self::from_docker_env())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_under_base() {
        let paths = PathManager::from_base("/tmp/cw");
        assert_eq!(paths.config_file(), PathBuf::from("/tmp/cw/config.toml"));
        assert_eq!(paths.data_dir(), Path::new("/tmp/cw/data"));
        assert_eq!(
            paths.history_file("continue-watching-storage.json"),
            PathBuf::from("/tmp/cw/data/continue-watching-storage.json")
        );
    }

    #[test]
    fn test_ensure_directories() {
        let dir = tempfile::tempdir().unwrap();
        let paths = PathManager::from_base(dir.path().join("cinewatch"));
        paths.ensure_directories().unwrap();
        assert!(paths.data_dir().is_dir());
        assert!(!dir.path().join("cinewatch").join("logs").exists());
    }
}
