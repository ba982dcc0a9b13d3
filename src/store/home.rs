use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::config::Config;
use crate::error::{Result, TickError};
use crate::session::Session;

/// The per-user `.tick` directory holding `config.json` and `session.json`.
#[derive(Debug, Clone)]
pub struct Home {
    root: PathBuf,
}

impl Home {
    /// `$TICK_HOME` if set, else `$HOME/.tick`, else `./.tick`.
    pub fn resolve() -> Self {
        if let Some(dir) = std::env::var_os("TICK_HOME").filter(|v| !v.is_empty()) {
            return Self::at(dir);
        }
        match std::env::var_os("HOME").filter(|v| !v.is_empty()) {
            Some(home) => Self::at(Path::new(&home).join(".tick")),
            None => Self::at(".tick"),
        }
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn config_path(&self) -> PathBuf {
        self.root.join("config.json")
    }

    fn session_path(&self) -> PathBuf {
        self.root.join("session.json")
    }

    fn lock_path(&self) -> PathBuf {
        self.root.join("session.lock")
    }

    /// Config from disk, or defaults when no file exists yet.
    pub fn read_config(&self) -> Result<Config> {
        let path = self.config_path();
        if !path.exists() {
            return Ok(Config::default());
        }
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn write_config(&self, config: &Config) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        fs::write(self.config_path(), serde_json::to_string_pretty(config)?)?;
        Ok(())
    }

    pub fn read_session(&self) -> Result<Option<Session>> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&data)?))
    }

    /// Tokens live here, so on unix the file is readable by the owner only.
    pub fn write_session(&self, session: &Session) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        let _lock = self.lock()?;
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
            options.mode(0o600);
            let path = self.session_path();
            if path.exists() {
                fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
            }
        }
        let mut file = options.open(self.session_path())?;
        file.write_all(serde_json::to_string_pretty(session)?.as_bytes())?;
        Ok(())
    }

    pub fn clear_session(&self) -> Result<()> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(());
        }
        let _lock = self.lock()?;
        fs::remove_file(path)?;
        Ok(())
    }

    /// Exclusive lock over session writes; released when the handle drops.
    fn lock(&self) -> Result<File> {
        let path = self.lock_path();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        file.try_lock_exclusive()
            .map_err(|_| TickError::Locked(path.display().to_string()))?;
        Ok(file)
    }
}
