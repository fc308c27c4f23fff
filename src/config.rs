use crate::error::{Result, UploaderError};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that relocates every file the app writes
pub const HOME_ENV_VAR: &str = "R2_UPLOADER_HOME";

const APP_DIR_NAME: &str = "com.r2uploader.desktop";
const DB_FILE_NAME: &str = "r2uploader.db";

/// Application data directory
///
/// On macOS: ~/Library/Application Support/com.r2uploader.desktop/
/// On Linux: ~/.local/share/com.r2uploader.desktop/
/// On Windows: %LOCALAPPDATA%/com.r2uploader.desktop/
pub fn get_app_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(HOME_ENV_VAR).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }

    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or_else(|| UploaderError::Config("Could not find local data directory".to_string()))
}

pub fn get_db_path() -> Result<PathBuf> {
    Ok(get_app_dir()?.join(DB_FILE_NAME))
}

pub fn get_logs_dir() -> Result<PathBuf> {
    Ok(get_app_dir()?.join("logs"))
}

pub fn ensure_app_dir() -> Result<PathBuf> {
    let dir = get_app_dir()?;
    ensure_private_dir(&dir)?;
    Ok(dir)
}

pub fn ensure_logs_dir() -> Result<PathBuf> {
    let dir = get_logs_dir()?;
    ensure_private_dir(&dir)?;
    Ok(dir)
}

/// Create `dir` if missing; new directories are owner-only (700) on Unix
fn ensure_private_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        return Ok(());
    }

    fs::create_dir_all(dir)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let metadata = fs::metadata(dir)?;
        let mut permissions = metadata.permissions();
        permissions.set_mode(0o700);
        fs::set_permissions(dir, permissions)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_ensure_private_dir_creates_nested() {
        let temp = tempdir().unwrap();
        let nested = temp.path().join("a").join("b");

        ensure_private_dir(&nested).unwrap();
        assert!(nested.is_dir());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&nested).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o700);
        }

        // second call is a no-op
        ensure_private_dir(&nested).unwrap();
    }

    #[test]
    fn test_db_and_logs_live_under_app_dir() {
        let app_dir = get_app_dir().unwrap();
        assert!(get_db_path().unwrap().starts_with(&app_dir));
        assert!(get_logs_dir().unwrap().starts_with(&app_dir));
        assert_eq!(get_db_path().unwrap().file_name().unwrap(), DB_FILE_NAME);
    }
}
