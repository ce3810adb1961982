use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, Error as SqliteError, OpenFlags, ffi::ErrorCode};

use crate::{ClientError, ClientResult};

pub const DATASTORE_FILE_NAME: &str = "datastore.db";
pub const CONFIG_FILE_NAME: &str = "qmseg.toml";

pub fn resolve_home(home_override: Option<&Path>) -> ClientResult<PathBuf> {
    let candidate = match home_override {
        Some(path) => path.to_path_buf(),
        None => {
            if let Some(override_path) = std::env::var_os("QMSEG_HOME") {
                PathBuf::from(override_path)
            } else if let Some(home_path) = home::home_dir() {
                home_path.join(".qmseg")
            } else {
                return Err(ClientError::datastore_failed(
                    Path::new("."),
                    "Could not resolve a home directory for the datastore.",
                ));
            }
        }
    };

    absolutize(&candidate)
}

pub fn ensure_home_directory(path: &Path) -> ClientResult<()> {
    fs::create_dir_all(path).map_err(|error| map_io_error(path, &error))?;
    set_private_permissions_best_effort(path);
    Ok(())
}

pub fn datastore_db_path(home: &Path) -> PathBuf {
    home.join(DATASTORE_FILE_NAME)
}

pub fn default_config_path(home: &Path) -> PathBuf {
    home.join(CONFIG_FILE_NAME)
}

pub fn open_connection(db_path: &Path) -> ClientResult<Connection> {
    let connection =
        Connection::open(db_path).map_err(|error| map_sqlite_error(db_path, &error))?;
    connection
        .busy_timeout(Duration::from_millis(250))
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    Ok(connection)
}

/// Opens an existing SQLite file without creating it. Used for the source
/// warehouse, which this tool must never write to.
pub fn open_readonly_connection(db_path: &Path) -> Result<Connection, SqliteError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI;
    let connection = Connection::open_with_flags(db_path, flags)?;
    connection.busy_timeout(Duration::from_millis(250))?;
    Ok(connection)
}

pub fn map_io_error(path: &Path, error: &std::io::Error) -> ClientError {
    if error.kind() == std::io::ErrorKind::PermissionDenied {
        return ClientError::datastore_permission_denied(path, &error.to_string());
    }

    ClientError::datastore_failed(path, &error.to_string())
}

pub fn map_sqlite_error(path: &Path, error: &SqliteError) -> ClientError {
    let error_code = error.sqlite_error_code();

    if matches!(
        error_code,
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    ) {
        return ClientError::datastore_locked(path);
    }

    if matches!(error_code, Some(ErrorCode::NotADatabase)) {
        return ClientError::datastore_corrupt(path, "file is not a SQLite database");
    }

    if matches!(
        error_code,
        Some(ErrorCode::CannotOpen | ErrorCode::ReadOnly)
    ) {
        return ClientError::datastore_permission_denied(path, &error.to_string());
    }

    ClientError::datastore_failed(path, &error.to_string())
}

fn absolutize(path: &Path) -> ClientResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|error| ClientError::datastore_failed(path, &error.to_string()))
}

#[cfg(unix)]
fn set_private_permissions_best_effort(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o700));
}

#[cfg(not(unix))]
fn set_private_permissions_best_effort(_path: &Path) {}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{datastore_db_path, default_config_path, resolve_home};

    #[test]
    fn explicit_home_override_wins() {
        let resolved = resolve_home(Some(Path::new("/tmp/qmseg-home")));
        assert!(resolved.is_ok());
        if let Ok(home) = resolved {
            assert_eq!(home, Path::new("/tmp/qmseg-home"));
            assert_eq!(
                datastore_db_path(&home),
                Path::new("/tmp/qmseg-home/datastore.db")
            );
            assert_eq!(
                default_config_path(&home),
                Path::new("/tmp/qmseg-home/qmseg.toml")
            );
        }
    }

    #[test]
    fn relative_home_is_made_absolute() {
        let resolved = resolve_home(Some(Path::new("relative-home")));
        assert!(resolved.is_ok());
        if let Ok(home) = resolved {
            assert!(home.is_absolute());
            assert!(home.ends_with("relative-home"));
        }
    }
}
