use std::path::{Path, PathBuf};

pub mod csv_events;
pub mod xml;

/// Resolves `file` against the directory of the config file. Absolute paths and paths starting with
/// `./` are used as they are.
pub fn resolve_path(config: &Path, file: &str) -> PathBuf {
    let file_path = PathBuf::from(file);
    if file_path.is_absolute() || file_path.starts_with("./") {
        return file_path;
    }

    if let Some(path) = config.parent() {
        path.join(file_path)
    } else {
        file_path
    }
}
