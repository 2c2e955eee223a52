use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

/// Read a JSON file and deserialise into a typed struct.
pub fn read_json<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    let value: T = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?;
    Ok(value)
}

/// Resolve a path against the working directory and check it names a file.
pub fn resolve_path(path: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.exists() {
        return Err(format!("File not found: {}", canonical.display()).into());
    }

    if !canonical.is_file() {
        return Err(format!("Not a file: {}", canonical.display()).into());
    }

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use statarb_core::pipeline::BacktestRequest;
    use std::io::Write;

    #[test]
    fn test_read_partial_request() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"tickers":["GDX","GLD"],"entry_z":1.5}}"#).unwrap();
        let req: BacktestRequest = read_json(f.path().to_str().unwrap()).unwrap();
        assert_eq!(req.tickers, ["GDX".to_string(), "GLD".to_string()]);
        assert_eq!(req.entry_z, 1.5);
        assert_eq!(req.window, statarb_core::config::DEFAULT_WINDOW);
    }

    #[test]
    fn test_missing_file() {
        let err = read_json::<BacktestRequest>("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }

    #[test]
    fn test_directory_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_path(dir.path().to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("Not a file"));
    }
}
