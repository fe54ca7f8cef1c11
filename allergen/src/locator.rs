//! Resolution of the model artifact path.

use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{AllergenError, Result};

/// Environment variable that overrides the model path.
pub const MODEL_ENV: &str = "ALLERGEN_MODEL";

/// Model path relative to the working directory or the executable.
pub const DEFAULT_MODEL_PATH: &str = "models/allergen_tfidf_logreg.model.zst";

/// Finds the model artifact.
///
/// Candidates are tried in order: the explicit path, [`MODEL_ENV`], [`DEFAULT_MODEL_PATH`] in the
/// working directory, and [`DEFAULT_MODEL_PATH`] next to the executable.
#[derive(Clone, Debug, Default)]
pub struct ModelLocator {
    explicit: Option<PathBuf>,
    env_path: Option<PathBuf>,
    base_dirs: Vec<PathBuf>,
}

impl ModelLocator {
    /// Creates a locator from the process environment.
    pub fn new() -> Self {
        let mut base_dirs = vec![];
        if let Ok(cwd) = env::current_dir() {
            base_dirs.push(cwd);
        }
        if let Some(dir) = env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            base_dirs.push(dir);
        }
        Self {
            explicit: None,
            env_path: env::var_os(MODEL_ENV).map(PathBuf::from),
            base_dirs,
        }
    }

    /// Sets the path given on the command line. It takes precedence over everything else.
    pub fn explicit<P>(mut self, path: Option<P>) -> Self
    where
        P: Into<PathBuf>,
    {
        self.explicit = path.map(Into::into);
        self
    }

    /// Replaces the value read from [`MODEL_ENV`].
    pub fn env_path<P>(mut self, path: Option<P>) -> Self
    where
        P: Into<PathBuf>,
    {
        self.env_path = path.map(Into::into);
        self
    }

    /// Replaces the directories searched for [`DEFAULT_MODEL_PATH`].
    pub fn base_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.base_dirs = dirs;
        self
    }

    /// All candidate paths, in the order they are tried.
    pub fn candidates(&self) -> Vec<PathBuf> {
        self.explicit
            .iter()
            .chain(&self.env_path)
            .cloned()
            .chain(self.base_dirs.iter().map(|dir| dir.join(DEFAULT_MODEL_PATH)))
            .collect()
    }

    /// Returns the first candidate that is an existing file.
    ///
    /// # Errors
    ///
    /// If no candidate exists, [`AllergenError::ArtifactLoad`] describing every attempt is
    /// returned.
    pub fn resolve(&self) -> Result<PathBuf> {
        let candidates = self.candidates();
        for path in &candidates {
            log::debug!("looking for the model at {}", path.display());
            if path.is_file() {
                return Ok(path.clone());
            }
        }
        let first = candidates
            .first()
            .cloned()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH));
        Err(AllergenError::artifact_load(
            first,
            diagnostics(&candidates, &self.base_dirs),
        ))
    }
}

fn diagnostics(candidates: &[PathBuf], base_dirs: &[PathBuf]) -> String {
    let mut msg = String::from("model file not found");
    for path in candidates {
        let _ = write!(msg, "\n  tried {} (exists: {})", path.display(), path.exists());
    }
    for dir in base_dirs {
        let _ = write!(msg, "\n  contents of {}:", dir.display());
        match fs::read_dir(dir) {
            Ok(entries) => {
                let mut names: Vec<String> = entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect();
                names.sort();
                for name in names {
                    let _ = write!(msg, " {name}");
                }
            }
            Err(e) => {
                let _ = write!(msg, " <{e}>");
            }
        }
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_model(dir: &Path) -> PathBuf {
        let path = dir.join(DEFAULT_MODEL_PATH);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"model").unwrap();
        path
    }

    #[test]
    fn test_resolve_explicit_first() {
        let dir = tempfile::tempdir().unwrap();
        let default = write_model(dir.path());
        let explicit = dir.path().join("custom.model.zst");
        fs::write(&explicit, b"model").unwrap();

        let locator = ModelLocator::default()
            .explicit(Some(&explicit))
            .env_path(Some(&default))
            .base_dirs(vec![dir.path().to_path_buf()]);
        assert_eq!(explicit, locator.resolve().unwrap());
    }

    #[test]
    fn test_resolve_env_before_default() {
        let dir = tempfile::tempdir().unwrap();
        write_model(dir.path());
        let env_model = dir.path().join("env.model.zst");
        fs::write(&env_model, b"model").unwrap();

        let locator = ModelLocator::default()
            .env_path(Some(&env_model))
            .base_dirs(vec![dir.path().to_path_buf()]);
        assert_eq!(env_model, locator.resolve().unwrap());
    }

    #[test]
    fn test_resolve_skips_missing_candidates() {
        let empty = tempfile::tempdir().unwrap();
        let exe_dir = tempfile::tempdir().unwrap();
        let expected = write_model(exe_dir.path());

        let locator = ModelLocator::default()
            .explicit(Some(empty.path().join("missing.zst")))
            .base_dirs(vec![empty.path().to_path_buf(), exe_dir.path().to_path_buf()]);
        assert_eq!(expected, locator.resolve().unwrap());
    }

    #[test]
    fn test_resolve_not_found() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("README.txt"), b"").unwrap();
        let missing = dir.path().join("nope.zst");

        let locator = ModelLocator::default()
            .explicit(Some(&missing))
            .base_dirs(vec![dir.path().to_path_buf()]);
        let err = locator.resolve().err().unwrap();

        let msg = err.to_string();
        assert!(matches!(err, AllergenError::ArtifactLoad(_)));
        assert!(msg.starts_with(&format!("ArtifactLoadError: {}: ", missing.display())));
        assert!(msg.contains(&format!("tried {} (exists: false)", missing.display())));
        assert!(msg.contains("README.txt"));
    }

    #[test]
    fn test_candidates_order() {
        let locator = ModelLocator::default()
            .explicit(Some("a.zst"))
            .env_path(Some("b.zst"))
            .base_dirs(vec![PathBuf::from("/cwd"), PathBuf::from("/exe")]);

        assert_eq!(
            vec![
                PathBuf::from("a.zst"),
                PathBuf::from("b.zst"),
                PathBuf::from("/cwd").join(DEFAULT_MODEL_PATH),
                PathBuf::from("/exe").join(DEFAULT_MODEL_PATH),
            ],
            locator.candidates()
        );
    }
}
