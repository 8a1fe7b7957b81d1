//! Persistent storage of the enrolled code.

use std::fmt::Debug;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use log::{debug, info};
use thiserror::Error;
use crate::code::{Code, CodeError};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed code record: {0}")]
    Malformed(#[from] CodeError),
}

/// What [CodeStore::load] found.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StoredCode {
    /// A previously enrolled code.
    Found(Code),
    /// Nothing was stored; the default code was written and is returned.
    Created(Code),
}

#[cfg(test)]
impl StoredCode {
    pub fn code(&self) -> Code {
        match self {
            StoredCode::Found(code) | StoredCode::Created(code) => *code,
        }
    }
}

pub trait CodeStore: Debug {
    /// Loads the stored code, initializing the store with the default code when it's empty.
    fn load(&mut self) -> Result<StoredCode, StoreError>;

    /// Replaces the stored code. Readers see either the old or the new code, never a mix.
    fn store(&mut self, code: &Code) -> Result<(), StoreError>;
}

/// Keeps the code in a small text file, as `d,d,d,d`.
#[derive(Debug, Clone)]
pub struct CodeFile {
    path: PathBuf,
    default_code: Code,
}

impl CodeFile {
    pub fn new(path: impl Into<PathBuf>, default_code: Code) -> Self {
        CodeFile {
            path: path.into(),
            default_code,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn encode(code: &Code) -> String {
        let digits: Vec<String> = code.digits().iter().map(char::to_string).collect();
        format!("{}\n", digits.join(","))
    }
}

impl CodeStore for CodeFile {
    fn load(&mut self) -> Result<StoredCode, StoreError> {
        if !self.path.exists() {
            info!("Code file {} not found, creating it.", self.path.display());
            let code = self.default_code;
            self.store(&code)?;
            return Ok(StoredCode::Created(code));
        }

        debug!("Reading code file {}.", self.path.display());
        let content = fs::read_to_string(&self.path)?;
        Ok(StoredCode::Found(content.parse()?))
    }

    fn store(&mut self, code: &Code) -> Result<(), StoreError> {
        let mut tmp_path = self.path.clone().into_os_string();
        tmp_path.push(".tmp");
        let tmp_path = PathBuf::from(tmp_path);

        {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(Self::encode(code).as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        debug!("Code file {} written.", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_created_with_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("code.txt");
        let mut store = CodeFile::new(&path, Code::default());

        let loaded = store.load().unwrap();

        assert_eq!(loaded, StoredCode::Created(Code::default()));
        assert_eq!(fs::read_to_string(&path).unwrap(), "1,2,3,4\n");
        assert_eq!(store.load().unwrap(), StoredCode::Found(Code::default()));
    }

    #[test]
    fn store_overwrites_and_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("code.txt");
        let mut store = CodeFile::new(&path, Code::default());
        let code: Code = "9087".parse().unwrap();

        store.store(&code).unwrap();
        store.store(&code.reversed()).unwrap();

        assert_eq!(store.load().unwrap().code(), code.reversed());
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("code.txt");
        fs::write(&path, "1,2,x").unwrap();
        let mut store = CodeFile::new(&path, Code::default());

        assert!(matches!(store.load(), Err(StoreError::Malformed(_))));
    }

    #[test]
    fn space_separated_records_are_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("code.txt");
        fs::write(&path, "5 6 7 8 ").unwrap();
        let mut store = CodeFile::new(&path, Code::default());

        assert_eq!(store.load().unwrap(), StoredCode::Found("5678".parse().unwrap()));
    }
}
