use crate::Result;
use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

impl From<Option<PathBuf>> for OutputTarget {
    fn from(path: Option<PathBuf>) -> Self {
        path.map_or(OutputTarget::Stdout, OutputTarget::File)
    }
}

impl OutputTarget {
    /// Hands a buffered writer for the target to `write`.
    ///
    /// File output lands in a temporary file next to the destination and is
    /// renamed into place only if `write` succeeds.
    pub fn write_with<T, F>(&self, write: F) -> Result<T>
    where
        F: FnOnce(&mut dyn Write) -> Result<T>,
    {
        match self {
            OutputTarget::Stdout => {
                let stdout = io::stdout();
                let mut out = BufWriter::new(stdout.lock());
                let value = write(&mut out)?;
                out.flush()?;
                Ok(value)
            }
            OutputTarget::File(path) => {
                let tmp = temp_file(path);
                let written = (|| -> Result<T> {
                    let mut out = BufWriter::new(File::create(&tmp)?);
                    let value = write(&mut out)?;
                    out.into_inner().map_err(|e| e.into_error())?.sync_all()?;
                    Ok(value)
                })();

                match written {
                    Ok(value) => {
                        fs::rename(&tmp, path)?;
                        debug!(path = %path.display(), "output written");
                        Ok(value)
                    }
                    Err(err) => {
                        remove_temp(&tmp);
                        Err(err)
                    }
                }
            }
        }
    }
}

fn temp_file(dest: &Path) -> PathBuf {
    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    dir.join(format!(".{}.tmp", Uuid::new_v4()))
}

/// Returns false when `tmp` exists but could not be removed.
fn remove_temp(tmp: &Path) -> bool {
    match fs::remove_file(tmp) {
        Ok(()) => true,
        Err(err) if err.kind() == io::ErrorKind::NotFound => true,
        Err(err) => {
            warn!(path = %tmp.display(), error = %err, "cannot remove temporary output file");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_file_output_renamed_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mr-out");
        let target = OutputTarget::from(Some(path.clone()));

        let n = target
            .write_with(|out| {
                writeln!(out, "hello")?;
                Ok(1)
            })
            .unwrap();

        assert_eq!(n, 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello\n");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_failed_write_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mr-out");

        let err = OutputTarget::File(path.clone())
            .write_with(|out| -> Result<()> {
                writeln!(out, "partial")?;
                Err(io::Error::new(io::ErrorKind::Other, "boom").into())
            })
            .unwrap_err();

        assert!(matches!(err, Error::Io(_)));
        assert!(!path.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_temp_file_in_destination_dir() {
        let tmp = temp_file(Path::new("out/result.txt"));
        assert_eq!(tmp.parent(), Some(Path::new("out")));
        assert_eq!(temp_file(Path::new("result.txt")).parent(), Some(Path::new(".")));
    }

    #[test]
    fn test_remove_temp_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let tmp = dir.path().join(".leftover.tmp");
        fs::write(&tmp, "x").unwrap();

        assert!(remove_temp(&tmp));
        assert!(!tmp.exists());
        // already gone is fine
        assert!(remove_temp(&tmp));
        // a directory cannot be removed with remove_file
        assert!(!remove_temp(dir.path()));
    }
}
