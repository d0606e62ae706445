use std::path::{Path, PathBuf};

use thiserror::Error;

/// Failure to bring a program image into memory. Raised before any instruction runs.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("image of {size} bytes does not fit in {capacity} bytes of memory")]
    ImageTooLarge { size: usize, capacity: usize },
    #[error("failed to read image {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Read a whole image file from disk.
pub fn read_image<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, LoadError> {
    let path = path.as_ref();
    std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Check that `size` bytes fit in a memory of `capacity` bytes.
pub(crate) fn check_fits(size: usize, capacity: usize) -> Result<(), LoadError> {
    if size > capacity {
        Err(LoadError::ImageTooLarge { size, capacity })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_check_fits() {
        assert!(check_fits(0, 0).is_ok());
        assert!(check_fits(16, 16).is_ok());
        assert!(matches!(
            check_fits(17, 16),
            Err(LoadError::ImageTooLarge {
                size: 17,
                capacity: 16
            })
        ));
    }

    #[test]
    fn test_read_image() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(&[0x01, 0x00, 0x05, 0x00])?;
        assert_eq!(read_image(file.path())?, vec![0x01, 0x00, 0x05, 0x00]);
        Ok(())
    }

    #[test]
    fn test_read_missing_image() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_image(dir.path().join("missing.bin")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
        assert!(err.to_string().contains("missing.bin"));
    }
}
