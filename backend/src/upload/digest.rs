use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

const CHUNK_SIZE: usize = 4096;

/// Lowercase hex SHA-256 of the file at `path`, read in fixed-size chunks.
pub fn file_sha256(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_scratch(dir: &tempfile::TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn digest_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let content = vec![7u8; 10_000];
        let a = write_scratch(&dir, "a", &content);
        let b = write_scratch(&dir, "b", &content);
        let first = file_sha256(&a).unwrap();
        assert_eq!(first, file_sha256(&b).unwrap());
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn single_byte_change_changes_digest() {
        let dir = tempfile::tempdir().unwrap();
        let mut content = vec![7u8; 10_000];
        let a = write_scratch(&dir, "a", &content);
        content[5000] = 8;
        let b = write_scratch(&dir, "b", &content);
        assert_ne!(file_sha256(&a).unwrap(), file_sha256(&b).unwrap());
    }

    #[test]
    fn known_vector() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_scratch(&dir, "abc", b"abc");
        assert_eq!(
            file_sha256(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
