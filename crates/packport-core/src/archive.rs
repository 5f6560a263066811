//! Archive creation and inspection for packs
//!
//! Packs travel as gzip-compressed tarballs with `Pack.yaml` at the root.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tar::{Archive, Builder, Header};

use crate::error::{CoreError, Result};
use crate::pack::{Pack, PackMetadata, PACK_YAML};

/// Create a `.tgz` archive from a pack.
///
/// Returns the path to the created archive file. `Pack.yaml` is written
/// first, followed by the pack's files in path order.
pub fn create_archive(pack: &Pack, output: &Path) -> Result<PathBuf> {
    let file = File::create(output)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = Builder::new(encoder);

    let yaml = serde_yaml::to_string(&pack.metadata)?;
    add_bytes_to_archive(&mut builder, PACK_YAML, yaml.as_bytes())?;

    for (rel, content) in &pack.files {
        add_bytes_to_archive(&mut builder, rel, content)?;
    }

    let encoder = builder.into_inner()?;
    encoder.finish()?;

    Ok(output.to_path_buf())
}

/// Load a full pack from a `.tgz` archive
pub fn load_archive(path: &Path) -> Result<Pack> {
    let contents = read_all_files(path)?;

    let yaml = contents.get(PACK_YAML).ok_or_else(|| CoreError::Archive {
        message: format!("{} missing from {}", PACK_YAML, path.display()),
    })?;
    let yaml = std::str::from_utf8(yaml).map_err(|e| CoreError::Archive {
        message: format!("invalid UTF-8 in {}: {}", PACK_YAML, e),
    })?;
    let metadata = PackMetadata::from_yaml(yaml)?;

    let files = contents
        .into_iter()
        .filter(|(rel, _)| rel != PACK_YAML)
        .collect();

    Ok(Pack { metadata, files })
}

/// Read only the metadata from a `.tgz` archive.
///
/// Stops at the first `Pack.yaml` entry, so scanning a directory of
/// archives stays cheap.
pub fn load_metadata(path: &Path) -> Result<PackMetadata> {
    let file = File::open(path)?;
    let decoder = GzDecoder::new(file);
    let mut archive = Archive::new(decoder);

    for entry in archive.entries().map_err(|e| not_an_archive(path, e))? {
        let mut entry = entry.map_err(|e| not_an_archive(path, e))?;
        let name = entry
            .path()
            .map_err(|e| not_an_archive(path, e))?
            .to_string_lossy()
            .to_string();
        if name == PACK_YAML {
            let mut yaml = String::new();
            entry
                .read_to_string(&mut yaml)
                .map_err(|e| not_an_archive(path, e))?;
            return PackMetadata::from_yaml(&yaml);
        }
    }

    Err(CoreError::Archive {
        message: format!("{} missing from {}", PACK_YAML, path.display()),
    })
}

fn not_an_archive(path: &Path, e: impl std::fmt::Display) -> CoreError {
    CoreError::Archive {
        message: format!("failed to read {}: {}", path.display(), e),
    }
}

/// Read all regular files from an archive in a single pass
fn read_all_files(path: &Path) -> Result<BTreeMap<String, Vec<u8>>> {
    let file = File::open(path)?;
    let decoder = GzDecoder::new(file);
    let mut archive = Archive::new(decoder);
    let mut contents = BTreeMap::new();

    for entry in archive.entries().map_err(|e| not_an_archive(path, e))? {
        let mut entry = entry.map_err(|e| not_an_archive(path, e))?;
        if entry.header().entry_type().is_dir() {
            continue;
        }
        let rel = entry
            .path()
            .map_err(|e| not_an_archive(path, e))?
            .to_string_lossy()
            .to_string();
        let mut data = Vec::new();
        entry
            .read_to_end(&mut data)
            .map_err(|e| not_an_archive(path, e))?;
        contents.insert(rel, data);
    }

    Ok(contents)
}

/// Add bytes to a tar archive with a given path
fn add_bytes_to_archive<W: Write>(
    builder: &mut Builder<W>,
    archive_path: &str,
    content: &[u8],
) -> Result<()> {
    let mut header = Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0); // Reproducible archives: epoch time
    header.set_cksum();

    builder.append_data(&mut header, archive_path, content)?;

    Ok(())
}

/// Generate the default archive filename for a pack
#[must_use]
pub fn default_archive_name(pack: &Pack) -> String {
    format!("{}-{}.tgz", pack.metadata.name, pack.metadata.version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_pack() -> Pack {
        let mut files = BTreeMap::new();
        files.insert("Dockerfile".to_string(), b"FROM alpine\n".to_vec());
        files.insert(
            "charts/app.yaml".to_string(),
            b"kind: Deployment\n".to_vec(),
        );
        Pack {
            metadata: PackMetadata {
                name: "alpine".to_string(),
                version: "0.2.0".to_string(),
                description: Some("Alpine pack".to_string()),
            },
            files,
        }
    }

    #[test]
    fn create_and_load() {
        let temp = TempDir::new().unwrap();
        let pack = test_pack();
        let out = temp.path().join(default_archive_name(&pack));
        create_archive(&pack, &out).unwrap();

        let loaded = load_archive(&out).unwrap();
        assert_eq!(loaded.metadata, pack.metadata);
        assert_eq!(loaded.files, pack.files);
    }

    #[test]
    fn metadata_only() {
        let temp = TempDir::new().unwrap();
        let pack = test_pack();
        let out = temp.path().join("alpine-0.2.0.tgz");
        create_archive(&pack, &out).unwrap();

        let md = load_metadata(&out).unwrap();
        assert_eq!(md.name, "alpine");
        assert_eq!(md.version, "0.2.0");
    }

    #[test]
    fn garbage_is_not_an_archive() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("junk.tgz");
        std::fs::write(&out, b"this is not a tarball").unwrap();

        assert!(load_metadata(&out).is_err());
    }

    #[test]
    fn default_name_includes_version() {
        assert_eq!(default_archive_name(&test_pack()), "alpine-0.2.0.tgz");
    }
}
