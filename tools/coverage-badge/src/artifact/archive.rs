//! Zip packing for artifact uploads and downloads.

use std::fs;
use std::io::{Cursor, Write};
use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{ActionError, Result};

#[derive(Debug, Clone)]
pub struct PackedArchive {
  pub bytes: Vec<u8>,
  /// Entry names in archive order.
  pub entries: Vec<String>,
}

/// Zip `files`, naming each entry by its path relative to `root`.
pub fn pack(files: &[PathBuf], root: &Path) -> Result<PackedArchive> {
  let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
  let mut entries = Vec::with_capacity(files.len());

  for file in files {
    let data = fs::read(file).map_err(|e| ActionError::io(file, e))?;
    let name = entry_name(file, root);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    writer.start_file(name.as_str(), options)?;
    writer.write_all(&data).map_err(|e| ActionError::io(file, e))?;
    entries.push(name);
  }

  let bytes = writer.finish()?.into_inner();
  Ok(PackedArchive { bytes, entries })
}

/// Unpack into `dest`, skipping directories and entries that would escape it.
pub fn unpack(bytes: &[u8], dest: &Path) -> Result<Vec<PathBuf>> {
  fs::create_dir_all(dest).map_err(|e| ActionError::io(dest, e))?;
  let mut archive = ZipArchive::new(Cursor::new(bytes))?;
  let mut extracted = Vec::new();

  for i in 0..archive.len() {
    let mut entry = archive.by_index(i)?;
    if entry.is_dir() {
      continue;
    }
    let Some(relative) = entry.enclosed_name().map(|p| p.to_path_buf()) else {
      continue;
    };
    let out = dest.join(relative);
    if let Some(parent) = out.parent() {
      fs::create_dir_all(parent).map_err(|e| ActionError::io(parent, e))?;
    }
    let mut file = fs::File::create(&out).map_err(|e| ActionError::io(&out, e))?;
    std::io::copy(&mut entry, &mut file).map_err(|e| ActionError::io(&out, e))?;
    extracted.push(out);
  }

  Ok(extracted)
}

/// `sha256:<hex>` as the artifact service expects it.
pub fn sha256_digest(bytes: &[u8]) -> String {
  format!("sha256:{:x}", Sha256::digest(bytes))
}

fn entry_name(file: &Path, root: &Path) -> String {
  let relative = file.strip_prefix(root).unwrap_or(file);
  let parts: Vec<String> = relative
    .components()
    .filter_map(|c| match c {
      Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
      _ => None,
    })
    .collect();
  parts.join("/")
}
