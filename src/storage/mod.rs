//! JSON and JSONL persistence helpers shared by the per-student stores.

mod learning_store;

pub use learning_store::LearningStore;

use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::warn;

/// Loads a JSON document if it exists.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let data =
        fs::read(path).with_context(|| format!("Failed to read payload {}", path.display()))?;
    let payload = serde_json::from_slice(&data)
        .with_context(|| format!("Failed to parse payload {}", path.display()))?;
    Ok(Some(payload))
}

/// Writes a JSON document by writing a sibling temp file and renaming it over
/// the target, so readers never observe a half-written document.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }
    let data = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    {
        let mut file = fs::File::create(&tmp)
            .with_context(|| format!("Failed to open {}", tmp.display()))?;
        file.write_all(&data)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)
        .with_context(|| format!("Failed to replace payload {}", path.display()))?;
    Ok(())
}

/// Appends one JSON line and flushes it to disk before returning.
pub fn append_jsonl<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log {}", path.display()))?;
    if ends_mid_line(&mut file)? {
        // Close off a torn tail so the new record gets a line of its own.
        warn!(path = %path.display(), "log ends with a partial line; terminating it");
        file.write_all(b"\n")?;
    }
    file.write_all(serde_json::to_string(value)?.as_bytes())?;
    file.write_all(b"\n")?;
    file.sync_all()
        .with_context(|| format!("Failed to flush log {}", path.display()))?;
    Ok(())
}

fn ends_mid_line(file: &mut fs::File) -> Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

/// Reads every parseable line of a JSONL file. A line that fails to parse
/// (e.g. torn by a crash mid-append) is skipped with a warning.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read log {}", path.display()))?;
    let mut items = Vec::new();
    for (idx, line) in data.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(item) => items.push(item),
            Err(err) => warn!(path = %path.display(), line = idx + 1, %err, "skipping unreadable log line"),
        }
    }
    Ok(items)
}

/// Lowercase hex SHA-256 of the provided bytes.
pub fn compute_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("{:x}", digest)
}
