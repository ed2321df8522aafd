//! JSON Lines persistence for documents

use super::Document;
use crate::error::{RagError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Read one document per non-blank line
pub fn read_jsonl(path: &Path) -> Result<Vec<Document>> {
    let reader = BufReader::new(File::open(path)?);
    let mut documents = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let document = serde_json::from_str(&line)
            .map_err(|e| RagError::corrupt(path, format!("line {}: {e}", index + 1)))?;
        documents.push(document);
    }

    Ok(documents)
}

/// Overwrite `path` with one document per line
pub fn write_jsonl(path: &Path, documents: &[Document]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    for document in documents {
        serde_json::to_writer(&mut writer, document)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
