//! Filesystem document loader.
//!
//! Reads every `*.txt` file directly inside a directory (no recursion) into
//! a [`Document`] whose source is the file's basename. Files are returned in
//! basename order so ingestion is deterministic.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use walkdir::WalkDir;

use crate::models::Document;

const DOCUMENT_GLOB: &str = "*.txt";

pub fn load_documents(dir: &Path) -> Result<Vec<Document>> {
    if !dir.is_dir() {
        bail!("Document directory does not exist: {}", dir.display());
    }

    let include = build_globset(&[DOCUMENT_GLOB])?;
    let mut docs = Vec::new();

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_string();
        if !include.is_match(&name) {
            continue;
        }

        let content = std::fs::read_to_string(entry.path())
            .with_context(|| format!("Failed to read document: {}", entry.path().display()))?;

        docs.push(Document {
            content,
            source: name,
        });
    }

    Ok(docs)
}

fn build_globset(patterns: &[&str]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
