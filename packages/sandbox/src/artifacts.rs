// ABOUTME: Build artifact collection from a streamed tar archive
// ABOUTME: Flattens the sandbox output directory into an extension-filtered filename map

use crate::error::{Result, RuntimeError};
use crate::runtime::ArchiveStream;
use futures::StreamExt;
use std::collections::BTreeMap;
use std::io::Read;
use tar::Archive;
use tracing::{debug, warn};

/// Extensions kept from the output directory. Matched case-sensitively.
pub const OUTPUT_EXTENSIONS: [&str; 4] = [".js", ".css", ".html", ".map"];

/// Base filename → file content. Directory structure is not preserved.
pub type ArtifactSet = BTreeMap<String, String>;

pub fn is_output_file(name: &str) -> bool {
    OUTPUT_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// Drain an archive stream and extract the matching files.
///
/// Any read failure yields an empty set; the build result has already been
/// decided by the time artifacts are collected.
pub async fn collect(mut stream: ArchiveStream<'_>) -> ArtifactSet {
    let mut data = Vec::new();
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => data.extend_from_slice(&bytes),
            Err(e) => {
                warn!("Failed to read output archive stream: {}", e);
                return ArtifactSet::new();
            }
        }
    }

    match extract(&data) {
        Ok(files) => {
            debug!("Collected {} artifact(s) from {} archive bytes", files.len(), data.len());
            files
        }
        Err(e) => {
            warn!("Failed to extract output archive: {}", e);
            ArtifactSet::new()
        }
    }
}

/// Read a complete tar archive into an [`ArtifactSet`].
pub fn extract(data: &[u8]) -> Result<ArtifactSet> {
    let mut archive = Archive::new(data);
    let mut files = ArtifactSet::new();

    let entries = archive
        .entries()
        .map_err(|e| RuntimeError::Archive(e.to_string()))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| RuntimeError::Archive(e.to_string()))?;

        if !entry.header().entry_type().is_file() {
            continue;
        }

        let name = {
            let path = entry
                .path()
                .map_err(|e| RuntimeError::Archive(e.to_string()))?;
            match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            }
        };

        if !is_output_file(&name) {
            continue;
        }

        let mut body = Vec::new();
        entry
            .read_to_end(&mut body)
            .map_err(|e| RuntimeError::Archive(e.to_string()))?;

        // Later duplicates of the same base name win
        files.insert(name, String::from_utf8_lossy(&body).into_owned());
    }

    Ok(files)
}
