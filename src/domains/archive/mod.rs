//! Zip bundling for optimized results.

use std::io::{Cursor, Write};
use zip::{write::FileOptions, ZipWriter};

use crate::errors::{DomainError, DomainResult};

/// Bundle result buffers into a single in-memory zip archive, one entry per
/// buffer, named `optimized-image{i}.{ext}` in input order.
pub fn bundle_results(results: &[(Vec<u8>, &str)]) -> DomainResult<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (i, (bytes, extension)) in results.iter().enumerate() {
        let name = format!("optimized-image{}.{}", i, extension);
        writer
            .start_file(name, options)
            .map_err(|e| DomainError::Archive(format!("failed to start zip entry: {}", e)))?;
        writer
            .write_all(bytes)
            .map_err(|e| DomainError::Archive(format!("failed to write zip entry: {}", e)))?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| DomainError::Archive(format!("failed to finish zip: {}", e)))?;
    Ok(cursor.into_inner())
}
