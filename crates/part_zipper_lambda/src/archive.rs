use std::io::{self, Cursor, Read};

use thiserror::Error;
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to create archive entry '{entry}': {source}")]
    CreateEntry { entry: String, source: ZipError },
    #[error("failed to write archive entry '{entry}': {source}")]
    WriteEntry { entry: String, source: io::Error },
    #[error("failed to finalize archive: {0}")]
    Finalize(ZipError),
}

/// Builds an in-memory zip holding exactly one deflated entry whose content
/// is streamed from `content` until it is exhausted.
pub fn build_single_entry_archive(
    entry_name: &str,
    content: &mut dyn Read,
) -> Result<Vec<u8>, ArchiveError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    writer
        .start_file(entry_name, options)
        .map_err(|source| ArchiveError::CreateEntry {
            entry: entry_name.to_string(),
            source,
        })?;
    io::copy(content, &mut writer).map_err(|source| ArchiveError::WriteEntry {
        entry: entry_name.to_string(),
        source,
    })?;

    let cursor = writer.finish().map_err(ArchiveError::Finalize)?;
    Ok(cursor.into_inner())
}
