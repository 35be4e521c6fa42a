//! Archive extraction.
//!
//! Site uploads are gzip-compressed tar archives. [`ArchiveExtractor`]
//! decodes one into a lazy, forward-only sequence of [`ArchiveEntry`]
//! values, one per regular file, with the logical path already normalized.
//! Directory markers produce nothing. The first decoding error ends the
//! sequence; callers must discard whatever they consumed before it.

use crate::error::{Error, Result};
use crate::site_path::SitePath;
use flate2::read::GzDecoder;
use std::fmt;
use std::io::Read;

/// Upper bound on the buffer preallocated from an entry's declared size.
const MAX_PREALLOC: usize = 16 * 1024 * 1024;

/// A regular file read out of an archive.
#[derive(Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Normalized logical path.
    pub path: SitePath,
    /// Entry name as it appeared in the archive.
    pub raw_name: String,
    /// Full file content.
    pub content: Vec<u8>,
}

impl fmt::Debug for ArchiveEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveEntry")
            .field("path", &self.path)
            .field("raw_name", &self.raw_name)
            .field("len", &self.content.len())
            .finish()
    }
}

/// Decoder for gzip-compressed tar archives.
pub struct ArchiveExtractor<R: Read> {
    archive: tar::Archive<GzDecoder<R>>,
}

impl<R: Read> ArchiveExtractor<R> {
    /// Open a compressed archive.
    ///
    /// Fails with [`Error::Format`] if the stream does not start with a
    /// valid gzip header.
    pub fn new(reader: R) -> Result<Self> {
        let decoder = GzDecoder::new(reader);
        if decoder.header().is_none() {
            return Err(Error::Format(
                "not a gzip stream: missing or malformed header".to_string(),
            ));
        }
        Ok(Self {
            archive: tar::Archive::new(decoder),
        })
    }

    /// Iterate the archive's file entries in archive order.
    pub fn entries(&mut self) -> Result<ArchiveEntries<'_, R>> {
        let entries = self
            .archive
            .entries()
            .map_err(|e| Error::Format(format!("cannot read archive: {e}")))?;
        Ok(ArchiveEntries {
            entries,
            finished: false,
        })
    }
}

/// Lazy iterator over the regular files of an archive.
pub struct ArchiveEntries<'a, R: Read> {
    entries: tar::Entries<'a, GzDecoder<R>>,
    finished: bool,
}

impl<'a, R: Read> ArchiveEntries<'a, R> {
    fn read_entry(mut entry: tar::Entry<'a, GzDecoder<R>>) -> Result<Option<ArchiveEntry>> {
        let raw_name = String::from_utf8(entry.path_bytes().into_owned())
            .map_err(|_| Error::InvalidPath("archive entry name is not UTF-8".to_string()))?;

        let entry_type = entry.header().entry_type();
        if entry_type.is_dir() {
            tracing::trace!(entry = %raw_name, "Skipping directory entry");
            return Ok(None);
        }
        if !entry_type.is_file() {
            tracing::debug!(
                entry = %raw_name,
                entry_type = ?entry_type,
                "Skipping non-regular archive entry"
            );
            return Ok(None);
        }

        let path = SitePath::from_entry_name(&raw_name)?;

        let declared = entry.size();
        let capacity = usize::try_from(declared).unwrap_or(0).min(MAX_PREALLOC);
        let mut content = Vec::with_capacity(capacity);
        entry
            .read_to_end(&mut content)
            .map_err(|e| Error::Format(format!("cannot read entry {raw_name}: {e}")))?;

        if content.len() as u64 != declared {
            return Err(Error::Format(format!(
                "truncated entry {raw_name}: expected {declared} bytes, got {}",
                content.len()
            )));
        }

        Ok(Some(ArchiveEntry {
            path,
            raw_name,
            content,
        }))
    }
}

impl<R: Read> Iterator for ArchiveEntries<'_, R> {
    type Item = Result<ArchiveEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            let result = match self.entries.next() {
                None => {
                    self.finished = true;
                    return None;
                }
                Some(Err(e)) => Err(Error::Format(format!("malformed archive: {e}"))),
                Some(Ok(entry)) => Self::read_entry(entry),
            };
            match result {
                Ok(Some(entry)) => return Some(Ok(entry)),
                Ok(None) => continue,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
