//! Two-step probe for run-log bodies: ZIP container first, plain text on a recognised format miss.

use std::io::{Cursor, Read};

use thiserror::Error;
use zip::result::ZipError;
use zip::ZipArchive;

const ZIP_LOCAL_HEADER_SIGNATURE: &[u8; 4] = b"PK\x03\x04";
const ZIP_EMPTY_ARCHIVE_SIGNATURE: &[u8; 4] = b"PK\x05\x06";
/// Size of the end-of-central-directory record; nothing shorter is a ZIP.
const ZIP_MIN_ARCHIVE_LEN: usize = 22;

#[derive(Debug, Error)]
pub enum LogArchiveError {
    #[error("failed to open log archive: {0}")]
    Open(#[source] ZipError),
    #[error("failed to open log archive member #{index}: {source}")]
    Member {
        index: usize,
        #[source]
        source: ZipError,
    },
    #[error("failed to read log archive member '{name}': {source}")]
    MemberRead {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// One named member of the archive with its decoded lines, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogArchiveEntry {
    pub name: String,
    pub lines: Vec<String>,
}

impl LogArchiveEntry {
    pub fn prefixed_lines(&self) -> impl Iterator<Item = String> + '_ {
        self.lines
            .iter()
            .map(move |line| format!("[{}] {line}", self.name))
    }
}

pub struct LogArchive<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
}

impl LogArchive<'_> {
    pub fn member_count(&self) -> usize {
        self.archive.len()
    }

    /// Decodes one member; directories yield `None`.
    pub fn read_member(&mut self, index: usize) -> Result<Option<LogArchiveEntry>, LogArchiveError> {
        let mut member = self
            .archive
            .by_index(index)
            .map_err(|source| LogArchiveError::Member { index, source })?;
        if member.is_dir() {
            return Ok(None);
        }
        let name = member.name().to_string();
        let mut raw = Vec::new();
        member
            .read_to_end(&mut raw)
            .map_err(|source| LogArchiveError::MemberRead {
                name: name.clone(),
                source,
            })?;
        let lines = split_raw_lines(&raw).map(decode_line).collect();
        Ok(Some(LogArchiveEntry { name, lines }))
    }
}

pub enum LogBody<'a> {
    Archive(LogArchive<'a>),
    PlainText(&'a [u8]),
}

/// Classifies a log body.
///
/// Only a missing signature or `ZipError::InvalidArchive` while opening the
/// container counts as "not an archive"; other failures are returned.
pub fn probe_log_body(body: &[u8]) -> Result<LogBody<'_>, LogArchiveError> {
    if !has_zip_signature(body) {
        return Ok(LogBody::PlainText(body));
    }
    match ZipArchive::new(Cursor::new(body)) {
        Ok(archive) => Ok(LogBody::Archive(LogArchive { archive })),
        Err(ZipError::InvalidArchive(_)) => Ok(LogBody::PlainText(body)),
        Err(error) => Err(LogArchiveError::Open(error)),
    }
}

fn has_zip_signature(body: &[u8]) -> bool {
    body.len() >= ZIP_MIN_ARCHIVE_LEN
        && (body.starts_with(ZIP_LOCAL_HEADER_SIGNATURE)
            || body.starts_with(ZIP_EMPTY_ARCHIVE_SIGNATURE))
}

/// Splits on `\n`; a trailing newline does not produce an empty final line.
pub fn split_raw_lines(bytes: &[u8]) -> impl Iterator<Item = &[u8]> {
    let trimmed = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    let mut pieces = trimmed.split(|byte| *byte == b'\n');
    if bytes.is_empty() {
        pieces.next();
    }
    pieces
}

/// Lossy UTF-8 decode with trailing whitespace stripped.
pub fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).trim_end().to_string()
}

/// Flattens a log body into one text blob.
///
/// Archives become `[member] line` rows joined by `\n`, in member order.
/// Plain bodies are returned unmodified apart from lossy decoding.
pub fn render_log_text(body: &[u8]) -> Result<String, LogArchiveError> {
    match probe_log_body(body)? {
        LogBody::PlainText(text) => Ok(String::from_utf8_lossy(text).into_owned()),
        LogBody::Archive(mut archive) => {
            let mut rows = Vec::new();
            for index in 0..archive.member_count() {
                if let Some(entry) = archive.read_member(index)? {
                    rows.extend(entry.prefixed_lines());
                }
            }
            Ok(rows.join("\n"))
        }
    }
}
