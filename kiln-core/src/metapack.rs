//! The on-disk artifact format.
//!
//! Every file the indexer produces is a MetaPack: a single compact JSON
//! header line carrying the artifact's metadata, a `\n`, and the payload,
//! optionally gzipped. The header records the MD5 checksum and size of the
//! payload *before* compression, so the serving side can answer conditional
//! requests and content-length questions without decompressing anything.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MetaPackError, MetaPackFormatError};

/// The format version this writer emits.
pub const VERSION: u64 = 1;

const GMT_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔══════════════════════════════════════════════════════════════════════════════╗
║                                   metadata                                   ║
║                                  ¯¯¯¯¯¯¯¯¯¯                                  ║
╚══════════════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

/// How the payload is stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// Verbatim bytes.
    Identity,
    /// Gzip-compressed bytes.
    Gzip,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Header {
    version: u64,
    checksum: String,
    last_modified: String,
    mime: String,
    bytes: u64,
    duration: u64,
    encoding: Encoding,
    #[serde(skip_serializing_if = "Option::is_none")]
    extension: Option<Value>,
}

/// The typed metadata of an artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct Meta {
    /// Format version; always positive.
    pub version: u64,
    /// Lowercase hex MD5 of the uncompressed payload.
    pub checksum: String,
    /// When the artifact was written.
    pub last_modified: DateTime<Utc>,
    /// The payload's MIME type.
    pub mime: String,
    /// Uncompressed payload size in bytes.
    pub bytes: u64,
    /// How long the artifact took to produce, in milliseconds.
    pub duration: u64,
    /// The on-disk payload encoding.
    pub encoding: Encoding,
    /// Free-form extra metadata, e.g. a schema's dialect.
    pub extension: Option<Value>,
}

/// An artifact with its metadata: the payload form depends on how far it has
/// been decoded.
#[derive(Debug)]
pub struct MetaPack<T> {
    /// The payload.
    pub data: T,
    /// The header metadata.
    pub meta: Meta,
}

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔══════════════════════════════════════════════════════════════════════════════╗
║                                   reading                                    ║
║                                  ¯¯¯¯¯¯¯¯¯                                   ║
╚══════════════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

fn format_error(path: &Path, reason: impl Into<String>) -> MetaPackError {
    MetaPackFormatError {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
    .into()
}

fn io_error(path: &Path, source: std::io::Error) -> MetaPackError {
    MetaPackError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Opens an artifact, validates the header, and returns the metadata plus a
/// reader positioned at the first payload byte.
///
/// # Errors
/// Returns [`MetaPackFormatError`] when the header is missing, truncated or
/// violates the format.
pub fn read_stream_raw(path: &Path) -> Result<MetaPack<BufReader<File>>, MetaPackError> {
    let file = File::open(path).map_err(|source| io_error(path, source))?;
    let mut reader = BufReader::new(file);
    let mut header_line = Vec::new();
    reader
        .read_until(b'\n', &mut header_line)
        .map_err(|source| io_error(path, source))?;
    if header_line.last() != Some(&b'\n') {
        return Err(format_error(path, "missing payload separator"));
    }
    header_line.pop();

    let header: Header = serde_json::from_slice(&header_line)
        .map_err(|error| format_error(path, format!("invalid header: {error}")))?;
    if header.version == 0 {
        return Err(format_error(path, "the version must be positive"));
    }
    if header.checksum.len() != 32
        || !header.checksum.bytes().all(|byte| byte.is_ascii_hexdigit())
        || header.checksum.chars().any(|character| character.is_ascii_uppercase())
    {
        return Err(format_error(path, "the checksum must be lowercase hex MD5"));
    }
    let last_modified = DateTime::parse_from_rfc2822(&header.last_modified)
        .map_err(|error| format_error(path, format!("invalid lastModified: {error}")))?
        .with_timezone(&Utc);

    Ok(MetaPack {
        data: reader,
        meta: Meta {
            version: header.version,
            checksum: header.checksum,
            last_modified,
            mime: header.mime,
            bytes: header.bytes,
            duration: header.duration,
            encoding: header.encoding,
            extension: header.extension,
        },
    })
}

/// Reads and decodes the payload bytes.
///
/// # Errors
/// Fails on format violations or I/O errors.
pub fn read_bytes_with_meta(path: &Path) -> Result<MetaPack<Vec<u8>>, MetaPackError> {
    let raw = read_stream_raw(path)?;
    let mut payload = Vec::with_capacity(raw.meta.bytes as usize);
    match raw.meta.encoding {
        Encoding::Identity => {
            let mut reader = raw.data;
            reader
                .read_to_end(&mut payload)
                .map_err(|source| io_error(path, source))?;
        }
        Encoding::Gzip => {
            let mut decoder = GzDecoder::new(raw.data);
            decoder
                .read_to_end(&mut payload)
                .map_err(|source| io_error(path, source))?;
        }
    }
    Ok(MetaPack {
        data: payload,
        meta: raw.meta,
    })
}

/// Reads and parses a JSON payload, returning the metadata as well.
///
/// # Errors
/// Fails on format violations, I/O errors, or an unparseable payload.
pub fn read_json_with_meta(path: &Path) -> Result<MetaPack<Value>, MetaPackError> {
    let decoded = read_bytes_with_meta(path)?;
    let data = serde_json::from_slice(&decoded.data)
        .map_err(|error| format_error(path, format!("invalid JSON payload: {error}")))?;
    Ok(MetaPack {
        data,
        meta: decoded.meta,
    })
}

/// Reads and parses a JSON payload.
///
/// # Errors
/// Fails on format violations, I/O errors, or an unparseable payload.
pub fn read_json(path: &Path) -> Result<Value, MetaPackError> {
    read_json_with_meta(path).map(|pack| pack.data)
}

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔══════════════════════════════════════════════════════════════════════════════╗
║                                   writing                                    ║
║                                  ¯¯¯¯¯¯¯¯¯                                   ║
╚══════════════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

/// Writes `payload` as a MetaPack file via write-to-temp-then-rename.
///
/// `bytes` and `checksum` in the header describe the uncompressed payload.
///
/// # Errors
/// Fails on I/O errors.
pub fn write_bytes(
    path: &Path,
    payload: &[u8],
    mime: &str,
    encoding: Encoding,
    extension: Option<Value>,
    duration: u64,
) -> Result<(), MetaPackError> {
    let header = Header {
        version: VERSION,
        checksum: format!("{:x}", md5::compute(payload)),
        last_modified: Utc::now().format(GMT_FORMAT).to_string(),
        mime: mime.to_owned(),
        bytes: payload.len() as u64,
        duration,
        encoding,
        extension,
    };
    let header_bytes = serde_json::to_vec(&header)
        .map_err(|error| format_error(path, format!("unencodable header: {error}")))?;

    let staging = path.with_extension(match path.extension() {
        Some(extension) => format!("{}.tmp", extension.to_string_lossy()),
        None => "tmp".to_owned(),
    });
    {
        let mut output = File::create(&staging).map_err(|source| io_error(&staging, source))?;
        output
            .write_all(&header_bytes)
            .and_then(|()| output.write_all(b"\n"))
            .map_err(|source| io_error(&staging, source))?;
        match encoding {
            Encoding::Identity => output
                .write_all(payload)
                .map_err(|source| io_error(&staging, source))?,
            Encoding::Gzip => {
                let mut encoder = GzEncoder::new(&mut output, Compression::default());
                encoder
                    .write_all(payload)
                    .map_err(|source| io_error(&staging, source))?;
                encoder
                    .finish()
                    .map_err(|source| io_error(&staging, source))?;
            }
        }
        output
            .sync_all()
            .map_err(|source| io_error(&staging, source))?;
    }
    fs::rename(&staging, path).map_err(|source| io_error(path, source))
}

/// Writes a compact JSON payload.
///
/// # Errors
/// Fails on I/O errors.
pub fn write_json(
    path: &Path,
    document: &Value,
    mime: &str,
    encoding: Encoding,
    extension: Option<Value>,
    duration: u64,
) -> Result<(), MetaPackError> {
    let payload = serde_json::to_vec(document)
        .map_err(|error| format_error(path, format!("unencodable payload: {error}")))?;
    write_bytes(path, &payload, mime, encoding, extension, duration)
}

/// Writes a pretty-printed JSON payload.
///
/// # Errors
/// Fails on I/O errors.
pub fn write_pretty_json(
    path: &Path,
    document: &Value,
    mime: &str,
    encoding: Encoding,
    extension: Option<Value>,
    duration: u64,
) -> Result<(), MetaPackError> {
    let mut payload = serde_json::to_vec_pretty(document)
        .map_err(|error| format_error(path, format!("unencodable payload: {error}")))?;
    payload.push(b'\n');
    write_bytes(path, &payload, mime, encoding, extension, duration)
}

/// Writes a JSONL payload, one entry per line.
///
/// # Errors
/// Fails on I/O errors.
pub fn write_jsonl(
    path: &Path,
    entries: &[Value],
    mime: &str,
    encoding: Encoding,
    extension: Option<Value>,
    duration: u64,
) -> Result<(), MetaPackError> {
    let mut payload = Vec::new();
    for entry in entries {
        serde_json::to_writer(&mut payload, entry)
            .map_err(|error| format_error(path, format!("unencodable payload: {error}")))?;
        payload.push(b'\n');
    }
    write_bytes(path, &payload, mime, encoding, extension, duration)
}

/// Writes a text payload with a trailing newline.
///
/// # Errors
/// Fails on I/O errors.
pub fn write_text(
    path: &Path,
    contents: &str,
    mime: &str,
    encoding: Encoding,
    extension: Option<Value>,
    duration: u64,
) -> Result<(), MetaPackError> {
    let mut payload = contents.as_bytes().to_vec();
    payload.push(b'\n');
    write_bytes(path, &payload, mime, encoding, extension, duration)
}
