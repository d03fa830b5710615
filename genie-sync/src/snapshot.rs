//! Canonical snapshot writer.
//!
//! ## Canonical form
//!
//! - object keys sorted at every depth
//! - two-space indentation, `,` + newline between items, `": "` after keys
//! - every character outside printable ASCII written as `\uXXXX`
//!   (UTF-16 surrogate pairs above the BMP)
//! - no trailing newline
//!
//! Re-running on an unchanged remote document therefore yields a
//! byte-identical file, and version control reports nothing to commit.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter};
use serde_json::{Map, Value};

use genie_core::SpaceId;

use crate::error::{io_err, SyncError};

/// Outcome of writing one snapshot file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotWrite {
    /// File was written (content changed or did not previously exist).
    Written { path: PathBuf },
    /// On-disk bytes already match; the file was left alone.
    Unchanged { path: PathBuf },
}

impl SnapshotWrite {
    pub fn path(&self) -> &Path {
        match self {
            SnapshotWrite::Written { path } | SnapshotWrite::Unchanged { path } => path,
        }
    }
}

/// `<root>/<configs_dir>/space_<id>.json`
pub fn snapshot_path(root: &Path, configs_dir: &Path, space_id: &SpaceId) -> PathBuf {
    root.join(configs_dir).join(space_id.snapshot_file_name())
}

/// Serialize `value` in canonical form.
pub fn canonical_json(value: &Value) -> Result<String, SyncError> {
    let sorted = sort_keys(value);
    let mut out = Vec::with_capacity(256);
    let mut ser = serde_json::Serializer::with_formatter(&mut out, AsciiPrettyFormatter::new());
    sorted.serialize(&mut ser)?;
    // The formatter only ever emits ASCII.
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Write the canonical form of `value` to `path`.
///
/// Parent directories are created as needed. The file is replaced through a
/// sibling `.tmp` + rename; an identical file is left untouched.
pub fn write_snapshot(path: &Path, value: &Value) -> Result<SnapshotWrite, SyncError> {
    let content = canonical_json(value)?;

    match std::fs::read(path) {
        Ok(existing) if existing == content.as_bytes() => {
            tracing::debug!("snapshot unchanged: {}", path.display());
            return Ok(SnapshotWrite::Unchanged {
                path: path.to_path_buf(),
            });
        }
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(io_err(path, e)),
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }

    let tmp = PathBuf::from(format!("{}.tmp", path.display()));
    std::fs::write(&tmp, &content).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }

    tracing::info!("configuration saved to {}", path.display());
    Ok(SnapshotWrite::Written {
        path: path.to_path_buf(),
    })
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut sorted = Map::new();
            for (key, inner) in entries {
                sorted.insert(key.clone(), sort_keys(inner));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

// ---------------------------------------------------------------------------
// Formatter
// ---------------------------------------------------------------------------

/// Two-space pretty printer that escapes everything outside printable ASCII.
struct AsciiPrettyFormatter<'a> {
    inner: PrettyFormatter<'a>,
}

impl<'a> AsciiPrettyFormatter<'a> {
    fn new() -> Self {
        Self {
            inner: PrettyFormatter::with_indent(b"  "),
        }
    }
}

impl Formatter for AsciiPrettyFormatter<'_> {
    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.inner.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.inner.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object_value(writer)
    }

    fn write_string_fragment<W: ?Sized + io::Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
        let mut start = 0;
        for (i, ch) in fragment.char_indices() {
            if (' '..='~').contains(&ch) {
                continue;
            }
            writer.write_all(&fragment.as_bytes()[start..i])?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
            start = i + ch.len_utf8();
        }
        writer.write_all(&fragment.as_bytes()[start..])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
