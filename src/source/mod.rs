//! File-backed byte source and input format detection

use std::fmt;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Local};
use nalscope_bitstream::ByteSource;
use parking_lot::Mutex;
use serde::Serialize;

/// Stream format guessed from the file name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InputFormat {
    Invalid,
    AnnexBHevc,
    AnnexBAvc,
    AnnexBVvc,
    /// A container file (MP4, Matroska, MPEG-TS, ...)
    Container,
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputFormat::Invalid => write!(f, "Unknown"),
            InputFormat::AnnexBHevc => write!(f, "Annex-B HEVC"),
            InputFormat::AnnexBAvc => write!(f, "Annex-B AVC"),
            InputFormat::AnnexBVvc => write!(f, "Annex-B VVC"),
            InputFormat::Container => write!(f, "Container"),
        }
    }
}

/// Guess the input format from the file extension
pub fn format_from_extension(path: &Path) -> InputFormat {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return InputFormat::Invalid;
    };
    match ext.to_lowercase().as_str() {
        "hevc" | "h265" | "265" => InputFormat::AnnexBHevc,
        "h264" | "264" | "avc" | "jsv" => InputFormat::AnnexBAvc,
        "h266" | "266" | "vvc" => InputFormat::AnnexBVvc,
        "mp4" | "mkv" | "mov" | "ts" | "webm" => InputFormat::Container,
        _ => InputFormat::Invalid,
    }
}

/// One line of file information
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InfoItem {
    pub name: String,
    pub text: String,
}

impl InfoItem {
    fn new(name: &str, text: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            text: text.into(),
        }
    }
}

/// A file opened for random access reads
///
/// The handle sits behind a mutex so one source can serve several readers.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    file: Mutex<File>,
    size: u64,
}

impl FileSource {
    pub fn open(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("Failed to open input file: {:?}", path))?;
        let size = file
            .metadata()
            .with_context(|| format!("Failed to read metadata: {:?}", path))?
            .len();

        tracing::debug!("Opened {:?} ({} bytes)", path, size);

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> InputFormat {
        format_from_extension(&self.path)
    }

    /// File Path, Time Modified and Nr Bytes
    pub fn file_info(&self) -> Vec<InfoItem> {
        let modified = std::fs::metadata(&self.path)
            .and_then(|meta| meta.modified())
            .map(|time| {
                DateTime::<Local>::from(time)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
            })
            .unwrap_or_else(|_| "unknown".to_string());

        vec![
            InfoItem::new("File Path", self.path.display().to_string()),
            InfoItem::new("Time Modified", modified),
            InfoItem::new("Nr Bytes", self.size.to_string()),
        ]
    }
}

impl ByteSource for FileSource {
    fn read_bytes(&self, start: u64, length: usize) -> nalscope_bitstream::Result<Bytes> {
        if start >= self.size {
            return Ok(Bytes::new());
        }
        let length = length.min((self.size - start) as usize);

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(start))?;

        let mut buffer = BytesMut::zeroed(length);
        let mut filled = 0;
        while filled < length {
            let n = file.read(&mut buffer[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buffer.truncate(filled);
        Ok(buffer.freeze())
    }

    fn size(&self) -> Option<u64> {
        Some(self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            format_from_extension(Path::new("clip.hevc")),
            InputFormat::AnnexBHevc
        );
        assert_eq!(
            format_from_extension(Path::new("CLIP.H265")),
            InputFormat::AnnexBHevc
        );
        assert_eq!(
            format_from_extension(Path::new("a.jsv")),
            InputFormat::AnnexBAvc
        );
        assert_eq!(
            format_from_extension(Path::new("a.266")),
            InputFormat::AnnexBVvc
        );
        assert_eq!(
            format_from_extension(Path::new("movie.mkv")),
            InputFormat::Container
        );
        assert_eq!(
            format_from_extension(Path::new("notes.txt")),
            InputFormat::Invalid
        );
        assert_eq!(format_from_extension(Path::new("noext")), InputFormat::Invalid);
    }

    #[test]
    fn test_read_bytes_clamps_at_end() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[1, 2, 3, 4, 5]).unwrap();
        file.flush().unwrap();

        let source = FileSource::open(file.path()).unwrap();
        assert_eq!(source.size(), Some(5));
        assert_eq!(source.read_bytes(1, 2).unwrap().as_ref(), &[2, 3]);
        assert_eq!(source.read_bytes(3, 100).unwrap().as_ref(), &[4, 5]);
        assert!(source.read_bytes(5, 1).unwrap().is_empty());
    }

    #[test]
    fn test_file_info_items() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 12]).unwrap();
        file.flush().unwrap();

        let source = FileSource::open(file.path()).unwrap();
        let info = source.file_info();
        let names: Vec<_> = info.iter().map(|item| item.name.as_str()).collect();
        assert_eq!(names, vec!["File Path", "Time Modified", "Nr Bytes"]);
        assert_eq!(info[2].text, "12");
    }

    #[test]
    fn test_open_missing_file_fails() {
        let err = FileSource::open(Path::new("/nonexistent/stream.hevc")).unwrap_err();
        assert!(err.to_string().contains("Failed to open input file"));
    }
}
