//! Capture file input.
//!
//! Two on-disk formats are accepted:
//! - Binary: the byte stream exactly as received (flags and stuffing intact)
//! - Hex dump: one or more frames per line as hex text, `#` comments allowed
//!
//! `-` reads from stdin.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use gdl90_core::types::hex_decode;

/// Bytes handed to the decoder per push when replaying a capture.
pub const CHUNK_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFormat {
    Binary,
    HexDump,
}

/// A capture on disk (or stdin), loaded whole.
pub struct CaptureReader {
    path: PathBuf,
}

impl CaptureReader {
    pub fn new(path: &Path) -> Self {
        CaptureReader {
            path: path.to_path_buf(),
        }
    }

    pub fn is_stdin(&self) -> bool {
        self.path.as_os_str() == "-"
    }

    /// Read the capture and return the raw byte stream plus the format it
    /// was found in.
    pub fn read_stream(&self) -> io::Result<(Vec<u8>, CaptureFormat)> {
        let content = if self.is_stdin() {
            let mut buf = Vec::new();
            io::stdin().lock().read_to_end(&mut buf)?;
            buf
        } else {
            fs::read(&self.path)?
        };

        match detect_format(&content) {
            CaptureFormat::HexDump => {
                let text = String::from_utf8_lossy(&content);
                let bytes = text.lines().filter_map(clean_hex_line).flatten().collect();
                Ok((bytes, CaptureFormat::HexDump))
            }
            CaptureFormat::Binary => Ok((content, CaptureFormat::Binary)),
        }
    }
}

/// Hex dump if the content is text and every non-comment line is hex.
pub fn detect_format(content: &[u8]) -> CaptureFormat {
    let Ok(text) = std::str::from_utf8(content) else {
        return CaptureFormat::Binary;
    };

    let mut hex_lines = 0usize;
    for line in text.lines() {
        let stripped = strip_comment(line).trim();
        if stripped.is_empty() {
            continue;
        }
        if clean_hex_line(line).is_none() {
            return CaptureFormat::Binary;
        }
        hex_lines += 1;
    }

    if hex_lines > 0 {
        CaptureFormat::HexDump
    } else {
        CaptureFormat::Binary
    }
}

/// Bytes of one hex dump line. Whitespace between digits is ignored.
pub fn clean_hex_line(line: &str) -> Option<Vec<u8>> {
    let line = strip_comment(line).trim();
    if line.is_empty() {
        return None;
    }
    hex_decode(line).filter(|bytes| !bytes.is_empty())
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(i) => &line[..i],
        None => line,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_hex_line_plain() {
        assert_eq!(clean_hex_line("7E0081417E"), Some(vec![0x7E, 0x00, 0x81, 0x41, 0x7E]));
    }

    #[test]
    fn test_clean_hex_line_spaced_lowercase() {
        assert_eq!(clean_hex_line("  7e 00 81  "), Some(vec![0x7E, 0x00, 0x81]));
    }

    #[test]
    fn test_clean_hex_line_comment() {
        assert_eq!(clean_hex_line("# heartbeat"), None);
        assert_eq!(clean_hex_line("7E00 # trailing"), Some(vec![0x7E, 0x00]));
    }

    #[test]
    fn test_clean_hex_line_invalid() {
        assert_eq!(clean_hex_line("7E0G"), None);
        assert_eq!(clean_hex_line("7E0"), None);
        assert_eq!(clean_hex_line(""), None);
    }

    #[test]
    fn test_detect_hex_dump() {
        let text = b"# capture\n7E 0081 41DB D008 02B3 8B7E\n\n7E00817E\n";
        assert_eq!(detect_format(text), CaptureFormat::HexDump);
    }

    #[test]
    fn test_detect_binary() {
        assert_eq!(
            detect_format(&[0x7E, 0x00, 0x81, 0x41, 0xDB, 0xD0, 0x08, 0x02, 0xB3, 0x8B, 0x7E]),
            CaptureFormat::Binary
        );
        assert_eq!(detect_format(b"not hex at all\n"), CaptureFormat::Binary);
        assert_eq!(detect_format(b""), CaptureFormat::Binary);
    }

    #[test]
    fn test_read_stream_hex_dump() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.txt");
        fs::write(&path, "7E 00 81\n41 7E # split across lines\n").unwrap();

        let (bytes, format) = CaptureReader::new(&path).read_stream().unwrap();
        assert_eq!(format, CaptureFormat::HexDump);
        assert_eq!(bytes, vec![0x7E, 0x00, 0x81, 0x41, 0x7E]);
    }

    #[test]
    fn test_read_stream_binary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.bin");
        fs::write(&path, [0x7Eu8, 0xFF, 0x7E]).unwrap();

        let (bytes, format) = CaptureReader::new(&path).read_stream().unwrap();
        assert_eq!(format, CaptureFormat::Binary);
        assert_eq!(bytes, vec![0x7E, 0xFF, 0x7E]);
    }

    #[test]
    fn test_read_missing_file() {
        let reader = CaptureReader::new(Path::new("/nonexistent/capture.bin"));
        assert!(reader.read_stream().is_err());
    }
}
