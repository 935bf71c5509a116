//! Binary capture format: record and replay point streams.
//!
//! A capture file is a fixed-size header followed by length-prefixed
//! postcard records, one per [`LidarPoint`]:
//!
//! ```text
//! [4B magic "DCAP"][postcard CaptureHeader, padded to 40B]
//! [u32 LE record len][postcard LidarPoint] ...
//! ```
//!
//! The loader rejects unknown magic bytes and unknown version words.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::scanner::{PointCallback, PointSource, SourceControl};
use crate::types::{LidarPoint, ScanCode};

/// Magic bytes at the start of a capture file.
pub const CAPTURE_MAGIC: [u8; 4] = *b"DCAP";

/// Current capture format version.
pub const CAPTURE_VERSION: u16 = 1;

/// Serialized header size in bytes (after the magic).
pub const HEADER_SIZE: usize = 40;

/// Capture file header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureHeader {
    /// File format version
    pub version: u16,
    /// Total number of point records
    pub point_count: u64,
    /// Timestamp of the first point (nanoseconds)
    pub start_ns: u64,
    /// Timestamp of the last point (nanoseconds)
    pub end_ns: u64,
}

impl CaptureHeader {
    fn new() -> Self {
        Self {
            version: CAPTURE_VERSION,
            point_count: 0,
            start_ns: 0,
            end_ns: 0,
        }
    }

    /// Recording span in nanoseconds.
    pub fn duration_ns(&self) -> u64 {
        self.end_ns.saturating_sub(self.start_ns)
    }
}

fn encode_header(header: &CaptureHeader) -> Result<[u8; HEADER_SIZE]> {
    let bytes = postcard::to_stdvec(header)
        .map_err(|e| Error::Capture(format!("header encode: {}", e)))?;
    if bytes.len() > HEADER_SIZE {
        return Err(Error::Capture("header exceeds fixed size".to_string()));
    }
    let mut buffer = [0u8; HEADER_SIZE];
    buffer[..bytes.len()].copy_from_slice(&bytes);
    Ok(buffer)
}

/// Streaming writer for capture files.
pub struct CaptureWriter {
    writer: BufWriter<File>,
    header: CaptureHeader,
}

impl CaptureWriter {
    /// Create a capture file, truncating any existing one.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&CAPTURE_MAGIC)?;
        writer.write_all(&[0u8; HEADER_SIZE])?;
        Ok(Self {
            writer,
            header: CaptureHeader::new(),
        })
    }

    /// Append one point record.
    pub fn record(&mut self, point: &LidarPoint) -> Result<()> {
        let bytes = postcard::to_stdvec(point)
            .map_err(|e| Error::Capture(format!("record encode: {}", e)))?;
        self.writer.write_all(&(bytes.len() as u32).to_le_bytes())?;
        self.writer.write_all(&bytes)?;

        let ns = point.timestamp.as_nanos();
        if self.header.point_count == 0 {
            self.header.start_ns = ns;
        }
        self.header.end_ns = ns;
        self.header.point_count += 1;
        Ok(())
    }

    /// Finalize the header and flush. The writer is consumed.
    pub fn finish(mut self) -> Result<CaptureHeader> {
        let encoded = encode_header(&self.header)?;
        self.writer.seek(SeekFrom::Start(CAPTURE_MAGIC.len() as u64))?;
        self.writer.write_all(&encoded)?;
        self.writer.flush()?;
        Ok(self.header)
    }
}

/// Replay driver for capture files.
pub struct CaptureScanner {
    path: PathBuf,
    reader: Option<BufReader<File>>,
    header: Option<CaptureHeader>,
    callback: Option<PointCallback>,
    control: SourceControl,
}

impl CaptureScanner {
    /// Create a scanner over the given capture file. The file is opened and
    /// validated by [`init`](PointSource::init).
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            reader: None,
            header: None,
            callback: None,
            control: SourceControl::new(),
        }
    }

    /// Header of the opened capture, if `init` has run.
    pub fn header(&self) -> Option<&CaptureHeader> {
        self.header.as_ref()
    }

    fn open(&mut self) -> Result<()> {
        let file = File::open(&self.path)
            .map_err(|e| Error::Init(format!("{}: {}", self.path.display(), e)))?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != CAPTURE_MAGIC {
            return Err(Error::Capture("bad magic bytes".to_string()));
        }

        let mut raw = [0u8; HEADER_SIZE];
        reader.read_exact(&mut raw)?;
        let header: CaptureHeader = postcard::from_bytes(&raw)
            .map_err(|e| Error::Capture(format!("header decode: {}", e)))?;
        if header.version != CAPTURE_VERSION {
            return Err(Error::Capture(format!(
                "unsupported capture version {}",
                header.version
            )));
        }

        self.reader = Some(reader);
        self.header = Some(header);
        Ok(())
    }

    fn read_record(&mut self) -> Result<Option<LidarPoint>> {
        let reader = match self.reader.as_mut() {
            Some(reader) => reader,
            None => return Ok(None),
        };

        let mut len_bytes = [0u8; 4];
        match reader.read_exact(&mut len_bytes) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                self.reader = None;
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        }

        let len = u32::from_le_bytes(len_bytes) as usize;
        let mut bytes = vec![0u8; len];
        reader
            .read_exact(&mut bytes)
            .map_err(|_| Error::Capture("truncated record".to_string()))?;
        let point = postcard::from_bytes(&bytes)
            .map_err(|e| Error::Capture(format!("record decode: {}", e)))?;
        Ok(Some(point))
    }
}

impl PointSource for CaptureScanner {
    fn init(&mut self) -> Result<()> {
        log::debug!("Initializing capture scanner: {}", self.path.display());
        self.open()
    }

    fn set_callback(&mut self, callback: PointCallback) {
        self.callback = Some(callback);
    }

    fn start(&mut self) -> Result<ScanCode> {
        if self.callback.is_none() {
            return Err(Error::NoCallback);
        }
        if self.control.is_stopped() {
            return Ok(ScanCode::Ok);
        }
        if self.reader.is_none() {
            // Previous pass hit EOF; rewind for a fresh pass.
            self.open()?;
        }

        loop {
            let point = match self.read_record()? {
                Some(point) => point,
                None => return Ok(ScanCode::Eof),
            };
            if let Some(callback) = self.callback.as_mut() {
                callback(point);
            }
            if self.control.take_interrupt() {
                return Ok(ScanCode::Ok);
            }
        }
    }

    fn control(&self) -> SourceControl {
        self.control.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timestamp;
    use std::sync::{Arc, Mutex};

    fn sample_points(n: u64) -> Vec<LidarPoint> {
        (0..n)
            .map(|i| {
                LidarPoint::new(
                    Timestamp::from_nanos(i * 1_000),
                    0.8,
                    i as f64,
                    -(i as f64),
                    10.0,
                )
            })
            .collect()
    }

    #[test]
    fn test_record_replay_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stream.dcap");

        let points = sample_points(5);
        let mut writer = CaptureWriter::create(&path).unwrap();
        for p in &points {
            writer.record(p).unwrap();
        }
        let header = writer.finish().unwrap();
        assert_eq!(header.point_count, 5);
        assert_eq!(header.duration_ns(), 4_000);

        let mut scanner = CaptureScanner::new(&path);
        scanner.init().unwrap();
        let sink = Arc::new(Mutex::new(Vec::new()));
        let out = Arc::clone(&sink);
        scanner.set_callback(Box::new(move |p| out.lock().unwrap().push(p)));
        let code = scanner.start().unwrap();

        assert_eq!(code, ScanCode::Eof);
        assert_eq!(*sink.lock().unwrap(), points);
    }

    #[test]
    fn test_bad_magic_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bogus.dcap");
        std::fs::write(&path, b"NOPExxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx").unwrap();

        let mut scanner = CaptureScanner::new(&path);
        assert!(matches!(scanner.init(), Err(Error::Capture(_))));
    }

    #[test]
    fn test_unknown_version_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("future.dcap");

        let mut writer = CaptureWriter::create(&path).unwrap();
        writer.record(&sample_points(1)[0]).unwrap();
        writer.header.version = 99;
        writer.finish().unwrap();

        let mut scanner = CaptureScanner::new(&path);
        assert!(matches!(scanner.init(), Err(Error::Capture(_))));
    }
}
