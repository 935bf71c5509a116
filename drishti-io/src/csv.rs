//! CSV replay scanner.
//!
//! Replays point streams exported as comma-separated text, one sample per
//! row: `timestamp_ns,x_mm,y_mm,z_mm,reflectivity`. A header row is skipped
//! when the first field does not parse as an integer.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::scanner::{PointCallback, PointSource, SourceControl};
use crate::types::{LidarPoint, ScanCode, Timestamp};

/// File replay driver for CSV point exports.
pub struct CsvScanner {
    path: PathBuf,
    reader: Option<BufReader<File>>,
    callback: Option<PointCallback>,
    control: SourceControl,
    line: usize,
}

impl CsvScanner {
    /// Create a scanner over the given CSV file. The file is opened by
    /// [`init`](PointSource::init).
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            reader: None,
            callback: None,
            control: SourceControl::new(),
            line: 0,
        }
    }

    fn open(&mut self) -> Result<()> {
        let file = File::open(&self.path)
            .map_err(|e| Error::Init(format!("{}: {}", self.path.display(), e)))?;
        self.reader = Some(BufReader::new(file));
        self.line = 0;
        Ok(())
    }

    fn parse_row(&self, row: &str) -> Result<LidarPoint> {
        let err = |msg: &str| Error::Parse {
            line: self.line,
            msg: msg.to_string(),
        };

        let mut fields = row.split(',').map(str::trim);
        let mut next = |name: &str| {
            fields
                .next()
                .filter(|f| !f.is_empty())
                .ok_or_else(|| err(&format!("missing field `{}`", name)))
        };

        let nanos: u64 = next("timestamp_ns")?
            .parse()
            .map_err(|_| err("bad timestamp"))?;
        let x: f64 = next("x_mm")?.parse().map_err(|_| err("bad x"))?;
        let y: f64 = next("y_mm")?.parse().map_err(|_| err("bad y"))?;
        let z: f64 = next("z_mm")?.parse().map_err(|_| err("bad z"))?;
        let reflectivity: f32 = next("reflectivity")?
            .parse()
            .map_err(|_| err("bad reflectivity"))?;

        Ok(LidarPoint::new(
            Timestamp::from_nanos(nanos),
            reflectivity,
            x,
            y,
            z,
        ))
    }
}

impl PointSource for CsvScanner {
    fn init(&mut self) -> Result<()> {
        log::debug!("Initializing CSV scanner: {}", self.path.display());
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

        let mut row = String::new();
        loop {
            row.clear();
            let consumed = match self.reader.as_mut() {
                Some(reader) => reader.read_line(&mut row)?,
                None => return Ok(ScanCode::Eof),
            };
            if consumed == 0 {
                self.reader = None;
                log::debug!("CSV scanner reached EOF after {} lines", self.line);
                return Ok(ScanCode::Eof);
            }
            self.line += 1;

            let trimmed = row.trim();
            if trimmed.is_empty() {
                continue;
            }
            // Header row: first field is not an integer timestamp.
            if self.line == 1
                && trimmed
                    .split(',')
                    .next()
                    .is_some_and(|f| f.trim().parse::<u64>().is_err())
            {
                continue;
            }

            let point = self.parse_row(trimmed)?;
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
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    fn collect_points(scanner: &mut CsvScanner) -> (Vec<LidarPoint>, ScanCode) {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let out = Arc::clone(&sink);
        scanner.set_callback(Box::new(move |p| out.lock().unwrap().push(p)));
        let code = scanner.start().unwrap();
        let points = sink.lock().unwrap().clone();
        (points, code)
    }

    #[test]
    fn test_replay_with_header() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timestamp_ns,x_mm,y_mm,z_mm,reflectivity").unwrap();
        writeln!(file, "1000,1.0,2.0,3.0,0.5").unwrap();
        writeln!(file, "2000,4.0,5.0,6.0,0.9").unwrap();

        let mut scanner = CsvScanner::new(file.path());
        scanner.init().unwrap();
        let (points, code) = collect_points(&mut scanner);

        assert_eq!(code, ScanCode::Eof);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].timestamp.as_nanos(), 1000);
        assert_eq!(points[1].x, 4.0);
        assert_eq!(points[1].reflectivity, 0.9);
    }

    #[test]
    fn test_malformed_row_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1000,1.0,oops,3.0,0.5").unwrap();

        let mut scanner = CsvScanner::new(file.path());
        scanner.init().unwrap();
        scanner.set_callback(Box::new(|_| {}));
        assert!(matches!(scanner.start(), Err(Error::Parse { line: 1, .. })));
    }

    #[test]
    fn test_eof_rewinds_for_next_pass() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1000,1.0,2.0,3.0,0.5").unwrap();

        let mut scanner = CsvScanner::new(file.path());
        scanner.init().unwrap();
        let (first, _) = collect_points(&mut scanner);
        let (second, _) = collect_points(&mut scanner);
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
    }
}
