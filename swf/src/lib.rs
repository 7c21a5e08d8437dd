//! A parser for parallel workloads in the Standard Workload Format.
//!
//! Information on the format and sample workloads are available at the
//! Parallel Workloads Archive:
//!
//! <http://www.cs.huji.ac.il/labs/parallel/workload/>

pub use self::record::{Record, RecordError, NUM_FIELDS};
use std::io::BufRead;

mod record;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read workload input")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {source}")]
    Line { line: usize, source: RecordError },
}

/// Streams [`Record`]s off a reader, one workload line at a time.
///
/// Comment lines (leading `;`) and blank lines are passed over silently,
/// and lines the archive rules mark as unusable (see [`Record::should_skip`])
/// are dropped with a debug log. Lines that do not parse at all are yielded
/// as [`Error::Line`] so the caller can decide whether a bad line is fatal.
pub struct Records<R> {
    reader: R,
    buf: String,
    line: usize,
}

impl<R: BufRead> Records<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: String::new(),
            line: 0,
        }
    }
}

impl<R: BufRead> Iterator for Records<R> {
    type Item = Result<Record, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(Error::Io(e))),
            }
            self.line += 1;

            let line = self.buf.trim();
            if line.is_empty() || line.starts_with(';') {
                continue;
            }

            match line.parse::<Record>() {
                Ok(record) => {
                    if record.should_skip() {
                        log::debug!(target: "swf", "line {}: skipping job {}", self.line, record.number);
                        continue;
                    }
                    return Some(Ok(record));
                }
                Err(source) => {
                    return Some(Err(Error::Line {
                        line: self.line,
                        source,
                    }))
                }
            }
        }
    }
}

/// Convenience constructor, `Records::new` with the noise filed off.
pub fn records<R: BufRead>(reader: R) -> Records<R> {
    Records::new(reader)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
; UnixStartTime: 0
; MaxProcs: 128

    1        10      0    716   32     -1    -1   32     800    -1  1   4   1   3  0 -1 -1 -1
    2        -1      0    716   32     -1    -1   32     800    -1  1   4   1   3  0 -1 -1 -1
garbage line that is not a record
    3        20      0    500   16     -1    -1   -1     600    -1  1   7   2   3  0 -1 -1 -1
";

    #[test]
    fn streams_usable_records_and_reports_bad_lines() {
        let mut records = records(SAMPLE.as_bytes());

        let first = records.next().unwrap().unwrap();
        assert_eq!(first.number, 1);
        assert_eq!(first.required_processors(), 32);

        // job 2 has no arrival time and is silently skipped; the garbage
        // line surfaces as an error carrying its line number.
        match records.next().unwrap() {
            Err(Error::Line { line, .. }) => assert_eq!(line, 6),
            other => panic!("expected a line error, got {other:?}"),
        }

        let third = records.next().unwrap().unwrap();
        assert_eq!(third.number, 3);
        // requested processors of -1 fall back to the allocated count
        assert_eq!(third.required_processors(), 16);

        assert!(records.next().is_none());
    }
}
