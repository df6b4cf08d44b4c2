// File-backed LogSource over a LogPattern
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::debug;

use pipectl_core::domain::{LogLine, LogPattern};
use pipectl_core::port::LogSource;

/// Backward reads go through windows of this size
const CHUNK_SIZE: u64 = 8 * 1024;

/// Read state of one followed file
#[derive(Debug, Clone, Copy)]
struct Position {
    /// Bytes already emitted
    offset: u64,
    /// File length at the previous poll
    seen_len: u64,
}

/// Log files matching a pattern, tailed by byte offset
///
/// Lines are emitted once their newline arrives. A trailing partial line is
/// held back until the file stops growing for one poll, then emitted as is.
/// A file that shrinks is treated as truncated and read again from the
/// start. Files created after the first poll are read in full.
pub struct FileLogSource {
    pattern: LogPattern,
    initial_lines: usize,
    positions: BTreeMap<PathBuf, Position>,
    primed: bool,
}

impl FileLogSource {
    pub fn new(pattern: LogPattern, initial_lines: usize) -> Self {
        Self {
            pattern,
            initial_lines,
            positions: BTreeMap::new(),
            primed: false,
        }
    }

    pub fn pattern(&self) -> &LogPattern {
        &self.pattern
    }

    /// Matching files, sorted by name (timestamped names sort chronologically)
    pub fn files(&self) -> io::Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(self.pattern.dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let matches = name
                .to_str()
                .is_some_and(|n| self.pattern.matches_name(n));
            if matches && entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    fn poll_file(&mut self, path: &Path, out: &mut Vec<LogLine>) -> io::Result<()> {
        let len = fs::metadata(path)?.len();

        let (from, flush) = match self.positions.get(path).copied() {
            None if !self.primed => {
                let mut file = File::open(path)?;
                let (lines, end) = tail_lines(&mut file, len, self.initial_lines)?;
                out.extend(lines.into_iter().map(|t| LogLine::new(path, t)));
                self.positions.insert(
                    path.to_path_buf(),
                    Position {
                        offset: end,
                        seen_len: len,
                    },
                );
                return Ok(());
            }
            None => {
                debug!(path = %path.display(), "New log file");
                (0, false)
            }
            Some(pos) if len < pos.offset => {
                debug!(path = %path.display(), "Log file truncated, reading from start");
                (0, false)
            }
            Some(pos) if len == pos.offset => return Ok(()),
            // Unchanged since the previous poll: the partial tail is final for now
            Some(pos) => (pos.offset, len == pos.seen_len),
        };

        let (lines, end) = read_span(path, from, len, flush)?;
        out.extend(lines.into_iter().map(|t| LogLine::new(path, t)));
        self.positions.insert(
            path.to_path_buf(),
            Position {
                offset: end,
                seen_len: len,
            },
        );
        Ok(())
    }
}

impl LogSource for FileLogSource {
    fn read_recent(
        &self,
        limit: usize,
        keep: &dyn Fn(&str) -> bool,
    ) -> pipectl_core::Result<Vec<LogLine>> {
        let mut found = Vec::new();
        if limit == 0 {
            return Ok(found);
        }

        for path in self.files()?.iter().rev() {
            let mut file = match File::open(path) {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            let len = file.metadata()?.len();

            rev_lines(&mut file, len, |text| {
                if keep(text.as_str()) {
                    found.push(LogLine::new(path, text));
                }
                found.len() < limit
            })?;

            if found.len() >= limit {
                break;
            }
        }

        found.reverse();
        Ok(found)
    }

    fn poll(&mut self) -> pipectl_core::Result<Vec<LogLine>> {
        let files = self.files()?;
        self.positions.retain(|path, _| files.contains(path));

        let mut out = Vec::new();
        for path in &files {
            match self.poll_file(path, &mut out) {
                Ok(()) => {}
                // Removed between listing and reading
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    self.positions.remove(path);
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.primed = true;
        Ok(out)
    }

    fn rewind(&mut self) {
        self.positions.clear();
        self.primed = false;
    }
}

/// Lines in bytes `from..to`, and the offset just past the last one emitted
///
/// Without `flush` a trailing partial line is left for a later read.
fn read_span(path: &Path, from: u64, to: u64, flush: bool) -> io::Result<(Vec<String>, u64)> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(from))?;

    let mut buf = Vec::new();
    file.take(to - from).read_to_end(&mut buf)?;

    let complete = if flush {
        buf.len()
    } else {
        buf.iter().rposition(|b| *b == b'\n').map_or(0, |i| i + 1)
    };
    let lines = String::from_utf8_lossy(&buf[..complete])
        .lines()
        .map(str::to_string)
        .collect();

    Ok((lines, from + complete as u64))
}

/// Last `n` complete lines before `len`, and the offset just past them
fn tail_lines<R: Read + Seek>(reader: &mut R, len: u64, n: usize) -> io::Result<(Vec<String>, u64)> {
    let end = complete_end(reader, len)?;

    let mut lines = Vec::new();
    if n > 0 {
        rev_lines(reader, end, |text| {
            lines.push(text);
            lines.len() < n
        })?;
    }
    lines.reverse();
    Ok((lines, end))
}

/// Offset just past the last newline before `len`, or 0 when there is none
fn complete_end<R: Read + Seek>(reader: &mut R, len: u64) -> io::Result<u64> {
    let mut pos = len;
    while pos > 0 {
        let size = CHUNK_SIZE.min(pos);
        pos -= size;
        let chunk = read_chunk(reader, pos, size)?;
        if let Some(i) = chunk.iter().rposition(|b| *b == b'\n') {
            return Ok(pos + i as u64 + 1);
        }
    }
    Ok(0)
}

/// Visit the lines before `end` newest first, until `visit` returns false
///
/// A newline right before `end` closes the last line; it does not open an
/// empty one.
fn rev_lines<R: Read + Seek>(
    reader: &mut R,
    end: u64,
    mut visit: impl FnMut(String) -> bool,
) -> io::Result<()> {
    let mut pos = end;
    let mut carry: Vec<u8> = Vec::new();
    let mut at_end = true;

    while pos > 0 {
        let size = CHUNK_SIZE.min(pos);
        pos -= size;
        let mut chunk = read_chunk(reader, pos, size)?;
        if std::mem::take(&mut at_end) && chunk.last() == Some(&b'\n') {
            chunk.pop();
        }
        chunk.extend_from_slice(&carry);

        let mut line_end = chunk.len();
        while let Some(i) = chunk[..line_end].iter().rposition(|b| *b == b'\n') {
            if !visit(decode(&chunk[i + 1..line_end])) {
                return Ok(());
            }
            line_end = i;
        }
        chunk.truncate(line_end);
        carry = chunk;
    }

    if end > 0 {
        visit(decode(&carry));
    }
    Ok(())
}

fn read_chunk<R: Read + Seek>(reader: &mut R, pos: u64, size: u64) -> io::Result<Vec<u8>> {
    reader.seek(SeekFrom::Start(pos))?;
    let mut chunk = vec![0; size as usize];
    reader.read_exact(&mut chunk)?;
    Ok(chunk)
}

fn decode(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
