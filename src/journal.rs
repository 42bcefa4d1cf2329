use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::model::{Event, Shift};

const MAX_RECORD_LEN: usize = 256 * 1024 * 1024;

/// Encode a single event to [len][bincode][crc32] format.
fn encode_event(writer: &mut impl Write, event: &Event) -> io::Result<()> {
    let payload =
        bincode::serialize(event).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let len = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "journal record too large"))?;
    let crc = crc32fast::hash(&payload);
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.write_all(&crc.to_le_bytes())?;
    Ok(())
}

/// Fill `buf`; `Ok(false)` when the file ends first.
fn read_part(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<bool> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Append-only shift journal.
///
/// Format per entry: `[u32: len][bincode: Event][u32: crc32]`
/// - `len` is the byte length of the bincode payload (not including the CRC).
/// - A truncated or corrupt trailing entry is discarded on replay.
///
/// After a failed write the journal is marked dirty: the bytes on disk may end
/// in a partial record, so the next write rewrites a full snapshot instead of
/// appending behind it.
pub struct Journal {
    writer: BufWriter<File>,
    path: PathBuf,
    appends_since_compact: u64,
    dirty: bool,
}

impl Journal {
    /// Open (or create) the journal file at `path`.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            appends_since_compact: 0,
            dirty: false,
        })
    }

    /// Append a single event and fsync.
    pub fn append(&mut self, event: &Event) -> io::Result<()> {
        self.append_buffered(event)?;
        self.flush_sync()
    }

    /// Append to the buffer without flushing or syncing.
    pub fn append_buffered(&mut self, event: &Event) -> io::Result<()> {
        encode_event(&mut self.writer, event)?;
        self.appends_since_compact += 1;
        Ok(())
    }

    /// Flush the BufWriter and fsync the underlying file.
    pub fn flush_sync(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn appends_since_compact(&self) -> u64 {
        self.appends_since_compact
    }

    /// Persist `event`, whose effect is already part of `current`.
    /// A dirty journal is healed by writing `current` as a snapshot instead.
    pub fn record(&mut self, event: &Event, current: &[Shift]) -> io::Result<()> {
        let result = if self.dirty {
            self.rewrite(current)
        } else {
            self.append(event)
        };
        self.dirty = result.is_err();
        result
    }

    /// Replace the journal with a single snapshot of `shifts`.
    pub fn rewrite(&mut self, shifts: &[Shift]) -> io::Result<()> {
        let snapshot = Event::Snapshot { shifts: shifts.to_vec() };
        let result = Self::write_compact_file(&self.path, std::slice::from_ref(&snapshot))
            .and_then(|()| self.swap_compact_file());
        self.dirty = result.is_err();
        result
    }

    /// Write compacted events to a temp file and fsync.
    pub fn write_compact_file(path: &Path, events: &[Event]) -> io::Result<()> {
        let tmp_path = path.with_extension("journal.tmp");
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        for event in events {
            encode_event(&mut writer, event)?;
        }
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    }

    /// Atomic swap: rename the temp file over the journal and reopen.
    pub fn swap_compact_file(&mut self) -> io::Result<()> {
        let tmp_path = self.path.with_extension("journal.tmp");
        fs::rename(&tmp_path, &self.path)?;
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.writer = BufWriter::new(file);
        self.appends_since_compact = 0;
        Ok(())
    }

    /// Read every intact record. Reading stops at the first torn, oversized,
    /// corrupt or undecodable record; everything before it is kept.
    pub fn replay(path: &Path) -> io::Result<Vec<Event>> {
        Self::scan(path).map(|(events, _)| events)
    }

    /// Replay plus the byte length of the intact prefix.
    fn scan(path: &Path) -> io::Result<(Vec<Event>, u64)> {
        let mut reader = match File::open(path) {
            Ok(f) => BufReader::new(f),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok((Vec::new(), 0)),
            Err(e) => return Err(e),
        };
        let mut events = Vec::new();
        let mut valid_len = 0u64;
        let mut header = [0u8; 4];

        while read_part(&mut reader, &mut header)? {
            let len = u32::from_le_bytes(header) as usize;
            if len > MAX_RECORD_LEN {
                tracing::warn!(path = %path.display(), len, "journal: implausible record length");
                break;
            }
            // Buffer only what the file actually holds.
            let mut payload = Vec::new();
            reader.by_ref().take(len as u64).read_to_end(&mut payload)?;
            let mut trailer = [0u8; 4];
            if payload.len() < len || !read_part(&mut reader, &mut trailer)? {
                tracing::warn!(path = %path.display(), "journal: dropping torn tail record");
                break;
            }
            if u32::from_le_bytes(trailer) != crc32fast::hash(&payload) {
                tracing::warn!(path = %path.display(), "journal: checksum mismatch, stopping replay");
                break;
            }
            match bincode::deserialize::<Event>(&payload) {
                Ok(event) => events.push(event),
                Err(e) => {
                    tracing::warn!(path = %path.display(), "journal: undecodable record: {e}");
                    break;
                }
            }
            valid_len += 8 + len as u64;
        }

        Ok((events, valid_len))
    }

    /// Replay and fold the journal into the current collection.
    pub fn load(path: &Path) -> io::Result<Vec<Shift>> {
        Ok(fold(Self::replay(path)?))
    }

    /// Load the collection and open the journal for writing. A file with
    /// bytes past its last intact record is rewritten first, so new appends
    /// never land behind a torn record.
    pub fn recover(path: &Path) -> io::Result<(Self, Vec<Shift>)> {
        let (events, valid_len) = Self::scan(path)?;
        let shifts = fold(events);
        let mut journal = Self::open(path)?;
        let file_len = fs::metadata(path)?.len();
        if file_len > valid_len {
            tracing::warn!(
                path = %path.display(),
                dropped_bytes = file_len - valid_len,
                "journal: rewriting after damaged tail"
            );
            journal.rewrite(&shifts)?;
        }
        Ok((journal, shifts))
    }
}

fn fold(events: Vec<Event>) -> Vec<Shift> {
    let mut shifts = Vec::new();
    for event in &events {
        event.apply(&mut shifts);
    }
    shifts
}
