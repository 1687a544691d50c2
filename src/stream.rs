//! Streaming record store.
//!
//! A [`RecordStream`] pairs a forward-only decoder over a byte [`Source`] with
//! an encoder into a byte [`Sink`]. Bulk operations (subsets, appended
//! fields, sorts) never modify the source in place: they read from it and
//! write into a fresh in-memory stream that is returned fully flushed.
//!
//! Reads are served in a fixed priority: a pending record (peeked or
//! stashed) first, then the decoder.
//!
//! ```
//! use ais_stream::{BoundingBox, RecordStream, ScanMode};
//!
//! let csv = "MMSI,LAT,LON\n1,10.0,20.0\n2,50.0,50.0\n";
//! let mut rs = RecordStream::from_bytes(csv).unwrap();
//! let area = BoundingBox::for_columns(rs.headers(), "LAT", "LON", (0.0, 20.0), (0.0, 30.0))
//!     .unwrap();
//!
//! let mut subset = rs.subset_limit(&area, None, ScanMode::Forward).unwrap().into_stream();
//! assert_eq!(subset.read().unwrap().unwrap().value(0), Some("1"));
//! assert!(subset.read().unwrap().is_none());
//! ```

use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::mem;
use std::path::Path;
use std::vec;

use tracing::{debug, info, trace};

use crate::config::StreamConfig;
use crate::error::{ParseError, StreamError};
use crate::generator::Generator;
use crate::handle::{AppendFile, MemoryBuffer, Sink, Source};
use crate::headers::{BASE_DATE_TIME, Headers, MMSI, VESSEL_NAME};
use crate::matching::Matching;
use crate::order::ByTimestamp;
use crate::record::{Record, TIME_LAYOUT};
use crate::vessel::{NO_VESSEL_NAME, Vessel, VesselSet};

/// Lifecycle of a stream's decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Headers are known and nothing has been decoded yet.
    Open,
    /// At least one record has been decoded.
    Reading,
    /// The decoder reached end of input. Pending records are still served.
    Exhausted,
    /// Handles are released; every operation fails with
    /// [`StreamError::Closed`].
    Closed,
}

/// How a scan treats the records it reads from the source stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
    /// Scanned records are consumed. Constant memory.
    #[default]
    Forward,
    /// Every scanned record is retained in memory and replayed by later
    /// reads, so the source reproduces exactly the sequence it held before
    /// the scan. Costs O(records scanned) memory: on multi-million row files
    /// prefer reopening the source.
    Replayable,
}

/// Outcome of a subset operation that ran to completion.
///
/// Zero matches is reported as [`Selection::Empty`] rather than an error.
/// Both variants carry a usable, fully flushed stream.
#[derive(Debug)]
pub enum Selection {
    Matched(RecordStream),
    Empty(RecordStream),
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        matches!(self, Selection::Empty(_))
    }

    pub fn stream(&self) -> &RecordStream {
        match self {
            Selection::Matched(stream) | Selection::Empty(stream) => stream,
        }
    }

    pub fn into_stream(self) -> RecordStream {
        match self {
            Selection::Matched(stream) | Selection::Empty(stream) => stream,
        }
    }
}

/// A record awaiting delivery ahead of the decoder.
#[derive(Debug, Default)]
enum Pending {
    #[default]
    Empty,
    /// Fetched by [`RecordStream::peek`], not yet handed out by a read.
    Lookahead(Record),
    /// Handed back by the client through [`RecordStream::stash`].
    Stashed(Record),
}

impl Pending {
    fn take(&mut self) -> Option<Record> {
        match mem::take(self) {
            Pending::Empty => None,
            Pending::Lookahead(record) | Pending::Stashed(record) => Some(record),
        }
    }

    fn get(&self) -> Option<&Record> {
        match self {
            Pending::Empty => None,
            Pending::Lookahead(record) | Pending::Stashed(record) => Some(record),
        }
    }
}

/// Forward-only source of decoded records.
enum Decoder {
    Csv(csv::Reader<Box<dyn Source>>),
    /// Serves records retained by a replayable scan, then continues with
    /// the decoder the scan read from.
    Replay {
        buffered: vec::IntoIter<Record>,
        rest: Box<Decoder>,
    },
    Closed,
}

impl Decoder {
    fn next(&mut self, config: &StreamConfig) -> Result<Option<Record>, StreamError> {
        if matches!(self, Decoder::Csv(reader) if reader.is_done()) {
            // Bytes appended to the source after end of input become visible
            // to a fresh reader over the same handle.
            if let Decoder::Csv(reader) = mem::replace(self, Decoder::Closed) {
                *self = Decoder::Csv(config.reader_builder().from_reader(reader.into_inner()));
            }
        }

        match self {
            Decoder::Csv(reader) => {
                let mut row = csv::ByteRecord::new();
                match reader.read_byte_record(&mut row) {
                    Ok(true) => Ok(Some(Record::from(&row))),
                    Ok(false) => Ok(None),
                    Err(err) => Err(csv_error(err, StreamError::Decode)),
                }
            }
            Decoder::Replay { buffered, rest } => {
                if let Some(record) = buffered.next() {
                    return Ok(Some(record));
                }
                let rest = mem::replace(rest.as_mut(), Decoder::Closed);
                *self = rest;
                self.next(config)
            }
            Decoder::Closed => Ok(None),
        }
    }

    fn close(&mut self) -> io::Result<()> {
        match self {
            Decoder::Csv(reader) => reader.get_mut().close(),
            Decoder::Replay { rest, .. } => rest.close(),
            Decoder::Closed => Ok(()),
        }
    }
}

/// Splits i/o failures out of csv errors so they surface as
/// [`StreamError::Io`].
fn csv_error(err: csv::Error, wrap: fn(csv::Error) -> StreamError) -> StreamError {
    if !err.is_io_error() {
        return wrap(err);
    }
    match err.into_kind() {
        csv::ErrorKind::Io(err) => StreamError::Io(err),
        _ => StreamError::Io(io::Error::other("csv i/o error")),
    }
}

/// Writes records through a csv encoder, flushing every `threshold` records.
struct BatchWriter {
    threshold: usize,
    written: usize,
}

impl BatchWriter {
    fn new(config: &StreamConfig) -> Self {
        Self {
            threshold: config.flush_threshold.max(1),
            written: 0,
        }
    }

    fn write<W: Write>(
        &mut self,
        encoder: &mut csv::Writer<W>,
        fields: &[String],
    ) -> Result<(), StreamError> {
        encoder
            .write_record(fields)
            .map_err(|err| csv_error(err, StreamError::Encode))?;
        self.written += 1;
        if self.written % self.threshold == 0 {
            trace!(written = self.written, "flushing batch");
            encoder.flush()?;
        }
        Ok(())
    }

    /// Final unconditional flush. Returns the number of records written.
    fn finish<W: Write>(self, encoder: &mut csv::Writer<W>) -> Result<usize, StreamError> {
        encoder.flush()?;
        Ok(self.written)
    }
}

/// A stream of delimited-text records with a header row.
///
/// Not synchronized: a single stream must not be shared between threads
/// without external locking. Distinct streams are independent.
pub struct RecordStream {
    headers: Headers,
    decoder: Decoder,
    encoder: Option<csv::Writer<Box<dyn Sink>>>,
    pending: Pending,
    /// Last decoded row rejected for its width, kept so a replayable scan
    /// can hand it back.
    rejected: Option<Record>,
    state: StreamState,
    config: StreamConfig,
    rows: u64,
}

impl fmt::Debug for RecordStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordStream")
            .field("headers", &self.headers)
            .field("state", &self.state)
            .field("pending", &self.pending)
            .field("rows", &self.rows)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RecordStream {
    /// Stream over `source` whose first non-comment line is the header row.
    ///
    /// Records written to the stream go to `sink`.
    pub fn new(
        source: impl Source + 'static,
        sink: impl Sink + 'static,
        config: StreamConfig,
    ) -> Result<Self, StreamError> {
        let source: Box<dyn Source> = Box::new(source);
        let mut reader = config.reader_builder().from_reader(source);
        let mut row = csv::ByteRecord::new();
        let found = reader
            .read_byte_record(&mut row)
            .map_err(|err| csv_error(err, StreamError::Decode))?;
        if !found {
            return Err(StreamError::NoHeader);
        }

        Ok(Self::with_decoder(
            Headers::from(&row),
            Decoder::Csv(reader),
            sink,
            config,
        ))
    }

    /// Empty stream backed by a fresh [`MemoryBuffer`]: records written to it
    /// are read back in order once flushed.
    pub fn in_memory(headers: Headers) -> Self {
        Self::in_memory_with(headers, StreamConfig::default())
    }

    pub fn in_memory_with(headers: Headers, config: StreamConfig) -> Self {
        let buffer = MemoryBuffer::new();
        let source: Box<dyn Source> = Box::new(buffer.clone());
        let reader = config.reader_builder().from_reader(source);
        Self::with_decoder(headers, Decoder::Csv(reader), buffer, config)
    }

    /// Stream over delimited text held in memory, header row first.
    pub fn from_bytes(bytes: impl AsRef<[u8]>) -> Result<Self, StreamError> {
        Self::from_bytes_with(bytes, StreamConfig::default())
    }

    pub fn from_bytes_with(bytes: impl AsRef<[u8]>, config: StreamConfig) -> Result<Self, StreamError> {
        let buffer = MemoryBuffer::from_bytes(bytes);
        Self::new(buffer.clone(), buffer, config)
    }

    /// Open a delimited-text file and parse its header row.
    ///
    /// Records written to the returned stream are appended to the file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StreamError> {
        Self::open_with(path, StreamConfig::default())
    }

    pub fn open_with(path: impl AsRef<Path>, config: StreamConfig) -> Result<Self, StreamError> {
        let path = path.as_ref();
        let source = File::open(path)?;
        let stream = Self::new(source, AppendFile::new(path), config)?;
        debug!(path = %path.display(), columns = stream.headers.len(), "opened record stream");
        Ok(stream)
    }

    fn with_decoder(
        headers: Headers,
        decoder: Decoder,
        sink: impl Sink + 'static,
        config: StreamConfig,
    ) -> Self {
        let sink: Box<dyn Sink> = Box::new(sink);
        Self {
            headers,
            decoder,
            encoder: Some(config.writer_builder().from_writer(sink)),
            pending: Pending::Empty,
            rejected: None,
            state: StreamState::Open,
            config,
            rows: 0,
        }
    }

    /// In-memory stream sharing this stream's configuration.
    fn derive(&self, headers: Headers) -> Self {
        Self::in_memory_with(headers, self.config)
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn set_headers(&mut self, headers: Headers) {
        self.headers = headers;
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    fn ensure_open(&self) -> Result<(), StreamError> {
        if self.state == StreamState::Closed {
            return Err(StreamError::Closed);
        }
        Ok(())
    }

    fn decode(&mut self) -> Result<Option<Record>, StreamError> {
        let Some(record) = self.decoder.next(&self.config)? else {
            self.state = StreamState::Exhausted;
            return Ok(None);
        };
        self.state = StreamState::Reading;
        self.rows += 1;
        if !self.headers.is_empty() && record.len() != self.headers.len() {
            let err = StreamError::FieldCount {
                row: self.rows,
                expected: self.headers.len(),
                found: record.len(),
            };
            self.rejected = Some(record);
            return Err(err);
        }
        Ok(Some(record))
    }

    /// Next record, or `Ok(None)` at end of input.
    ///
    /// A peeked or stashed record is returned before the decoder is touched.
    pub fn read(&mut self) -> Result<Option<Record>, StreamError> {
        self.ensure_open()?;
        if let Some(record) = self.pending.take() {
            return Ok(Some(record));
        }
        self.decode()
    }

    /// The record the next [`read`](Self::read) will return, without
    /// consuming it.
    pub fn peek(&mut self) -> Result<Option<&Record>, StreamError> {
        self.ensure_open()?;
        if matches!(self.pending, Pending::Empty)
            && let Some(record) = self.decode()?
        {
            self.pending = Pending::Lookahead(record);
        }
        Ok(self.pending.get())
    }

    /// Have the next [`read`](Self::read) return `record` again.
    ///
    /// One slot: a second stash replaces the first. Fails with
    /// [`StreamError::StashConflict`] while a peeked record is still
    /// undelivered.
    pub fn stash(&mut self, record: Record) -> Result<(), StreamError> {
        self.ensure_open()?;
        if matches!(self.pending, Pending::Lookahead(_)) {
            return Err(StreamError::StashConflict);
        }
        self.pending = Pending::Stashed(record);
        Ok(())
    }

    /// Iterate over the remaining records. Iteration stops after the first
    /// error.
    pub fn records(&mut self) -> Records<'_> {
        Records {
            stream: self,
            failed: false,
        }
    }

    fn encoder(&mut self) -> Result<&mut csv::Writer<Box<dyn Sink>>, StreamError> {
        self.encoder.as_mut().ok_or(StreamError::Closed)
    }

    /// Encode `record` into the stream's sink. Call [`flush`](Self::flush)
    /// before expecting it to be readable.
    pub fn write(&mut self, record: &Record) -> Result<(), StreamError> {
        self.encoder()?
            .write_record(record.fields())
            .map_err(|err| csv_error(err, StreamError::Encode))
    }

    /// Push buffered output to the sink, surfacing any deferred write error.
    pub fn flush(&mut self) -> Result<(), StreamError> {
        self.encoder()?.flush()?;
        Ok(())
    }

    /// Flush and release the underlying handles. Calling it again is a no-op.
    pub fn close(&mut self) -> Result<(), StreamError> {
        if self.state == StreamState::Closed {
            return Ok(());
        }
        self.state = StreamState::Closed;
        self.pending = Pending::Empty;
        self.rejected = None;

        let sink_result = match self.encoder.take() {
            Some(encoder) => encoder
                .into_inner()
                .map_err(|err| err.into_error())
                .and_then(|mut sink| sink.close()),
            None => Ok(()),
        };
        let source_result = self.decoder.close();
        self.decoder = Decoder::Closed;
        debug!(rows = self.rows, "closed record stream");

        sink_result?;
        source_result?;
        Ok(())
    }

    /// Run `op` with a tap that sees every record it reads. In
    /// [`ScanMode::Replayable`] the tapped records are retained and the
    /// decoder is rebound to replay them, whether or not `op` succeeds. A row
    /// that failed the width check is replayed too, so it fails again.
    fn scan<T>(
        &mut self,
        mode: ScanMode,
        op: impl FnOnce(&mut Self, &mut dyn FnMut(&Record)) -> Result<T, StreamError>,
    ) -> Result<T, StreamError> {
        match mode {
            ScanMode::Forward => op(self, &mut |_: &Record| {}),
            ScanMode::Replayable => {
                let mut scanned = Vec::new();
                self.rejected = None;
                let result = op(self, &mut |record: &Record| scanned.push(record.clone()));
                if result.is_err()
                    && let Some(record) = self.rejected.take()
                {
                    scanned.push(record);
                }
                self.rebind_for_replay(scanned);
                result
            }
        }
    }

    fn rebind_for_replay(&mut self, scanned: Vec<Record>) {
        if scanned.is_empty() || self.state == StreamState::Closed {
            return;
        }
        debug!(records = scanned.len(), "rebinding decoder for replay");
        let rest = mem::replace(&mut self.decoder, Decoder::Closed);
        self.decoder = Decoder::Replay {
            buffered: scanned.into_iter(),
            rest: Box::new(rest),
        };
        self.state = StreamState::Reading;
    }

    /// New stream holding, in order, the first `limit` records that match
    /// (`None` collects every match).
    ///
    /// Scanning stops as soon as `limit` matches are found. Any decode or
    /// predicate error aborts the whole operation.
    pub fn subset_limit(
        &mut self,
        matcher: &impl Matching,
        limit: Option<usize>,
        mode: ScanMode,
    ) -> Result<Selection, StreamError> {
        self.scan(mode, |rs, tap| rs.select(matcher, limit, tap))
    }

    /// Every matching record, consuming the source.
    pub fn subset(&mut self, matcher: &impl Matching) -> Result<Selection, StreamError> {
        self.subset_limit(matcher, None, ScanMode::Forward)
    }

    fn select(
        &mut self,
        matcher: &impl Matching,
        limit: Option<usize>,
        tap: &mut dyn FnMut(&Record),
    ) -> Result<Selection, StreamError> {
        let mut dest = self.derive(self.headers.clone());
        let mut batch = BatchWriter::new(&self.config);
        let mut scanned = 0usize;

        while limit.is_none_or(|n| batch.written < n) {
            let Some(record) = self.read()? else {
                break;
            };
            scanned += 1;
            tap(&record);
            if matcher.matches(&record)? {
                batch.write(dest.encoder()?, record.fields())?;
            }
        }
        let matched = batch.finish(dest.encoder()?)?;
        info!(scanned, matched, "subset complete");

        if matched == 0 {
            Ok(Selection::Empty(dest))
        } else {
            Ok(Selection::Matched(dest))
        }
    }

    /// New stream with column `name` appended, computed for every record by
    /// `generator` from the columns in `required` (passed as indices in the
    /// same order).
    ///
    /// Consumes the source in a single forward pass.
    pub fn append_field(
        &mut self,
        name: &str,
        required: &[&str],
        generator: &impl Generator,
    ) -> Result<RecordStream, StreamError> {
        let indices = self.required_indices(required)?;
        let mut dest = self.derive(self.headers.clone().with_column(name));
        let mut batch = BatchWriter::new(&self.config);

        while let Some(record) = self.read()? {
            let field = generator.generate(&record, &indices)?;
            let record = record.with_field(field);
            batch.write(dest.encoder()?, record.fields())?;
        }
        let written = batch.finish(dest.encoder()?)?;
        info!(column = name, written, "append field complete");
        Ok(dest)
    }

    fn required_indices(&self, names: &[&str]) -> Result<Vec<usize>, StreamError> {
        names
            .iter()
            .map(|name| {
                self.headers
                    .index_of(name)
                    .ok_or_else(|| StreamError::MissingColumn(name.to_string()))
            })
            .collect()
    }

    /// Record count per vessel, consuming the source.
    pub fn unique_vessels(&mut self) -> Result<VesselSet, StreamError> {
        self.unique_vessels_with(ScanMode::Forward)
    }

    /// Record count per (`MMSI`, `VesselName`) pair. Streams without a
    /// `VesselName` column count under [`NO_VESSEL_NAME`].
    pub fn unique_vessels_with(&mut self, mode: ScanMode) -> Result<VesselSet, StreamError> {
        let mmsi = self
            .headers
            .index_of(MMSI)
            .ok_or_else(|| StreamError::MissingColumn(MMSI.to_string()))?;
        let vessel_name = self.headers.index_of(VESSEL_NAME);

        self.scan(mode, |rs, tap| {
            let mut vessels = VesselSet::new();
            while let Some(record) = rs.read()? {
                tap(&record);
                let id = field_at(&record, mmsi)?;
                let name = match vessel_name {
                    Some(index) => field_at(&record, index)?,
                    None => NO_VESSEL_NAME,
                };
                *vessels.entry(Vessel::new(id, name)).or_insert(0) += 1;
            }
            info!(vessels = vessels.len(), "unique vessels complete");
            Ok(vessels)
        })
    }

    /// Every remaining record, in order.
    pub fn load_records(&mut self) -> Result<Vec<Record>, StreamError> {
        self.records().collect()
    }

    /// New stream with all remaining records stably sorted by the timestamp
    /// in `column`, parsed with [`TIME_LAYOUT`].
    ///
    /// Loads the whole stream into memory. Any unparseable timestamp fails
    /// the sort.
    pub fn sort_by_timestamp(&mut self, column: &str) -> Result<RecordStream, StreamError> {
        let index = self.required_indices(&[column])?[0];
        let mut by_time = ByTimestamp::new(self.load_records()?, index, TIME_LAYOUT)?;
        by_time.sort();

        let mut dest = self.derive(self.headers.clone());
        let mut batch = BatchWriter::new(&self.config);
        for record in by_time.into_records() {
            batch.write(dest.encoder()?, record.fields())?;
        }
        let written = batch.finish(dest.encoder()?)?;
        info!(column, written, "sort complete");
        Ok(dest)
    }

    /// [`sort_by_timestamp`](Self::sort_by_timestamp) on `BaseDateTime`.
    pub fn sort_by_time(&mut self) -> Result<RecordStream, StreamError> {
        self.sort_by_timestamp(BASE_DATE_TIME)
    }

    /// Write the header row and every remaining record to a new file at
    /// `path`, replacing any existing file.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<usize, StreamError> {
        self.ensure_open()?;
        let path = path.as_ref();
        let file = File::create(path)?;
        let mut encoder = self.config.writer_builder().from_writer(file);
        encoder
            .write_record(self.headers.fields())
            .map_err(|err| csv_error(err, StreamError::Encode))?;

        let mut batch = BatchWriter::new(&self.config);
        while let Some(record) = self.read()? {
            batch.write(&mut encoder, record.fields())?;
        }
        let written = batch.finish(&mut encoder)?;

        let mut file = encoder.into_inner().map_err(|err| err.into_error())?;
        Sink::close(&mut file)?;
        debug!(path = %path.display(), written, "saved record stream");
        Ok(written)
    }
}

fn field_at(record: &Record, index: usize) -> Result<&str, StreamError> {
    record.value(index).ok_or(StreamError::Parse(ParseError::OutOfRange {
        index,
        len: record.len(),
    }))
}

/// Iterator over the remaining records of a [`RecordStream`].
pub struct Records<'a> {
    stream: &'a mut RecordStream,
    failed: bool,
}

impl Iterator for Records<'_> {
    type Item = Result<Record, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.stream.read().transpose();
        self.failed = matches!(item, Some(Err(_)));
        item
    }
}
