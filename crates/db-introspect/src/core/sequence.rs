//! Lazy sequences of metadata rows and records.
//!
//! Enumeration results are finite, non-restartable sequences. Driver
//! adapters feed [`RowSequence`] from a bounded channel so consumption can
//! begin before the engine has produced the full result set; dropping a
//! sequence hangs up the channel and the feeder task stops on its next send.
//!
//! Operations whose output is inherently aggregated (a multi-column primary
//! key, grouped foreign-key constraints) use the buffered form instead.

use std::collections::VecDeque;

use tokio::sync::mpsc;

use crate::core::value::MetaRow;
use crate::error::Result;

/// Channel capacity for streamed metadata rows. Backpressure above this
/// bound keeps a slow consumer from buffering an entire catalog.
pub const ROW_CHANNEL_CAPACITY: usize = 64;

/// A lazy, finite, non-restartable sequence of untyped metadata rows.
pub struct RowSequence {
    inner: RowInner,
}

enum RowInner {
    Streamed(mpsc::Receiver<Result<MetaRow>>),
    Buffered(VecDeque<MetaRow>),
}

impl RowSequence {
    /// Create a channel-fed sequence. The sender side goes to the feeder
    /// task; the returned sequence is handed to the caller.
    pub fn channel() -> (mpsc::Sender<Result<MetaRow>>, Self) {
        let (tx, rx) = mpsc::channel(ROW_CHANNEL_CAPACITY);
        (
            tx,
            Self {
                inner: RowInner::Streamed(rx),
            },
        )
    }

    /// Create a sequence over rows that are already materialized.
    pub fn buffered(rows: Vec<MetaRow>) -> Self {
        Self {
            inner: RowInner::Buffered(rows.into()),
        }
    }

    /// Pull the next row, or `None` once the sequence is exhausted.
    pub async fn next(&mut self) -> Option<Result<MetaRow>> {
        match &mut self.inner {
            RowInner::Streamed(rx) => rx.recv().await,
            RowInner::Buffered(rows) => rows.pop_front().map(Ok),
        }
    }

    /// Drain the remainder of the sequence, failing on the first error.
    pub async fn collect(mut self) -> Result<Vec<MetaRow>> {
        let mut out = Vec::new();
        while let Some(row) = self.next().await {
            out.push(row?);
        }
        Ok(out)
    }
}

type RowMapper<T> = Box<dyn FnMut(MetaRow) -> Result<T> + Send>;

/// A lazy, finite, non-restartable sequence of typed metadata records.
///
/// Either maps an underlying [`RowSequence`] record-by-record, or replays a
/// pre-assembled batch when the operation had to aggregate rows first.
pub struct RecordSequence<T> {
    inner: RecordInner<T>,
}

enum RecordInner<T> {
    Mapped { rows: RowSequence, map: RowMapper<T> },
    Ready(VecDeque<T>),
}

impl<T> RecordSequence<T> {
    /// Lazily map rows into records as they are pulled.
    pub fn mapped(
        rows: RowSequence,
        map: impl FnMut(MetaRow) -> Result<T> + Send + 'static,
    ) -> Self {
        Self {
            inner: RecordInner::Mapped {
                rows,
                map: Box::new(map),
            },
        }
    }

    /// Replay records that were assembled up front.
    pub fn ready(records: Vec<T>) -> Self {
        Self {
            inner: RecordInner::Ready(records.into()),
        }
    }

    pub fn empty() -> Self {
        Self::ready(Vec::new())
    }

    /// Pull the next record, or `None` once the sequence is exhausted.
    pub async fn next(&mut self) -> Option<Result<T>> {
        match &mut self.inner {
            RecordInner::Mapped { rows, map } => match rows.next().await? {
                Ok(row) => Some(map(row)),
                Err(e) => Some(Err(e)),
            },
            RecordInner::Ready(records) => records.pop_front().map(Ok),
        }
    }

    /// Drain the remainder of the sequence, failing on the first error.
    pub async fn collect(mut self) -> Result<Vec<T>> {
        let mut out = Vec::new();
        while let Some(record) = self.next().await {
            out.push(record?);
        }
        Ok(out)
    }
}
