//! Incremental chunked classification
//!
//! Splits a filtered record set into fixed-size chunks and classifies one
//! chunk per resumption, pausing between chunks so a consumer can redraw or
//! handle input. Every run holds a [`RunTicket`]; once the shared
//! [`RunGeneration`] moves on, the run stops delivering chunks.

use crate::config::MonitorConfig;
use crate::error::{CropwatchError, Result};
use crate::models::{AttributeSelection, ClassifiedRecord, OutcomeTally, Record, StandardProfile};
use crate::pipeline::classify::classify;

use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde::Serialize;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;
use tracing::debug;

/// Monotonic run counter shared by every run started from one monitor
#[derive(Debug, Clone, Default)]
pub struct RunGeneration {
    current: Arc<AtomicU64>,
}

impl RunGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation and return its ticket; older tickets become stale
    pub fn advance(&self) -> RunTicket {
        let id = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        RunTicket {
            id,
            current: Arc::clone(&self.current),
        }
    }

    /// Make every outstanding ticket stale without starting a run
    pub fn invalidate(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }
}

/// Proof that a run belongs to a particular generation
#[derive(Debug, Clone)]
pub struct RunTicket {
    id: u64,
    current: Arc<AtomicU64>,
}

impl RunTicket {
    /// Ticket for a run nobody else can supersede
    pub fn detached() -> Self {
        RunGeneration::new().advance()
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.id
    }
}

/// One classified chunk plus the tally of everything classified so far
#[derive(Debug, Clone, Serialize)]
pub struct ChunkResult {
    pub generation: u64,
    pub index: usize,
    pub classified: Vec<ClassifiedRecord>,
    /// Running tally over chunks 0..=index
    pub tally: OutcomeTally,
    /// Records still waiting in later chunks
    pub remaining: usize,
}

impl ChunkResult {
    pub fn is_last(&self) -> bool {
        self.remaining == 0
    }
}

/// Final state of a drained run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub generation: u64,
    pub tally: OutcomeTally,
    pub chunks_delivered: usize,
    /// True if a newer run cut this one short
    pub superseded: bool,
}

/// Chunked classifier with cooperative pauses
#[derive(Debug, Clone)]
pub struct IncrementalBatcher {
    chunk_size: usize,
    pause: Duration,
}

impl IncrementalBatcher {
    pub fn new(chunk_size: usize, pause: Duration) -> Result<Self> {
        if chunk_size == 0 {
            return Err(CropwatchError::configuration("chunk size must be at least 1"));
        }
        Ok(Self { chunk_size, pause })
    }

    pub fn from_config(config: &MonitorConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_pause())
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn pause(&self) -> Duration {
        self.pause
    }

    /// Start a run over `records`.
    ///
    /// With no records or no profile the run delivers no chunks and its tally
    /// leaves every record indeterminate.
    pub fn run(
        &self,
        records: Vec<Record>,
        profile: Option<StandardProfile>,
        attributes: AttributeSelection,
        ticket: RunTicket,
    ) -> BatchRun {
        let total = records.len();
        let generation = ticket.id();

        let Some(profile) = profile.filter(|_| total > 0) else {
            debug!(
                "Batch run {} has nothing to classify ({} records)",
                generation, total
            );
            return BatchRun {
                inner: stream::empty().boxed(),
                ticket,
                total,
                tally: OutcomeTally::unclassified(total),
                chunks_delivered: 0,
            };
        };

        let total_chunks = total.div_ceil(self.chunk_size);
        debug!(
            "Batch run {} over {} records in {} chunks of {}",
            generation, total, total_chunks, self.chunk_size
        );

        let state = RunState {
            records,
            profile,
            attributes,
            ticket: ticket.clone(),
            chunk_size: self.chunk_size,
            pause: self.pause,
            next_start: 0,
            index: 0,
            tally: OutcomeTally::default(),
        };

        BatchRun {
            inner: stream::unfold(state, next_chunk).fuse().boxed(),
            ticket,
            total,
            tally: OutcomeTally::default(),
            chunks_delivered: 0,
        }
    }
}

struct RunState {
    records: Vec<Record>,
    profile: StandardProfile,
    attributes: AttributeSelection,
    ticket: RunTicket,
    chunk_size: usize,
    pause: Duration,
    next_start: usize,
    index: usize,
    tally: OutcomeTally,
}

async fn next_chunk(mut state: RunState) -> Option<(ChunkResult, RunState)> {
    if state.next_start >= state.records.len() || !state.ticket.is_current() {
        return None;
    }

    if state.index > 0 {
        if state.pause.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(state.pause).await;
        }
        if !state.ticket.is_current() {
            debug!(
                "Batch run {} superseded before chunk {}",
                state.ticket.id(),
                state.index
            );
            return None;
        }
    }

    let start = state.next_start;
    let end = (start + state.chunk_size).min(state.records.len());
    let classified: Vec<ClassifiedRecord> = state.records[start..end]
        .iter()
        .map(|record| {
            let outcome = classify(record, Some(&state.profile), &state.attributes);
            state.tally.record(outcome);
            ClassifiedRecord {
                record: record.clone(),
                outcome,
            }
        })
        .collect();

    debug!(
        "Classified chunk {} of run {} ({} records)",
        state.index,
        state.ticket.id(),
        classified.len()
    );

    let chunk = ChunkResult {
        generation: state.ticket.id(),
        index: state.index,
        classified,
        tally: state.tally,
        remaining: state.records.len() - end,
    };

    state.next_start = end;
    state.index += 1;
    Some((chunk, state))
}

/// A running batch: a finite stream of [`ChunkResult`]s
pub struct BatchRun {
    inner: BoxStream<'static, ChunkResult>,
    ticket: RunTicket,
    total: usize,
    tally: OutcomeTally,
    chunks_delivered: usize,
}

impl BatchRun {
    pub fn generation(&self) -> u64 {
        self.ticket.id()
    }

    /// Number of records handed to the run
    pub fn total(&self) -> usize {
        self.total
    }

    /// Running tally over the chunks delivered so far
    pub fn tally(&self) -> OutcomeTally {
        self.tally
    }

    pub fn chunks_delivered(&self) -> usize {
        self.chunks_delivered
    }

    pub fn is_current(&self) -> bool {
        self.ticket.is_current()
    }

    /// Consume every remaining chunk and report where the run ended
    pub async fn drain(mut self) -> BatchSummary {
        while self.next().await.is_some() {}
        self.summary()
    }

    /// Feed every remaining chunk to `sink`, then report where the run ended
    pub async fn for_each_chunk<F>(mut self, mut sink: F) -> BatchSummary
    where
        F: FnMut(&ChunkResult),
    {
        while let Some(chunk) = self.next().await {
            sink(&chunk);
        }
        self.summary()
    }

    fn summary(&self) -> BatchSummary {
        BatchSummary {
            generation: self.ticket.id(),
            tally: self.tally,
            chunks_delivered: self.chunks_delivered,
            superseded: self.tally.total < self.total,
        }
    }
}

impl Stream for BatchRun {
    type Item = ChunkResult;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match this.inner.poll_next_unpin(cx) {
            Poll::Ready(Some(chunk)) => {
                if !this.ticket.is_current() {
                    return Poll::Ready(None);
                }
                this.tally = chunk.tally;
                this.chunks_delivered += 1;
                Poll::Ready(Some(chunk))
            }
            other => other,
        }
    }
}

impl std::fmt::Debug for BatchRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchRun")
            .field("generation", &self.ticket.id())
            .field("total", &self.total)
            .field("tally", &self.tally)
            .field("chunks_delivered", &self.chunks_delivered)
            .finish()
    }
}
