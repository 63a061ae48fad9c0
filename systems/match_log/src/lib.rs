#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! In-memory match recorder that groups events by round and fingerprints the
//! full event stream.
//!
//! Two matches played from the same map, rules, seed, and decision logic
//! produce byte-identical event streams, so equal fingerprints are the replay
//! check used by tests and by the command line runner.

use std::io::Write;

use sha2::{Digest, Sha256};
use skirmish_core::{Event, MatchRecorder, Outcome};

/// Recorder that keeps every event of a match.
#[derive(Clone, Debug, Default)]
pub struct MatchLog {
    header: Option<Event>,
    rounds: Vec<Vec<Event>>,
    pending: Vec<Event>,
    footer: Option<Event>,
    hasher: Sha256,
    recorded: usize,
}

impl MatchLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The match header, once recorded.
    #[must_use]
    pub fn header(&self) -> Option<&Event> {
        self.header.as_ref()
    }

    /// Events of every completed round, each ending with its round summary.
    #[must_use]
    pub fn rounds(&self) -> &[Vec<Event>] {
        &self.rounds
    }

    /// The match footer, once recorded.
    #[must_use]
    pub fn footer(&self) -> Option<&Event> {
        self.footer.as_ref()
    }

    /// Outcome carried by the footer.
    #[must_use]
    pub fn outcome(&self) -> Option<Outcome> {
        match self.footer {
            Some(Event::MatchFooter { outcome, .. }) => outcome,
            _ => None,
        }
    }

    /// Number of events recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.recorded
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recorded == 0
    }

    /// Every recorded event in arrival order.
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.header
            .iter()
            .chain(self.rounds.iter().flatten())
            .chain(self.pending.iter())
            .chain(self.footer.iter())
    }

    /// SHA-256 over the JSON encoding of every event, as lowercase hex.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        self.hasher
            .clone()
            .finalize()
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect()
    }

    /// Writes every event as one JSON document per line.
    pub fn write_json_lines<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        for event in self.events() {
            serde_json::to_writer(&mut out, event)?;
            out.write_all(b"\n")?;
        }
        out.flush()
    }
}

impl MatchRecorder for MatchLog {
    fn record(&mut self, event: &Event) {
        self.recorded += 1;
        if let Ok(bytes) = serde_json::to_vec(event) {
            self.hasher.update(&bytes);
        }
        self.hasher.update(b"\n");

        match event {
            Event::MatchHeader { .. } => self.header = Some(event.clone()),
            Event::RoundSummary { .. } => {
                self.pending.push(event.clone());
                self.rounds.push(std::mem::take(&mut self.pending));
            }
            Event::MatchFooter { .. } => {
                if !self.pending.is_empty() {
                    self.rounds.push(std::mem::take(&mut self.pending));
                }
                self.footer = Some(event.clone());
            }
            _ => self.pending.push(event.clone()),
        }
    }
}
