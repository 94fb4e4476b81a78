use pong_shared::protocol::{SyncEnvelope, SyncMsg};

/// Outgoing sync messages, stamped with this peer's monotonic sequence.
#[derive(Debug)]
pub struct Outbox {
    next_seq: u64,
    pending: Vec<SyncEnvelope>,
}

impl Outbox {
    pub fn new() -> Self {
        Self {
            next_seq: 1,
            pending: Vec::new(),
        }
    }

    pub fn push(&mut self, msg: SyncMsg) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(SyncEnvelope { seq, msg });
    }

    /// Make sure the next sequence is above `seq`. Used when taking over as
    /// authority so peers do not discard our corrections as stale.
    pub fn continue_after(&mut self, seq: u64) {
        self.next_seq = self.next_seq.max(seq + 1);
    }

    /// Envelopes pushed since the last drain.
    pub fn pending(&self) -> &[SyncEnvelope] {
        &self.pending
    }

    pub fn drain(&mut self) -> Vec<SyncEnvelope> {
        std::mem::take(&mut self.pending)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }
}

impl Default for Outbox {
    fn default() -> Self {
        Self::new()
    }
}
