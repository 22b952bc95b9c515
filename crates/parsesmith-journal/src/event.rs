//! Journal entry and log types.
//!
//! `JournalEntry` wraps one `AttemptRecord` with sequence numbering and the
//! SHA-256 hashes that make tampering detectable. `JournalLog` is the sealed
//! form exported once a run finishes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use parsesmith_contracts::{execution::AttemptRecord, state::Phase};

/// One attempt in the hash chain.
///
/// Changing any field, including those of the embedded `record`, invalidates
/// `this_hash` and every later `prev_hash`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Position in the chain, starting at 0.
    pub sequence: u64,

    /// The run this attempt belongs to.
    pub run_id: String,

    pub record: AttemptRecord,

    /// Hash of the previous entry, or `GENESIS_HASH` for the first.
    pub prev_hash: String,

    /// Hash over (run_id, sequence, prev_hash, canonical JSON of record).
    pub this_hash: String,
}

impl JournalEntry {
    /// The `prev_hash` of the first entry in every chain.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}

/// A sealed journal for one target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalLog {
    pub target: String,

    /// All entries in chain order.
    pub entries: Vec<JournalEntry>,

    /// `Success` or `Exhausted` once the run has been finalized.
    pub terminal_phase: Option<Phase>,

    pub finalized_at: DateTime<Utc>,

    /// `this_hash` of the last entry. Empty when there are no entries.
    pub terminal_hash: String,
}
