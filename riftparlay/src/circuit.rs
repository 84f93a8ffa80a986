use crate::*;

use num_enum::TryFromPrimitive;

/// Number of mutually exclusive outcomes per circuit.
pub const PATHLINE_COUNT: usize = 4;

/// Shortest allowed open window: 10 minutes.
pub const MIN_DURATION: u64 = 10 * 60;

/// Longest allowed open window: 96 hours.
pub const MAX_DURATION: u64 = 96 * 60 * 60;

/// Unix timestamp in seconds. Core logic never reads a wall clock; callers
/// pass the current time in.
pub type Timestamp = u64;

/// One count per pathline, as reported by the decryption oracle.
pub type VoteCounts = [u64; PATHLINE_COUNT];

/// One of the four outcome categories of a circuit.
#[derive(Serialize, Deserialize, TryFromPrimitive, Copy, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Pathline {
    Nova = 0,
    Ember = 1,
    Tidal = 2,
    Quake = 3,
}

impl Pathline {
    pub const ALL: [Pathline; PATHLINE_COUNT] = [
        Pathline::Nova,
        Pathline::Ember,
        Pathline::Tidal,
        Pathline::Quake,
    ];

    pub fn index(&self) -> u8 {
        *self as u8
    }
}

impl std::fmt::Display for Pathline {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            Pathline::Nova => "nova",
            Pathline::Ember => "ember",
            Pathline::Tidal => "tidal",
            Pathline::Quake => "quake",
        };
        write!(f, "{}", name)
    }
}

/// Lifecycle position of a circuit, derived from its flags plus `now`.
/// "Locked" is never stored; it is a timestamp comparison.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CircuitStatus {
    Open,
    Locked,
    Revealing,
    Settled,
    Cancelled,
}

/// One prediction-market instance: a fixed lock deadline, four pathlines,
/// at most one encrypted entry per participant.
///
/// All state transitions live here so the rules stay testable with injected
/// timestamps. The registry wraps each circuit in a lock and serializes
/// mutations; these methods assume exclusive access.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Circuit {
    id: String,
    headline: String,
    creator: ParticipantId,
    created_at: Timestamp,
    lock_time: Timestamp,
    cancelled: bool,
    reveal_requested: bool,
    revealed_votes: Option<VoteCounts>,
    outcome: Option<Outcome>,
    entries: ChoiceStore,
}

impl Circuit {
    /// Create an open circuit locking at `now + duration_secs`.
    pub fn new(
        id: &str,
        headline: &str,
        creator: ParticipantId,
        duration_secs: u64,
        now: Timestamp,
    ) -> Result<Self, Error> {
        if duration_secs < MIN_DURATION || duration_secs > MAX_DURATION {
            return Err(Error::InvalidDuration(duration_secs));
        }

        Ok(Circuit {
            id: id.to_owned(),
            headline: headline.to_owned(),
            creator,
            created_at: now,
            lock_time: now + duration_secs,
            cancelled: false,
            reveal_requested: false,
            revealed_votes: None,
            outcome: None,
            entries: ChoiceStore::default(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn creator(&self) -> &ParticipantId {
        &self.creator
    }

    pub fn lock_time(&self) -> Timestamp {
        self.lock_time
    }

    pub fn is_locked(&self, now: Timestamp) -> bool {
        now >= self.lock_time
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn is_settled(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn status(&self, now: Timestamp) -> CircuitStatus {
        if self.cancelled {
            CircuitStatus::Cancelled
        } else if self.is_settled() {
            CircuitStatus::Settled
        } else if self.reveal_requested {
            CircuitStatus::Revealing
        } else if self.is_locked(now) {
            CircuitStatus::Locked
        } else {
            CircuitStatus::Open
        }
    }

    /// Record an encrypted entry while the circuit is still open.
    pub fn place_entry<V: ProofVerifier>(
        &mut self,
        participant: ParticipantId,
        ciphertext: Ciphertext,
        proof: &EntryProof,
        verifier: &V,
        now: Timestamp,
    ) -> Result<(), Error> {
        if self.cancelled {
            return Err(Error::Cancelled(self.id.clone()));
        }
        if self.is_settled() {
            return Err(Error::AlreadySettled(self.id.clone()));
        }
        if self.is_locked(now) {
            return Err(Error::Locked(self.id.clone()));
        }

        self.entries
            .record(&self.id, participant, ciphertext, proof, verifier)
    }

    /// Flag all stored ciphertexts for off-protocol decryption.
    ///
    /// Returns whether this call did the flagging; a repeat call is a
    /// harmless no-op and must not re-trigger side effects.
    pub fn request_reveal(&mut self, now: Timestamp) -> Result<bool, Error> {
        if self.cancelled {
            return Err(Error::Cancelled(self.id.clone()));
        }
        if !self.is_locked(now) {
            return Err(Error::NotLocked(self.id.clone()));
        }
        if self.reveal_requested {
            return Ok(false);
        }

        self.entries.mark_all_decryptable();
        self.reveal_requested = true;
        Ok(true)
    }

    /// Accept the oracle's aggregate count vector, exactly once.
    ///
    /// The engine cannot check the vector against the ciphertexts without
    /// decrypting them itself; the oracle is trusted on content, not timing.
    pub fn submit_tally(&mut self, votes: VoteCounts, now: Timestamp) -> Result<(), Error> {
        if self.cancelled {
            return Err(Error::Cancelled(self.id.clone()));
        }
        if !self.is_locked(now) {
            return Err(Error::NotLocked(self.id.clone()));
        }
        if self.revealed_votes.is_some() {
            return Err(Error::AlreadySubmitted(self.id.clone()));
        }

        self.revealed_votes = Some(votes);
        Ok(())
    }

    /// Resolve and store the settlement outcome.
    ///
    /// Cancellation takes precedence over every temporal guard, and a
    /// circuit with no submitted tally cannot settle.
    pub fn settle(&mut self, seed: &TieBreakSeed, now: Timestamp) -> Result<Outcome, Error> {
        if self.cancelled {
            return Err(Error::Cancelled(self.id.clone()));
        }
        if self.is_settled() {
            return Err(Error::AlreadySettled(self.id.clone()));
        }
        if !self.is_locked(now) {
            return Err(Error::NotLocked(self.id.clone()));
        }
        let votes = self
            .revealed_votes
            .as_ref()
            .ok_or_else(|| Error::TallyMissing(self.id.clone()))?;

        let outcome = resolve(votes, seed);
        self.outcome = Some(outcome);
        Ok(outcome)
    }

    /// Creator-only, permanent, blocked once settled.
    pub fn cancel(&mut self, caller: &ParticipantId) -> Result<(), Error> {
        if *caller != self.creator {
            return Err(Error::NotCreator(self.id.clone()));
        }
        if self.is_settled() {
            return Err(Error::AlreadySettled(self.id.clone()));
        }
        if self.cancelled {
            return Err(Error::Cancelled(self.id.clone()));
        }

        self.cancelled = true;
        Ok(())
    }

    pub fn has_entered(&self, participant: &ParticipantId) -> bool {
        self.entries.has_entered(participant)
    }

    pub fn entrants(&self) -> Vec<ParticipantId> {
        self.entries.entrants()
    }

    pub fn total_entrants(&self) -> usize {
        self.entries.len()
    }

    /// The stored ciphertext, unchanged regardless of decryptability state.
    pub fn encrypted_choice(&self, participant: &ParticipantId) -> Result<Ciphertext, Error> {
        self.entries
            .get(participant)
            .map(|entry| entry.ciphertext.clone())
            .ok_or_else(|| Error::EntryMissing(self.id.clone(), participant.clone()))
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        CircuitSnapshot {
            circuit_id: self.id.clone(),
            headline: self.headline.clone(),
            creator: self.creator.clone(),
            created_at: self.created_at,
            lock_time: self.lock_time,
            total_entrants: self.entries.len(),
            cancelled: self.cancelled,
            settled: self.is_settled(),
            push_all: self.outcome.map(|o| o.push_all()).unwrap_or(false),
            winning_pathline: self.outcome.and_then(|o| o.winning_pathline()),
            revealed_votes: self.revealed_votes,
            reveal_requested: self.reveal_requested,
        }
    }
}

/// Read-model of a circuit, the shape UI and indexers consume.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CircuitSnapshot {
    pub circuit_id: String,
    pub headline: String,
    pub creator: ParticipantId,
    pub created_at: Timestamp,
    pub lock_time: Timestamp,
    pub total_entrants: usize,
    pub cancelled: bool,
    pub settled: bool,
    pub push_all: bool,
    pub winning_pathline: Option<Pathline>,
    pub revealed_votes: Option<VoteCounts>,
    pub reveal_requested: bool,
}

impl CircuitSnapshot {
    pub fn status(&self, now: Timestamp) -> CircuitStatus {
        if self.cancelled {
            CircuitStatus::Cancelled
        } else if self.settled {
            CircuitStatus::Settled
        } else if self.reveal_requested {
            CircuitStatus::Revealing
        } else if now >= self.lock_time {
            CircuitStatus::Locked
        } else {
            CircuitStatus::Open
        }
    }
}
