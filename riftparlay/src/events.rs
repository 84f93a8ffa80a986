use crate::*;

use std::sync::Mutex;
use uuid::Uuid;

/// A lifecycle transition, in the shape indexers and the UI consume.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    CircuitCreated {
        circuit_id: String,
        creator: ParticipantId,
        lock_time: Timestamp,
    },
    EntryPlaced {
        circuit_id: String,
        participant: ParticipantId,
    },
    RevealRequested {
        circuit_id: String,
    },
    VotesRevealed {
        circuit_id: String,
        votes: VoteCounts,
    },
    CircuitSettled {
        circuit_id: String,
        push_all: bool,
        winning_pathline: Option<Pathline>,
    },
    CircuitCancelled {
        circuit_id: String,
    },
}

impl EventKind {
    pub fn circuit_id(&self) -> &str {
        match self {
            EventKind::CircuitCreated { circuit_id, .. } => circuit_id,
            EventKind::EntryPlaced { circuit_id, .. } => circuit_id,
            EventKind::RevealRequested { circuit_id } => circuit_id,
            EventKind::VotesRevealed { circuit_id, .. } => circuit_id,
            EventKind::CircuitSettled { circuit_id, .. } => circuit_id,
            EventKind::CircuitCancelled { circuit_id } => circuit_id,
        }
    }
}

/// A recorded event: what happened, when, under which record id.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: Uuid,
    pub at: Timestamp,
    #[serde(flatten)]
    pub kind: EventKind,
}

/// Append-only record of lifecycle transitions.
///
/// Events are appended while the originating circuit's lock is held, so the
/// log order agrees with the per-circuit operation order.
#[derive(Debug, Default)]
pub struct EventLog {
    inner: Mutex<Vec<Event>>,
}

impl EventLog {
    pub fn append(&self, at: Timestamp, kind: EventKind) {
        let event = Event {
            id: Uuid::new_v4(),
            at,
            kind,
        };
        self.inner.lock().unwrap().push(event);
    }

    /// A consistent copy of the whole log.
    pub fn snapshot(&self) -> Vec<Event> {
        self.inner.lock().unwrap().clone()
    }

    /// Events touching one circuit, in append order.
    pub fn for_circuit(&self, circuit_id: &str) -> Vec<Event> {
        self.inner
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind.circuit_id() == circuit_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }
}
