use crate::*;

use indexmap::IndexMap;
use std::sync::{Arc, Mutex, RwLock};

/// Storage backing the registry.
///
/// Injected so the engine can sit on an in-memory map in tests and on
/// something persistent in a deployment. Implementations hand out each
/// circuit behind its own lock; the registry serializes every mutation of a
/// circuit through that lock, which is what keeps operations on one circuit
/// totally ordered while different circuits proceed independently.
pub trait CircuitStore: Send + Sync {
    /// Insert a new circuit. The duplicate check and the insert are one
    /// atomic step.
    fn insert(&self, circuit: Circuit) -> Result<(), Error>;

    fn get(&self, id: &str) -> Option<Arc<Mutex<Circuit>>>;

    /// All ids in insertion order, including cancelled and settled circuits.
    fn list_ids(&self) -> Vec<String>;
}

/// A simple store that uses an in-memory IndexMap.
#[derive(Default)]
pub struct MemStore {
    inner: RwLock<IndexMap<String, Arc<Mutex<Circuit>>>>,
}

impl CircuitStore for MemStore {
    fn insert(&self, circuit: Circuit) -> Result<(), Error> {
        let mut inner = self.inner.write().unwrap();
        if inner.contains_key(circuit.id()) {
            return Err(Error::CircuitExists(circuit.id().to_owned()));
        }
        inner.insert(circuit.id().to_owned(), Arc::new(Mutex::new(circuit)));
        Ok(())
    }

    fn get(&self, id: &str) -> Option<Arc<Mutex<Circuit>>> {
        self.inner.read().unwrap().get(id).cloned()
    }

    fn list_ids(&self) -> Vec<String> {
        self.inner.read().unwrap().keys().cloned().collect()
    }
}

/// The single source of truth for circuit existence, and the front door for
/// every lifecycle operation.
///
/// Collaborators come in as ports: proof verification and tie-break entropy
/// are injected per call, timestamps are passed in by the caller. The
/// registry adds per-circuit locking and event emission on top of the
/// transitions defined on `Circuit`.
pub struct CircuitRegistry<S: CircuitStore> {
    store: S,
    events: EventLog,
}

impl CircuitRegistry<MemStore> {
    pub fn in_memory() -> Self {
        CircuitRegistry::new(MemStore::default())
    }
}

impl<S: CircuitStore> CircuitRegistry<S> {
    pub fn new(store: S) -> Self {
        CircuitRegistry {
            store,
            events: EventLog::default(),
        }
    }

    fn circuit(&self, id: &str) -> Result<Arc<Mutex<Circuit>>, Error> {
        self.store
            .get(id)
            .ok_or_else(|| Error::CircuitMissing(id.to_owned()))
    }

    /// Create a circuit locking at `now + duration_secs`.
    pub fn create(
        &self,
        id: &str,
        headline: &str,
        creator: ParticipantId,
        duration_secs: u64,
        now: Timestamp,
    ) -> Result<CircuitSnapshot, Error> {
        let circuit = Circuit::new(id, headline, creator.clone(), duration_secs, now)?;
        let snapshot = circuit.snapshot();
        self.store.insert(circuit)?;

        self.events.append(
            now,
            EventKind::CircuitCreated {
                circuit_id: id.to_owned(),
                creator,
                lock_time: snapshot.lock_time,
            },
        );
        Ok(snapshot)
    }

    pub fn get(&self, id: &str) -> Result<CircuitSnapshot, Error> {
        let circuit = self.circuit(id)?;
        let circuit = circuit.lock().unwrap();
        Ok(circuit.snapshot())
    }

    pub fn list_ids(&self) -> Vec<String> {
        self.store.list_ids()
    }

    pub fn has_entered(&self, id: &str, participant: &ParticipantId) -> Result<bool, Error> {
        let circuit = self.circuit(id)?;
        let circuit = circuit.lock().unwrap();
        Ok(circuit.has_entered(participant))
    }

    /// Entrant identities only; ciphertexts are never exposed here.
    pub fn entrants(&self, id: &str) -> Result<Vec<ParticipantId>, Error> {
        let circuit = self.circuit(id)?;
        let circuit = circuit.lock().unwrap();
        Ok(circuit.entrants())
    }

    pub fn encrypted_choice(
        &self,
        id: &str,
        participant: &ParticipantId,
    ) -> Result<Ciphertext, Error> {
        let circuit = self.circuit(id)?;
        let circuit = circuit.lock().unwrap();
        circuit.encrypted_choice(participant)
    }

    pub fn enter<V: ProofVerifier>(
        &self,
        id: &str,
        participant: ParticipantId,
        ciphertext: Ciphertext,
        proof: &EntryProof,
        verifier: &V,
        now: Timestamp,
    ) -> Result<(), Error> {
        let circuit = self.circuit(id)?;
        let mut circuit = circuit.lock().unwrap();
        circuit.place_entry(participant.clone(), ciphertext, proof, verifier, now)?;

        self.events.append(
            now,
            EventKind::EntryPlaced {
                circuit_id: id.to_owned(),
                participant,
            },
        );
        Ok(())
    }

    /// Callable by anyone once the lock has passed; only the first effective
    /// call flags ciphertexts and emits an event.
    pub fn request_reveal(&self, id: &str, now: Timestamp) -> Result<(), Error> {
        let circuit = self.circuit(id)?;
        let mut circuit = circuit.lock().unwrap();
        let newly_revealed = circuit.request_reveal(now)?;

        if newly_revealed {
            self.events.append(
                now,
                EventKind::RevealRequested {
                    circuit_id: id.to_owned(),
                },
            );
        }
        Ok(())
    }

    pub fn submit_tally(&self, id: &str, votes: VoteCounts, now: Timestamp) -> Result<(), Error> {
        let circuit = self.circuit(id)?;
        let mut circuit = circuit.lock().unwrap();
        circuit.submit_tally(votes, now)?;

        self.events.append(
            now,
            EventKind::VotesRevealed {
                circuit_id: id.to_owned(),
                votes,
            },
        );
        Ok(())
    }

    pub fn settle<E: EntropySource>(
        &self,
        id: &str,
        entropy: &E,
        now: Timestamp,
    ) -> Result<Outcome, Error> {
        let circuit = self.circuit(id)?;
        let mut circuit = circuit.lock().unwrap();
        let seed = entropy.tie_break_seed();
        let outcome = circuit.settle(&seed, now)?;

        self.events.append(
            now,
            EventKind::CircuitSettled {
                circuit_id: id.to_owned(),
                push_all: outcome.push_all(),
                winning_pathline: outcome.winning_pathline(),
            },
        );
        Ok(outcome)
    }

    pub fn cancel(&self, id: &str, caller: &ParticipantId, now: Timestamp) -> Result<(), Error> {
        let circuit = self.circuit(id)?;
        let mut circuit = circuit.lock().unwrap();
        circuit.cancel(caller)?;

        self.events.append(
            now,
            EventKind::CircuitCancelled {
                circuit_id: id.to_owned(),
            },
        );
        Ok(())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.snapshot()
    }

    pub fn events_for(&self, circuit_id: &str) -> Vec<Event> {
        self.events.for_circuit(circuit_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: Timestamp = 1_700_000_000;

    fn registry() -> CircuitRegistry<MemStore> {
        CircuitRegistry::in_memory()
    }

    fn enter(
        registry: &CircuitRegistry<MemStore>,
        id: &str,
        who: &str,
        now: Timestamp,
    ) -> Result<(), Error> {
        let participant = ParticipantId::from(who);
        let ciphertext = Ciphertext(who.as_bytes().to_vec());
        let proof = DigestVerifier::expected_proof(
            &ciphertext,
            &ProofContext {
                circuit_id: id,
                participant: &participant,
            },
        );
        registry.enter(id, participant, ciphertext, &proof, &DigestVerifier, now)
    }

    #[test]
    fn create_and_lookup() {
        let registry = registry();
        let snapshot = registry
            .create("c1", "Which pathline wins Q1?", "creator".into(), 3600, NOW)
            .unwrap();
        assert_eq!(snapshot.circuit_id, "c1");
        assert_eq!(snapshot.lock_time, NOW + 3600);

        let fetched = registry.get("c1").unwrap();
        assert_eq!(fetched, snapshot);

        assert_eq!(
            registry.get("nope").unwrap_err(),
            Error::CircuitMissing("nope".to_owned())
        );
    }

    #[test]
    fn duplicate_id_rejected_whatever_the_fields() {
        let registry = registry();
        registry
            .create("dup", "first", "a".into(), 3600, NOW)
            .unwrap();
        let err = registry
            .create("dup", "different headline", "b".into(), 7200, NOW + 5)
            .unwrap_err();
        assert_eq!(err, Error::CircuitExists("dup".to_owned()));
        // The stored circuit is the first one.
        assert_eq!(registry.get("dup").unwrap().headline, "first");
    }

    #[test]
    fn list_ids_keeps_insertion_order_and_never_prunes() {
        let registry = registry();
        for id in ["one", "two", "three"] {
            registry.create(id, id, "creator".into(), 3600, NOW).unwrap();
        }
        registry.cancel("two", &"creator".into(), NOW + 1).unwrap();

        assert_eq!(
            registry.list_ids(),
            vec!["one".to_owned(), "two".to_owned(), "three".to_owned()]
        );
    }

    #[test]
    fn entering_twice_fails_without_touching_state() {
        let registry = registry();
        registry
            .create("c1", "h", "creator".into(), 3600, NOW)
            .unwrap();

        enter(&registry, "c1", "alice", NOW + 1).unwrap();
        let err = enter(&registry, "c1", "alice", NOW + 2).unwrap_err();
        assert_eq!(
            err,
            Error::AlreadyEntered("c1".to_owned(), "alice".into())
        );
        assert_eq!(registry.get("c1").unwrap().total_entrants, 1);
    }

    #[test]
    fn entrants_are_listed_without_ciphertexts() {
        let registry = registry();
        registry
            .create("c1", "h", "creator".into(), 3600, NOW)
            .unwrap();
        enter(&registry, "c1", "alice", NOW + 1).unwrap();
        enter(&registry, "c1", "bob", NOW + 2).unwrap();

        assert_eq!(
            registry.entrants("c1").unwrap(),
            vec![ParticipantId::from("alice"), ParticipantId::from("bob")]
        );
        assert!(registry.has_entered("c1", &"alice".into()).unwrap());
        assert!(!registry.has_entered("c1", &"carol".into()).unwrap());
    }

    #[test]
    fn encrypted_choice_round_trips_unchanged() {
        let registry = registry();
        registry
            .create("c1", "h", "creator".into(), 3600, NOW)
            .unwrap();
        enter(&registry, "c1", "alice", NOW + 1).unwrap();

        let before = registry.encrypted_choice("c1", &"alice".into()).unwrap();
        registry.request_reveal("c1", NOW + 3600).unwrap();
        let after = registry.encrypted_choice("c1", &"alice".into()).unwrap();
        assert_eq!(before, after);

        assert_eq!(
            registry
                .encrypted_choice("c1", &"nobody".into())
                .unwrap_err(),
            Error::EntryMissing("c1".to_owned(), "nobody".into())
        );
    }

    #[test]
    fn circuits_do_not_interfere() {
        let registry = registry();
        for id in ["a", "b", "c"] {
            registry.create(id, id, "creator".into(), 3600, NOW).unwrap();
        }
        enter(&registry, "a", "alice", NOW + 1).unwrap();
        enter(&registry, "c", "alice", NOW + 1).unwrap();

        registry.cancel("b", &"creator".into(), NOW + 2).unwrap();

        let a = registry.get("a").unwrap();
        let b = registry.get("b").unwrap();
        let c = registry.get("c").unwrap();
        assert!(!a.cancelled);
        assert!(b.cancelled);
        assert!(!c.cancelled);
        assert_eq!(a.total_entrants, 1);
        assert_eq!(b.total_entrants, 0);
        assert_eq!(c.total_entrants, 1);
    }

    #[test]
    fn lifecycle_emits_one_event_per_transition() {
        let registry = registry();
        registry
            .create("c1", "h", "creator".into(), 3600, NOW)
            .unwrap();
        enter(&registry, "c1", "alice", NOW + 1).unwrap();
        registry.request_reveal("c1", NOW + 3600).unwrap();
        // Second reveal request: no new event.
        registry.request_reveal("c1", NOW + 3601).unwrap();
        registry
            .submit_tally("c1", [1, 0, 0, 0], NOW + 3700)
            .unwrap();
        registry
            .settle("c1", &FixedEntropy([0u8; 32]), NOW + 3800)
            .unwrap();

        let kinds: Vec<&'static str> = registry
            .events_for("c1")
            .iter()
            .map(|e| match e.kind {
                EventKind::CircuitCreated { .. } => "created",
                EventKind::EntryPlaced { .. } => "entered",
                EventKind::RevealRequested { .. } => "reveal",
                EventKind::VotesRevealed { .. } => "votes",
                EventKind::CircuitSettled { .. } => "settled",
                EventKind::CircuitCancelled { .. } => "cancelled",
            })
            .collect();
        assert_eq!(kinds, vec!["created", "entered", "reveal", "votes", "settled"]);
    }

    #[test]
    fn failed_guard_emits_no_event() {
        let registry = registry();
        registry
            .create("c1", "h", "creator".into(), 3600, NOW)
            .unwrap();
        let before = registry.events().len();

        assert!(registry.request_reveal("c1", NOW).is_err());
        assert!(registry
            .settle("c1", &FixedEntropy([0u8; 32]), NOW)
            .is_err());
        assert!(registry.cancel("c1", &"mallory".into(), NOW).is_err());

        assert_eq!(registry.events().len(), before);
    }

    #[test]
    fn settlement_outcome_is_recorded_in_the_event() {
        let registry = registry();
        registry
            .create("c1", "h", "creator".into(), 3600, NOW)
            .unwrap();
        registry
            .submit_tally("c1", [0, 0, 0, 0], NOW + 3600)
            .unwrap();
        registry
            .settle("c1", &FixedEntropy([0u8; 32]), NOW + 3600)
            .unwrap();

        let events = registry.events_for("c1");
        match &events.last().unwrap().kind {
            EventKind::CircuitSettled {
                push_all,
                winning_pathline,
                ..
            } => {
                assert!(*push_all);
                assert_eq!(*winning_pathline, None);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
