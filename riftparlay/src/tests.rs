use super::*;

const CREATED: Timestamp = 1_700_000_000;
const DURATION: u64 = 60 * 60;
const LOCKED: Timestamp = CREATED + DURATION;

fn place(
    registry: &CircuitRegistry<MemStore>,
    circuit_id: &str,
    who: &str,
    choice: u8,
    now: Timestamp,
) {
    // Stand-in for the external encryption primitive: the ciphertext bytes
    // are opaque to the engine either way.
    let participant = ParticipantId::from(who);
    let ciphertext = Ciphertext(vec![choice; 24]);
    let proof = DigestVerifier::expected_proof(
        &ciphertext,
        &ProofContext {
            circuit_id,
            participant: &participant,
        },
    );
    registry
        .enter(
            circuit_id,
            participant,
            ciphertext,
            &proof,
            &DigestVerifier,
            now,
        )
        .unwrap();
}

#[test]
fn end_to_end_circuit() {
    let registry = CircuitRegistry::in_memory();

    // Create a circuit with a one-hour window
    let snapshot = registry
        .create(
            "q1-activity",
            "Nova vs Ember vs Tidal vs Quake - Q1 Network Activity",
            "creator".into(),
            DURATION,
            CREATED,
        )
        .unwrap();
    assert_eq!(snapshot.status(CREATED), CircuitStatus::Open);
    assert_eq!(snapshot.lock_time, LOCKED);

    // Three participants commit encrypted choices while the window is open
    place(&registry, "q1-activity", "alice", 0, CREATED + 10);
    place(&registry, "q1-activity", "bob", 0, CREATED + 20);
    place(&registry, "q1-activity", "carol", 1, CREATED + 30);
    assert_eq!(registry.get("q1-activity").unwrap().total_entrants, 3);

    // Nothing past the lock works before it
    assert_eq!(
        registry
            .request_reveal("q1-activity", LOCKED - 1)
            .unwrap_err(),
        Error::NotLocked("q1-activity".to_owned())
    );

    // The window closes; anyone may flag the ciphertexts for the oracle
    registry.request_reveal("q1-activity", LOCKED).unwrap();
    assert_eq!(
        registry.get("q1-activity").unwrap().status(LOCKED),
        CircuitStatus::Revealing
    );

    // Every stored ciphertext is now publicly decryptable, unchanged
    let choice = registry
        .encrypted_choice("q1-activity", &"alice".into())
        .unwrap();
    assert_eq!(choice, Ciphertext(vec![0u8; 24]));

    // The oracle decrypts off-protocol and reports the aggregate
    registry
        .submit_tally("q1-activity", [2, 1, 0, 0], LOCKED + 60)
        .unwrap();

    // Settlement is deterministic: Nova carried the tally
    let outcome = registry
        .settle("q1-activity", &OsEntropy, LOCKED + 120)
        .unwrap();
    assert_eq!(outcome.winning_pathline(), Some(Pathline::Nova));
    assert!(!outcome.push_all());

    let settled = registry.get("q1-activity").unwrap();
    assert!(settled.settled);
    assert_eq!(settled.winning_pathline, Some(Pathline::Nova));
    assert_eq!(settled.revealed_votes, Some([2, 1, 0, 0]));
    assert_eq!(settled.status(LOCKED + 120), CircuitStatus::Settled);

    // Terminal: no second settlement, no late cancellation
    assert_eq!(
        registry
            .settle("q1-activity", &OsEntropy, LOCKED + 180)
            .unwrap_err(),
        Error::AlreadySettled("q1-activity".to_owned())
    );
    assert_eq!(
        registry
            .cancel("q1-activity", &"creator".into(), LOCKED + 180)
            .unwrap_err(),
        Error::AlreadySettled("q1-activity".to_owned())
    );

    // The event log tells the whole story in order
    let events = registry.events_for("q1-activity");
    assert_eq!(events.len(), 7);
    assert!(matches!(events[0].kind, EventKind::CircuitCreated { .. }));
    assert!(matches!(
        events.last().unwrap().kind,
        EventKind::CircuitSettled {
            push_all: false,
            winning_pathline: Some(Pathline::Nova),
            ..
        }
    ));
}

#[test]
fn tied_settlement_is_reproducible_from_the_seed() {
    let seed = [5u8; 32];

    let run = |registry: &CircuitRegistry<MemStore>| {
        registry
            .create("tied", "h", "creator".into(), DURATION, CREATED)
            .unwrap();
        registry
            .submit_tally("tied", [5, 5, 2, 0], LOCKED)
            .unwrap();
        registry
            .settle("tied", &FixedEntropy(seed), LOCKED)
            .unwrap()
    };

    let first = run(&CircuitRegistry::in_memory());
    let second = run(&CircuitRegistry::in_memory());
    assert_eq!(first, second);

    let winner = first.winning_pathline().unwrap();
    assert!(winner == Pathline::Nova || winner == Pathline::Ember);
}

#[test]
fn concurrent_entries_across_circuits_stay_isolated() {
    use std::sync::Arc;
    use std::thread;

    let registry = Arc::new(CircuitRegistry::in_memory());
    for id in ["left", "right"] {
        registry
            .create(id, id, "creator".into(), DURATION, CREATED)
            .unwrap();
    }

    let mut handles = Vec::new();
    for i in 0..8u8 {
        let registry = Arc::clone(&registry);
        handles.push(thread::spawn(move || {
            let circuit_id = if i % 2 == 0 { "left" } else { "right" };
            place(
                &registry,
                circuit_id,
                &format!("user-{}", i),
                i % 4,
                CREATED + 1 + i as u64,
            );
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(registry.get("left").unwrap().total_entrants, 4);
    assert_eq!(registry.get("right").unwrap().total_entrants, 4);

    // Eight entry events plus two creations, nothing lost.
    assert_eq!(registry.events().len(), 10);
}

#[test]
fn concurrent_duplicate_entries_admit_exactly_one() {
    use std::sync::Arc;
    use std::thread;

    let registry = Arc::new(CircuitRegistry::in_memory());
    registry
        .create("c1", "h", "creator".into(), DURATION, CREATED)
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let registry = Arc::clone(&registry);
        handles.push(thread::spawn(move || {
            let participant = ParticipantId::from("alice");
            let ciphertext = Ciphertext(vec![1u8; 24]);
            let proof = DigestVerifier::expected_proof(
                &ciphertext,
                &ProofContext {
                    circuit_id: "c1",
                    participant: &participant,
                },
            );
            registry
                .enter(
                    "c1",
                    participant,
                    ciphertext,
                    &proof,
                    &DigestVerifier,
                    CREATED + 5,
                )
                .is_ok()
        }));
    }

    let admitted = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();
    assert_eq!(admitted, 1);
    assert_eq!(registry.get("c1").unwrap().total_entrants, 1);
}
