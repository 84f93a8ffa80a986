use crate::finish;
use crate::rest;

use riftparlay::{Ciphertext, DigestVerifier, ParticipantId, ProofContext};

pub fn command_enter(matches: &clap::ArgMatches, uri: &str) {
    let id = matches.value_of("ID").unwrap();
    let participant = ParticipantId::from(matches.value_of("participant").unwrap());

    // The choice is encrypted by the caller's wallet tooling; this client
    // only binds it to the circuit and identity.
    let ciphertext = match hex::decode(matches.value_of("ciphertext").unwrap()) {
        Ok(bytes) => Ciphertext(bytes),
        Err(e) => {
            eprintln!("riftparlay enter: ciphertext must be hex: {}", e);
            std::process::exit(1);
        }
    };
    let proof = DigestVerifier::expected_proof(
        &ciphertext,
        &ProofContext {
            circuit_id: id,
            participant: &participant,
        },
    );

    let body = serde_json::json!({
        "participant": participant,
        "ciphertext": hex::encode(ciphertext.as_bytes()),
        "proof": hex::encode(&proof.0),
    });
    finish(rest::post(uri, &format!("/api/circuit/{}/enter", id), &body));
}

pub fn command_entrants(matches: &clap::ArgMatches, uri: &str) {
    let id = matches.value_of("ID").unwrap();
    finish(rest::get(uri, &format!("/api/circuit/{}/entrants", id)));
}

pub fn command_entered(matches: &clap::ArgMatches, uri: &str) {
    let id = matches.value_of("ID").unwrap();
    let participant = matches.value_of("PARTICIPANT").unwrap();
    finish(rest::get(
        uri,
        &format!("/api/circuit/{}/entered/{}", id, participant),
    ));
}
