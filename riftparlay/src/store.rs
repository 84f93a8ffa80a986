use crate::*;

use indexmap::IndexMap;
use sha2::{Digest, Sha512};

/// Identity of a caller, as reported by the wallet layer.
///
/// The engine treats identities as opaque strings; it never verifies them
/// itself. Signature checking belongs to the transport in front of us.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        ParticipantId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        ParticipantId(s.to_owned())
    }
}

/// An opaque verified ciphertext holding one encrypted pathline choice.
///
/// The engine never decrypts these bytes; decryption happens off-protocol
/// once the ciphertext has been flagged publicly decryptable.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Ciphertext(#[serde(with = "hex::serde")] pub Vec<u8>);

impl Ciphertext {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Proof that a ciphertext was produced for a specific circuit and caller.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EntryProof(#[serde(with = "hex::serde")] pub Vec<u8>);

/// The binding context an entry proof is verified against.
pub struct ProofContext<'a> {
    pub circuit_id: &'a str,
    pub participant: &'a ParticipantId,
}

/// Verification of an entry proof against its binding context.
///
/// The underlying encryption scheme is external to this engine, so
/// verification is an injected collaborator.
pub trait ProofVerifier {
    fn verify(&self, ciphertext: &Ciphertext, proof: &EntryProof, context: &ProofContext) -> bool;
}

/// Binds a proof to `(ciphertext, circuit, participant)` by SHA-512 digest.
///
/// This is the shipped stand-in for the external proof primitive: it rejects
/// a ciphertext replayed into another circuit or under another identity,
/// which is the replay surface the engine itself is responsible for.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestVerifier;

impl DigestVerifier {
    pub fn expected_proof(ciphertext: &Ciphertext, context: &ProofContext) -> EntryProof {
        let mut hasher = Sha512::new();
        hasher.update(ciphertext.as_bytes());
        hasher.update(context.circuit_id.as_bytes());
        hasher.update(context.participant.as_str().as_bytes());
        EntryProof(hasher.finalize().to_vec())
    }
}

impl ProofVerifier for DigestVerifier {
    fn verify(&self, ciphertext: &Ciphertext, proof: &EntryProof, context: &ProofContext) -> bool {
        *proof == DigestVerifier::expected_proof(ciphertext, context)
    }
}

impl<V: ProofVerifier + ?Sized> ProofVerifier for &V {
    fn verify(&self, ciphertext: &Ciphertext, proof: &EntryProof, context: &ProofContext) -> bool {
        (**self).verify(ciphertext, proof, context)
    }
}

impl<V: ProofVerifier + ?Sized> ProofVerifier for Box<V> {
    fn verify(&self, ciphertext: &Ciphertext, proof: &EntryProof, context: &ProofContext) -> bool {
        (**self).verify(ciphertext, proof, context)
    }
}

/// Accepts every proof. For tests and for deployments where verification
/// already happened upstream.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveVerifier;

impl ProofVerifier for PermissiveVerifier {
    fn verify(&self, _: &Ciphertext, _: &EntryProof, _: &ProofContext) -> bool {
        true
    }
}

/// Who may exercise a capability on a stored ciphertext.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Principal {
    /// The engine itself.
    Engine,
    /// A single participant.
    Participant(ParticipantId),
    /// Anyone, including the off-protocol decryption oracle.
    Public,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Operate on the ciphertext (re-grant, flag for decryption).
    Operate,
    /// Decrypt the ciphertext off-protocol.
    Decrypt,
}

/// One capability grant on one stored ciphertext.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub principal: Principal,
    pub capability: Capability,
}

/// A participant's encrypted, proof-verified commitment to one pathline.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Entry {
    pub ciphertext: Ciphertext,
    pub grants: Vec<Grant>,
}

impl Entry {
    fn new(participant: &ParticipantId, ciphertext: Ciphertext) -> Self {
        // The engine may operate on the ciphertext; the participant may
        // decrypt their own value. Nobody else sees anything until reveal.
        let grants = vec![
            Grant {
                principal: Principal::Engine,
                capability: Capability::Operate,
            },
            Grant {
                principal: Principal::Participant(participant.clone()),
                capability: Capability::Decrypt,
            },
        ];
        Entry { ciphertext, grants }
    }

    pub fn may_decrypt(&self, principal: &Principal) -> bool {
        self.grants.iter().any(|g| {
            g.capability == Capability::Decrypt
                && (g.principal == Principal::Public || g.principal == *principal)
        })
    }

    fn make_publicly_decryptable(&mut self) {
        let grant = Grant {
            principal: Principal::Public,
            capability: Capability::Decrypt,
        };
        if !self.grants.contains(&grant) {
            self.grants.push(grant);
        }
    }
}

/// Holds one ciphertext per participant for a single circuit, plus the
/// capability grants attached to each. Owned by the parent `Circuit` and
/// never pruned.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ChoiceStore {
    entries: IndexMap<ParticipantId, Entry>,
}

impl ChoiceStore {
    /// Record a verified ciphertext for a participant.
    ///
    /// The duplicate check and proof verification both run before anything
    /// is written, so a rejected record leaves the store untouched.
    pub fn record<V: ProofVerifier>(
        &mut self,
        circuit_id: &str,
        participant: ParticipantId,
        ciphertext: Ciphertext,
        proof: &EntryProof,
        verifier: &V,
    ) -> Result<(), Error> {
        if self.entries.contains_key(&participant) {
            return Err(Error::AlreadyEntered(circuit_id.to_owned(), participant));
        }

        let context = ProofContext {
            circuit_id,
            participant: &participant,
        };
        if !verifier.verify(&ciphertext, proof, &context) {
            return Err(Error::InvalidProof);
        }

        let entry = Entry::new(&participant, ciphertext);
        self.entries.insert(participant, entry);
        Ok(())
    }

    /// Flag every stored ciphertext as publicly decryptable so the external
    /// oracle can read them off-protocol. Irreversible.
    pub fn mark_all_decryptable(&mut self) {
        for entry in self.entries.values_mut() {
            entry.make_publicly_decryptable();
        }
    }

    pub fn get(&self, participant: &ParticipantId) -> Option<&Entry> {
        self.entries.get(participant)
    }

    pub fn has_entered(&self, participant: &ParticipantId) -> bool {
        self.entries.contains_key(participant)
    }

    /// Entrants in the order they entered.
    pub fn entrants(&self) -> Vec<ParticipantId> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
