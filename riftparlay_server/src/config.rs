use riftparlay::{
    DigestVerifier, EntropySource, OsEntropy, PermissiveVerifier, ProofVerifier, SeededEntropy,
    TieBreakSeed,
};
use std::env::var;

pub struct Config {
    pub trust_proofs: bool,
    pub entropy_seed: Option<TieBreakSeed>,
}

impl Config {
    pub fn from_env() -> Self {
        let trust_proofs = match var("RIFTPARLAY_TRUST_PROOFS") {
            Ok(val) => val == "1" || val.eq_ignore_ascii_case("true"),
            Err(_e) => false,
        };

        // Hex-encoded 32-byte seed for reproducible settlements. Leave unset
        // in production so tie-breaks stay unpredictable.
        let entropy_seed = match var("RIFTPARLAY_ENTROPY_SEED") {
            Ok(val) => {
                let bytes = hex::decode(&val)
                    .expect("RIFTPARLAY_ENTROPY_SEED must be hex");
                let mut seed = [0u8; 32];
                if bytes.len() != seed.len() {
                    panic!("RIFTPARLAY_ENTROPY_SEED must be 32 bytes");
                }
                seed.copy_from_slice(&bytes);
                Some(seed)
            }
            Err(_e) => None,
        };

        Config {
            trust_proofs,
            entropy_seed,
        }
    }

    pub fn verifier(&self) -> Box<dyn ProofVerifier + Send + Sync> {
        if self.trust_proofs {
            Box::new(PermissiveVerifier)
        } else {
            Box::new(DigestVerifier)
        }
    }

    pub fn entropy(&self) -> Box<dyn EntropySource + Send + Sync> {
        match self.entropy_seed {
            Some(seed) => Box::new(SeededEntropy::new(seed)),
            None => Box::new(OsEntropy),
        }
    }
}
