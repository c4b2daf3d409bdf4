mod engine;

pub use engine::{CryptoEngine, SignedPurpose};
