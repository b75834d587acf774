pub mod fingerprint;

pub use fingerprint::{DefinitionFingerprint, content_hash};
