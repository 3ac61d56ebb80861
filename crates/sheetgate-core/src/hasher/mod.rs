pub mod sha256;
pub mod token;

pub use sha256::{hash_bytes, hash_reader, ContentDigest, SHORT_HEX_LEN};
pub use token::new_token;
