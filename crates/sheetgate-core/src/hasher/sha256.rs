use sha2::digest::Output;
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::{self, Read};

/// Hex length of the fragment embedded in stored names (64 bits).
pub const SHORT_HEX_LEN: usize = 16;

/// SHA-256 over the complete content of an upload.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest(Output<Sha256>);

impl ContentDigest {
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }

    pub fn to_hex(&self) -> String {
        format!("{:x}", self.0)
    }

    pub fn short(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(SHORT_HEX_LEN);
        hex
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentDigest({})", self.short())
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Consumes the reader to EOF.
pub fn hash_reader<R: Read>(mut reader: R) -> io::Result<ContentDigest> {
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(ContentDigest(hasher.finalize()))
}

pub fn hash_bytes(data: &[u8]) -> ContentDigest {
    ContentDigest(Sha256::digest(data))
}
