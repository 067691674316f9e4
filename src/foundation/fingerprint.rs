use xxhash_rust::xxh3::Xxh3;

const XXH3_SEED: u64 = 0x4b1e_7a9d_03c2_55e1;

/// Stable 128-bit digest of an item state.
///
/// Two states with equal fingerprints are bit-identical for every hashed field (floats are hashed
/// by bit pattern, so `0.0` and `-0.0` differ).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StateFingerprint {
    /// High 64 bits.
    pub hi: u64,
    /// Low 64 bits.
    pub lo: u64,
}

pub(crate) struct StableHasher {
    inner: Xxh3,
}

impl StableHasher {
    pub(crate) fn new() -> Self {
        Self {
            inner: Xxh3::with_seed(XXH3_SEED),
        }
    }

    pub(crate) fn write_bytes(&mut self, b: &[u8]) {
        self.inner.update(b);
    }

    pub(crate) fn write_u8(&mut self, v: u8) {
        self.write_bytes(&[v]);
    }

    pub(crate) fn write_u16(&mut self, v: u16) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub(crate) fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub(crate) fn write_f64(&mut self, v: f64) {
        self.write_bytes(&v.to_bits().to_le_bytes());
    }

    pub(crate) fn finish(self) -> StateFingerprint {
        let v = self.inner.digest128();
        StateFingerprint {
            hi: (v >> 64) as u64,
            lo: v as u64,
        }
    }
}
