use rand::Rng;
pub use slotbook_core::DEFAULT_REFERENCE_LENGTH;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Source of human-readable booking references.
///
/// Uniqueness is enforced by the store; sources only need to be unlikely to repeat.
pub trait ReferenceSource: Send + Sync {
    fn next_reference(&self) -> String;
}

#[derive(Debug, Clone)]
pub struct RandomReference {
    length: usize,
}

impl RandomReference {
    pub fn new(length: usize) -> Self {
        Self {
            length: length.max(1),
        }
    }
}

impl Default for RandomReference {
    fn default() -> Self {
        Self::new(DEFAULT_REFERENCE_LENGTH)
    }
}

impl ReferenceSource for RandomReference {
    fn next_reference(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..self.length)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect()
    }
}

pub fn is_well_formed(reference: &str) -> bool {
    !reference.is_empty() && reference.bytes().all(|b| ALPHABET.contains(&b))
}
