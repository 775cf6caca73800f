use uuid::Uuid;

/// Number of characters in the random discriminator appended to batch keys.
pub const SUFFIX_LENGTH: usize = 8;

/// Source of the random discriminator that keeps two batches stored in the
/// same second by the same user apart.
pub trait SuffixSource {
    fn next_suffix(&self) -> String;
}

/// First 8 hex characters of a random v4 uuid.
#[derive(Clone)]
pub struct RandomSuffix {}

impl SuffixSource for RandomSuffix {
    fn next_suffix(&self) -> String {
        hex::encode(&Uuid::new_v4().as_bytes()[..SUFFIX_LENGTH / 2])
    }
}

#[derive(Clone)]
pub struct FixedSuffix {
    pub suffix: String,
}

impl SuffixSource for FixedSuffix {
    fn next_suffix(&self) -> String {
        self.suffix.clone()
    }
}
