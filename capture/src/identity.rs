use sha3::{Digest, Sha3_256};

use crate::api::CaptureError;

/// Raw contributor identifiers are uuid strings.
pub const USER_ID_LENGTH: usize = 36;
/// Hex encoded SHA3-256 digest.
pub const PUBLIC_USER_ID_LENGTH: usize = 64;

/// Pseudonymous public identifier for a raw contributor id: the lowercase hex
/// SHA3-256 digest of its UTF-8 bytes.
pub fn hash_user_id(user_id: &str) -> String {
    hex::encode(Sha3_256::digest(user_id.as_bytes()))
}

/// Lengths are counted in characters, not bytes.
pub fn validate_user_id(user_id: &str) -> Result<(), CaptureError> {
    if user_id.chars().count() != USER_ID_LENGTH {
        return Err(CaptureError::InvalidUserIdLength);
    }
    Ok(())
}

pub fn validate_public_user_id(public_user_id: &str) -> Result<(), CaptureError> {
    if public_user_id.chars().count() != PUBLIC_USER_ID_LENGTH {
        return Err(CaptureError::InvalidPublicUserIdLength);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::api::CaptureError;
    use crate::identity::{
        hash_user_id, validate_public_user_id, validate_user_id, PUBLIC_USER_ID_LENGTH,
    };

    #[test]
    fn hashes_known_vector() {
        // SHA3-256 of the empty string
        assert_eq!(
            hash_user_id(""),
            "a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a"
        );
    }

    #[test]
    fn hash_is_deterministic_and_fixed_length() {
        let user_id = "a".repeat(36);
        let first = hash_user_id(&user_id);
        let second = hash_user_id(&user_id);

        assert_eq!(first, second);
        assert_eq!(first.len(), PUBLIC_USER_ID_LENGTH);
        assert!(first
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn different_ids_hash_differently() {
        let first = hash_user_id("00000000-0000-0000-0000-000000000000");
        let second = hash_user_id("00000000-0000-0000-0000-000000000001");
        assert_ne!(first, second);
    }

    #[test]
    fn accepts_uuid_shaped_ids() {
        assert!(validate_user_id("5a1f0a3e-5d3c-4b0b-9b1e-1d2c3b4a5f6e").is_ok());
    }

    #[test]
    fn rejects_wrong_length_ids() {
        for user_id in ["", "short", &"a".repeat(35), &"a".repeat(37)] {
            let res = validate_user_id(user_id);
            assert!(matches!(res, Err(CaptureError::InvalidUserIdLength)));
        }
    }

    #[test]
    fn counts_characters_not_bytes() {
        // 36 characters, 72 bytes
        assert!(validate_user_id(&"é".repeat(36)).is_ok());
    }

    #[test]
    fn validates_public_ids() {
        assert!(validate_public_user_id(&hash_user_id("anything")).is_ok());
        assert!(matches!(
            validate_public_user_id("abc"),
            Err(CaptureError::InvalidPublicUserIdLength)
        ));
    }
}
