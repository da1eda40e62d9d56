//! Identifier codec.
//!
//! Records carry their identity as a 24-character hex string; the store
//! keys documents by `ObjectId`.

use bson::oid::ObjectId;
use thiserror::Error;

/// The input is not a valid hex encoding of an `ObjectId`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("`{input}` is not a valid identifier (expected 24 hex characters)")]
pub struct InvalidIdentifier {
    pub input: String,
}

/// Decode an external identifier into the store's native key.
pub fn decode(input: &str) -> Result<ObjectId, InvalidIdentifier> {
    ObjectId::parse_str(input).map_err(|_| InvalidIdentifier {
        input: input.to_string(),
    })
}

/// Encode a native key into its external form.
pub fn encode(id: &ObjectId) -> String {
    id.to_hex()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_valid_identifier() {
        let id = decode("642d5b2298ba2bb73c55e5c4").unwrap();
        assert_eq!(encode(&id), "642d5b2298ba2bb73c55e5c4");
    }

    #[test]
    fn test_round_trip_is_stable() {
        for input in [
            "6380c8a9185309a5944a3171",
            "642D5B2298BA2BB73C55E5C4",
            "000000000000000000000000",
            "ffffffffffffffffffffffff",
        ] {
            let decoded = decode(input).unwrap();
            assert_eq!(decode(&encode(&decoded)).unwrap(), decoded);
        }
    }

    #[test]
    fn test_fresh_ids_round_trip() {
        for _ in 0..64 {
            let id = ObjectId::new();
            assert_eq!(decode(&encode(&id)).unwrap(), id);
        }
    }

    #[test]
    fn test_rejects_malformed_input() {
        for input in [
            "",
            "not-a-valid-id",
            "642d5b2298ba2bb73c55e5c",
            "642d5b2298ba2bb73c55e5c4a",
            "642d5b2298ba2bb73c55e5cg",
            " 642d5b2298ba2bb73c55e5c4",
            "642d5b22-98ba-2bb7-3c55-e5c4",
            "ｆｆｆｆｆｆｆｆｆｆｆｆｆｆｆｆｆｆｆｆｆｆｆｆ",
        ] {
            let err = decode(input).unwrap_err();
            assert_eq!(err.input, input);
        }
    }

    #[test]
    fn test_rejects_generated_garbage_without_panicking() {
        // Deterministic walk over lengths and a mixed charset.
        let charset: Vec<char> = "0123456789abcdefxyzXYZ-_ é".chars().collect();
        let mut seed: u64 = 0x9e37_79b9_7f4a_7c15;
        for len in 0..48 {
            let input: String = (0..len)
                .map(|_| {
                    seed ^= seed << 13;
                    seed ^= seed >> 7;
                    seed ^= seed << 17;
                    charset[(seed % charset.len() as u64) as usize]
                })
                .collect();

            let is_hex24 = input.len() == 24 && input.chars().all(|c| c.is_ascii_hexdigit());
            assert_eq!(decode(&input).is_ok(), is_hex24, "input: {:?}", input);
        }
    }
}
