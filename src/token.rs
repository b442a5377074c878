//! Short category tokens for callback payloads.
//!
//! Category names are arbitrary Unicode and can be long, while callback data
//! is limited to 64 bytes. A token is the lowercase hex MD5 digest of the
//! category name, truncated to a fixed length. The token-to-name mapping is
//! never stored: resolving a token recomputes it over the live category list,
//! so it cannot go stale when categories appear or disappear.
//!
//! Truncated digests can collide. Collisions are not detected; on reverse
//! lookup the first matching label wins.

use md5::{Digest, Md5};

/// Token codec with a fixed truncation length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenCodec {
    len: usize,
}

/// Codec used by the public browse keyboards (8 hex characters).
pub const BROWSE_TOKENS: TokenCodec = TokenCodec::new(8);

/// Codec used by the administrator keyboards (10 hex characters).
pub const ADMIN_TOKENS: TokenCodec = TokenCodec::new(10);

impl TokenCodec {
    pub const fn new(len: usize) -> Self {
        Self { len }
    }

    /// Encode a label into its token.
    pub fn encode(&self, label: &str) -> String {
        let mut hasher = Md5::new();
        hasher.update(label.as_bytes());
        let mut digest = hex::encode(hasher.finalize());
        digest.truncate(self.len);
        digest
    }

    /// Resolve a token back to the first live label that encodes to it.
    pub fn decode<'a, I>(&self, labels: I, token: &str) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        if token.len() != self.len {
            return None;
        }
        labels.into_iter().find(|label| self.encode(label) == token)
    }

    /// Whether `candidate` has the shape of a token from this codec.
    pub fn is_well_formed(&self, candidate: &str) -> bool {
        candidate.len() == self.len
            && candidate
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_lengths_and_alphabet() {
        for label in ["Жвачка и ЖКТ", "Маститы", "Отёлы", ""] {
            let browse = BROWSE_TOKENS.encode(label);
            let admin = ADMIN_TOKENS.encode(label);
            assert_eq!(browse.len(), 8);
            assert_eq!(admin.len(), 10);
            assert!(BROWSE_TOKENS.is_well_formed(&browse));
            assert!(ADMIN_TOKENS.is_well_formed(&admin));
        }
    }

    #[test]
    fn test_encode_is_md5_prefix() {
        // md5("test") = 098f6bcd4621d373cade4e832627b4f6
        assert_eq!(BROWSE_TOKENS.encode("test"), "098f6bcd");
        assert_eq!(ADMIN_TOKENS.encode("test"), "098f6bcd46");
    }

    #[test]
    fn test_encode_is_deterministic() {
        assert_eq!(
            BROWSE_TOKENS.encode("Жвачка и ЖКТ"),
            BROWSE_TOKENS.encode("Жвачка и ЖКТ")
        );
        assert_ne!(
            BROWSE_TOKENS.encode("Жвачка и ЖКТ"),
            BROWSE_TOKENS.encode("Жвачка и ЖКТ ")
        );
    }

    #[test]
    fn test_decode_round_trip_over_live_labels() {
        let live = ["Жвачка и ЖКТ", "Маститы", "Отёлы"];
        for label in live {
            let token = BROWSE_TOKENS.encode(label);
            assert_eq!(BROWSE_TOKENS.decode(live, &token), Some(label));
        }
    }

    #[test]
    fn test_decode_removed_label_is_not_found() {
        let token = BROWSE_TOKENS.encode("Удалённая категория");
        assert_eq!(BROWSE_TOKENS.decode(["Маститы", "Отёлы"], &token), None);
    }

    #[test]
    fn test_codecs_do_not_resolve_each_other() {
        let live = ["Маститы"];
        let browse = BROWSE_TOKENS.encode("Маститы");
        let admin = ADMIN_TOKENS.encode("Маститы");
        assert_eq!(ADMIN_TOKENS.decode(live, &browse), None);
        assert_eq!(BROWSE_TOKENS.decode(live, &admin), None);
    }

    #[test]
    fn test_collision_first_match_wins() {
        // A zero-length codec maps every label to the same token.
        let degenerate = TokenCodec::new(0);
        assert_eq!(degenerate.decode(["a", "b"], ""), Some("a"));
    }
}
