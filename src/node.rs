//! Node records: the display name and public key a node announces about itself.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::alias::{generate_alias, AliasGenerator};
use crate::container::{decode, encode, ContentRef, Schema};
use crate::error::Result;
use crate::keys::{KeyPair, PublicKey};

/// MIN_NAME_LENGTH is the shortest trimmed name a node may keep, in bytes
pub const MIN_NAME_LENGTH: usize = 3;

/// Node is what a node announces before it is placed in the subscribed or connected collections.
///
/// Once accepted it is never edited; a re-keyed identity gets a new Node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub public_key: String,
}

impl Schema for Node {
    const NAME: &'static str = "Node";
}

impl Node {
    pub fn new(name: &str, public_key_hex: &str) -> Node {
        Node {
            name: name.to_string(),
            public_key: public_key_hex.to_string(),
        }
    }

    /// check decodes the public key and normalizes the name in place.
    ///
    /// A name shorter than three bytes after trimming is replaced by a random alias.
    pub fn check(&mut self) -> Result<PublicKey> {
        self.check_name_with(generate_alias)
    }

    /// check_with is check with an injected alias source
    pub fn check_with<R: Rng>(&mut self, aliases: &mut AliasGenerator<R>) -> Result<PublicKey> {
        self.check_name_with(|| aliases.next_alias())
    }

    fn check_name_with<F: FnOnce() -> String>(&mut self, alias: F) -> Result<PublicKey> {
        let public_key = PublicKey::from_hex(&self.public_key)?;
        let trimmed = self.name.trim();
        if trimmed.len() < MIN_NAME_LENGTH {
            let replacement = alias();
            warn!(rejected = %self.name, alias = %replacement, "node name too short, using alias");
            self.name = replacement;
        } else if trimmed.len() != self.name.len() {
            self.name = trimmed.to_string();
        }
        Ok(public_key)
    }

    /// touch_with_seed re-keys the node from `seed` and returns the new key pair
    pub fn touch_with_seed(&mut self, seed: &[u8]) -> KeyPair {
        let pair = KeyPair::derive(seed);
        self.public_key = pair.public.to_hex();
        pair
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode(self)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Node> {
        decode(data)
    }

    /// reference is the content address of the encoded node
    pub fn reference(&self) -> Result<ContentRef> {
        let bytes = self.to_bytes()?;
        Ok(ContentRef::digest(&bytes))
    }
}

/* ------------------------------------------------------------------------- */

// TESTS

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::is_alias;
    use crate::error::MessengerError;

    fn valid_key() -> String {
        KeyPair::derive(b"node tests").public.to_hex()
    }

    #[test]
    fn check_keeps_good_name_and_returns_key() {
        let mut node = Node::new("  alice  ", &valid_key());
        let pk = node.check().unwrap();
        assert_eq!(pk.to_hex(), valid_key());
        assert_eq!(node.name, "alice");
    }

    #[test]
    fn check_replaces_short_name() {
        let mut node = Node::new("  a ", &valid_key());
        node.check().unwrap();
        assert!(is_alias(&node.name), "got {}", node.name);
    }

    #[test]
    fn name_length_counts_bytes() {
        // one character, three bytes
        let mut node = Node::new(" 日 ", &valid_key());
        node.check().unwrap();
        assert_eq!(node.name, "日");
        let mut short = Node::new("é", &valid_key());
        short.check().unwrap();
        assert!(is_alias(&short.name), "got {}", short.name);
    }

    #[test]
    fn check_with_seeded_generator_is_reproducible() {
        let mut first = Node::new("", &valid_key());
        let mut second = Node::new("ab", &valid_key());
        first.check_with(&mut AliasGenerator::with_seed(3)).unwrap();
        second.check_with(&mut AliasGenerator::with_seed(3)).unwrap();
        assert_eq!(first.name, second.name);
    }

    #[test]
    fn check_rejects_bad_key() {
        let mut node = Node::new("alice", "nothex");
        assert_eq!(node.check(), Err(MessengerError::InvalidPublicKey));
        let mut short = Node::new("alice", "02ff");
        assert_eq!(short.check(), Err(MessengerError::InvalidPublicKey));
    }

    #[test]
    fn touch_with_seed_rekeys() {
        let mut node = Node::new("alice", &valid_key());
        let pair = node.touch_with_seed(b"fresh seed");
        assert_eq!(node.public_key, pair.public.to_hex());
        assert_ne!(node.public_key, valid_key());
        assert_eq!(node.check().unwrap(), pair.public);
    }

    #[test]
    fn json_uses_store_field_names() {
        let node = Node::new("alice", &valid_key());
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["name"], "alice");
        assert_eq!(json["public_key"], valid_key());
    }

    #[test]
    fn binary_encoding_and_reference() {
        let node = Node::new("alice", &valid_key());
        let bytes = node.to_bytes().unwrap();
        assert_eq!(Node::from_bytes(&bytes).unwrap(), node);
        assert_eq!(node.reference().unwrap(), node.reference().unwrap());
        let other = Node::new("bob", &valid_key());
        assert_ne!(node.reference().unwrap(), other.reference().unwrap());
        assert!(matches!(Node::from_bytes(&bytes[..bytes.len() - 1]), Err(MessengerError::DecodeError(_))));
    }
}
