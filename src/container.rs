//! The typed collections that the replicated object store carries, plus the shared binary encoding.
//!
//! The store itself (replication, feeds, persistence) lives elsewhere. This module only knows the schema names, the content references, and the rules for what may be appended.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use bincode::Options;
use hex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::{MessengerError, Result};
use crate::keys::PublicKey;
use crate::messages::Message;
use crate::node::Node;

/// REFERENCE_LENGTH is 32 bytes (a SHA-256 digest)
pub const REFERENCE_LENGTH: usize = 32;
/// MAX_OBJECT_SIZE caps any encoded object at 1 MiB
pub const MAX_OBJECT_SIZE: u64 = 1024 * 1024;
/// REGISTERED_SCHEMAS in registration order
pub const REGISTERED_SCHEMAS: [&str; 3] = [Node::NAME, Message::NAME, NodeContainer::NAME];

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .reject_trailing_bytes()
        .with_limit(MAX_OBJECT_SIZE)
}

/// encode writes a value in the store's fixed-width little-endian layout
pub(crate) fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    options()
        .serialize(value)
        .map_err(|e| MessengerError::EncodeError(e.to_string()))
}

/// decode is the strict inverse of encode: truncated input, oversize lengths and trailing bytes all fail
pub(crate) fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    options()
        .deserialize(data)
        .map_err(|e| MessengerError::DecodeError(e.to_string()))
}

/// Schema names a type the store can register. Peers decode by these names, so they never change.
pub trait Schema {
    const NAME: &'static str;
}

/// is_node_container picks the container out of a root's dynamic references by schema name
pub fn is_node_container(schema_name: &str) -> bool {
    schema_name == NodeContainer::NAME
}

/// ContentRef is the address of an object in the store: the SHA-256 of its encoding.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentRef([u8; REFERENCE_LENGTH]);

impl ContentRef {
    /// digest hashes `data` into a reference
    pub fn digest(data: &[u8]) -> ContentRef {
        let mut reference = [0u8; REFERENCE_LENGTH];
        reference.copy_from_slice(&Sha256::digest(data));
        ContentRef(reference)
    }

    pub fn from_hex(s: &str) -> Result<ContentRef> {
        let mut reference = [0u8; REFERENCE_LENGTH];
        hex::decode_to_slice(s, &mut reference).map_err(|_| MessengerError::InvalidReference)?;
        Ok(ContentRef(reference))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; REFERENCE_LENGTH] {
        &self.0
    }
}

impl fmt::Debug for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentRef({})", self.to_hex())
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// References is an ordered, append-only list of references to objects of one schema.
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub struct References<T: Schema> {
    refs: Vec<ContentRef>,
    #[serde(skip)]
    schema: PhantomData<T>,
}

impl<T: Schema> References<T> {
    pub fn new() -> Self {
        References {
            refs: Vec::new(),
            schema: PhantomData,
        }
    }

    pub fn push(&mut self, reference: ContentRef) {
        self.refs.push(reference);
    }

    pub fn contains(&self, reference: &ContentRef) -> bool {
        self.refs.contains(reference)
    }

    pub fn get(&self, index: usize) -> Option<&ContentRef> {
        self.refs.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ContentRef> {
        self.refs.iter()
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    /// schema_name is the schema every entry points at
    pub fn schema_name(&self) -> &'static str {
        T::NAME
    }
}

impl<T: Schema> Default for References<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Schema> Clone for References<T> {
    fn clone(&self) -> Self {
        References {
            refs: self.refs.clone(),
            schema: PhantomData,
        }
    }
}

impl<T: Schema> fmt::Debug for References<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("References")
            .field("schema", &T::NAME)
            .field("refs", &self.refs)
            .finish()
    }
}

/// NodeContainer is the first branch object under a feed root.
///
/// - subscribed: nodes this node follows
/// - connected: nodes currently connected
/// - queue: signed messages, oldest first
///
/// A node is identified by its public key, so the key indexes are what keep a node from being listed twice. They are local bookkeeping and are not replicated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeContainer {
    pub subscribed: References<Node>,
    pub connected: References<Node>,
    pub queue: References<Message>,
    #[serde(skip)]
    subscribed_keys: HashMap<PublicKey, ContentRef>,
    #[serde(skip)]
    connected_keys: HashMap<PublicKey, ContentRef>,
}

impl Schema for NodeContainer {
    const NAME: &'static str = "NodeContainer";
}

impl NodeContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// subscribe checks the node and records it as followed. A public key already followed keeps its first entry.
    pub fn subscribe(&mut self, node: &mut Node) -> Result<ContentRef> {
        Self::append_node(&mut self.subscribed, &mut self.subscribed_keys, node)
    }

    /// connect checks the node and records it as connected
    pub fn connect(&mut self, node: &mut Node) -> Result<ContentRef> {
        Self::append_node(&mut self.connected, &mut self.connected_keys, node)
    }

    fn append_node(
        list: &mut References<Node>,
        keys: &mut HashMap<PublicKey, ContentRef>,
        node: &mut Node,
    ) -> Result<ContentRef> {
        let public_key = node.check()?;
        if let Some(existing) = keys.get(&public_key) {
            debug!(public_key = %public_key, reference = %existing, "node already listed");
            return Ok(*existing);
        }
        let reference = node.reference()?;
        list.push(reference);
        keys.insert(public_key, reference);
        Ok(reference)
    }

    /// enqueue appends a message to the queue after it passes verification
    pub fn enqueue(&mut self, message: &Message) -> Result<ContentRef> {
        if let Err(e) = message.verify() {
            warn!(error = %e, origin = %message.origin, "refusing to enqueue message");
            return Err(e);
        }
        let reference = message.reference()?;
        self.queue.push(reference);
        debug!(reference = %reference, queued = self.queue.len(), "message enqueued");
        Ok(reference)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode(self)
    }

    pub fn from_bytes(data: &[u8]) -> Result<NodeContainer> {
        decode(data)
    }
}

/* ------------------------------------------------------------------------- */

// TESTS

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyPair;

    fn signed(body: &str, seed: &[u8]) -> Message {
        let pair = KeyPair::derive(seed);
        let mut message = Message::new(body);
        message.sign(&pair.public, &pair.secret).unwrap();
        message
    }

    #[test]
    fn schema_names_are_stable() {
        assert_eq!(REGISTERED_SCHEMAS, ["Node", "Message", "NodeContainer"]);
        assert!(is_node_container("NodeContainer"));
        assert!(!is_node_container("Node"));
        let container = NodeContainer::new();
        assert_eq!(container.subscribed.schema_name(), "Node");
        assert_eq!(container.queue.schema_name(), "Message");
    }

    #[test]
    fn content_ref_hex() {
        let reference = ContentRef::digest(b"object");
        assert_eq!(reference.to_hex().len(), REFERENCE_LENGTH * 2);
        assert_eq!(ContentRef::from_hex(&reference.to_hex()).unwrap(), reference);
        assert_eq!(ContentRef::from_hex("abcd"), Err(MessengerError::InvalidReference));
        assert_eq!(ContentRef::from_hex(&"g".repeat(64)), Err(MessengerError::InvalidReference));
    }

    #[test]
    fn subscribe_checks_and_dedups() {
        let mut container = NodeContainer::new();
        let key = KeyPair::derive(b"carol").public.to_hex();
        let mut node = Node::new("carol", &key);
        let first = container.subscribe(&mut node).unwrap();
        let second = container.subscribe(&mut node).unwrap();
        assert_eq!(first, second);
        assert_eq!(container.subscribed.len(), 1);
        assert!(container.connected.is_empty());

        // a short name gets a fresh random alias each time, the key still identifies the node
        let short_key = KeyPair::derive(b"al").public.to_hex();
        let first = container.subscribe(&mut Node::new("a", &short_key)).unwrap();
        for _ in 0..20 {
            let again = container.subscribe(&mut Node::new("a", &short_key)).unwrap();
            assert_eq!(again, first);
        }
        assert_eq!(container.subscribed.len(), 2);

        let mut broken = Node::new("dave", "00");
        assert_eq!(container.connect(&mut broken), Err(MessengerError::InvalidPublicKey));
        assert!(container.connected.is_empty());
    }

    #[test]
    fn enqueue_keeps_order_and_rejects_unsigned() {
        let mut container = NodeContainer::new();
        let a = container.enqueue(&signed("first", b"erin")).unwrap();
        let b = container.enqueue(&signed("second", b"erin")).unwrap();
        assert_eq!(container.queue.get(0), Some(&a));
        assert_eq!(container.queue.get(1), Some(&b));

        let mut unsigned = Message::new("never signed");
        unsigned.origin = KeyPair::derive(b"erin").public.to_hex();
        assert_eq!(container.enqueue(&unsigned), Err(MessengerError::SignatureInvalid));
        assert_eq!(container.queue.len(), 2);
    }

    #[test]
    fn container_encoding() {
        let mut container = NodeContainer::new();
        container.enqueue(&signed("hello there", b"frank")).unwrap();
        let bytes = container.to_bytes().unwrap();
        let decoded = NodeContainer::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.queue.iter().collect::<Vec<_>>(), container.queue.iter().collect::<Vec<_>>());
        assert!(matches!(NodeContainer::from_bytes(&[1, 2, 3]), Err(MessengerError::DecodeError(_))));
    }
}
