//! # Messenger Library
//!
//! Identity and message authentication for a chat that lives in a replicated object graph. Nodes derive their key pairs from a human-chosen seed, announce themselves with a Node record, and append signed Messages to a shared queue. Anyone who fetches a Message can check it with nothing but the origin key it carries.
//!
//! The object store that replicates the graph, feed subscriptions and transport are not in here. This crate only defines the values handed to and read from that store, and the rules for accepting or rejecting them.
//!
//! ### Warnings and Disclaimers
//!
//! - The signature covers the body and the origin key ONLY. `created` is zeroed before hashing, so a timestamp is informational and anyone can rewrite it without breaking the signature. Changing this changes what existing signatures mean.
//! - A key pair derived from a name is exactly as secret as the name. Pick seeds accordingly.
//!
//! ### Examples / API
//!
//! Alice derives her identity from her seed and announces herself.
//!
//! ```rust
//! let keys = KeyPair::derive(b"alice");
//! let mut alice = Node::new("alice", &keys.public.to_hex());
//! let mut container = NodeContainer::new();
//! container.subscribe(&mut alice)?;
//! ```
//!
//! She signs a message, stamps the time, and queues it. `enqueue` verifies before appending.
//!
//! ```rust
//! let mut message = Message::new("Hi Bob, did you know that cats are awesome?");
//! message.sign(&keys.public, &keys.secret)?;
//! message.touch();
//! container.enqueue(&message)?;
//! ```
//!
//! Bob fetches the stored bytes and verifies them. No secret material is needed.
//!
//! ```rust
//! let received = Message::from_bytes(&bytes)?;
//! received.verify()?;
//! ```
//!
//! ### Under the Hood
//!
//! Keys are secp256k1: 33 byte compressed public keys, 32 byte secret keys, 65 byte recoverable signatures, all hex on the outside. The signed digest is the SHA-256 of the message's canonical encoding: body, origin, a zero timestamp and an empty signature, in that order. The content reference ("hash") is the SHA-256 of the stored encoding and is never itself encoded or signed.

pub mod alias;
pub mod config;
pub mod container;
pub mod error;
pub mod keys;
pub mod logging;
pub mod messages;
pub mod node;

pub use alias::{generate_alias, AliasGenerator};
pub use config::{Config, ConfigError};
pub use container::{ContentRef, NodeContainer, References, Schema};
pub use error::{MessengerError, Result};
pub use keys::{KeyPair, PublicKey, SecretKey, Signature};
pub use messages::Message;
pub use node::Node;
