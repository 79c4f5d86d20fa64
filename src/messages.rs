//! Chat messages: canonical form, signing, verification.
//!
//! A message is signed once by its author and never edited after. Anyone holding it can verify it with nothing but the origin key embedded in it.
//!
//! The signature covers `body` and `origin` only. `created` is zeroed in the canonical form, so stamping a time with [`Message::touch`] after signing does not break the signature. `hash` (the content reference) is never encoded at all.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::container::{decode, encode, ContentRef, Schema};
use crate::error::{MessengerError, Result};
use crate::keys::{PublicKey, SecretKey, Signature};

/// MIN_BODY_LENGTH is the shortest trimmed body a message may carry, in bytes
pub const MIN_BODY_LENGTH: usize = 2;

/// Message wraps up a chat line and its authentication data.
///
/// - body: the text
/// - origin: hex public key of the author
/// - created: unix nanoseconds, informational only (not signed)
/// - signature: detached signature over the canonical form; not part of the JSON view
/// - content_ref: address of the message in the store ("hash"); never encoded or signed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub body: String,
    pub origin: String,
    pub created: i64,
    #[serde(skip)]
    pub signature: Signature,
    #[serde(rename = "hash", default)]
    pub content_ref: String,
}

impl Schema for Message {
    const NAME: &'static str = "Message";
}

/// EncodedMessage borrows a message in encoding order. The canonical view and the stored form differ only in the values handed to it.
#[derive(Serialize)]
struct EncodedMessage<'a> {
    body: &'a str,
    origin: &'a str,
    created: i64,
    signature: &'a Signature,
}

/// StoredMessage is the owned mirror of EncodedMessage for decoding
#[derive(Deserialize)]
struct StoredMessage {
    body: String,
    origin: String,
    created: i64,
    signature: Signature,
}

impl Message {
    //! Wraps up a body in an unsigned message.
    pub fn new(body: &str) -> Message {
        Message {
            body: body.to_string(),
            origin: String::new(),
            created: 0,
            signature: Signature::EMPTY,
            content_ref: String::new(),
        }
    }

    /// canonical_bytes is exactly what gets hashed for signing: the real body and origin, a zero timestamp and an empty signature
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        encode(&EncodedMessage {
            body: &self.body,
            origin: &self.origin,
            created: 0,
            signature: &Signature::EMPTY,
        })
    }

    fn digest(&self) -> Result<[u8; 32]> {
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&Sha256::digest(self.canonical_bytes()?));
        Ok(digest)
    }

    fn check_content(&self) -> Result<()> {
        if self.body.trim().len() < MIN_BODY_LENGTH {
            return Err(MessengerError::ContentTooShort);
        }
        Ok(())
    }

    fn check_origin(&self) -> Result<PublicKey> {
        if self.origin == PublicKey::ZERO.to_hex() {
            return Err(MessengerError::EmptyOrigin);
        }
        PublicKey::from_hex(&self.origin)
    }

    /// sign checks the body, stamps the origin, and signs.
    ///
    /// `created` is reset to zero; stamp it afterwards with touch if wanted.
    pub fn sign(&mut self, public_key: &PublicKey, secret_key: &SecretKey) -> Result<()> {
        self.check_content()?;
        self.origin = public_key.to_hex();
        self.created = 0;
        self.signature = Signature::EMPTY;
        let digest = self.digest()?;
        self.signature = secret_key.sign_digest(&digest)?;
        debug!(origin = %self.origin, "message signed");
        Ok(())
    }

    /// verify checks the body, the origin, and the signature. The message is left untouched.
    pub fn verify(&self) -> Result<()> {
        self.check_content()?;
        let origin = self.check_origin()?;
        let digest = self.digest()?;
        origin.verify_digest(&digest, &self.signature)
    }

    /// touch stamps `created` with the current wall-clock time in nanoseconds
    pub fn touch(&mut self) {
        // saturates at i64::MAX (year 2262); a clock set before the epoch stamps 0
        self.created = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| i64::try_from(elapsed.as_nanos()).unwrap_or(i64::MAX))
            .unwrap_or_default();
    }

    /// to_bytes encodes the message as stored: real timestamp, real signature, no content reference
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode(&EncodedMessage {
            body: &self.body,
            origin: &self.origin,
            created: self.created,
            signature: &self.signature,
        })
    }

    /// from_bytes decodes a stored message and addresses it by the hash of `data`
    pub fn from_bytes(data: &[u8]) -> Result<Message> {
        let stored: StoredMessage = decode(data)?;
        Ok(Message {
            body: stored.body,
            origin: stored.origin,
            created: stored.created,
            signature: stored.signature,
            content_ref: ContentRef::digest(data).to_hex(),
        })
    }

    /// reference is the content address of the encoded message
    pub fn reference(&self) -> Result<ContentRef> {
        Ok(ContentRef::digest(&self.to_bytes()?))
    }
}

/* ------------------------------------------------------------------------- */

// TESTS

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyPair;
    use proptest::prelude::*;

    fn signed(body: &str) -> (Message, KeyPair) {
        let pair = KeyPair::derive(b"message tests");
        let mut message = Message::new(body);
        message.sign(&pair.public, &pair.secret).expect("signing failed");
        (message, pair)
    }

    #[test]
    fn sign_then_verify() {
        let (message, pair) = signed("hello world");
        assert_eq!(message.origin, pair.public.to_hex());
        assert_eq!(message.created, 0);
        assert!(!message.signature.is_empty());
        assert!(message.verify().is_ok());
    }

    #[test]
    fn sign_rejects_short_body() {
        let pair = KeyPair::generate();
        let mut message = Message::new(" x  ");
        assert_eq!(message.sign(&pair.public, &pair.secret), Err(MessengerError::ContentTooShort));
        assert!(message.signature.is_empty());
        assert!(message.origin.is_empty());
    }

    #[test]
    fn body_length_counts_bytes() {
        // "é" is two bytes, so it is long enough
        let (message, _) = signed("é");
        assert!(message.verify().is_ok());
        let pair = KeyPair::generate();
        assert_eq!(Message::new(" e ").sign(&pair.public, &pair.secret), Err(MessengerError::ContentTooShort));
    }

    #[test]
    fn touch_stamps_a_positive_time() {
        let mut message = Message::new("what time is it");
        message.touch();
        assert!(message.created > 0);
        assert!(message.created < i64::MAX);
    }

    #[test]
    fn sign_zeroes_created() {
        let pair = KeyPair::generate();
        let mut message = Message::new("stamped early");
        message.touch();
        message.sign(&pair.public, &pair.secret).unwrap();
        assert_eq!(message.created, 0);
    }

    #[test]
    fn tampered_body_fails() {
        let (mut message, _) = signed("pay alice 5");
        message.body = "pay alice 500".to_string();
        assert_eq!(message.verify(), Err(MessengerError::SignatureInvalid));
    }

    #[test]
    fn swapped_origin_fails() {
        let (mut message, _) = signed("who said this");
        message.origin = KeyPair::derive(b"somebody else").public.to_hex();
        assert_eq!(message.verify(), Err(MessengerError::SignatureInvalid));
    }

    #[test]
    fn touch_does_not_break_signature() {
        let (mut message, _) = signed("timestamps are not signed");
        message.touch();
        assert!(message.created > 0);
        assert!(message.verify().is_ok());
    }

    #[test]
    fn verify_rejects_zero_origin() {
        let (mut message, _) = signed("from nobody");
        message.origin = PublicKey::ZERO.to_hex();
        assert_eq!(message.verify(), Err(MessengerError::EmptyOrigin));
    }

    #[test]
    fn verify_rejects_bad_origin() {
        let (mut message, _) = signed("from garbage");
        message.origin = "zz".to_string();
        assert_eq!(message.verify(), Err(MessengerError::InvalidPublicKey));
    }

    #[test]
    fn verify_rejects_blank_body() {
        let (mut message, _) = signed("soon blank");
        message.body = " ".to_string();
        assert_eq!(message.verify(), Err(MessengerError::ContentTooShort));
    }

    #[test]
    fn corrupted_signature_fails() {
        let (mut message, _) = signed("flip a bit");
        let mut bytes = *message.signature.as_bytes();
        bytes[10] ^= 0x01;
        message.signature = Signature::from_bytes(&bytes).unwrap();
        assert_eq!(message.verify(), Err(MessengerError::SignatureInvalid));
    }

    #[test]
    fn verify_leaves_message_untouched() {
        let (mut message, _) = signed("look but do not touch");
        message.touch();
        let before = message.clone();
        message.verify().unwrap();
        assert_eq!(message, before);
    }

    #[test]
    fn canonical_bytes_ignore_created_and_signature() {
        let (mut message, _) = signed("canonical");
        let canonical = message.canonical_bytes().unwrap();
        message.touch();
        assert_eq!(message.canonical_bytes().unwrap(), canonical);
        assert_ne!(message.to_bytes().unwrap(), canonical);
    }

    #[test]
    fn stored_bytes_layout() {
        let (message, _) = signed("layout");
        let bytes = message.to_bytes().unwrap();
        // u64 length + body, u64 length + origin, i64 created, 65 raw signature bytes
        let expected = 8 + message.body.len() + 8 + message.origin.len() + 8 + 65;
        assert_eq!(bytes.len(), expected);
        assert_eq!(&bytes[bytes.len() - 65..], &message.signature.as_bytes()[..]);
    }

    #[test]
    fn decoded_message_verifies_and_is_addressed() {
        let (mut message, _) = signed("over the wire");
        message.touch();
        let bytes = message.to_bytes().unwrap();
        let decoded = Message::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.body, message.body);
        assert_eq!(decoded.created, message.created);
        assert_eq!(decoded.signature, message.signature);
        assert_eq!(decoded.content_ref, message.reference().unwrap().to_hex());
        assert!(decoded.verify().is_ok());
    }

    #[test]
    fn json_uses_store_field_names() {
        let (mut message, _) = signed("json view");
        message.content_ref = message.reference().unwrap().to_hex();
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["body"], "json view");
        assert_eq!(json["origin"], message.origin.as_str());
        assert_eq!(json["created"], 0);
        assert_eq!(json["hash"], message.content_ref.as_str());
        assert!(json.get("signature").is_none());
    }

    #[test]
    fn truncated_input_never_decodes() {
        let (message, _) = signed("cut me short");
        let bytes = message.to_bytes().unwrap();
        for len in 0..bytes.len() {
            assert!(
                matches!(Message::from_bytes(&bytes[..len]), Err(MessengerError::DecodeError(_))),
                "prefix of length {} decoded",
                len
            );
        }
        let mut padded = bytes.clone();
        padded.push(0);
        assert!(matches!(Message::from_bytes(&padded), Err(MessengerError::DecodeError(_))));
    }

    proptest! {
        #[test]
        fn garbage_never_decodes(data in proptest::collection::vec(any::<u8>(), 0..256)) {
            prop_assert!(matches!(Message::from_bytes(&data), Err(MessengerError::DecodeError(_))));
        }

        #[test]
        fn any_long_enough_body_round_trips(body in "[a-zA-Z0-9 ]{0,40}[a-zA-Z0-9]{2}") {
            let pair = KeyPair::derive(b"proptest");
            let mut message = Message::new(&body);
            prop_assert!(message.sign(&pair.public, &pair.secret).is_ok());
            prop_assert!(message.verify().is_ok());
        }
    }
}
