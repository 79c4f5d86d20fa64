//! Key material for node identities: secp256k1 key pairs, detached signatures, and the deterministic seed-to-key derivation.
//!
//! Everything crossing the boundary to humans or config is lowercase hex. Decoding rejects any string whose byte length does not match the fixed size of the key or signature.

use std::fmt;

use hex;
use hkdf::Hkdf;
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha256;
use tracing::debug;

use crate::error::{MessengerError, Result};

/// PUBLIC_KEY_LENGTH is 33 bytes (SEC1 compressed point)
pub const PUBLIC_KEY_LENGTH: usize = 33;
/// SECRET_KEY_LENGTH is 32 bytes
pub const SECRET_KEY_LENGTH: usize = 32;
/// SIGNATURE_LENGTH is 65 bytes: r, s, then the recovery id
pub const SIGNATURE_LENGTH: usize = 65;
/// DERIVATION_SALT fixes the HKDF extract step so a seed maps to the same key everywhere
const DERIVATION_SALT: &[u8] = b"messenger identity salt";
/// DERIVATION_CONTEXT is prepended to the retry counter in the HKDF info
const DERIVATION_CONTEXT: &[u8] = b"messenger identity key";

/// PublicKey is a compressed secp256k1 point. The all-zero value is the "empty" key and is never a valid curve point.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; PUBLIC_KEY_LENGTH]);

impl PublicKey {
    /// ZERO is the empty public key; messages carrying it as origin are rejected
    pub const ZERO: PublicKey = PublicKey([0u8; PUBLIC_KEY_LENGTH]);

    /// from_bytes accepts exactly 33 bytes that decode to a point on the curve
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PUBLIC_KEY_LENGTH {
            return Err(MessengerError::InvalidPublicKey);
        }
        VerifyingKey::from_sec1_bytes(bytes).map_err(|_| MessengerError::InvalidPublicKey)?;
        let mut key = [0u8; PUBLIC_KEY_LENGTH];
        key.copy_from_slice(bytes);
        Ok(PublicKey(key))
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|_| MessengerError::InvalidPublicKey)?;
        Self::from_bytes(&bytes)
    }

    fn from_verifying_key(key: &VerifyingKey) -> Self {
        let mut bytes = [0u8; PUBLIC_KEY_LENGTH];
        bytes.copy_from_slice(key.to_encoded_point(true).as_bytes());
        PublicKey(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; PUBLIC_KEY_LENGTH]
    }

    fn verifying_key(&self) -> Result<VerifyingKey> {
        VerifyingKey::from_sec1_bytes(&self.0).map_err(|_| MessengerError::InvalidPublicKey)
    }

    /// verify_digest checks a detached signature over a 32 byte digest.
    ///
    /// The ECDSA check runs against this key, and recovering the signer from the signature must also land on this key.
    pub fn verify_digest(&self, digest: &[u8], signature: &Signature) -> Result<()> {
        let verifying_key = self.verifying_key()?;
        let ecdsa = EcdsaSignature::from_slice(&signature.0[..64]).map_err(|_| MessengerError::SignatureInvalid)?;
        let recovery_id = RecoveryId::from_byte(signature.0[64]).ok_or(MessengerError::SignatureInvalid)?;
        verifying_key
            .verify_prehash(digest, &ecdsa)
            .map_err(|_| MessengerError::SignatureInvalid)?;
        let recovered = VerifyingKey::recover_from_prehash(digest, &ecdsa, recovery_id)
            .map_err(|_| MessengerError::SignatureInvalid)?;
        if recovered != verifying_key {
            return Err(MessengerError::SignatureInvalid);
        }
        Ok(())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// SecretKey wraps the signing scalar. k256 zeroizes it on drop.
#[derive(Clone)]
pub struct SecretKey(SigningKey);

impl SecretKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SECRET_KEY_LENGTH {
            return Err(MessengerError::InvalidSecretKey);
        }
        let signing_key = SigningKey::from_slice(bytes).map_err(|_| MessengerError::InvalidSecretKey)?;
        Ok(SecretKey(signing_key))
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|_| MessengerError::InvalidSecretKey)?;
        Self::from_bytes(&bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0.to_bytes())
    }

    /// public_key computes the matching compressed public key
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_verifying_key(self.0.verifying_key())
    }

    /// sign_digest produces a recoverable signature over a 32 byte digest
    pub fn sign_digest(&self, digest: &[u8]) -> Result<Signature> {
        let (ecdsa, recovery_id) = self
            .0
            .sign_prehash_recoverable(digest)
            .map_err(|_| MessengerError::InvalidSecretKey)?;
        let mut bytes = [0u8; SIGNATURE_LENGTH];
        bytes[..64].copy_from_slice(&ecdsa.to_bytes());
        bytes[64] = recovery_id.to_byte();
        Ok(Signature(bytes))
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

/// Signature is a detached, recoverable ECDSA signature. The all-zero value stands for "not signed yet".
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; SIGNATURE_LENGTH]);

impl Signature {
    pub const EMPTY: Signature = Signature([0u8; SIGNATURE_LENGTH]);

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SIGNATURE_LENGTH {
            return Err(MessengerError::SignatureInvalid);
        }
        let mut sig = [0u8; SIGNATURE_LENGTH];
        sig.copy_from_slice(bytes);
        Ok(Signature(sig))
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|_| MessengerError::SignatureInvalid)?;
        Self::from_bytes(&bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == [0u8; SIGNATURE_LENGTH]
    }
}

impl Default for Signature {
    fn default() -> Self {
        Signature::EMPTY
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}...)", hex::encode(&self.0[..8]))
    }
}

// Signatures travel as 65 raw bytes (a fixed tuple), never as a length-prefixed byte string or hex
impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(SIGNATURE_LENGTH)?;
        for byte in self.0.iter() {
            tuple.serialize_element(byte)?;
        }
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct SignatureVisitor;

        impl<'de> Visitor<'de> for SignatureVisitor {
            type Value = Signature;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{} signature bytes", SIGNATURE_LENGTH)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Signature, A::Error> {
                let mut bytes = [0u8; SIGNATURE_LENGTH];
                for (i, byte) in bytes.iter_mut().enumerate() {
                    *byte = seq.next_element()?.ok_or_else(|| de::Error::invalid_length(i, &self))?;
                }
                Ok(Signature(bytes))
            }
        }

        deserializer.deserialize_tuple(SIGNATURE_LENGTH, SignatureVisitor)
    }
}

/// KeyPair bundles an identity's public and secret halves.
#[derive(Clone, Debug)]
pub struct KeyPair {
    pub public: PublicKey,
    pub secret: SecretKey,
}

impl KeyPair {
    /// derive maps a seed (usually the node name) to a key pair. The same seed always yields the same pair.
    ///
    /// HKDF-SHA256 expands the seed into a candidate scalar; the rare candidate outside the curve order is skipped by bumping the counter in the info string.
    pub fn derive(seed: &[u8]) -> Self {
        let kdf = Hkdf::<Sha256>::new(Some(DERIVATION_SALT), seed);
        let mut counter: u32 = 0;
        loop {
            let info = [DERIVATION_CONTEXT, &counter.to_be_bytes()].concat();
            let mut candidate = [0u8; SECRET_KEY_LENGTH];
            if kdf.expand(&info, &mut candidate).is_ok() {
                if let Ok(signing_key) = SigningKey::from_slice(&candidate) {
                    let secret = SecretKey(signing_key);
                    let public = secret.public_key();
                    debug!(public_key = %public, attempts = counter + 1, "derived key pair from seed");
                    return KeyPair { public, secret };
                }
            }
            counter = counter.wrapping_add(1);
        }
    }

    /// generate builds a fresh key pair from the OS CSPRNG
    pub fn generate() -> Self {
        let secret = SecretKey(SigningKey::random(&mut OsRng));
        let public = secret.public_key();
        KeyPair { public, secret }
    }

    pub fn from_secret(secret: SecretKey) -> Self {
        KeyPair { public: secret.public_key(), secret }
    }
}

/* ------------------------------------------------------------------------- */

// TESTS
