use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Sha256, Sha384, Sha512};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::{AuthError, Result};

type HmacSha256 = Hmac<Sha256>;
type HmacSha384 = Hmac<Sha384>;
type HmacSha512 = Hmac<Sha512>;

/// Signature algorithm named in the token header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    HS256,
    HS384,
    HS512,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::HS256 => "HS256",
            Algorithm::HS384 => "HS384",
            Algorithm::HS512 => "HS512",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "HS256" => Ok(Algorithm::HS256),
            "HS384" => Ok(Algorithm::HS384),
            "HS512" => Ok(Algorithm::HS512),
            _ => Err(AuthError::Config(format!("Unsupported algorithm: {}", s))),
        }
    }
}

fn compute_mac<M: Mac + KeyInit>(secret: &[u8], input: &[u8]) -> Result<Vec<u8>> {
    let mut mac = <M as Mac>::new_from_slice(secret)
        .map_err(|e| AuthError::Config(format!("Failed to create HMAC: {}", e)))?;
    mac.update(input);
    Ok(mac.finalize().into_bytes().to_vec())
}

// verify_slice compares in constant time
fn verify_mac<M: Mac + KeyInit>(secret: &[u8], input: &[u8], signature: &[u8]) -> bool {
    match <M as Mac>::new_from_slice(secret) {
        Ok(mut mac) => {
            mac.update(input);
            mac.verify_slice(signature).is_ok()
        }
        Err(_) => false,
    }
}

fn hmac_sign(algorithm: Algorithm, secret: &[u8], input: &[u8]) -> Result<Vec<u8>> {
    match algorithm {
        Algorithm::HS256 => compute_mac::<HmacSha256>(secret, input),
        Algorithm::HS384 => compute_mac::<HmacSha384>(secret, input),
        Algorithm::HS512 => compute_mac::<HmacSha512>(secret, input),
    }
}

fn hmac_verify(algorithm: Algorithm, secret: &[u8], input: &[u8], signature: &[u8]) -> bool {
    match algorithm {
        Algorithm::HS256 => verify_mac::<HmacSha256>(secret, input, signature),
        Algorithm::HS384 => verify_mac::<HmacSha384>(secret, input, signature),
        Algorithm::HS512 => verify_mac::<HmacSha512>(secret, input, signature),
    }
}

/// Secret material used to sign tokens.
#[derive(Clone)]
pub struct SigningKey {
    algorithm: Algorithm,
    key_id: Option<String>,
    secret: Arc<[u8]>,
}

impl SigningKey {
    pub fn new(algorithm: Algorithm, secret: impl AsRef<[u8]>) -> Result<Self> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(AuthError::Config("Signing secret must not be empty".to_string()));
        }
        Ok(Self {
            algorithm,
            key_id: None,
            secret: Arc::from(secret),
        })
    }

    pub fn hs256(secret: impl AsRef<[u8]>) -> Result<Self> {
        Self::new(Algorithm::HS256, secret)
    }

    pub fn with_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.key_id = Some(key_id.into());
        self
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    pub fn sign(&self, signing_input: &[u8]) -> Result<Vec<u8>> {
        hmac_sign(self.algorithm, &self.secret, signing_input)
    }

    /// Verifier that accepts signatures made with this key
    pub fn verifier(&self) -> HmacVerifier {
        HmacVerifier {
            algorithm: self.algorithm,
            key_id: self.key_id.clone(),
            secret: Arc::clone(&self.secret),
        }
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("algorithm", &self.algorithm)
            .field("key_id", &self.key_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Checks a signature for one algorithm.
///
/// Implementations must compare in constant time.
pub trait Verifier: Send + Sync {
    fn algorithm(&self) -> Algorithm;

    fn key_id(&self) -> Option<&str> {
        None
    }

    fn verify(&self, signing_input: &[u8], signature: &[u8]) -> bool;
}

/// Shared-secret HMAC verifier
#[derive(Clone)]
pub struct HmacVerifier {
    algorithm: Algorithm,
    key_id: Option<String>,
    secret: Arc<[u8]>,
}

impl HmacVerifier {
    pub fn new(algorithm: Algorithm, secret: impl AsRef<[u8]>) -> Self {
        Self {
            algorithm,
            key_id: None,
            secret: Arc::from(secret.as_ref()),
        }
    }

    pub fn with_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.key_id = Some(key_id.into());
        self
    }
}

impl Verifier for HmacVerifier {
    fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    fn verify(&self, signing_input: &[u8], signature: &[u8]) -> bool {
        hmac_verify(self.algorithm, &self.secret, signing_input, signature)
    }
}

impl fmt::Debug for HmacVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacVerifier")
            .field("algorithm", &self.algorithm)
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

/// Immutable set of verifiers, grouped by algorithm.
///
/// Built once during startup and shared read-only between requests.
#[derive(Clone, Default)]
pub struct VerifierRegistry {
    verifiers: HashMap<Algorithm, Vec<Arc<dyn Verifier>>>,
}

impl VerifierRegistry {
    pub fn builder() -> VerifierRegistryBuilder {
        VerifierRegistryBuilder::default()
    }

    /// Registry trusting a single signing key
    pub fn for_key(key: &SigningKey) -> Self {
        Self::builder().with_verifier(key.verifier()).build()
    }

    /// Candidate verifiers for `algorithm`.
    ///
    /// When both the token and a verifier carry a key id they must match;
    /// a missing id on either side does not filter.
    pub fn candidates<'a>(
        &'a self,
        algorithm: Algorithm,
        key_id: Option<&'a str>,
    ) -> impl Iterator<Item = &'a Arc<dyn Verifier>> + 'a {
        self.verifiers
            .get(&algorithm)
            .into_iter()
            .flatten()
            .filter(move |v| match (key_id, v.key_id()) {
                (Some(wanted), Some(have)) => wanted == have,
                _ => true,
            })
    }

    pub fn is_empty(&self) -> bool {
        self.verifiers.values().all(|v| v.is_empty())
    }

    pub fn len(&self) -> usize {
        self.verifiers.values().map(|v| v.len()).sum()
    }
}

impl fmt::Debug for VerifierRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&str, usize> = self
            .verifiers
            .iter()
            .map(|(alg, v)| (alg.as_str(), v.len()))
            .collect();
        f.debug_struct("VerifierRegistry").field("verifiers", &counts).finish()
    }
}

#[derive(Default)]
pub struct VerifierRegistryBuilder {
    verifiers: HashMap<Algorithm, Vec<Arc<dyn Verifier>>>,
}

impl VerifierRegistryBuilder {
    pub fn with_verifier(mut self, verifier: impl Verifier + 'static) -> Self {
        self.add(Arc::new(verifier));
        self
    }

    pub fn add(&mut self, verifier: Arc<dyn Verifier>) {
        self.verifiers.entry(verifier.algorithm()).or_default().push(verifier);
    }

    pub fn build(self) -> VerifierRegistry {
        VerifierRegistry {
            verifiers: self.verifiers,
        }
    }
}
