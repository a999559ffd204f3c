//! RSA signing keystore persisted as a JWK set.
//!
//! The file holds private members (`d`, `p`, `q`, `dp`, `dq`, `qi`) so the provider
//! can sign with it; [`Keystore::public_jwks`] is what gets published.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use jsonwebtoken::EncodingKey;
use rand::rngs::OsRng;
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, RsaPrivateKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

pub const DEFAULT_KEY_BITS: usize = 2048;

#[derive(Debug, thiserror::Error)]
pub enum KeystoreError {
    #[error("key generation failed: {0}")]
    Generation(String),
    #[error("keystore contains no keys")]
    Empty,
    #[error("key {kid} has unsupported type {kty}")]
    UnsupportedKeyType { kid: String, kty: String },
    #[error("key {kid} is missing member {member}")]
    MissingMember { kid: String, member: &'static str },
    #[error("key {kid} is invalid: {reason}")]
    InvalidKey { kid: String, reason: String },
    #[error("failed to encode PEM: {0}")]
    Pem(String),
    #[error("malformed keystore JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("keystore I/O on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// One JSON Web Key. Private members are absent in the published set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub kid: String,
    #[serde(rename = "use")]
    pub key_use: String,
    pub alg: String,
    pub n: String,
    pub e: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dq: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qi: Option<String>,
}

impl Jwk {
    pub fn is_private(&self) -> bool {
        self.d.is_some()
            || self.p.is_some()
            || self.q.is_some()
            || self.dp.is_some()
            || self.dq.is_some()
            || self.qi.is_some()
    }

    pub fn to_public(&self) -> Jwk {
        Jwk {
            d: None,
            p: None,
            q: None,
            dp: None,
            dq: None,
            qi: None,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

struct Entry {
    jwk: Jwk,
    key: RsaPrivateKey,
}

pub struct Keystore {
    entries: Vec<Entry>,
}

impl fmt::Debug for Keystore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keystore")
            .field("kids", &self.kids())
            .finish()
    }
}

fn b64(value: &BigUint) -> String {
    URL_SAFE_NO_PAD.encode(value.to_bytes_be())
}

fn unb64(kid: &str, member: &'static str, value: &str) -> Result<BigUint, KeystoreError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|e| KeystoreError::InvalidKey {
            kid: kid.to_string(),
            reason: format!("{member} is not base64url: {e}"),
        })?;
    Ok(BigUint::from_bytes_be(&bytes))
}

/// CRT parameters `(dp, dq, qi)` for primes `p`, `q` and private exponent `d`.
fn crt_params(d: &BigUint, p: &BigUint, q: &BigUint) -> (BigUint, BigUint, BigUint) {
    let one = BigUint::from(1u8);
    let two = BigUint::from(2u8);
    let dp = d % (p - &one);
    let dq = d % (q - &one);
    // p is prime, so q^(p-2) is the inverse of q mod p.
    let qi = q.modpow(&(p - &two), p);
    (dp, dq, qi)
}

fn jwk_from_key(kid: String, key: &RsaPrivateKey) -> Result<Jwk, KeystoreError> {
    let [p, q] = key.primes() else {
        return Err(KeystoreError::InvalidKey {
            kid,
            reason: "expected exactly two primes".to_string(),
        });
    };
    let (dp, dq, qi) = crt_params(key.d(), p, q);

    Ok(Jwk {
        kty: "RSA".to_string(),
        kid,
        key_use: "sig".to_string(),
        alg: "RS256".to_string(),
        n: b64(key.n()),
        e: b64(key.e()),
        d: Some(b64(key.d())),
        p: Some(b64(p)),
        q: Some(b64(q)),
        dp: Some(b64(&dp)),
        dq: Some(b64(&dq)),
        qi: Some(b64(&qi)),
    })
}

fn key_from_jwk(jwk: &Jwk) -> Result<RsaPrivateKey, KeystoreError> {
    let kid = jwk.kid.as_str();
    if jwk.kty != "RSA" {
        return Err(KeystoreError::UnsupportedKeyType {
            kid: kid.to_string(),
            kty: jwk.kty.clone(),
        });
    }

    let member = |name: &'static str, value: &Option<String>| -> Result<BigUint, KeystoreError> {
        let value = value.as_deref().ok_or_else(|| KeystoreError::MissingMember {
            kid: kid.to_string(),
            member: name,
        })?;
        unb64(kid, name, value)
    };

    let n = unb64(kid, "n", &jwk.n)?;
    let e = unb64(kid, "e", &jwk.e)?;
    let d = member("d", &jwk.d)?;
    let p = member("p", &jwk.p)?;
    let q = member("q", &jwk.q)?;

    let invalid = |reason: String| KeystoreError::InvalidKey {
        kid: kid.to_string(),
        reason,
    };

    let key = RsaPrivateKey::from_components(n, e, d, vec![p.clone(), q.clone()])
        .map_err(|e| invalid(e.to_string()))?;
    key.validate().map_err(|e| invalid(e.to_string()))?;

    let (dp, dq, qi) = crt_params(key.d(), &p, &q);
    for (name, expected, stored) in [("dp", &dp, &jwk.dp), ("dq", &dq, &jwk.dq), ("qi", &qi, &jwk.qi)] {
        if let Some(stored) = stored {
            if &unb64(kid, name, stored)? != expected {
                return Err(invalid(format!("{name} does not match the primes")));
            }
        }
    }

    Ok(key)
}

impl Keystore {
    /// Generate a keystore holding one fresh RSA signing key.
    pub fn generate_rsa(bits: usize) -> Result<Self, KeystoreError> {
        let key = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| KeystoreError::Generation(e.to_string()))?;
        let kid = uuid::Uuid::new_v4().to_string();
        let jwk = jwk_from_key(kid, &key)?;

        let keystore = Self {
            entries: vec![Entry { jwk, key }],
        };
        keystore.check_signing_keys()?;
        Ok(keystore)
    }

    pub fn from_jwk_set(set: JwkSet) -> Result<Self, KeystoreError> {
        if set.keys.is_empty() {
            return Err(KeystoreError::Empty);
        }
        let entries = set
            .keys
            .into_iter()
            .map(|jwk| key_from_jwk(&jwk).map(|key| Entry { jwk, key }))
            .collect::<Result<Vec<_>, _>>()?;

        let keystore = Self { entries };
        keystore.check_signing_keys()?;
        Ok(keystore)
    }

    pub fn from_json(json: &str) -> Result<Self, KeystoreError> {
        Self::from_jwk_set(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, KeystoreError> {
        Ok(serde_json::to_string_pretty(&self.private_jwks())?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, KeystoreError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| KeystoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let keystore = Self::from_json(&json)?;
        tracing::info!(path = %path.display(), kids = ?keystore.kids(), "keystore loaded");
        Ok(keystore)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), KeystoreError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?).map_err(|source| KeystoreError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn kids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.jwk.kid.as_str()).collect()
    }

    /// The full set, private members included. Do not publish.
    pub fn private_jwks(&self) -> JwkSet {
        JwkSet {
            keys: self.entries.iter().map(|e| e.jwk.clone()).collect(),
        }
    }

    pub fn public_jwks(&self) -> JwkSet {
        JwkSet {
            keys: self.entries.iter().map(|e| e.jwk.to_public()).collect(),
        }
    }

    /// PKCS#8 private key PEM of the key at `index`.
    pub fn private_pem(&self, index: usize) -> Result<String, KeystoreError> {
        let entry = self.entry(index)?;
        let pem = entry
            .key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| KeystoreError::Pem(e.to_string()))?;
        Ok(pem.to_string())
    }

    /// SPKI public key PEM of the key at `index`.
    pub fn public_pem(&self, index: usize) -> Result<String, KeystoreError> {
        let entry = self.entry(index)?;
        entry
            .key
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| KeystoreError::Pem(e.to_string()))
    }

    fn entry(&self, index: usize) -> Result<&Entry, KeystoreError> {
        self.entries.get(index).ok_or(KeystoreError::Empty)
    }

    fn check_signing_keys(&self) -> Result<(), KeystoreError> {
        for (index, entry) in self.entries.iter().enumerate() {
            let pem = self.private_pem(index)?;
            EncodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| KeystoreError::InvalidKey {
                kid: entry.jwk.kid.clone(),
                reason: format!("rejected as a signing key: {e}"),
            })?;
        }
        Ok(())
    }
}
