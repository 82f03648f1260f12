//! Challenge-response computations for the authentication plug-ins.
//!
//! Each function is a pure scramble; the session drives the multi-step
//! flows (auth switch, caching_sha2 full auth, RSA key exchange, dialog).

use std::sync::Arc;

use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use rand::rngs::OsRng;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::RsaPublicKey;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

use crate::consts::SCRAMBLE_LENGTH;
use crate::error::{Error, Result};

/// Well-known plug-in names.
pub mod plugins {
    pub const NATIVE_PASSWORD: &str = "mysql_native_password";
    pub const CACHING_SHA2_PASSWORD: &str = "caching_sha2_password";
    pub const SHA256_PASSWORD: &str = "sha256_password";
    pub const OLD_PASSWORD: &str = "mysql_old_password";
    pub const CLEAR_PASSWORD: &str = "mysql_clear_password";
    pub const ED25519: &str = "client_ed25519";
    pub const DIALOG: &str = "dialog";
}

/// Status bytes inside caching_sha2_password extra-auth-data packets.
pub mod caching_sha2 {
    pub const REQUEST_PUBLIC_KEY: u8 = 0x02;
    pub const FAST_AUTH_SUCCESS: u8 = 0x03;
    pub const PERFORM_FULL_AUTH: u8 = 0x04;
}

/// Callback answering `dialog` plug-in prompts. Receives the echo flag and
/// the prompt text, returns the reply (without the trailing NUL).
pub type DialogHandler = Arc<dyn Fn(bool, &[u8]) -> Vec<u8> + Send + Sync>;

/// Override for a plug-in's scramble: `(password, salt) -> response`.
pub type PluginOverride = Arc<dyn Fn(&[u8], &[u8]) -> Vec<u8> + Send + Sync>;

/// `SHA1(password) XOR SHA1(salt + SHA1(SHA1(password)))`
pub fn scramble_native_password(password: &[u8], salt: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return Vec::new();
    }
    let salt = &salt[..salt.len().min(SCRAMBLE_LENGTH)];

    let stage1 = Sha1::digest(password);
    let stage2 = Sha1::digest(stage1);
    let mut hasher = Sha1::new();
    hasher.update(salt);
    hasher.update(stage2);
    let stage3 = hasher.finalize();

    stage1
        .iter()
        .zip(stage3.iter())
        .map(|(a, b)| a ^ b)
        .collect()
}

/// `XOR(SHA256(password), SHA256(SHA256(SHA256(password)) + salt))`,
/// the caching_sha2_password fast path.
pub fn scramble_caching_sha2(password: &[u8], salt: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return Vec::new();
    }

    let p1 = Sha256::digest(password);
    let p2 = Sha256::digest(p1);
    let mut hasher = Sha256::new();
    hasher.update(p2);
    hasher.update(salt);
    let p3 = hasher.finalize();

    p1.iter().zip(p3.iter()).map(|(a, b)| a ^ b).collect()
}

/// XOR `data` with the salt repeated; used ahead of the RSA step. The salt
/// is truncated to the scramble length first.
pub fn xor_password(data: &[u8], salt: &[u8]) -> Vec<u8> {
    let salt = &salt[..salt.len().min(SCRAMBLE_LENGTH)];
    if salt.is_empty() {
        return data.to_vec();
    }
    data.iter()
        .enumerate()
        .map(|(i, &b)| b ^ salt[i % salt.len()])
        .collect()
}

/// Encrypt `password + NUL`, XOR-rotated with the salt, under the server's
/// RSA public key with OAEP-SHA1/MGF1-SHA1 padding. Used by both
/// sha256_password and caching_sha2_password full auth.
pub fn sha2_rsa_encrypt(password: &[u8], salt: &[u8], public_key_pem: &[u8]) -> Result<Vec<u8>> {
    let mut message = password.to_vec();
    message.push(0);
    let message = xor_password(&message, salt);

    let pem = std::str::from_utf8(public_key_pem)
        .map_err(|_| Error::programming("Server public key is not valid PEM"))?;
    let key = RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|e| Error::programming(format!("Invalid server public key: {e}")))?;

    key.encrypt(&mut OsRng, rsa::Oaep::new::<Sha1>(), &message)
        .map_err(|e| Error::operational(
            crate::consts::cr::CR_AUTH_PLUGIN_ERR,
            format!("RSA encryption failed: {e}"),
        ))
}

/// MariaDB client_ed25519: sign the server scramble with a keypair derived
/// from the password. The secret scalar is the clamped first half of
/// SHA-512(password); the second half seeds the commitment, per RFC 8032
/// section 5.1.6 with the password hash in place of the expanded seed.
pub fn ed25519_scramble(password: &[u8], scramble: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return Vec::new();
    }

    let h: [u8; 64] = Sha512::digest(password).into();

    let mut s_bytes = [0u8; 32];
    s_bytes.copy_from_slice(&h[..32]);
    s_bytes[0] &= 248;
    s_bytes[31] &= 127;
    s_bytes[31] |= 64;
    // Reduction mod L preserves the public point and the signature scalar.
    let s = Scalar::from_bytes_mod_order(s_bytes);
    let big_a = EdwardsPoint::mul_base(&s).compress();

    let mut hasher = Sha512::new();
    hasher.update(&h[32..]);
    hasher.update(scramble);
    let r = Scalar::from_bytes_mod_order_wide(&hasher.finalize().into());
    let big_r = EdwardsPoint::mul_base(&r).compress();

    let mut hasher = Sha512::new();
    hasher.update(big_r.as_bytes());
    hasher.update(big_a.as_bytes());
    hasher.update(scramble);
    let k = Scalar::from_bytes_mod_order_wide(&hasher.finalize().into());

    let sig_s = k * s + r;

    let mut out = Vec::with_capacity(64);
    out.extend_from_slice(big_r.as_bytes());
    out.extend_from_slice(sig_s.as_bytes());
    out
}

// Pre-4.1 scramble. Kept only for servers that demand mysql_old_password
// via auth switch.

struct Rand323 {
    seed1: u64,
    seed2: u64,
}

const RAND323_MAX: u64 = 0x3FFFFFFF;

impl Rand323 {
    fn next(&mut self) -> f64 {
        self.seed1 = (self.seed1 * 3 + self.seed2) % RAND323_MAX;
        self.seed2 = (self.seed1 + self.seed2 + 33) % RAND323_MAX;
        self.seed1 as f64 / RAND323_MAX as f64
    }
}

fn hash_323(data: &[u8]) -> (u32, u32) {
    let mut nr: u32 = 1345345333;
    let mut add: u32 = 7;
    let mut nr2: u32 = 0x12345671;
    for &b in data {
        if b == b' ' || b == b'\t' {
            continue;
        }
        let tmp = b as u32;
        nr ^= (nr & 63)
            .wrapping_add(add)
            .wrapping_mul(tmp)
            .wrapping_add(nr << 8);
        nr2 = nr2.wrapping_add((nr2 << 8) ^ nr);
        add = add.wrapping_add(tmp);
    }
    (nr & 0x7FFF_FFFF, nr2 & 0x7FFF_FFFF)
}

/// The legacy 8-byte scramble for `mysql_old_password`.
pub fn scramble_old_password(password: &[u8], salt: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return Vec::new();
    }
    let salt = &salt[..salt.len().min(8)];
    let hp = hash_323(password);
    let hs = hash_323(salt);
    let mut rng = Rand323 {
        seed1: ((hp.0 ^ hs.0) as u64) % RAND323_MAX,
        seed2: ((hp.1 ^ hs.1) as u64) % RAND323_MAX,
    };

    let mut out: Vec<u8> = (0..salt.len())
        .map(|_| (rng.next() * 31.0) as u8 + 64)
        .collect();
    let extra = (rng.next() * 31.0) as u8;
    for b in &mut out {
        *b ^= extra;
    }
    out
}
