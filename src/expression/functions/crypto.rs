//! 摘要与加密函数
//!
//! 哈希输出为小写十六进制。AES 采用 CBC 模式，密钥由
//! PBKDF2-HMAC-SHA256 派生（10 万轮），密文为
//! base64(salt16 + iv16 + ciphertext)。

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use anyhow::{Result, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use serde_json::{Value, json};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

use crate::expression::args::arg_str;
use crate::expression::registry::FunctionRegistry;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const PBKDF2_ROUNDS: u32 = 100_000;

pub fn register(registry: &mut FunctionRegistry) {
    registry.register("md5", md5_hash);
    registry.register("md5_hash", md5_hash);
    registry.register("sha1", sha1_hash);
    registry.register("sha1_hash", sha1_hash);
    registry.register("sha256", sha256_hash);
    registry.register("sha256_hash", sha256_hash);
    registry.register("sha512_hash", sha512_hash);
    registry.register("base64", base64_alias);
    registry.register("hash_comparison", hash_comparison);
    registry.register("aes_encrypt", aes_encrypt);
    registry.register("aes_decrypt", aes_decrypt);
}

fn hex_digest(algorithm: &str, text: &str) -> Result<String> {
    let digest = match algorithm {
        "md5" => format!("{:x}", md5::compute(text.as_bytes())),
        "sha1" => hex_string(&Sha1::digest(text.as_bytes())),
        "sha256" => hex_string(&Sha256::digest(text.as_bytes())),
        "sha512" => hex_string(&Sha512::digest(text.as_bytes())),
        other => bail!("不支持的哈希算法: {}", other),
    };
    Ok(digest)
}

fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn hash_response(algorithm: &str, label: &str, args: &[Value]) -> Result<Value> {
    let text = arg_str(args, 0, "");
    let digest = hex_digest(algorithm, &text)?;
    Ok(json!({
        "result": digest,
        "algorithm": label,
        "input_length": text.chars().count(),
        "hash_length": digest.len(),
    }))
}

fn md5_hash(args: &[Value]) -> Result<Value> {
    hash_response("md5", "MD5", args)
}

fn sha1_hash(args: &[Value]) -> Result<Value> {
    hash_response("sha1", "SHA-1", args)
}

fn sha256_hash(args: &[Value]) -> Result<Value> {
    hash_response("sha256", "SHA-256", args)
}

fn sha512_hash(args: &[Value]) -> Result<Value> {
    hash_response("sha512", "SHA-512", args)
}

/// 加密类别下的 base64 别名，与编码类别的 base64_encode 行为一致
fn base64_alias(args: &[Value]) -> Result<Value> {
    let text = arg_str(args, 0, "");
    let encoded = STANDARD.encode(text.as_bytes());
    Ok(json!({
        "result": encoded,
        "input_length": text.chars().count(),
        "encoded_length": encoded.len(),
    }))
}

/// hash_comparison(text, hash_value, algorithm='md5')
fn hash_comparison(args: &[Value]) -> Result<Value> {
    let text = arg_str(args, 0, "");
    let hash_value = arg_str(args, 1, "");
    let algorithm = arg_str(args, 2, "md5");

    let computed = hex_digest(&algorithm, &text)?;
    Ok(json!({
        "is_match": computed.eq_ignore_ascii_case(&hash_value),
        "computed_hash": computed,
        "provided_hash": hash_value,
        "algorithm": algorithm,
    }))
}

fn derive_key(password: &str, salt: &[u8]) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ROUNDS, &mut key);
    key
}

/// aes_encrypt(text, password, mode='CBC')
fn aes_encrypt(args: &[Value]) -> Result<Value> {
    let text = arg_str(args, 0, "");
    let password = arg_str(args, 1, "");
    let mode = arg_str(args, 2, "CBC");
    if mode != "CBC" {
        bail!("不支持的AES模式: {}", mode);
    }

    let mut salt = [0u8; 16];
    let mut iv = [0u8; 16];
    rand::rng().fill_bytes(&mut salt);
    rand::rng().fill_bytes(&mut iv);

    let key = derive_key(&password, &salt);
    let ciphertext = Aes256CbcEnc::new(&key.into(), &iv.into())
        .encrypt_padded_vec_mut::<Pkcs7>(text.as_bytes());

    let mut payload = Vec::with_capacity(32 + ciphertext.len());
    payload.extend_from_slice(&salt);
    payload.extend_from_slice(&iv);
    payload.extend_from_slice(&ciphertext);

    Ok(json!({
        "result": STANDARD.encode(payload),
        "algorithm": "AES-CBC",
        "key_length": 256,
    }))
}

/// aes_decrypt(encrypted_text, password, mode='CBC')
fn aes_decrypt(args: &[Value]) -> Result<Value> {
    let encrypted_text = arg_str(args, 0, "");
    let password = arg_str(args, 1, "");
    let mode = arg_str(args, 2, "CBC");
    if mode != "CBC" {
        bail!("不支持的AES模式: {}", mode);
    }

    let payload = STANDARD
        .decode(encrypted_text.trim())
        .map_err(|_| anyhow::anyhow!("AES解密失败，请检查密码和密文！"))?;
    if payload.len() < 48 {
        bail!("AES解密失败，请检查密码和密文！");
    }

    let (salt, rest) = payload.split_at(16);
    let (iv, ciphertext) = rest.split_at(16);
    let key = derive_key(&password, salt);

    let iv_arr: [u8; 16] = iv.try_into().map_err(|_| anyhow::anyhow!("AES解密失败，请检查密码和密文！"))?;
    let plaintext = Aes256CbcDec::new(&key.into(), &iv_arr.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| anyhow::anyhow!("AES解密失败，请检查密码和密文！"))?;
    let decrypted = String::from_utf8(plaintext).map_err(|_| anyhow::anyhow!("AES解密失败，请检查密码和密文！"))?;

    Ok(json!({
        "result": decrypted,
        "algorithm": "AES-CBC",
        "success": true,
    }))
}
