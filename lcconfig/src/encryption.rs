//! Chiffrement des identifiants stockés dans la configuration
//!
//! Les mots de passe BMC peuvent être écrits dans `config.yaml` sous la forme
//! `encrypted:<base64>`. La clé AES-256 est dérivée de l'identifiant de la
//! machine : un fichier copié sur une autre machine ne se déchiffre pas.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use anyhow::{Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};

/// Préfixe des valeurs chiffrées
pub const ENCRYPTED_PREFIX: &str = "encrypted:";

const KEY_SALT: &[u8] = b"lcwsman-credentials-v1";
const NONCE_SALT: &[u8] = b"lcwsman-nonce-v1";
const NONCE_LEN: usize = 12;

/// Identifiant stable de la machine
fn machine_id() -> Result<String> {
    #[cfg(target_os = "linux")]
    {
        for path in ["/etc/machine-id", "/var/lib/dbus/machine-id"] {
            if let Ok(id) = std::fs::read_to_string(path) {
                let id = id.trim();
                if !id.is_empty() {
                    return Ok(id.to_string());
                }
            }
        }
        Err(anyhow!("Failed to read machine-id"))
    }

    #[cfg(target_os = "macos")]
    {
        let output = std::process::Command::new("ioreg")
            .args(["-d2", "-c", "IOPlatformExpertDevice"])
            .output()?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        // "IOPlatformUUID" = "XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX"
        stdout
            .lines()
            .find(|line| line.contains("IOPlatformUUID"))
            .and_then(|line| line.split('"').nth(3))
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Failed to extract IOPlatformUUID from ioreg"))
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        Err(anyhow!("Unsupported platform for machine id extraction"))
    }
}

/// Clé AES-256 dérivée d'un secret
fn derive_key(secret: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(secret);
    hasher.update(KEY_SALT);

    let mut key = [0u8; 32];
    key.copy_from_slice(&hasher.finalize());
    key
}

fn cipher(secret: &[u8]) -> Result<Aes256Gcm> {
    Aes256Gcm::new_from_slice(&derive_key(secret))
        .map_err(|e| anyhow!("Failed to create cipher: {}", e))
}

/// Chiffre `password` avec la clé dérivée de `secret`.
///
/// Le nonce est dérivé du mot de passe : le même mot de passe donne toujours
/// la même valeur, et le fichier de configuration ne change pas à chaque
/// sauvegarde. Format : `encrypted:` + base64(nonce ‖ ciphertext).
pub fn encrypt_with(secret: &[u8], password: &str) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(NONCE_SALT);
    let digest = hasher.finalize();
    let nonce_bytes = &digest[..NONCE_LEN];

    let ciphertext = cipher(secret)?
        .encrypt(Nonce::from_slice(nonce_bytes), password.as_bytes())
        .map_err(|e| anyhow!("Encryption failed: {}", e))?;

    let mut combined = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    combined.extend_from_slice(nonce_bytes);
    combined.extend_from_slice(&ciphertext);

    Ok(format!("{}{}", ENCRYPTED_PREFIX, STANDARD.encode(&combined)))
}

/// Déchiffre une valeur produite par [`encrypt_with`] avec le même secret.
pub fn decrypt_with(secret: &[u8], encrypted: &str) -> Result<String> {
    let encoded = encrypted
        .strip_prefix(ENCRYPTED_PREFIX)
        .ok_or_else(|| anyhow!("Invalid encrypted password format (missing prefix)"))?;

    let combined = STANDARD
        .decode(encoded)
        .map_err(|e| anyhow!("Invalid base64: {}", e))?;

    if combined.len() < NONCE_LEN {
        return Err(anyhow!("Invalid ciphertext (too short)"));
    }
    let (nonce, ciphertext) = combined.split_at(NONCE_LEN);

    let plaintext = cipher(secret)?
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|e| anyhow!("Decryption failed (wrong machine or corrupted data): {}", e))?;

    String::from_utf8(plaintext).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
}

/// Chiffre un mot de passe pour cette machine.
pub fn encrypt_password(password: &str) -> Result<String> {
    encrypt_with(machine_id()?.as_bytes(), password)
}

/// Déchiffre un mot de passe chiffré sur cette machine.
pub fn decrypt_password(encrypted: &str) -> Result<String> {
    decrypt_with(machine_id()?.as_bytes(), encrypted)
}

pub fn is_encrypted(value: &str) -> bool {
    value.starts_with(ENCRYPTED_PREFIX)
}

/// Mot de passe en clair, que la valeur soit chiffrée ou non.
pub fn get_password(value: &str) -> Result<String> {
    if is_encrypted(value) {
        decrypt_password(value)
    } else {
        Ok(value.to_string())
    }
}
