use anyhow::anyhow;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Well-formed hash with the default Argon2id cost that no password matches.
/// Checked against when a login names an unknown user, so both paths cost the same.
pub const UNKNOWN_USER_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$DFZkg2kiIp6aSqPLf1drJw$Vf54k6SJR70mReftZJdo0j1rAtfuqgfi4f1SOVtb4qs";

/// Hash `password` with Argon2id and a fresh random salt
pub fn hash(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow!("failed to hash password: {}", e))
}

/// Check `password` against a stored PHC hash string
pub fn verify(password: &str, stored: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(|e| anyhow!("invalid password hash: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// [`hash`] off the async runtime
pub async fn hash_blocking(password: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || hash(&password)).await?
}

/// [`verify`] off the async runtime
pub async fn verify_blocking(password: String, stored: String) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || verify(&password, &stored)).await?
}
