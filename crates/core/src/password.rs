/// Failure while hashing or parsing a stored hash.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct PasswordError(pub String);

/// One-way password hashing used by registration and password login.
pub trait PasswordEncrypter: Send + Sync {
    fn hash_password(&self, plain: &str) -> Result<String, PasswordError>;

    /// `Ok(false)` on mismatch; `Err` only when `hash` cannot be parsed.
    fn check_password(&self, hash: &str, plain: &str) -> Result<bool, PasswordError>;
}
