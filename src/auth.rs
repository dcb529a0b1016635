use anyhow::anyhow;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

/// Argon2id hash in PHC string form (`$argon2id$v=19$...`), salt included.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("failed to hash password: {}", e))?;
    Ok(hash.to_string())
}

/// Anything that is not a parseable PHC string never verifies.
pub fn verify_password(stored: &str, candidate: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            log::warn!("stored password hash is not a PHC string: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_verifies_only_the_original_password() {
        let stored = hash_password("King@123").expect("hash");
        assert!(stored.starts_with("$argon2id$"));
        assert!(verify_password(&stored, "King@123"));
        assert!(!verify_password(&stored, "king@123"));
        assert!(!verify_password(&stored, ""));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = hash_password("secret").expect("hash");
        let b = hash_password("secret").expect("hash");
        assert_ne!(a, b);
        assert!(verify_password(&a, "secret"));
        assert!(verify_password(&b, "secret"));
    }

    #[test]
    fn stored_hash_carries_a_work_factor() {
        let stored = hash_password("King@123").expect("hash");
        PasswordHash::new(&stored).expect("phc string");
        assert!(stored.contains("m="), "{}", stored);
        assert!(stored.contains("t="), "{}", stored);
        assert!(!stored.contains("King@123"));
    }

    #[test]
    fn plaintext_or_malformed_storage_never_verifies() {
        assert!(!verify_password("secret", "secret"));
        assert!(!verify_password("sha256$salt$abc", "secret"));
        assert!(!verify_password("$argon2id$v=19$garbage", "secret"));
    }
}
