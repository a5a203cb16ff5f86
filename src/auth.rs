use rand::Rng;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
    Student,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Student => "student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "staff" => Ok(Role::Staff),
            "student" => Ok(Role::Student),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Random decimal string, leading zeros allowed.
pub fn generate_digits(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

pub fn generate_numeric_id(len: usize) -> String {
    generate_digits(len)
}

pub fn generate_pin(len: usize) -> String {
    generate_digits(len)
}

/// Lowercase hex SHA-256 of the password.
pub fn hash_password(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("id and pin are required")]
    Missing,
    #[error("id must be {id_len} digits and pin must be {pin_len} digits")]
    BadShape { id_len: usize, pin_len: usize },
}

/// Shape check for student/staff logins before any lookup.
pub fn check_numeric_credentials(
    id: &str,
    pin: &str,
    id_len: usize,
    pin_len: usize,
) -> Result<(), CredentialError> {
    if id.is_empty() || pin.is_empty() {
        return Err(CredentialError::Missing);
    }
    let digits = |s: &str, n: usize| s.len() == n && s.bytes().all(|b| b.is_ascii_digit());
    if !digits(id, id_len) || !digits(pin, pin_len) {
        return Err(CredentialError::BadShape { id_len, pin_len });
    }
    Ok(())
}

/// Accepts `local@domain.tld`: one `@`, something before it, and a dot in
/// the domain with text on both sides.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return false;
    }
    match domain.rfind('.') {
        Some(i) => i > 0 && i + 1 < domain.len(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_credentials_have_requested_shape() {
        for _ in 0..50 {
            let id = generate_numeric_id(8);
            let pin = generate_pin(5);
            assert_eq!(id.len(), 8);
            assert_eq!(pin.len(), 5);
            assert!(check_numeric_credentials(&id, &pin, 8, 5).is_ok());
        }
    }

    #[test]
    fn password_hash_is_sha256_hex() {
        assert_eq!(
            hash_password("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(hash_password("").len(), 64);
    }

    #[test]
    fn credential_shape_rules() {
        assert_eq!(
            check_numeric_credentials("", "12345", 8, 5),
            Err(CredentialError::Missing)
        );
        assert!(matches!(
            check_numeric_credentials("1234567", "12345", 8, 5),
            Err(CredentialError::BadShape { .. })
        ));
        assert!(matches!(
            check_numeric_credentials("1234567a", "12345", 8, 5),
            Err(CredentialError::BadShape { .. })
        ));
        assert!(check_numeric_credentials("00000001", "00000", 8, 5).is_ok());
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("admin@school.edu"));
        assert!(is_valid_email("a.b@x.co.uk"));
        assert!(!is_valid_email("admin"));
        assert!(!is_valid_email("@school.edu"));
        assert!(!is_valid_email("admin@school"));
        assert!(!is_valid_email("admin@.edu"));
        assert!(!is_valid_email("admin@school."));
        assert!(!is_valid_email("a@b@c.d"));
        assert!(!is_valid_email("a@b.c@d"));
        assert!(!is_valid_email("ad min@school.edu"));
    }

    #[test]
    fn role_parse_round_trip() {
        assert_eq!("Admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!(Role::Staff.to_string(), "staff");
        assert!("janitor".parse::<Role>().is_err());
    }
}
