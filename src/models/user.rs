use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::enums::UserRole;

pub const CREDENTIAL_ITERATIONS: u32 = 100_000;
const SALT_LENGTH: usize = 16;
const HASH_LENGTH: usize = 32;

/// A clinician account. Only the salted hash of the secret is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub display_name: String,
    pub role: UserRole,
    pub credential: Credential,
}

/// What callers are allowed to see of a [`User`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub user_id: String,
    pub display_name: String,
    pub role: UserRole,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id.clone(),
            display_name: user.display_name.clone(),
            role: user.role,
        }
    }
}

/// PBKDF2-SHA256 hash of a user secret, stored as `salt$hash` (base64).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    /// Hash `secret` under a fresh random salt.
    pub fn from_secret(secret: &str) -> Self {
        let salt: [u8; SALT_LENGTH] = rand::random();
        let hash = derive(secret, &salt);
        Self(format!(
            "{}${}",
            STANDARD_NO_PAD.encode(salt),
            STANDARD_NO_PAD.encode(hash)
        ))
    }

    /// Constant-time check of `secret` against the stored hash.
    /// A malformed stored value never verifies.
    pub fn verify(&self, secret: &str) -> bool {
        let Some((salt_b64, hash_b64)) = self.0.split_once('$') else {
            return false;
        };
        let (Ok(salt), Ok(expected)) = (
            STANDARD_NO_PAD.decode(salt_b64),
            STANDARD_NO_PAD.decode(hash_b64),
        ) else {
            return false;
        };
        let actual = derive(secret, &salt);
        actual.as_slice().ct_eq(expected.as_slice()).into()
    }
}

fn derive(secret: &str, salt: &[u8]) -> [u8; HASH_LENGTH] {
    let mut out = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(secret.as_bytes(), salt, CREDENTIAL_ITERATIONS, &mut out);
    out
}

/// One entry of the account seed file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSeed {
    pub user_id: String,
    pub display_name: Option<String>,
    pub role: UserRole,
    pub password: String,
}

impl UserSeed {
    pub fn into_user(self) -> User {
        User {
            display_name: self.display_name.unwrap_or_else(|| self.user_id.clone()),
            user_id: self.user_id,
            role: self.role,
            credential: Credential::from_secret(&self.password),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_verifies_only_the_right_secret() {
        let credential = Credential::from_secret("correct horse");
        assert!(credential.verify("correct horse"));
        assert!(!credential.verify("correct horse "));
        assert!(!credential.verify(""));
    }

    #[test]
    fn same_secret_hashes_differently_per_salt() {
        assert_ne!(Credential::from_secret("pw"), Credential::from_secret("pw"));
    }

    #[test]
    fn malformed_credential_never_verifies() {
        assert!(!Credential("no-separator".into()).verify("x"));
        assert!(!Credential("!!$!!".into()).verify("x"));
    }

    #[test]
    fn view_hides_credential() {
        let user = UserSeed {
            user_id: "dr.okafor".into(),
            display_name: None,
            role: UserRole::Doctor,
            password: "pw".into(),
        }
        .into_user();
        assert_eq!(user.display_name, "dr.okafor");

        let json = serde_json::to_value(UserView::from(&user)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"userId": "dr.okafor", "displayName": "dr.okafor", "role": "doctor"})
        );
    }
}
