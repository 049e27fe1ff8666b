use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::model::UserId;

pub const MAX_KEY_LENGTH: usize = 512;
pub const MAX_VALUE_SIZE: usize = 1024 * 1024;

/// Hex chars of the blake3 digest kept in per-user key suffixes.
const USER_SCOPE_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyNamespace {
    Session,
    CheckIn,
    Cache,
}

impl KeyNamespace {
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::CheckIn => "checkin",
            Self::Cache => "cache",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KvKey {
    namespace: KeyNamespace,
    key: String,
}

impl KvKey {
    pub fn new(namespace: KeyNamespace, key: impl Into<String>) -> Result<Self, KvError> {
        let key = key.into();
        Self::validate_key(&key)?;
        Ok(Self { namespace, key })
    }

    #[must_use]
    pub fn raw(&self) -> String {
        format!("{}:{}", self.namespace.prefix(), self.key)
    }

    fn validate_key(key: &str) -> Result<(), KvError> {
        if key.trim().is_empty() {
            return Err(KvError::InvalidKey {
                key: key.to_string(),
                reason: "key cannot be empty".to_string(),
            });
        }

        if key.len() > MAX_KEY_LENGTH {
            return Err(KvError::InvalidKey {
                key: key.chars().take(50).collect::<String>() + "...",
                reason: format!("key exceeds maximum length of {MAX_KEY_LENGTH} bytes"),
            });
        }

        if key.contains("..") {
            return Err(KvError::InvalidKey {
                key: key.to_string(),
                reason: "key cannot contain path traversal sequences".to_string(),
            });
        }

        if key.starts_with('/') || key.starts_with('\\') {
            return Err(KvError::InvalidKey {
                key: key.to_string(),
                reason: "key cannot start with path separator".to_string(),
            });
        }

        if key.chars().any(char::is_control) {
            return Err(KvError::InvalidKey {
                key: key.escape_debug().to_string(),
                reason: "key contains control characters".to_string(),
            });
        }

        Ok(())
    }
}

/// Opaque per-user key component. Raw user ids never reach device storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserScope(String);

impl UserScope {
    #[must_use]
    pub fn of(user_id: &UserId) -> Self {
        let digest = blake3::hash(user_id.as_str().as_bytes()).to_hex();
        Self(digest.as_str()[..USER_SCOPE_LEN].to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Every value the core keeps on the device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoredKey {
    CurrentUser,
    LastCheckIn(UserScope),
    CheckInDay(UserScope, NaiveDate),
    FavoritesCache(UserScope),
}

impl StoredKey {
    #[must_use]
    pub fn last_check_in(user_id: &UserId) -> Self {
        Self::LastCheckIn(UserScope::of(user_id))
    }

    #[must_use]
    pub fn check_in_day(user_id: &UserId, day: NaiveDate) -> Self {
        Self::CheckInDay(UserScope::of(user_id), day)
    }

    #[must_use]
    pub fn favorites_cache(user_id: &UserId) -> Self {
        Self::FavoritesCache(UserScope::of(user_id))
    }

    pub fn to_kv_key(&self) -> Result<KvKey, KvError> {
        match self {
            Self::CurrentUser => KvKey::new(KeyNamespace::Session, "current_user"),
            Self::LastCheckIn(scope) => {
                KvKey::new(KeyNamespace::CheckIn, format!("last:{}", scope.as_str()))
            }
            Self::CheckInDay(scope, day) => KvKey::new(
                KeyNamespace::CheckIn,
                format!("day:{}:{}", scope.as_str(), day.format("%Y-%m-%d")),
            ),
            Self::FavoritesCache(scope) => {
                KvKey::new(KeyNamespace::Cache, format!("favorites:{}", scope.as_str()))
            }
        }
    }

    pub fn raw(&self) -> Result<String, KvError> {
        self.to_kv_key().map(|k| k.raw())
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CurrentUser => "current_user",
            Self::LastCheckIn(_) => "last_check_in",
            Self::CheckInDay(..) => "check_in_day",
            Self::FavoritesCache(_) => "favorites_cache",
        }
    }
}

pub fn encode_value<T: Serialize>(value: &T) -> Result<Vec<u8>, KvError> {
    let data = serde_json::to_vec(value).map_err(|e| KvError::Serialization {
        message: e.to_string(),
    })?;
    if data.len() > MAX_VALUE_SIZE {
        return Err(KvError::ValueTooLarge {
            size: data.len(),
            max: MAX_VALUE_SIZE,
        });
    }
    Ok(data)
}

/// `Ok(None)` when nothing is stored under the key.
pub fn decode_value<T: DeserializeOwned>(
    stored: Result<Option<Vec<u8>>, String>,
) -> Result<Option<T>, KvError> {
    match stored {
        Ok(None) => Ok(None),
        Ok(Some(bytes)) if bytes.is_empty() => Ok(None),
        Ok(Some(bytes)) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| KvError::Serialization {
                message: e.to_string(),
            }),
        Err(message) => Err(KvError::Storage { message }),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum KvError {
    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("value too large: {size} bytes exceeds maximum of {max} bytes")]
    ValueTooLarge { size: usize, max: usize },

    #[error("serialization error: {message}")]
    Serialization { message: String },

    #[error("storage error: {message}")]
    Storage { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_validation_empty() {
        assert!(KvKey::new(KeyNamespace::Cache, "").is_err());
        assert!(KvKey::new(KeyNamespace::Cache, "   ").is_err());
    }

    #[test]
    fn test_key_validation_path_traversal() {
        let result = KvKey::new(KeyNamespace::Cache, "../etc/passwd");
        assert!(matches!(result, Err(KvError::InvalidKey { .. })));
    }

    #[test]
    fn test_key_validation_control_chars() {
        assert!(KvKey::new(KeyNamespace::Cache, "a\nb").is_err());
        assert!(KvKey::new(KeyNamespace::Cache, "a\0b").is_err());
    }

    #[test]
    fn test_key_validation_too_long() {
        let long = "a".repeat(MAX_KEY_LENGTH + 1);
        assert!(KvKey::new(KeyNamespace::Cache, long).is_err());
    }

    #[test]
    fn test_stored_key_layout() {
        let user = UserId::new("user-42");
        let scope = UserScope::of(&user);
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        assert_eq!(StoredKey::CurrentUser.raw().unwrap(), "session:current_user");
        assert_eq!(
            StoredKey::last_check_in(&user).raw().unwrap(),
            format!("checkin:last:{}", scope.as_str())
        );
        assert_eq!(
            StoredKey::check_in_day(&user, day).raw().unwrap(),
            format!("checkin:day:{}:2024-06-01", scope.as_str())
        );
        assert_eq!(
            StoredKey::favorites_cache(&user).raw().unwrap(),
            format!("cache:favorites:{}", scope.as_str())
        );
    }

    #[test]
    fn test_user_scope_hides_user_id() {
        let user = UserId::new("alice@example.com");
        let raw = StoredKey::favorites_cache(&user).raw().unwrap();
        assert!(!raw.contains("alice"));
        assert_eq!(UserScope::of(&user).as_str().len(), USER_SCOPE_LEN);
        assert_eq!(UserScope::of(&user), UserScope::of(&UserId::new("alice@example.com")));
        assert_ne!(UserScope::of(&user), UserScope::of(&UserId::new("bob")));
    }

    #[test]
    fn test_decode_missing_and_empty() {
        assert_eq!(decode_value::<u32>(Ok(None)).unwrap(), None);
        assert_eq!(decode_value::<u32>(Ok(Some(Vec::new()))).unwrap(), None);
    }

    #[test]
    fn test_decode_stored_value() {
        let bytes = encode_value(&NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()).unwrap();
        let day: Option<NaiveDate> = decode_value(Ok(Some(bytes))).unwrap();
        assert_eq!(day, NaiveDate::from_ymd_opt(2024, 1, 2));
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(
            decode_value::<u32>(Ok(Some(b"not json".to_vec()))),
            Err(KvError::Serialization { .. })
        ));
        assert!(matches!(
            decode_value::<u32>(Err("disk full".into())),
            Err(KvError::Storage { .. })
        ));
    }
}
