use crate::config::{MatchingConfig, MissingAttributePolicy};
use crate::model::{MatchKey, UserRecord};

/// Keep only ASCII digits. A missing phone normalizes to the empty string.
pub fn normalize_phone(raw: Option<&str>) -> String {
    raw.map(|s| s.chars().filter(|c| c.is_ascii_digit()).collect())
        .unwrap_or_default()
}

/// Lower-case and trim. A missing email normalizes to `missing_token`.
pub fn normalize_email(raw: Option<&str>, missing_token: &str) -> String {
    raw.unwrap_or(missing_token).to_lowercase().trim().to_string()
}

/// Derives the match keys of a user row under a matching policy.
#[derive(Debug, Clone)]
pub struct Normalizer {
    policy: MissingAttributePolicy,
    missing_email_token: String,
}

impl Normalizer {
    pub fn new(config: &MatchingConfig) -> Self {
        Self {
            policy: config.missing_attributes,
            missing_email_token: config.missing_email_token.clone(),
        }
    }

    pub fn policy(&self) -> MissingAttributePolicy {
        self.policy
    }

    pub fn phone_key(&self, raw: Option<&str>) -> Option<MatchKey> {
        let digits = normalize_phone(raw);
        if digits.is_empty() && self.policy == MissingAttributePolicy::Skip {
            return None;
        }
        Some(MatchKey::Phone(digits))
    }

    pub fn email_key(&self, raw: Option<&str>) -> Option<MatchKey> {
        match self.policy {
            MissingAttributePolicy::Merge => {
                Some(MatchKey::Email(normalize_email(raw, &self.missing_email_token)))
            }
            MissingAttributePolicy::Skip => {
                let addr = normalize_email(Some(raw?), "");
                (!addr.is_empty()).then_some(MatchKey::Email(addr))
            }
        }
    }

    /// Phone key then email key; either may be absent under `Skip`.
    pub fn keys(&self, record: &UserRecord) -> impl Iterator<Item = MatchKey> {
        self.phone_key(record.phone.as_deref())
            .into_iter()
            .chain(self.email_key(record.email.as_deref()))
    }

    /// True when `key` is what a missing attribute turns into.
    pub fn is_absence_key(&self, key: &MatchKey) -> bool {
        match key {
            MatchKey::Phone(digits) => digits.is_empty(),
            MatchKey::Email(addr) => {
                addr.is_empty() || *addr == normalize_email(None, &self.missing_email_token)
            }
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(&MatchingConfig::default())
    }
}
