use serde::{Deserialize, Serialize};

use crate::error::IdentityError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
    pub name: String,
    pub users: UsersSource,
    #[serde(default)]
    pub orders: Option<OrdersSource>,
    #[serde(default)]
    pub catalog: Option<CatalogSource>,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct UsersSource {
    pub file: String,
    #[serde(default)]
    pub columns: UserColumns,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserColumns {
    pub id: String,
    pub phone: String,
    pub email: String,
}

impl Default for UserColumns {
    fn default() -> Self {
        Self {
            id: "id".into(),
            phone: "phone".into(),
            email: "email".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrdersSource {
    pub file: String,
    #[serde(default)]
    pub columns: OrderColumns,
}

/// Column names for the order table. `user_id`, `timestamp` and `book_id`
/// are looked up but may be absent from the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrderColumns {
    pub user_id: String,
    pub quantity: String,
    pub unit_price: String,
    pub timestamp: String,
    pub book_id: String,
}

impl Default for OrderColumns {
    fn default() -> Self {
        Self {
            user_id: "user_id".into(),
            quantity: "quantity".into(),
            unit_price: "unit_price".into(),
            timestamp: "timestamp".into(),
            book_id: "book_id".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSource {
    pub file: String,
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// What to do with a phone or email that is missing or normalizes to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingAttributePolicy {
    /// Missing values still produce a shared key, so every user lacking a
    /// phone is linked to every other user lacking a phone.
    #[default]
    Merge,
    /// Missing values produce no key and never link anything.
    Skip,
}

impl std::fmt::Display for MissingAttributePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Merge => write!(f, "merge"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub missing_attributes: MissingAttributePolicy,
    /// Text a missing email normalizes to under the `merge` policy.
    pub missing_email_token: String,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            missing_attributes: MissingAttributePolicy::Merge,
            missing_email_token: "nan".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Pricing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Multiplier applied to prices quoted in euros.
    pub eur_rate: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self { eur_rate: 1.2 }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl IdentityConfig {
    pub fn from_toml(input: &str) -> Result<Self, IdentityError> {
        let config: IdentityConfig =
            toml::from_str(input).map_err(|e| IdentityError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), IdentityError> {
        if self.name.trim().is_empty() {
            return Err(IdentityError::ConfigValidation("name must not be empty".into()));
        }

        if self.users.file.trim().is_empty() {
            return Err(IdentityError::ConfigValidation("users.file must not be empty".into()));
        }
        let u = &self.users.columns;
        check_columns("users", &[("id", &u.id), ("phone", &u.phone), ("email", &u.email)])?;

        if let Some(ref orders) = self.orders {
            if orders.file.trim().is_empty() {
                return Err(IdentityError::ConfigValidation(
                    "orders.file must not be empty".into(),
                ));
            }
            let o = &orders.columns;
            check_columns(
                "orders",
                &[
                    ("user_id", &o.user_id),
                    ("quantity", &o.quantity),
                    ("unit_price", &o.unit_price),
                    ("timestamp", &o.timestamp),
                    ("book_id", &o.book_id),
                ],
            )?;
        }

        if let Some(ref catalog) = self.catalog {
            if catalog.file.trim().is_empty() {
                return Err(IdentityError::ConfigValidation(
                    "catalog.file must not be empty".into(),
                ));
            }
        }

        if !self.pricing.eur_rate.is_finite() || self.pricing.eur_rate <= 0.0 {
            return Err(IdentityError::ConfigValidation(format!(
                "pricing.eur_rate must be positive, got {}",
                self.pricing.eur_rate
            )));
        }

        Ok(())
    }
}

fn check_columns(table: &str, columns: &[(&str, &String)]) -> Result<(), IdentityError> {
    for (field, name) in columns {
        if name.trim().is_empty() {
            return Err(IdentityError::ConfigValidation(format!(
                "{table}.columns.{field} must not be empty"
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
name = "DATA1"

[users]
file = "users.csv"
"#;

    #[test]
    fn parse_minimal() {
        let config = IdentityConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.name, "DATA1");
        assert_eq!(config.users.columns.id, "id");
        assert_eq!(config.users.columns.phone, "phone");
        assert!(config.orders.is_none());
        assert!(config.catalog.is_none());
        assert_eq!(config.matching.missing_attributes, MissingAttributePolicy::Merge);
        assert_eq!(config.matching.missing_email_token, "nan");
        assert_eq!(config.pricing.eur_rate, 1.2);
    }

    #[test]
    fn parse_full() {
        let input = r#"
name = "DATA3"

[users]
file = "users.csv"
[users.columns]
id = "user_key"
email = "mail"

[orders]
file = "orders.csv"
[orders.columns]
unit_price = "price"

[catalog]
file = "books.json"

[matching]
missing_attributes = "skip"

[pricing]
eur_rate = 1.08
"#;
        let config = IdentityConfig::from_toml(input).unwrap();
        assert_eq!(config.users.columns.id, "user_key");
        assert_eq!(config.users.columns.phone, "phone");
        assert_eq!(config.users.columns.email, "mail");
        let orders = config.orders.unwrap();
        assert_eq!(orders.columns.unit_price, "price");
        assert_eq!(orders.columns.quantity, "quantity");
        assert_eq!(config.catalog.unwrap().file, "books.json");
        assert_eq!(config.matching.missing_attributes, MissingAttributePolicy::Skip);
        assert_eq!(config.pricing.eur_rate, 1.08);
    }

    #[test]
    fn reject_unknown_policy() {
        let input = format!("{MINIMAL}\n[matching]\nmissing_attributes = \"fuzzy\"\n");
        let err = IdentityConfig::from_toml(&input).unwrap_err();
        assert!(matches!(err, IdentityError::ConfigParse(_)));
    }

    #[test]
    fn reject_empty_name() {
        let err =
            IdentityConfig::from_toml("name = \" \"\n[users]\nfile = \"u.csv\"\n").unwrap_err();
        assert!(err.to_string().contains("name must not be empty"));
    }

    #[test]
    fn reject_bad_rate() {
        let input = format!("{MINIMAL}\n[pricing]\neur_rate = 0.0\n");
        let err = IdentityConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("eur_rate"));
    }

    #[test]
    fn reject_empty_column() {
        let input = "name = \"x\"\n[users]\nfile = \"u.csv\"\n[users.columns]\nphone = \"\"\n";
        let err = IdentityConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("users.columns.phone"));
    }

    #[test]
    fn reject_missing_users_table() {
        let err = IdentityConfig::from_toml("name = \"x\"\n").unwrap_err();
        assert!(matches!(err, IdentityError::ConfigParse(_)));
    }
}
