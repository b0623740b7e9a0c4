use crate::errors::StoreError;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use url::Url;
use validator::{Validate, ValidationError, ValidationErrors};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub u64);

impl Display for ProductId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProductId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteSource {
    Amazon,
    Flipkart,
    #[default]
    #[serde(other)]
    Other,
}

impl Display for SiteSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SiteSource::Amazon => write!(f, "Amazon"),
            SiteSource::Flipkart => write!(f, "Flipkart"),
            SiteSource::Other => write!(f, "Other"),
        }
    }
}

fn site_or_other<'de, D>(deserializer: D) -> Result<SiteSource, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<SiteSource>::deserialize(deserializer)?.unwrap_or_default())
}

/// A tracked product as the remote service reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub url: String,
    #[serde(default, deserialize_with = "site_or_other")]
    pub site_source: SiteSource,
    #[serde(default, rename = "product_title", alias = "title")]
    pub title: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub current_price: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float")]
    pub target_price: Decimal,
    #[serde(default, rename = "last_checked", with = "checked_at")]
    pub last_checked_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceStatus {
    /// No price check has completed yet.
    Unknown,
    AtOrBelowTarget { difference: Decimal },
    AboveTarget { difference: Decimal },
}

impl Product {
    pub fn price_status(&self) -> PriceStatus {
        match self.current_price {
            None => PriceStatus::Unknown,
            Some(current) if current <= self.target_price => PriceStatus::AtOrBelowTarget {
                difference: self.target_price - current,
            },
            Some(current) => PriceStatus::AboveTarget {
                difference: current - self.target_price,
            },
        }
    }

    pub fn is_below_target(&self) -> bool {
        matches!(self.price_status(), PriceStatus::AtOrBelowTarget { .. })
    }

    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.trim().is_empty() => title,
            _ => "Fetching product details…",
        }
    }
}

/// Timestamps arrive either as RFC 3339 or as `YYYY-MM-DD HH:MM:SS[.ffffff]`.
mod checked_at {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{de, Deserialize, Deserializer, Serializer};

    const FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

    pub fn parse(value: &str) -> Option<NaiveDateTime> {
        if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
            return Some(datetime.naive_utc());
        }
        if let Ok(datetime) = DateTime::parse_from_rfc2822(value) {
            return Some(datetime.naive_utc());
        }
        FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
    }

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(datetime) => {
                serializer.serialize_str(&datetime.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(value) if value.trim().is_empty() => Ok(None),
            Some(value) => parse(value.trim())
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("unrecognised timestamp {value}"))),
        }
    }
}

fn validate_product_url(url: &str) -> Result<(), ValidationError> {
    let mut err = ValidationError::new("url");
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => Ok(()),
        _ => {
            err.message = Some(Cow::Borrowed("Invalid URL format"));
            Err(err)
        }
    }
}

fn validate_target_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_positive() && !price.is_zero() {
        return Ok(());
    }
    let mut err = ValidationError::new("range");
    err.message = Some(Cow::Borrowed("Target price must be a positive number"));
    Err(err)
}

/// Body of an add request, checked before anything goes over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
pub struct NewProduct {
    #[validate(custom(function = "validate_product_url"))]
    pub url: String,
    #[validate(custom(function = "validate_target_price"))]
    #[serde(with = "rust_decimal::serde::float")]
    pub target_price: Decimal,
}

impl NewProduct {
    pub fn new(url: &str, target_price: Decimal) -> Result<Self, ValidationErrors> {
        let product = Self {
            url: url.trim().to_string(),
            target_price,
        };
        product.validate()?;
        Ok(product)
    }

    /// Builds a product from raw form input, rejecting non-numeric prices.
    pub fn parse(url: &str, target_price: &str) -> Result<Self, StoreError> {
        let target_price = Decimal::from_str(target_price.trim())?;
        Ok(Self::new(url, target_price)?)
    }
}

/// Bearer credential issued by the auth service.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(**redacted**)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    pub email: String,
}

#[derive(Clone, Serialize, Validate)]
pub struct Credentials {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Validate)]
struct NewPassword<'a> {
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    password: &'a str,
}

impl Credentials {
    pub fn for_login(email: &str, password: &str) -> Result<Self, ValidationErrors> {
        let credentials = Self {
            email: email.trim().to_lowercase(),
            password: password.to_string(),
        };
        credentials.validate()?;
        Ok(credentials)
    }

    pub fn for_registration(email: &str, password: &str) -> Result<Self, ValidationErrors> {
        let credentials = Self::for_login(email, password)?;
        NewPassword {
            password: &credentials.password,
        }
        .validate()?;
        Ok(credentials)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"**redacted**")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: Credential,
    pub user: UserProfile,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductsResponse {
    pub products: Vec<Product>,
}

/// What the service echoes back after an add; only the id is relied upon.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreatedProduct {
    pub id: ProductId,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddProductResponse {
    #[serde(default)]
    pub product: Option<CreatedProduct>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::FromPrimitive;
    use serde_json::json;

    fn product(current: Option<f64>, target: f64) -> Product {
        Product {
            id: ProductId(1),
            url: "https://amazon.in/x".to_string(),
            site_source: SiteSource::Amazon,
            title: None,
            current_price: current.and_then(Decimal::from_f64),
            target_price: Decimal::from_f64(target).unwrap(),
            last_checked_at: None,
        }
    }

    #[test]
    fn product_from_service_json_works() {
        let value = json!({
            "id": 1,
            "user_id": 7,
            "url": "https://amazon.in/dp/B0",
            "site_source": "amazon",
            "product_title": "Kettle",
            "current_price": 450.0,
            "target_price": 500,
            "last_checked": "2024-03-01 10:15:30.123456",
            "is_active": 1,
            "alert_sent": 0
        });
        let product: Product = serde_json::from_value(value).expect("Failed to parse product");
        assert_eq!(product.id, ProductId(1));
        assert_eq!(product.site_source, SiteSource::Amazon);
        assert_eq!(product.title.as_deref(), Some("Kettle"));
        assert_eq!(product.current_price, Some(Decimal::new(450, 0)));
        assert_eq!(product.target_price, Decimal::new(500, 0));
        assert!(product.last_checked_at.is_some());
        assert!(product.is_below_target());
    }

    #[test]
    fn product_with_missing_fields_works() {
        let value = json!({
            "id": 2,
            "url": "https://example.com/item",
            "site_source": null,
            "current_price": null,
            "target_price": 10.5,
            "last_checked": null
        });
        let product: Product = serde_json::from_value(value).expect("Failed to parse product");
        assert_eq!(product.site_source, SiteSource::Other);
        assert_eq!(product.title, None);
        assert_eq!(product.current_price, None);
        assert_eq!(product.last_checked_at, None);
        assert_eq!(product.price_status(), PriceStatus::Unknown);
        assert!(!product.is_below_target());
    }

    #[test]
    fn unknown_site_is_other() {
        let site: SiteSource = serde_json::from_str("\"myntra\"").unwrap();
        assert_eq!(site, SiteSource::Other);
        let site: SiteSource = serde_json::from_str("\"flipkart\"").unwrap();
        assert_eq!(site, SiteSource::Flipkart);
    }

    #[test]
    fn rfc3339_timestamp_works() {
        assert!(checked_at::parse("2024-03-01T10:15:30Z").is_some());
        assert!(checked_at::parse("2024-03-01 10:15:30").is_some());
        assert!(checked_at::parse("yesterday").is_none());
    }

    #[test]
    fn price_status_below_works() {
        let status = product(Some(450.0), 500.0).price_status();
        assert_eq!(
            status,
            PriceStatus::AtOrBelowTarget {
                difference: Decimal::new(50, 0)
            }
        );
    }

    #[test]
    fn price_status_equal_is_below() {
        assert!(product(Some(500.0), 500.0).is_below_target());
    }

    #[test]
    fn price_status_above_works() {
        let status = product(Some(1299.5), 999.0).price_status();
        assert_eq!(
            status,
            PriceStatus::AboveTarget {
                difference: Decimal::new(3005, 1)
            }
        );
    }

    #[test]
    fn new_product_validation_works() {
        let product = NewProduct::parse(" https://amazon.in/x ", "999").expect("valid product");
        assert_eq!(product.url, "https://amazon.in/x");
        assert_eq!(product.target_price, Decimal::new(999, 0));
    }

    #[test]
    fn new_product_zero_price_fails() {
        let err = NewProduct::parse("https://amazon.in/x", "0").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn new_product_negative_price_fails() {
        let err = NewProduct::parse("https://amazon.in/x", "-15").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn new_product_non_numeric_price_fails() {
        let err = NewProduct::parse("https://amazon.in/x", "abc").unwrap_err();
        assert!(err.is_validation());
        let err = NewProduct::parse("https://amazon.in/x", "").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn new_product_bad_url_fails() {
        assert!(NewProduct::parse("amazon.in/x", "10").is_err());
        assert!(NewProduct::parse("ftp://amazon.in/x", "10").is_err());
        assert!(NewProduct::parse("", "10").is_err());
    }

    #[test]
    fn new_product_serializes_price_as_number() {
        let product = NewProduct::parse("https://amazon.in/x", "1999.50").unwrap();
        let value = serde_json::to_value(&product).unwrap();
        assert_eq!(value, json!({"url": "https://amazon.in/x", "target_price": 1999.5}));
    }

    #[test]
    fn add_response_works() {
        let body: AddProductResponse = serde_json::from_value(json!({
            "message": "Product added successfully",
            "product": {"id": 7, "title": "Headphones", "current_price": 450.0}
        }))
        .unwrap();
        assert_eq!(
            body.product,
            Some(CreatedProduct {
                id: ProductId(7),
                title: Some("Headphones".to_string())
            })
        );
        let ack: AddProductResponse = serde_json::from_value(json!({"message": "ok"})).unwrap();
        assert_eq!(ack.product, None);
    }

    #[test]
    fn credentials_validation_works() {
        let credentials = Credentials::for_login(" Me@Example.com ", "secret").unwrap();
        assert_eq!(credentials.email, "me@example.com");
        assert!(Credentials::for_login("me@example.com", "").is_err());
        assert!(Credentials::for_login("not-an-email", "secret").is_err());
    }

    #[test]
    fn registration_requires_long_password() {
        assert!(Credentials::for_registration("me@example.com", "12345").is_err());
        assert!(Credentials::for_registration("me@example.com", "123456").is_ok());
    }

    #[test]
    fn credential_debug_is_redacted() {
        let credential = Credential::new("super-secret-token");
        assert!(!format!("{credential:?}").contains("super-secret"));
        let credentials = Credentials::for_login("me@example.com", "hunter22").unwrap();
        assert!(!format!("{credentials:?}").contains("hunter22"));
    }
}
