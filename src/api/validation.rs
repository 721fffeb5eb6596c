use regex::Regex;
use rust_decimal::Decimal;
use std::sync::OnceLock;

use super::ApiError;

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
static PHONE_RE: OnceLock<Regex> = OnceLock::new();

pub fn validate_order_id(id: i32) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid order ID: {}. ID must be a positive integer",
            id
        )));
    }
    Ok(id)
}

pub fn validate_category_id(id: i32) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid category ID: {}. ID must be a positive integer",
            id
        )));
    }
    Ok(id)
}

pub fn validate_item_id(id: i32) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid item ID: {}. ID must be a positive integer",
            id
        )));
    }
    Ok(id)
}

pub fn validate_name<'a>(name: &'a str, what: &str) -> Result<&'a str, ApiError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(format!("{what} name cannot be empty")));
    }
    if trimmed.len() > 120 {
        return Err(ApiError::validation(format!(
            "{what} name must be 120 characters or less"
        )));
    }
    Ok(trimmed)
}

pub fn validate_email(email: &str) -> Result<String, ApiError> {
    let normalized = email.trim().to_lowercase();
    let re = EMAIL_RE
        .get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid regex"));
    if !re.is_match(&normalized) {
        return Err(ApiError::validation("Invalid email address"));
    }
    Ok(normalized)
}

/// Accepts digits with an optional leading `+`, ignoring spaces and
/// hyphens, 8 to 15 digits total.
pub fn validate_phone(phone: &str) -> Result<String, ApiError> {
    let compact: String = phone
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    let re = PHONE_RE.get_or_init(|| Regex::new(r"^\+?\d{8,15}$").expect("Invalid regex"));
    if !re.is_match(&compact) {
        return Err(ApiError::validation("Invalid phone number"));
    }
    Ok(compact)
}

pub fn validate_money(amount: Decimal, what: &str) -> Result<Decimal, ApiError> {
    if amount.is_sign_negative() {
        return Err(ApiError::validation(format!("{what} cannot be negative")));
    }
    if amount.scale() > 2 {
        return Err(ApiError::validation(format!(
            "{what} supports at most two decimal places"
        )));
    }
    Ok(amount)
}

/// Lowercase the name and squash runs of non-alphanumerics into single
/// hyphens.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_hyphen = true;
    for c in name.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

pub fn validate_slug(slug: &str) -> Result<&str, ApiError> {
    if slug.is_empty()
        || !slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(ApiError::validation(
            "Slug can only contain lowercase letters, digits, and hyphens",
        ));
    }
    Ok(slug)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validate_order_id() {
        assert!(validate_order_id(1).is_ok());
        assert!(validate_order_id(12345).is_ok());
        assert!(validate_order_id(0).is_err());
        assert!(validate_order_id(-1).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert_eq!(
            validate_email(" Asha@Example.COM ").unwrap(),
            "asha@example.com"
        );
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("sp ace@example.com").is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert_eq!(validate_phone("+91 98765 43210").unwrap(), "+919876543210");
        assert_eq!(validate_phone("98765-43210").unwrap(), "9876543210");
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("phone").is_err());
    }

    #[test]
    fn test_validate_money() {
        assert!(validate_money(dec!(0.00), "Rate").is_ok());
        assert!(validate_money(dec!(199.99), "Rate").is_ok());
        assert!(validate_money(dec!(-1), "Rate").is_err());
        assert!(validate_money(dec!(1.999), "Rate").is_err());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Bridal Lehengas"), "bridal-lehengas");
        assert_eq!(slugify("  Sherwanis & Suits  "), "sherwanis-suits");
        assert_eq!(slugify("Already-Slugged"), "already-slugged");
    }

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("bridal-lehengas").is_ok());
        assert!(validate_slug("sarees2026").is_ok());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("Has Caps").is_err());
    }
}
