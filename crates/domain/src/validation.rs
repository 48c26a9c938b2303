//! Field validators.
//!
//! Every function here is pure: it inspects its input and reports whether it
//! has the expected shape. Composite validators collect [`FieldError`]s so a
//! caller can report all problems of a form at once.

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::order::PaymentMethod;

/// A validation failure tied to an input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// `local@domain.tld`: one `@`, a dot inside the domain, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let last = domain.len().saturating_sub(1);
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i < last)
}

/// At least 8 ASCII letters/digits with an uppercase, a lowercase and a digit.
pub fn is_strong_password(password: &str) -> bool {
    password.len() >= 8
        && password.chars().all(|c| c.is_ascii_alphanumeric())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_digit())
}

/// Luhn checksum over the digits of `card_number`; separators are ignored.
pub fn is_valid_card_number(card_number: &str) -> bool {
    let digits: Vec<u32> = card_number.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.is_empty() {
        return false;
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &digit)| {
            if i % 2 == 1 {
                let doubled = digit * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                digit
            }
        })
        .sum();

    sum % 10 == 0
}

/// `MM/YY` expiry that is not earlier than the month of `today`.
///
/// Years are compared as two-digit values.
pub fn is_valid_expiry(expiry: &str, today: NaiveDate) -> bool {
    let Some((month, year)) = expiry.split_once('/') else {
        return false;
    };
    if !(1..=2).contains(&month.len()) || year.len() != 2 || !is_numeric(month) || !is_numeric(year)
    {
        return false;
    }
    let (Ok(month), Ok(year)) = (month.parse::<u32>(), year.parse::<i32>()) else {
        return false;
    };
    if !(1..=12).contains(&month) {
        return false;
    }

    let current_year = today.year() % 100;
    let current_month = today.month();
    (year, month) >= (current_year, current_month)
}

/// [`is_valid_expiry`] against the current UTC date.
pub fn is_valid_expiry_now(expiry: &str) -> bool {
    is_valid_expiry(expiry, Utc::now().date_naive())
}

/// Three or four digits.
pub fn is_valid_cvv(cvv: &str) -> bool {
    (3..=4).contains(&cvv.len()) && is_numeric(cvv)
}

/// Optional leading `+`, then at least 10 digits, spaces or hyphens.
pub fn is_valid_phone(phone: &str) -> bool {
    let rest = phone.strip_prefix('+').unwrap_or(phone);
    rest.chars().count() >= 10
        && rest
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_whitespace() || c == '-')
}

/// `12345` or `12345-6789`.
pub fn is_valid_zip_code(zip: &str) -> bool {
    let (base, extension) = match zip.split_once('-') {
        Some((base, extension)) => (base, Some(extension)),
        None => (zip, None),
    };
    base.len() == 5
        && is_numeric(base)
        && extension.is_none_or(|ext| ext.len() == 4 && is_numeric(ext))
}

pub fn is_required(value: &str) -> bool {
    !value.trim().is_empty()
}

pub fn has_min_length(value: &str, min: usize) -> bool {
    value.chars().count() >= min
}

pub fn has_max_length(value: &str, max: usize) -> bool {
    value.chars().count() <= max
}

/// One or more ASCII digits.
pub fn is_numeric(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

/// ASCII letters and whitespace.
pub fn is_alphabetic(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphabetic() || c.is_whitespace())
}

/// ASCII letters, digits and whitespace.
pub fn is_alphanumeric(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
}

/// Checkout form address, as entered by a customer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutAddress {
    pub full_name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
}

pub fn validate_shipping_address(address: &CheckoutAddress) -> Vec<FieldError> {
    let mut errors = Vec::new();

    let required = [
        ("full_name", &address.full_name, "Full name is required"),
        ("address", &address.address, "Address is required"),
        ("city", &address.city, "City is required"),
        ("state", &address.state, "State is required"),
    ];
    for (field, value, message) in required {
        if !is_required(value) {
            errors.push(FieldError::new(field, message));
        }
    }

    if !is_required(&address.postal_code) {
        errors.push(FieldError::new("postal_code", "Postal code is required"));
    } else if !is_valid_zip_code(&address.postal_code) {
        errors.push(FieldError::new(
            "postal_code",
            "Please enter a valid postal code (e.g., 12345 or 12345-6789)",
        ));
    }

    if !is_required(&address.country) {
        errors.push(FieldError::new("country", "Country is required"));
    }

    if !is_required(&address.phone) {
        errors.push(FieldError::new("phone", "Phone number is required"));
    } else if !is_valid_phone(&address.phone) {
        errors.push(FieldError::new("phone", "Please enter a valid phone number"));
    }

    errors
}

/// Card details submitted with a payment. Never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardDetails {
    pub card_number: Option<String>,
    pub expiry_date: Option<String>,
    pub cvv: Option<String>,
}

/// Shape checks for the card fields of a payment; PayPal needs none.
pub fn validate_card_payment(method: PaymentMethod, card: &CardDetails) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if !method.is_card() {
        return errors;
    }

    match card.card_number.as_deref() {
        None | Some("") => errors.push(FieldError::new("card_number", "Card number is required")),
        Some(number) => {
            let compact: String = number.chars().filter(|c| !c.is_whitespace()).collect();
            if compact.len() != 16 || !is_numeric(&compact) {
                errors.push(FieldError::new(
                    "card_number",
                    "Please enter a valid 16-digit card number",
                ));
            }
        }
    }

    match card.expiry_date.as_deref() {
        None | Some("") => errors.push(FieldError::new("expiry_date", "Expiry date is required")),
        Some(expiry) if !is_expiry_shape(expiry) => errors.push(FieldError::new(
            "expiry_date",
            "Please enter a valid expiry date (MM/YY)",
        )),
        Some(_) => {}
    }

    match card.cvv.as_deref() {
        None | Some("") => errors.push(FieldError::new("cvv", "CVV is required")),
        Some(cvv) if !is_valid_cvv(cvv) => errors.push(FieldError::new(
            "cvv",
            "Please enter a valid CVV (3 or 4 digits)",
        )),
        Some(_) => {}
    }

    errors
}

/// Exactly `MM/YY` with month `01`–`12`.
fn is_expiry_shape(expiry: &str) -> bool {
    match expiry.split_once('/') {
        Some((month, year)) => {
            month.len() == 2
                && year.len() == 2
                && is_numeric(year)
                && month.parse::<u32>().is_ok_and(|m| (1..=12).contains(&m))
                && is_numeric(month)
        }
        None => false,
    }
}

/// Server-side registration rules.
pub fn validate_registration(email: &str, password: &str, name: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if !is_valid_email(email.trim()) {
        errors.push(FieldError::new("email", "A valid email is required"));
    }
    if !has_min_length(password, 6) {
        errors.push(FieldError::new(
            "password",
            "Password must be at least 6 characters",
        ));
    }
    if !is_required(name) {
        errors.push(FieldError::new("name", "Name is required"));
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn june_2024() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("a.b@sub.example.co"));
        assert!(!is_valid_email("user@example"));
        assert!(!is_valid_email("user example@example.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@@example.com"));
        assert!(!is_valid_email("user@.com"));
        assert!(!is_valid_email("user@example."));
    }

    #[test]
    fn password_strength() {
        assert!(is_strong_password("Passw0rd"));
        assert!(!is_strong_password("Pass0rd"));
        assert!(!is_strong_password("password1"));
        assert!(!is_strong_password("PASSWORD1"));
        assert!(!is_strong_password("Password"));
        assert!(!is_strong_password("Passw0rd!"));
    }

    #[test]
    fn luhn_check() {
        assert!(is_valid_card_number("4111111111111111"));
        assert!(!is_valid_card_number("4111111111111112"));
        assert!(is_valid_card_number("4111 1111-1111 1111"));
        assert!(is_valid_card_number("79927398713"));
        assert!(!is_valid_card_number(""));
        assert!(!is_valid_card_number("----"));
    }

    #[test]
    fn expiry_against_fixed_date() {
        assert!(!is_valid_expiry("05/24", june_2024()));
        assert!(is_valid_expiry("06/24", june_2024()));
        assert!(is_valid_expiry("01/25", june_2024()));
        assert!(!is_valid_expiry("12/23", june_2024()));
        assert!(!is_valid_expiry("13/25", june_2024()));
        assert!(!is_valid_expiry("00/25", june_2024()));
        assert!(!is_valid_expiry("0625", june_2024()));
        assert!(!is_valid_expiry("ab/cd", june_2024()));
    }

    #[test]
    fn cvv_phone_zip() {
        assert!(is_valid_cvv("123"));
        assert!(is_valid_cvv("1234"));
        assert!(!is_valid_cvv("12"));
        assert!(!is_valid_cvv("12a"));

        assert!(is_valid_phone("+1 555-123-4567"));
        assert!(is_valid_phone("5551234567"));
        assert!(!is_valid_phone("555-1234"));
        assert!(!is_valid_phone("555123456x"));

        assert!(is_valid_zip_code("12345"));
        assert!(is_valid_zip_code("12345-6789"));
        assert!(!is_valid_zip_code("1234"));
        assert!(!is_valid_zip_code("12345-678"));
        assert!(!is_valid_zip_code("12345-"));
    }

    #[test]
    fn generic_shapes() {
        assert!(is_required(" x "));
        assert!(!is_required("   "));
        assert!(has_min_length("héllo", 5));
        assert!(!has_max_length("héllo", 4));
        assert!(is_numeric("007"));
        assert!(!is_numeric(""));
        assert!(is_alphabetic("New York"));
        assert!(!is_alphabetic("Route 66"));
        assert!(is_alphanumeric("Route 66"));
        assert!(!is_alphanumeric("Route-66"));
    }

    #[test]
    fn shipping_address_collects_all_errors() {
        let errors = validate_shipping_address(&CheckoutAddress {
            postal_code: "1234".to_string(),
            phone: "12".to_string(),
            ..Default::default()
        });
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            [
                "full_name",
                "address",
                "city",
                "state",
                "postal_code",
                "country",
                "phone"
            ]
        );
    }

    #[test]
    fn valid_shipping_address_has_no_errors() {
        let address = CheckoutAddress {
            full_name: "Ada Lovelace".to_string(),
            address: "1 Analytical Way".to_string(),
            city: "London".to_string(),
            state: "LDN".to_string(),
            postal_code: "12345-6789".to_string(),
            country: "UK".to_string(),
            phone: "+44 20 7946 0958".to_string(),
        };
        assert!(validate_shipping_address(&address).is_empty());
    }

    #[test]
    fn card_payment_checks() {
        let valid = CardDetails {
            card_number: Some("4111 1111 1111 1111".to_string()),
            expiry_date: Some("09/30".to_string()),
            cvv: Some("123".to_string()),
        };
        assert!(validate_card_payment(PaymentMethod::CreditCard, &valid).is_empty());

        let invalid = CardDetails {
            card_number: Some("4111".to_string()),
            expiry_date: Some("9/30".to_string()),
            cvv: None,
        };
        let errors = validate_card_payment(PaymentMethod::DebitCard, &invalid);
        assert_eq!(errors.len(), 3);

        assert!(validate_card_payment(PaymentMethod::Paypal, &CardDetails::default()).is_empty());
    }

    #[test]
    fn registration_rules() {
        assert!(validate_registration("a@b.co", "secret", "Ada").is_empty());
        let errors = validate_registration("nope", "123", " ");
        assert_eq!(errors.len(), 3);
    }
}
