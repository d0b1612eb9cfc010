//! Field-level validation rules shared by catalog, blog and account forms.
//!
//! Every check appends to a [`ValidationErrors`] accumulator instead of
//! returning early, so callers can report all offending fields at once.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Substrings rejected in product and post text, matched case-insensitively.
pub const BANNED_WORDS: &[&str] = &[
    "казино",
    "криптовалюта",
    "крипта",
    "биржа",
    "дешево",
    "бесплатно",
    "обман",
    "полиция",
    "радар",
];

pub const PRODUCT_NAME_MAX_CHARS: usize = 150;
pub const CATEGORY_NAME_MAX_CHARS: usize = 100;
pub const POST_TITLE_MAX_CHARS: usize = 200;
pub const COUNTRY_MAX_CHARS: usize = 100;
pub const CONTACT_NAME_MAX_CHARS: usize = 100;
pub const CONTACT_PHONE_MAX_CHARS: usize = 20;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];
const IMAGE_REFERENCE_MAX_CHARS: usize = 255;

static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\d+\-() ]{7,20}$").expect("phone pattern compiles"));

/// Accumulated field-level validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<&'static str, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record a message for `field`. The first message recorded for a field wins.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.fields.iter().map(|(field, message)| (*field, message.as_str()))
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.fields {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Banned words present in `text`, in list order.
pub fn banned_words_in(text: &str) -> Vec<&'static str> {
    if text.is_empty() {
        return Vec::new();
    }
    let lowered = text.to_lowercase();
    BANNED_WORDS
        .iter()
        .copied()
        .filter(|word| lowered.contains(word))
        .collect()
}

pub fn check_banned_words(
    errors: &mut ValidationErrors,
    field: &'static str,
    label: &str,
    text: &str,
) {
    let hits = banned_words_in(text);
    if !hits.is_empty() {
        errors.add(
            field,
            format!("{label} contains banned words: {}.", hits.join(", ")),
        );
    }
}

pub fn check_required(errors: &mut ValidationErrors, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, "This field is required.");
    }
}

pub fn check_max_chars(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: &str,
    max: usize,
) {
    let count = value.chars().count();
    if count > max {
        errors.add(
            field,
            format!("Ensure this value has at most {max} characters (it has {count})."),
        );
    }
}

pub fn check_price(errors: &mut ValidationErrors, field: &'static str, price_minor: i64) {
    if price_minor < 0 {
        errors.add(field, "Price cannot be negative.");
    }
}

/// Image references are relative upload paths such as `products/phone.png`.
pub fn check_image_reference(
    errors: &mut ValidationErrors,
    field: &'static str,
    reference: Option<&str>,
) {
    let Some(reference) = reference else {
        return;
    };

    if let Err(reason) = parse_image_reference(reference) {
        errors.add(field, format!("Upload a valid image. {reason}"));
    }
}

fn parse_image_reference(reference: &str) -> Result<(), &'static str> {
    if reference.trim().is_empty() {
        return Err("The reference is empty.");
    }
    if reference.chars().count() > IMAGE_REFERENCE_MAX_CHARS {
        return Err("The reference is too long.");
    }
    if reference.starts_with('/') || reference.contains('\\') {
        return Err("The reference must be a relative path.");
    }
    if reference
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err("The reference contains an invalid path segment.");
    }

    let extension = reference
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .ok_or("The file has no extension.")?;
    if !IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        return Err("The file is not a supported image type.");
    }

    Ok(())
}

pub fn check_phone(errors: &mut ValidationErrors, field: &'static str, phone: &str) {
    if phone.is_empty() {
        return;
    }
    if !PHONE_PATTERN.is_match(phone) {
        errors.add(
            field,
            "Phone must contain 7-20 characters: digits, + - ( ) and spaces.",
        );
    }
}

pub fn check_email(errors: &mut ValidationErrors, field: &'static str, email: &str) {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    };
    if !valid {
        errors.add(field, "Enter a valid email address.");
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
