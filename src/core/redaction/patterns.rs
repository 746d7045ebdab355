//! PII detection patterns
//!
//! Pre-compiled regex patterns for detecting personally identifiable
//! information. These are static known-good patterns; a compile failure is a
//! code error caught by the tests below.

use once_cell::sync::Lazy;
use regex::Regex;

/// Email pattern: local@domain.tld
pub static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap());

/// Phone pattern: optional country code, then XXX-XXX-XXXX with -, ., or space
pub static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\+?\d{0,3}[-.\s]?\(?\d{3}\)?[-.\s]\d{3}[-.\s]\d{4}\b").unwrap());

/// SSN pattern: XXX-XX-XXXX
pub static SSN_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap());

/// Credit card pattern: four groups of four digits, optionally separated
pub static CREDIT_CARD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{4}[\s-]?\d{4}[\s-]?\d{4}[\s-]?\d{4}\b").unwrap());

/// IPv4 address pattern
pub static IP_ADDRESS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b").unwrap());
