//! Phone-number candidates for customer lookup.
//!
//! Historical rows were stored in several formats (`9876543210`,
//! `919876543210`, `+919876543210`, or whatever was typed), so a lookup
//! queries every plausible representation and takes the first hit.

const COUNTRY_CODE: &str = "91";

/// Keep ASCII digits only.
pub fn digits_only(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn push_unique(out: &mut Vec<String>, candidate: String) {
    if !out.contains(&candidate) {
        out.push(candidate);
    }
}

/// Ordered, de-duplicated candidate set for a free-form phone string.
///
/// The raw input is always the first member.
///
/// ```
/// let c = models::phone::phone_candidates("+91 98765 43210");
/// assert!(c.contains(&"9876543210".to_string()));
/// assert!(c.contains(&"+919876543210".to_string()));
/// ```
pub fn phone_candidates(input: &str) -> Vec<String> {
    let digits = digits_only(input);
    let mut out = Vec::with_capacity(5);
    push_unique(&mut out, input.to_string());
    if !digits.is_empty() {
        push_unique(&mut out, digits.clone());
    }

    if digits.len() == 10 {
        push_unique(&mut out, format!("{COUNTRY_CODE}{digits}"));
        push_unique(&mut out, format!("+{COUNTRY_CODE}{digits}"));
    } else if digits.len() == 12 && digits.starts_with(COUNTRY_CODE) {
        push_unique(&mut out, format!("+{digits}"));
        push_unique(&mut out, digits[COUNTRY_CODE.len()..].to_string());
    }
    out
}

/// E.164 form used as the auth identity handle.
pub fn to_e164(input: &str) -> String {
    let trimmed = input.trim();
    let digits = digits_only(trimmed);
    if digits.len() == 10 {
        format!("+{COUNTRY_CODE}{digits}")
    } else {
        format!("+{digits}")
    }
}
