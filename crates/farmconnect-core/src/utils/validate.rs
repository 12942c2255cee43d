/// Number of digits in an SMS one-time code
pub const OTP_LENGTH: usize = 6;

/// Length of an Indian mobile number without country code
const PHONE_LENGTH: usize = 10;

/// Country calling code accepted (and stripped) in front of a number
const COUNTRY_CODE: &str = "91";

/// Reduce user input to the bare 10-digit form the service expects.
/// Accepts spaces, dashes, parentheses and a leading +91 / 0.
pub fn normalize_phone(input: &str) -> String {
    let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() == PHONE_LENGTH + COUNTRY_CODE.len() && digits.starts_with(COUNTRY_CODE) {
        digits[COUNTRY_CODE.len()..].to_string()
    } else if digits.len() == PHONE_LENGTH + 1 && digits.starts_with('0') {
        digits[1..].to_string()
    } else {
        digits
    }
}

/// Mobile numbers are 10 digits and start with 6, 7, 8 or 9
pub fn is_valid_phone(phone: &str) -> bool {
    phone.len() == PHONE_LENGTH
        && phone.chars().all(|c| c.is_ascii_digit())
        && matches!(phone.as_bytes()[0], b'6'..=b'9')
}

pub fn is_valid_otp(code: &str) -> bool {
    code.len() == OTP_LENGTH && code.chars().all(|c| c.is_ascii_digit())
}

/// Mask all but the last four digits for log output
pub fn mask_phone(phone: &str) -> String {
    let count = phone.chars().count();
    let hidden = count.saturating_sub(4);
    phone
        .chars()
        .enumerate()
        .map(|(i, c)| if i < hidden { '*' } else { c })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("98765 43210"), "9876543210");
        assert_eq!(normalize_phone("+91 98765-43210"), "9876543210");
        assert_eq!(normalize_phone("09876543210"), "9876543210");
        assert_eq!(normalize_phone("(987) 654-3210"), "9876543210");
        // Unknown shapes are left as digits for validation to reject
        assert_eq!(normalize_phone("12345"), "12345");
    }

    #[test]
    fn test_is_valid_phone() {
        assert!(is_valid_phone("9876543210"));
        assert!(is_valid_phone("6000000000"));
        assert!(!is_valid_phone("5876543210"));
        assert!(!is_valid_phone("987654321"));
        assert!(!is_valid_phone("98765432100"));
        assert!(!is_valid_phone("98765o3210"));
        assert!(!is_valid_phone(""));
    }

    #[test]
    fn test_is_valid_otp() {
        assert!(is_valid_otp("123456"));
        assert!(is_valid_otp("000000"));
        assert!(!is_valid_otp("12345"));
        assert!(!is_valid_otp("1234567"));
        assert!(!is_valid_otp("12a456"));
    }

    #[test]
    fn test_mask_phone() {
        assert_eq!(mask_phone("9876543210"), "******3210");
        assert_eq!(mask_phone("321"), "321");
        assert_eq!(mask_phone(""), "");
    }

    #[test]
    fn test_mask_phone_counts_characters() {
        assert_eq!(mask_phone("९८७६५४३२१०"), "******३२१०");
        assert_eq!(mask_phone("é1234"), "*1234");
    }
}
