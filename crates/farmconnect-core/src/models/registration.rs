use serde::Serialize;

use super::{Language, Location};
use crate::utils::{is_valid_otp, is_valid_phone};

/// Account creation request.
///
/// Carries the one-time code so the service verifies ownership of the
/// number in the same call that issues credentials.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub name: String,
    #[serde(rename = "phonenumber")]
    pub phone_number: String,
    pub code: String,
    pub language: Language,
    pub location: Location,
}

impl Registration {
    /// Check the fields the service requires, returning a user-facing message
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Please enter your name".to_string());
        }
        if !is_valid_phone(&self.phone_number) {
            return Err("Please enter a valid 10-digit phone number".to_string());
        }
        if !is_valid_otp(&self.code) {
            return Err("Please enter the complete 6-digit OTP".to_string());
        }
        let has = |field: &Option<String>| field.as_deref().is_some_and(|s| !s.trim().is_empty());
        if !has(&self.location.state) || !has(&self.location.district) {
            return Err("Please provide location details".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> Registration {
        Registration {
            name: "Asha".to_string(),
            phone_number: "9876543210".to_string(),
            code: "123456".to_string(),
            language: Language::Telugu,
            location: Location {
                state: Some("Telangana".to_string()),
                district: Some("Warangal".to_string()),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_validate_ok() {
        assert!(registration().validate().is_ok());
    }

    #[test]
    fn test_validate_requires_name() {
        let mut reg = registration();
        reg.name = "   ".to_string();
        assert_eq!(reg.validate().unwrap_err(), "Please enter your name");
    }

    #[test]
    fn test_validate_requires_state_and_district() {
        let mut reg = registration();
        reg.location.district = None;
        assert_eq!(reg.validate().unwrap_err(), "Please provide location details");

        let mut reg = registration();
        reg.location.state = Some(" ".to_string());
        assert!(reg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_phone_and_code() {
        let mut reg = registration();
        reg.phone_number = "1234567890".to_string();
        assert!(reg.validate().is_err());

        let mut reg = registration();
        reg.code = "12".to_string();
        assert!(reg.validate().is_err());
    }

    #[test]
    fn test_serializes_wire_names() {
        let value = serde_json::to_value(registration()).unwrap();
        assert_eq!(value["phonenumber"], "9876543210");
        assert_eq!(value["language"], "telugu");
        assert_eq!(value["location"]["district"], "Warangal");
    }
}
