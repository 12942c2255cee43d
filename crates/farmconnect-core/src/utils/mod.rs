//! Input validation and formatting helpers shared by the auth flows.

pub mod validate;

// Re-export commonly used functions at module level
pub use validate::{is_valid_otp, is_valid_phone, mask_phone, normalize_phone, OTP_LENGTH};
