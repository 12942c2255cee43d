//! Data models for FarmConnect entities.
//!
//! - `Farmer`: the profile snapshot returned alongside credentials
//! - `Registration`: the payload sent when creating an account

pub mod farmer;
pub mod registration;

pub use farmer::{
    AreaUnit, Coordinates, Farmer, Language, Location, NotificationPreferences, Preferences,
    UnitPreferences, WeightUnit,
};
pub use registration::Registration;
