use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Telugu,
    Hindi,
    English,
}

impl Language {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "telugu" | "te" => Some(Language::Telugu),
            "hindi" | "hi" => Some(Language::Hindi),
            "english" | "en" => Some(Language::English),
            _ => None,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::Telugu => write!(f, "Telugu"),
            Language::Hindi => write!(f, "Hindi"),
            Language::English => write!(f, "English"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Coordinates {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Location {
    pub state: Option<String>,
    pub district: Option<String>,
    pub mandal: Option<String>,
    pub village: Option<String>,
    pub coordinates: Option<Coordinates>,
}

impl Location {
    /// Human readable "village, mandal, district, state", skipping blanks
    pub fn display(&self) -> String {
        [&self.village, &self.mandal, &self.district, &self.state]
            .iter()
            .filter_map(|part| part.as_deref())
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct NotificationPreferences {
    pub disease: Option<bool>,
    pub fertilizer: Option<bool>,
    pub irrigation: Option<bool>,
    pub market: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum AreaUnit {
    Acre,
    Hectare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    Kg,
    Quintal,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct UnitPreferences {
    pub area: Option<AreaUnit>,
    pub weight: Option<WeightUnit>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Preferences {
    pub notifications: Option<NotificationPreferences>,
    pub units: Option<UnitPreferences>,
}

/// Profile snapshot returned by login, registration and renewal.
///
/// Only `name` is guaranteed; the service omits the rest for partially
/// onboarded accounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Farmer {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "phonenumber", default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub language: Option<Language>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(rename = "isVerified", default)]
    pub is_verified: Option<bool>,
    #[serde(rename = "farmProfiles", default)]
    pub farm_profiles: Vec<String>,
    #[serde(default)]
    pub preferences: Option<Preferences>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<String>,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<String>,
}

impl Farmer {
    /// Name to greet the user with; falls back like the welcome screen does
    pub fn greeting_name(&self) -> &str {
        let name = self.name.trim();
        if name.is_empty() {
            "Farmer"
        } else {
            name
        }
    }

    pub fn location_display(&self) -> Option<String> {
        self.location
            .as_ref()
            .map(Location::display)
            .filter(|s| !s.is_empty())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_farmer_deserialize_full() {
        let json = r#"{
            "_id": "66f0c1",
            "name": "Asha",
            "phonenumber": "9876543210",
            "language": "telugu",
            "location": {
                "state": "Telangana",
                "district": "Warangal",
                "mandal": "Hanamkonda",
                "village": "Kazipet",
                "coordinates": { "latitude": 17.97, "longitude": 79.5 }
            },
            "isVerified": true,
            "farmProfiles": ["f1", "f2"],
            "preferences": {
                "notifications": { "disease": true, "market": false },
                "units": { "area": "acre", "weight": "quintal" }
            },
            "createdAt": "2025-01-02T03:04:05Z"
        }"#;

        let farmer: Farmer = serde_json::from_str(json).unwrap();
        assert_eq!(farmer.id.as_deref(), Some("66f0c1"));
        assert_eq!(farmer.phone_number.as_deref(), Some("9876543210"));
        assert_eq!(farmer.language, Some(Language::Telugu));
        assert_eq!(farmer.farm_profiles.len(), 2);
        assert_eq!(farmer.is_verified, Some(true));
        let units = farmer.preferences.unwrap().units.unwrap();
        assert_eq!(units.area, Some(AreaUnit::Acre));
        assert_eq!(units.weight, Some(WeightUnit::Quintal));
    }

    #[test]
    fn test_farmer_deserialize_minimal() {
        let farmer: Farmer = serde_json::from_str(r#"{"name":"Asha"}"#).unwrap();
        assert_eq!(farmer.name, "Asha");
        assert!(farmer.id.is_none());
        assert!(farmer.farm_profiles.is_empty());
        assert!(farmer.location_display().is_none());
    }

    #[test]
    fn test_greeting_name_falls_back() {
        let mut farmer: Farmer = serde_json::from_str(r#"{"name":"  "}"#).unwrap();
        assert_eq!(farmer.greeting_name(), "Farmer");
        farmer.name = "Ravi".to_string();
        assert_eq!(farmer.greeting_name(), "Ravi");
    }

    #[test]
    fn test_location_display_skips_blanks() {
        let location = Location {
            state: Some("Telangana".into()),
            district: Some("Warangal".into()),
            mandal: Some("".into()),
            village: None,
            coordinates: None,
        };
        assert_eq!(location.display(), "Warangal, Telangana");
    }

    #[test]
    fn test_language_parse() {
        assert_eq!(Language::parse("Hindi"), Some(Language::Hindi));
        assert_eq!(Language::parse("te"), Some(Language::Telugu));
        assert_eq!(Language::parse(" ENGLISH "), Some(Language::English));
        assert_eq!(Language::parse("tamil"), None);
    }
}
