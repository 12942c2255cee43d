use chrono::{DateTime, Duration, Utc};

/// Seconds a user must wait before another code is sent to the same number
pub const RESEND_COOLDOWN_SECS: i64 = 60;

/// Tracks when a one-time code was last requested, per phone number.
#[derive(Debug, Default)]
pub struct ResendCooldown {
    last_sent: Option<(String, DateTime<Utc>)>,
}

impl ResendCooldown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds left before `phone` may request another code, if any
    pub fn remaining(&self, phone: &str, now: DateTime<Utc>) -> Option<i64> {
        let (last_phone, sent_at) = self.last_sent.as_ref()?;
        if last_phone != phone {
            return None;
        }
        let ready_at = *sent_at + Duration::seconds(RESEND_COOLDOWN_SECS);
        let left = (ready_at - now).num_seconds();
        (left > 0).then_some(left)
    }

    pub fn record(&mut self, phone: &str, now: DateTime<Utc>) {
        self.last_sent = Some((phone.to_string(), now));
    }

    pub fn reset(&mut self) {
        self.last_sent = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooldown_blocks_same_number() {
        let mut cooldown = ResendCooldown::new();
        let now = Utc::now();
        assert_eq!(cooldown.remaining("9876543210", now), None);

        cooldown.record("9876543210", now);
        assert_eq!(cooldown.remaining("9876543210", now + Duration::seconds(15)), Some(45));
        assert_eq!(cooldown.remaining("9876543210", now + Duration::seconds(60)), None);
    }

    #[test]
    fn test_cooldown_ignores_other_numbers() {
        let mut cooldown = ResendCooldown::new();
        let now = Utc::now();
        cooldown.record("9876543210", now);
        assert_eq!(cooldown.remaining("9123456789", now), None);
    }

    #[test]
    fn test_reset_clears() {
        let mut cooldown = ResendCooldown::new();
        let now = Utc::now();
        cooldown.record("9876543210", now);
        cooldown.reset();
        assert_eq!(cooldown.remaining("9876543210", now), None);
    }
}
