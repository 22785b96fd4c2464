use std::fmt;

use chrono::NaiveDate;
use teloxide::types::UserId;

pub const EXPIRY_DATE_FORMAT: &str = "%Y-%m-%d";

/// A subscriber and the day their access runs out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    user_id: UserId,
    exp_date: String,
}

impl RegistryEntry {
    pub fn new(user_id: UserId, exp_date: impl Into<String>) -> Self {
        Self {
            user_id,
            exp_date: exp_date.into(),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// The stored date string, as written by the admin.
    pub fn exp_date(&self) -> &str {
        &self.exp_date
    }

    pub fn expiry_date(&self) -> Result<NaiveDate, chrono::ParseError> {
        NaiveDate::parse_from_str(self.exp_date.trim(), EXPIRY_DATE_FORMAT)
    }
}

impl fmt::Display for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ID: <code>{}</code> until {}", self.user_id.0, self.exp_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_expiry_date() {
        let entry = RegistryEntry::new(UserId(5), "2030-01-31");

        assert_eq!(entry.expiry_date().unwrap(), NaiveDate::from_ymd_opt(2030, 1, 31).unwrap());
        assert_eq!(entry.to_string(), "ID: <code>5</code> until 2030-01-31");
    }

    #[test]
    fn corrupt_date_is_an_error() {
        assert!(RegistryEntry::new(UserId(5), "31.01.2030").expiry_date().is_err());
        assert!(RegistryEntry::new(UserId(5), "").expiry_date().is_err());
    }
}
