// Time-related operations.
use time::{Date, Duration, Time, format_description::BorrowedFormatItem, macros::format_description};

use crate::logic::error::{Error, Result};

// Use these formats for formatting and parsing dates and kick-off times.
pub static ISO_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");
pub static SLOT_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[hour]:[minute]");

// JSON serialisation and deserialisation for ISO dates.
pub mod iso_date_format {
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _, ser::Error as _};
    use time::Date;

    use super::ISO_FORMAT;

    pub fn serialize<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer {
        let s = date.format(ISO_FORMAT).map_err(S::Error::custom)?;
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Date, D::Error>
    where D: Deserializer<'de> {
        let s = String::deserialize(deserializer)?;
        Date::parse(s.as_str(), ISO_FORMAT).map_err(D::Error::custom)
    }
}

// JSON serialisation for a single kick-off time as "HH:MM".
pub mod slot_format {
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _, ser::Error as _};
    use time::Time;

    use super::SLOT_FORMAT;

    pub fn serialize<S>(slot: &Time, serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer {
        let s = slot.format(SLOT_FORMAT).map_err(S::Error::custom)?;
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Time, D::Error>
    where D: Deserializer<'de> {
        let s = String::deserialize(deserializer)?;
        Time::parse(s.as_str(), SLOT_FORMAT).map_err(D::Error::custom)
    }
}

// JSON serialisation for a list of kick-off times.
pub mod slots_format {
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _, ser::Error as _, ser::SerializeSeq};
    use time::Time;

    use super::SLOT_FORMAT;

    pub fn serialize<S>(slots: &[Time], serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer {
        let mut seq = serializer.serialize_seq(Some(slots.len()))?;
        for slot in slots {
            seq.serialize_element(&slot.format(SLOT_FORMAT).map_err(S::Error::custom)?)?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Time>, D::Error>
    where D: Deserializer<'de> {
        let strings = Vec::<String>::deserialize(deserializer)?;
        strings.iter()
            .map(|s| Time::parse(s.as_str(), SLOT_FORMAT).map_err(D::Error::custom))
            .collect()
    }
}

// Convert a Date object to database string.
pub fn date_to_string(date: Date) -> String {
    date.format(ISO_FORMAT).unwrap_or_else(|_| date.to_string())
}

// Convert a kick-off time to "HH:MM".
pub fn slot_to_string(slot: Time) -> String {
    slot.format(SLOT_FORMAT).unwrap_or_else(|_| slot.to_string())
}

pub fn string_to_date(date: &str) -> Result<Date> {
    Date::parse(date, ISO_FORMAT)
        .map_err(|e| Error::Validation(format!("'{date}' is not a YYYY-MM-DD date: {e}")))
}

pub fn string_to_slot(slot: &str) -> Result<Time> {
    Time::parse(slot, SLOT_FORMAT)
        .map_err(|e| Error::Validation(format!("'{slot}' is not a HH:MM time: {e}")))
}

// Get the date that is the given number of days after the start.
pub fn days_after(start: Date, days: u32) -> Result<Date> {
    start.checked_add(Duration::days(i64::from(days)))
        .ok_or_else(|| Error::InvalidScheduleSpec(format!("{days} days after {start} is out of range")))
}
