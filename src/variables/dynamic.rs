//! Dynamic variables
//!
//! Placeholder tokens that are generated at resolution time instead of being
//! looked up in a scope. Every call generates a fresh value:
//! - `{{$timestamp}}` - Unix timestamp (milliseconds)
//! - `{{$isoTimestamp}}` - Current RFC 3339 timestamp
//! - `{{$guid}}` / `{{$randomUUID}}` - Random UUID v4
//! - `{{$randomInt}}` - Random integer in 0..1000
//! - `{{$randomUserName}}` / `{{$randomEmail}}` - Random identities
//! - `{{$randomBoolean}}` - `true` or `false`
//! - `{{$randomDate}}` - Random RFC 3339 date within the past year
//! - `{{$randomTime}}` - Random `HH:MM:SS`
//! - `{{$randomCity}}` / `{{$randomCountry}}` - Pick from a fixed list
//! - `{{$randomZipCode}}` - Five upper-case alphanumerics
//! - `{{$randomAlphaNumeric}}` / `{{$randomHexadecimal}}` - One character

use chrono::{Duration, Utc};
use rand::Rng;
use uuid::Uuid;

/// Every token the catalogue knows, without braces
pub const DYNAMIC_VARIABLES: &[&str] = &[
    "$timestamp",
    "$isoTimestamp",
    "$guid",
    "$randomUUID",
    "$randomInt",
    "$randomUserName",
    "$randomEmail",
    "$randomBoolean",
    "$randomDate",
    "$randomTime",
    "$randomCity",
    "$randomCountry",
    "$randomZipCode",
    "$randomAlphaNumeric",
    "$randomHexadecimal",
];

const CITIES: &[&str] = &["New York", "London", "Paris", "Tokyo", "Sydney"];
const COUNTRIES: &[&str] = &["USA", "UK", "France", "Japan", "Australia"];

/// Whether `name` is a dynamic variable token
pub fn is_dynamic(name: &str) -> bool {
    DYNAMIC_VARIABLES.contains(&name)
}

/// Generate a fresh value for a dynamic token, `None` for unknown names
pub fn generate(name: &str) -> Option<String> {
    let mut rng = rand::rng();
    let value = match name {
        "$timestamp" => Utc::now().timestamp_millis().to_string(),
        "$isoTimestamp" => Utc::now().to_rfc3339(),
        "$guid" | "$randomUUID" => Uuid::new_v4().to_string(),
        "$randomInt" => rng.random_range(0..1000).to_string(),
        "$randomUserName" => format!("user_{}", random_string(6).to_lowercase()),
        "$randomEmail" => format!("user{}@example.com", random_string(6).to_lowercase()),
        "$randomBoolean" => rng.random_bool(0.5).to_string(),
        "$randomDate" => {
            let seconds_back = rng.random_range(0..365 * 24 * 3600);
            (Utc::now() - Duration::seconds(seconds_back)).to_rfc3339()
        }
        "$randomTime" => format!(
            "{:02}:{:02}:{:02}",
            rng.random_range(0..24),
            rng.random_range(0..60),
            rng.random_range(0..60)
        ),
        "$randomCity" => pick(CITIES),
        "$randomCountry" => pick(COUNTRIES),
        "$randomZipCode" => random_string(5).to_uppercase(),
        "$randomAlphaNumeric" => random_string(1),
        "$randomHexadecimal" => format!("{:x}", rng.random_range(0..16u8)),
        _ => return None,
    };
    Some(value)
}

/// Generate a random alphanumeric string
fn random_string(len: usize) -> String {
    use rand::distr::Alphanumeric;
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn pick(items: &[&str]) -> String {
    let mut rng = rand::rng();
    items[rng.random_range(0..items.len())].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_catalogue_entry_generates() {
        for name in DYNAMIC_VARIABLES {
            assert!(generate(name).is_some(), "{} produced nothing", name);
        }
    }

    #[test]
    fn test_unknown_token() {
        assert!(generate("$nope").is_none());
        assert!(!is_dynamic("guid"));
    }

    #[test]
    fn test_guid_is_fresh() {
        let a = generate("$guid").unwrap();
        let b = generate("$guid").unwrap();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
    }

    #[test]
    fn test_timestamp_is_millis() {
        let ts: i64 = generate("$timestamp").unwrap().parse().unwrap();
        assert!(ts > 1_700_000_000_000);
    }

    #[test]
    fn test_random_int_range() {
        for _ in 0..50 {
            let n: u32 = generate("$randomInt").unwrap().parse().unwrap();
            assert!(n < 1000);
        }
    }

    #[test]
    fn test_zip_code_shape() {
        let zip = generate("$randomZipCode").unwrap();
        assert_eq!(zip.len(), 5);
        assert!(zip.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_random_time_shape() {
        let time = generate("$randomTime").unwrap();
        assert_eq!(time.len(), 8);
        assert_eq!(time.matches(':').count(), 2);
    }

    #[test]
    fn test_email_shape() {
        let email = generate("$randomEmail").unwrap();
        assert!(email.starts_with("user"));
        assert!(email.ends_with("@example.com"));
    }
}
