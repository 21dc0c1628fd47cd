//! Pseudonymous client identity.
//!
//! Browsers persist a device identifier and send it with every request. The
//! server never sees an account; the device id is the voter/author id and a
//! stable animal nickname is derived from it.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;

pub const DEVICE_ID_HEADER: &str = "x-device-id";
pub const DISPLAY_NAME_HEADER: &str = "x-display-name";

const ADJECTIVES: [&str; 16] = [
    "Brave", "Silent", "Digital", "Free", "Bold", "Swift", "Fierce", "Noble", "Proud", "Strong",
    "Wise", "Calm", "Wild", "Pure", "Sharp", "Quick",
];

const ANIMALS: [&str; 16] = [
    "Yak", "Eagle", "Tiger", "Rhino", "Leopard", "Elephant", "Hawk", "Wolf", "Bear", "Falcon",
    "Lion", "Deer", "Fox", "Crane", "Panda", "Raven",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub id: String,
    pub name: String,
}

impl ClientIdentity {
    pub fn from_device_id(device_id: &str) -> Self {
        Self {
            id: device_id.to_string(),
            name: anonymous_name(device_id),
        }
    }
}

/// 32-bit rolling hash (`h * 31 + unit` over UTF-16 code units), absolute value.
pub fn simple_hash(input: &str) -> u64 {
    let hash = input.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit))
    });
    i64::from(hash).unsigned_abs()
}

pub fn anonymous_name(device_id: &str) -> String {
    let hash = simple_hash(device_id);
    let adjective = ADJECTIVES[(hash % ADJECTIVES.len() as u64) as usize];
    let animal = ANIMALS[((hash >> 4) % ANIMALS.len() as u64) as usize];
    format!("{} {}", adjective, animal)
}

fn valid_device_id(id: &str) -> bool {
    (1..=128).contains(&id.len())
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl<S> FromRequestParts<S> for ClientIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let device_id = parts
            .headers
            .get(DEVICE_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .ok_or_else(|| AppError::Authentication("Missing device identity".to_string()))?;

        if !valid_device_id(device_id) {
            return Err(AppError::Authentication(
                "Invalid device identity".to_string(),
            ));
        }

        let mut identity = ClientIdentity::from_device_id(device_id);

        if let Some(name) = parts
            .headers
            .get(DISPLAY_NAME_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|name| (1..=50).contains(&name.chars().count()))
        {
            identity.name = name.to_string();
        }

        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn hash_matches_known_values() {
        assert_eq!(simple_hash(""), 0);
        assert_eq!(simple_hash("a"), 97);
        // 97 * 31 + 98
        assert_eq!(simple_hash("ab"), 3105);
    }

    #[test]
    fn names_are_stable_per_device() {
        let first = anonymous_name("1736120-m5x2k1");
        let second = anonymous_name("1736120-m5x2k1");
        assert_eq!(first, second);

        let (adjective, animal) = first.split_once(' ').unwrap();
        assert!(ADJECTIVES.contains(&adjective));
        assert!(ANIMALS.contains(&animal));
    }

    #[test]
    fn device_ids_are_restricted() {
        assert!(valid_device_id("12345-abc_DEF"));
        assert!(!valid_device_id(""));
        assert!(!valid_device_id("has space"));
        assert!(!valid_device_id(&"x".repeat(129)));
    }

    #[tokio::test]
    async fn extractor_reads_headers() {
        let (mut parts, _) = Request::builder()
            .header(DEVICE_ID_HEADER, "device-1")
            .header(DISPLAY_NAME_HEADER, "Night Owl")
            .body(())
            .unwrap()
            .into_parts();

        let identity = ClientIdentity::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(identity.id, "device-1");
        assert_eq!(identity.name, "Night Owl");
    }

    #[tokio::test]
    async fn extractor_rejects_missing_device() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        let err = ClientIdentity::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));
    }
}
