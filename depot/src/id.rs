use chrono::Utc;
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::warn;

pub trait IdGenerator {
    /// A fresh event id. Never contains `_`, which separates the id from the rest of a key.
    fn generate(&self) -> String;
}

/// `{unix_seconds}-{16 hex chars}` from the OS randomness source.
#[derive(Clone, Default)]
pub struct RandomIdGenerator {}

impl IdGenerator for RandomIdGenerator {
    fn generate(&self) -> String {
        let now = Utc::now();
        let mut random = [0u8; 8];

        match OsRng.try_fill_bytes(&mut random) {
            Ok(()) => format!("{}-{}", now.timestamp(), hex::encode(random)),
            Err(err) => {
                warn!(error = %err, "OS randomness unavailable, falling back to clock id");
                let nanos = now
                    .timestamp_nanos_opt()
                    .unwrap_or_else(|| i64::from(now.timestamp_subsec_nanos()));
                format!("{}-{}", now.timestamp(), nanos)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn ids_have_timestamp_and_hex_suffix() {
        let id = RandomIdGenerator::default().generate();

        let (seconds, suffix) = id.split_once('-').unwrap();
        assert!(seconds.parse::<i64>().unwrap() > 1_600_000_000);
        assert_eq!(suffix.len(), 16);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!id.contains('_'));
    }

    #[test]
    fn ids_are_unique() {
        let generator = RandomIdGenerator::default();
        let ids: HashSet<String> = (0..1000).map(|_| generator.generate()).collect();

        assert_eq!(ids.len(), 1000);
    }
}
