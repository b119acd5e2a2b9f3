use chrono::{DateTime, SecondsFormat, Utc};

pub trait TimeSource {
    fn current_time(&self) -> DateTime<Utc>;

    // RFC 3339, whole seconds, `Z` suffix
    fn current_timestamp(&self) -> String {
        self.current_time()
            .to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

#[derive(Clone, Default)]
pub struct SystemTime {}

impl TimeSource for SystemTime {
    fn current_time(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
pub struct FixedTime {
    pub time: DateTime<Utc>,
}

#[cfg(test)]
impl TimeSource for FixedTime {
    fn current_time(&self) -> DateTime<Utc> {
        self.time
    }
}
