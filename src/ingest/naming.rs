use chrono::{DateTime, Local, TimeZone, Utc};
use std::sync::atomic::{AtomicU64, Ordering};

/// `YYYY-MM-DD_HH-MM-SS`
pub fn format_timestamp<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("%Y-%m-%d_%H-%M-%S").to_string()
}

pub fn generate_timestamp() -> String {
    format_timestamp(&Local::now())
}

pub fn generate_text_filename() -> String {
    format!("{}.txt", generate_timestamp())
}

/// Time based ids for inline items. The sequence keeps two items staged in
/// the same millisecond apart.
#[derive(Debug, Default)]
pub struct ItemIdGenerator {
    sequence: AtomicU64,
}

impl ItemIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        format!("{}-{}", Utc::now().timestamp_millis(), seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_format_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap();
        assert_eq!(format_timestamp(&at), "2024-03-07_09-05-01");
    }

    #[test]
    fn test_text_filename_shape() {
        let name = generate_text_filename();
        assert!(name.ends_with(".txt"));
        assert_eq!(name.len(), "2024-03-07_09-05-01.txt".len());
    }

    #[test]
    fn test_ids_unique_within_session() {
        let ids = ItemIdGenerator::new();
        let generated: HashSet<String> = (0..1000).map(|_| ids.next_id()).collect();
        assert_eq!(generated.len(), 1000);
    }
}
