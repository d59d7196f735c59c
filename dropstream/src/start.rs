//! Instant de démarrage de la radio
//!
//! La position du direct est le temps écoulé depuis cet instant : deux
//! auditeurs qui se connectent au même moment entendent le même point de
//! la boucle, quel que soit le moment où le serveur a été relancé.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use std::sync::OnceLock;

#[derive(Debug, Default)]
pub struct StartInstant {
    instant: OnceLock<DateTime<Utc>>,
}

impl StartInstant {
    /// Instant fixé, ou `None` pour « maintenant » à la première utilisation
    pub fn new(start: Option<DateTime<Utc>>) -> Self {
        let instant = OnceLock::new();
        if let Some(start) = start {
            let _ = instant.set(start);
        }
        Self { instant }
    }

    /// Parse un instant RFC 3339 (ex: `2024-03-01T12:00:00Z`)
    ///
    /// Une valeur absente ou vide signifie « maintenant ».
    pub fn parse(start: Option<&str>) -> Result<Self> {
        match start.map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(Self::default()),
            Some(value) => DateTime::parse_from_rfc3339(value)
                .map(|dt| Self::new(Some(dt.with_timezone(&Utc))))
                .map_err(|source| Error::InvalidStart {
                    value: value.to_string(),
                    source,
                }),
        }
    }

    pub fn instant(&self) -> DateTime<Utc> {
        *self.instant.get_or_init(Utc::now)
    }

    /// Microsecondes écoulées depuis le démarrage
    pub fn playhead_us(&self) -> i64 {
        self.playhead_us_at(Utc::now())
    }

    /// Microsecondes écoulées entre le démarrage et `now`
    ///
    /// Un démarrage dans le futur donne 0.
    pub fn playhead_us_at(&self, now: DateTime<Utc>) -> i64 {
        (now - self.instant())
            .num_microseconds()
            .unwrap_or(i64::MAX)
            .max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn test_fixed_start() {
        let start = StartInstant::parse(Some("2024-03-01T12:00:00+01:00")).unwrap();
        assert_eq!(start.instant().to_rfc3339(), "2024-03-01T11:00:00+00:00");

        let now = start.instant() + TimeDelta::milliseconds(1500);
        assert_eq!(start.playhead_us_at(now), 1_500_000);
    }

    #[test]
    fn test_future_start_is_zero() {
        let start = StartInstant::new(Some(Utc::now() + TimeDelta::hours(1)));
        assert_eq!(start.playhead_us(), 0);
    }

    #[test]
    fn test_default_start_is_stable() {
        let start = StartInstant::parse(None).unwrap();
        let first = start.instant();
        assert_eq!(start.instant(), first);
        assert!(StartInstant::parse(Some("  ")).unwrap().playhead_us() >= 0);
    }

    #[test]
    fn test_invalid_start() {
        assert!(matches!(
            StartInstant::parse(Some("yesterday")),
            Err(Error::InvalidStart { .. })
        ));
    }
}
