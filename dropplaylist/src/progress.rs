//! Projection des rapports de l'encodeur sur la boucle de la playlist

use crate::entry::PlaylistEntry;
use crate::error::{Error, Result};
use crate::playlist::{Playlist, SeekResult};
use serde::Serialize;
use std::sync::Arc;

/// Valeur sentinelle de l'encodeur pour un échantillon pas encore disponible
pub const UNAVAILABLE_SAMPLE: &str = "N/A";

/// Position courante du flux dans la playlist
///
/// Combine un [`SeekResult`] et la playlist (partagée, non possédée) contre
/// laquelle il a été calculé.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    #[serde(flatten)]
    pub seek: SeekResult,
    pub playlist: Arc<Playlist>,
}

impl Progress {
    /// Morceau en cours
    pub fn entry(&self) -> &PlaylistEntry {
        &self.playlist.entries()[self.seek.index]
    }

    /// Avancement dans le morceau courant, entre 0 et 1
    pub fn entry_ratio(&self) -> f64 {
        ratio(self.seek.entry_offset, self.entry().duration)
    }

    /// Avancement dans le passage courant de la playlist, entre 0 et 1
    pub fn playlist_ratio(&self) -> f64 {
        ratio(self.seek.playlist_offset, self.playlist.duration())
    }
}

fn ratio(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

/// Convertit le temps de sortie de l'encodeur en position dans la boucle
///
/// L'encodeur démarre à `offset` microsecondes dans la boucle et rapporte le
/// temps produit depuis son lancement : la position absolue est donc
/// `offset + échantillon`. Le projecteur ne garde aucun historique.
#[derive(Debug, Clone)]
pub struct ProgressProjector {
    playlist: Arc<Playlist>,
    offset: u64,
}

impl ProgressProjector {
    pub fn new(playlist: Arc<Playlist>, offset: u64) -> Self {
        Self { playlist, offset }
    }

    pub fn playlist(&self) -> &Arc<Playlist> {
        &self.playlist
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Projette un temps écoulé (µs) depuis le lancement de l'encodeur
    pub fn project(&self, elapsed_us: i64) -> Result<Progress> {
        let playhead = i64::try_from(self.offset)
            .ok()
            .and_then(|offset| offset.checked_add(elapsed_us))
            .ok_or_else(|| Error::InvalidSample(elapsed_us.to_string()))?;

        Ok(Progress {
            seek: self.playlist.seek(playhead)?,
            playlist: self.playlist.clone(),
        })
    }

    /// Projette un échantillon brut `out_time_us` de l'encodeur
    ///
    /// Les échantillons `N/A` doivent être filtrés en amont : les projeter
    /// est une erreur ([`Error::SampleUnavailable`]).
    pub fn project_sample(&self, out_time_us: &str) -> Result<Progress> {
        let sample = out_time_us.trim();
        if sample == UNAVAILABLE_SAMPLE {
            return Err(Error::SampleUnavailable);
        }
        let elapsed = sample
            .parse::<i64>()
            .map_err(|_| Error::InvalidSample(sample.to_string()))?;
        self.project(elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projector(offset: u64) -> ProgressProjector {
        let playlist = Playlist::new(vec![
            PlaylistEntry::new("one", "one.wav", "/in/one.wav", 10),
            PlaylistEntry::new("two", "two.wav", "/in/two.wav", 20),
            PlaylistEntry::new("three", "three.wav", "/in/three.wav", 30),
        ]);
        ProgressProjector::new(Arc::new(playlist), offset)
    }

    #[test]
    fn test_project_adds_offset() {
        let projector = projector(30);
        let progress = projector.project(35).unwrap();
        assert_eq!(progress.seek.index, 0);
        assert_eq!(progress.seek.loop_count, 1);
        assert_eq!(progress.seek.entry_offset, 5);
        assert_eq!(progress.entry().title, "one");
        assert!(Arc::ptr_eq(&progress.playlist, projector.playlist()));
    }

    #[test]
    fn test_project_sample() {
        let projector = projector(0);
        let progress = projector.project_sample("35").unwrap();
        assert_eq!(progress.seek.index, 2);
        assert_eq!(progress.entry().title, "three");
        assert!((progress.entry_ratio() - 5.0 / 30.0).abs() < 1e-9);
        assert!((progress.playlist_ratio() - 35.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_project_sample_rejects_sentinel_and_garbage() {
        let projector = projector(0);
        assert!(matches!(
            projector.project_sample("N/A"),
            Err(Error::SampleUnavailable)
        ));
        assert!(matches!(
            projector.project_sample("12.5"),
            Err(Error::InvalidSample(s)) if s == "12.5"
        ));
        assert!(matches!(
            projector.project_sample("-1"),
            Err(Error::NegativeSeekTime(-1))
        ));
    }

    #[test]
    fn test_project_is_stateless() {
        let projector = projector(7);
        let first = projector.project(100).unwrap();
        let _ = projector.project(3).unwrap();
        assert_eq!(projector.project(100).unwrap(), first);
    }

    #[test]
    fn test_project_overflow() {
        let projector = projector(u64::MAX);
        assert!(matches!(projector.project(0), Err(Error::InvalidSample(_))));
    }

    #[test]
    fn test_serialize_progress() {
        let progress = projector(0).project(15).unwrap();
        let json = serde_json::to_value(&progress).unwrap();
        assert_eq!(json["index"], 1);
        assert_eq!(json["loop"], 0);
        assert_eq!(json["entryOffset"], 5);
        assert_eq!(json["playlistOffset"], 15);
        assert_eq!(json["playlist"]["length"], 3);
    }
}
