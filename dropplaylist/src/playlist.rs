//! Playlist : index temporel d'une boucle infinie de morceaux
//!
//! Une `Playlist` est construite une seule fois à partir de la liste ordonnée
//! des morceaux, puis partagée en lecture seule (`Arc<Playlist>`) entre le
//! serveur HTTP, la projection de progression et l'écriture des fichiers
//! ffconcat. Chaque morceau occupe l'intervalle semi-ouvert
//! `[start_time(i), end_time(i))` de la boucle.

use crate::entry::PlaylistEntry;
use crate::error::{Error, Result};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

/// Résultat d'un seek dans la boucle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeekResult {
    /// Index du morceau en cours
    pub index: usize,
    /// Nombre de passages complets de la playlist déjà joués
    #[serde(rename = "loop")]
    pub loop_count: u64,
    /// Position dans le morceau (µs)
    pub entry_offset: u64,
    /// Position dans le passage courant de la playlist (µs)
    pub playlist_offset: u64,
}

/// Playlist immuable traitée comme un cycle infini
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playlist {
    entries: Vec<PlaylistEntry>,
    duration: u64,
    start_times: Vec<u64>,
    end_times: Vec<u64>,
}

impl Playlist {
    /// Construit la playlist et ses tables d'intervalles cumulés
    ///
    /// Les durées ne sont pas validées : une entrée de durée nulle donne un
    /// intervalle vide qu'aucun seek ne peut atteindre. Le cumul sature à
    /// `u64::MAX` (plus de 500 000 ans en µs).
    pub fn new(entries: Vec<PlaylistEntry>) -> Self {
        let mut start_times = Vec::with_capacity(entries.len());
        let mut end_times = Vec::with_capacity(entries.len());
        let mut duration = 0u64;

        for entry in &entries {
            start_times.push(duration);
            duration = duration.saturating_add(entry.duration);
            end_times.push(duration);
        }

        Self {
            entries,
            duration,
            start_times,
            end_times,
        }
    }

    pub fn entries(&self) -> &[PlaylistEntry] {
        &self.entries
    }

    /// Nombre de morceaux
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Durée totale d'un passage (µs), 0 si vide
    pub fn duration(&self) -> u64 {
        self.duration
    }

    /// Début de l'intervalle du morceau `index` dans un passage (µs)
    pub fn start_time(&self, index: usize) -> Option<u64> {
        self.start_times.get(index).copied()
    }

    /// Fin (exclue) de l'intervalle du morceau `index` dans un passage (µs)
    pub fn end_time(&self, index: usize) -> Option<u64> {
        self.end_times.get(index).copied()
    }

    /// Résout le morceau joué après `time` microsecondes de lecture continue
    ///
    /// `time` peut couvrir un nombre quelconque de passages complets. Le
    /// calcul est une fonction pure du temps et du contenu de la playlist.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyPlaylist`] si la playlist n'a aucun morceau
    /// - [`Error::NegativeSeekTime`] si `time < 0`
    /// - [`Error::ZeroDuration`] si tous les morceaux ont une durée nulle
    ///
    /// # Exemple
    ///
    /// ```
    /// use dropplaylist::{Playlist, PlaylistEntry};
    ///
    /// let playlist = Playlist::new(vec![
    ///     PlaylistEntry::new("a", "a.wav", "/music/a.wav", 10),
    ///     PlaylistEntry::new("b", "b.wav", "/music/b.wav", 20),
    ///     PlaylistEntry::new("c", "c.wav", "/music/c.wav", 30),
    /// ]);
    ///
    /// let result = playlist.seek(65)?;
    /// assert_eq!(result.index, 0);
    /// assert_eq!(result.loop_count, 1);
    /// assert_eq!(result.entry_offset, 5);
    /// # Ok::<(), dropplaylist::Error>(())
    /// ```
    pub fn seek(&self, time: i64) -> Result<SeekResult> {
        if self.entries.is_empty() {
            return Err(Error::EmptyPlaylist);
        }
        if time < 0 {
            return Err(Error::NegativeSeekTime(time));
        }
        if self.duration == 0 {
            return Err(Error::ZeroDuration);
        }

        let time = time as u64;
        let loop_count = time / self.duration;
        let playlist_offset = time % self.duration;
        let index = self.locate(playlist_offset);

        Ok(SeekResult {
            index,
            loop_count,
            entry_offset: playlist_offset - self.start_times[index],
            playlist_offset,
        })
    }

    /// Plus petit index dont la fin d'intervalle dépasse `offset`
    ///
    /// Les sondes alternent une estimation par interpolation et une
    /// bissection : la bissection divise la plage par deux et
    /// l'interpolation ne l'élargit jamais, d'où O(log n) au pire. Si aucun
    /// intervalle ne contient `offset` (offset == durée), on retombe sur le
    /// dernier morceau.
    fn locate(&self, offset: u64) -> usize {
        self.locate_counting(offset).0
    }

    /// [`Self::locate`] et le nombre d'itérations effectuées
    fn locate_counting(&self, offset: u64) -> (usize, u32) {
        let (mut lo, mut hi) = (0, self.entries.len() - 1);
        let mut interpolate = true;
        let mut steps = 0;

        while lo < hi {
            steps += 1;
            let m = if interpolate {
                self.interpolate(lo, hi, offset)
            } else {
                lo + (hi - lo) / 2
            };
            interpolate = !interpolate;

            if self.end_times[m] > offset {
                hi = m;
            } else {
                lo = m + 1;
            }
        }

        (lo, steps)
    }

    /// Sonde dans `[lo, hi)` proportionnelle à la position de `offset`
    fn interpolate(&self, lo: usize, hi: usize, offset: u64) -> usize {
        let span = self.end_times[hi] - self.start_times[lo];
        if span == 0 {
            return lo + (hi - lo) / 2;
        }
        let shifted = offset.saturating_sub(self.start_times[lo]) as u128;
        let step = shifted * (hi - lo) as u128 / span as u128;
        (lo + step as usize).min(hi - 1)
    }
}

impl FromIterator<PlaylistEntry> for Playlist {
    fn from_iter<I: IntoIterator<Item = PlaylistEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Serialize for Playlist {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Playlist", 3)?;
        state.serialize_field("entries", &self.entries)?;
        state.serialize_field("length", &self.entries.len())?;
        state.serialize_field("duration", &self.duration)?;
        state.end()
    }
}
