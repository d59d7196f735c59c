//! PlaylistEntry : un morceau de la boucle

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Un morceau audio de la playlist
///
/// Les entrées sont produites une seule fois par le scan du répertoire
/// d'entrée et ne sont jamais modifiées ensuite. La durée est exprimée en
/// microsecondes entières pour éviter toute dérive sur un nombre de boucles
/// non borné.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistEntry {
    pub title: String,
    pub filename: String,
    pub filepath: PathBuf,
    /// Durée en microsecondes
    pub duration: u64,
}

impl PlaylistEntry {
    pub fn new(
        title: impl Into<String>,
        filename: impl Into<String>,
        filepath: impl Into<PathBuf>,
        duration: u64,
    ) -> Self {
        Self {
            title: title.into(),
            filename: filename.into(),
            filepath: filepath.into(),
            duration,
        }
    }
}
