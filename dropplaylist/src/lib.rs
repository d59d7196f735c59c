//! # dropplaylist - Index temporel d'une playlist en boucle infinie
//!
//! Cette crate fournit le cœur de DropRadio :
//! - [`Playlist`] : liste ordonnée et immuable de morceaux, vue comme une
//!   boucle infinie, avec un seek en O(log n) sur les intervalles cumulés
//! - [`ProgressProjector`] : conversion des rapports de l'encodeur en
//!   position dans la boucle ([`Progress`])
//! - Génération des fichiers ffconcat lus par l'encodeur
//! - Construction de la playlist depuis un répertoire de fichiers audio
//!
//! Toutes les durées sont des microsecondes entières.
//!
//! # Exemple d'utilisation
//!
//! ```
//! use dropplaylist::{Playlist, PlaylistEntry, ProgressProjector};
//! use std::sync::Arc;
//!
//! let playlist = Arc::new(Playlist::new(vec![
//!     PlaylistEntry::new("intro", "intro.wav", "/music/intro.wav", 90_000_000),
//!     PlaylistEntry::new("live", "live.wav", "/music/live.wav", 240_000_000),
//! ]));
//!
//! // L'encodeur a démarré 100 s dans la boucle et a produit 5 s de son
//! let projector = ProgressProjector::new(playlist, 100_000_000);
//! let progress = projector.project_sample("5000000")?;
//!
//! assert_eq!(progress.entry().title, "live");
//! assert_eq!(progress.seek.entry_offset, 15_000_000);
//! # Ok::<(), dropplaylist::Error>(())
//! ```

mod entry;
mod error;
mod ffconcat;
mod playlist;
mod progress;
mod scan;

// Réexports publics
pub use entry::PlaylistEntry;
pub use error::{Error, Result};
pub use ffconcat::{
    create_meta_playlist_file, format_duration, render_ffconcat, render_meta_playlist,
    write_playlist_file,
};
pub use playlist::{Playlist, SeekResult};
pub use progress::{Progress, ProgressProjector, UNAVAILABLE_SAMPLE};
pub use scan::{read_playlist_from_dir, DurationProbe, FfprobeDuration};
