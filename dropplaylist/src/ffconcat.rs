//! Génération des fichiers ffconcat lus par l'encodeur
//!
//! Deux fichiers sont produits dans le répertoire de sortie :
//!
//! - le fichier playlist, qui liste les morceaux à partir de la position de
//!   seek (avec `inpoint` pour le premier morceau entamé) ;
//! - le méta-fichier, qui référence deux fois le fichier playlist. L'encodeur
//!   relit ainsi le fichier playlist à chaque passage, ce qui permet de le
//!   réécrire depuis le début de la boucle une fois le premier passage
//!   partiel lancé.

use crate::error::Result;
use crate::playlist::Playlist;
use std::fmt::Write as _;
use std::path::Path;
use tracing::debug;

const HEADER: &str = "ffconcat version 1.0\n";

/// Formate une durée en microsecondes en secondes à six décimales
///
/// ```
/// assert_eq!(dropplaylist::format_duration(5), "0.000005");
/// assert_eq!(dropplaylist::format_duration(12_345_678), "12.345678");
/// ```
pub fn format_duration(duration_us: u64) -> String {
    format!("{}.{:06}", duration_us / 1_000_000, duration_us % 1_000_000)
}

/// Échappe un chemin pour une directive `file '...'`
fn quote(path: &Path) -> String {
    path.to_string_lossy().replace('\'', r"'\''")
}

/// Rend le fichier playlist à partir de la position `seek_time` (µs)
///
/// Seuls les morceaux restants du passage courant sont listés : le
/// méta-fichier enchaîne ensuite sur la playlist complète.
pub fn render_ffconcat(playlist: &Playlist, seek_time: i64) -> Result<String> {
    let seek = playlist.seek(seek_time)?;
    let mut content = String::from(HEADER);

    for (i, entry) in playlist.entries().iter().enumerate().skip(seek.index) {
        let _ = writeln!(content, "file '{}'", quote(&entry.filepath));
        if i == seek.index && seek.entry_offset > 0 {
            let _ = writeln!(content, "inpoint {}", format_duration(seek.entry_offset));
            let _ = writeln!(
                content,
                "duration {}",
                format_duration(entry.duration - seek.entry_offset)
            );
        } else {
            let _ = writeln!(content, "duration {}", format_duration(entry.duration));
        }
    }

    Ok(content)
}

/// Écrit le fichier playlist ffconcat
pub async fn write_playlist_file(
    playlist: &Playlist,
    path: impl AsRef<Path>,
    seek_time: i64,
) -> Result<()> {
    let path = path.as_ref();
    let content = render_ffconcat(playlist, seek_time)?;
    tokio::fs::write(path, content).await?;
    debug!(path=%path.display(), seek_time, "Wrote ffconcat playlist file");
    Ok(())
}

/// Rend le méta-fichier qui boucle sur le fichier playlist
pub fn render_meta_playlist(playlist_file: &Path) -> String {
    let mut content = String::from(HEADER);
    for _ in 0..2 {
        let _ = writeln!(content, "file '{}'", quote(playlist_file));
        content.push_str("option safe 0\n");
    }
    content
}

/// Écrit le méta-fichier ffconcat
pub async fn create_meta_playlist_file(
    meta_playlist_file: impl AsRef<Path>,
    playlist_file: impl AsRef<Path>,
) -> Result<()> {
    let meta_playlist_file = meta_playlist_file.as_ref();
    let content = render_meta_playlist(playlist_file.as_ref());
    tokio::fs::write(meta_playlist_file, content).await?;
    debug!(path=%meta_playlist_file.display(), "Wrote ffconcat meta playlist file");
    Ok(())
}
