//! Nettoyage des fichiers laissés par un précédent lancement

use std::io;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Extensions des fichiers produits par l'encodeur et le service
const STREAM_FILE_EXTENSIONS: [&str; 3] = ["m3u8", "ts", "txt"];

/// Supprime récursivement les `*.m3u8`, `*.ts` et `*.txt` de `directory`
///
/// Retourne le nombre de fichiers supprimés.
pub fn cleanup_stream_files(directory: impl AsRef<Path>) -> io::Result<usize> {
    let directory = directory.as_ref();
    let mut removed = 0;

    for entry in WalkDir::new(directory).follow_links(false) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_stream_file = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| STREAM_FILE_EXTENSIONS.contains(&ext));
        if is_stream_file {
            std::fs::remove_file(entry.path())?;
            debug!(file=%entry.path().display(), "Removed stream file");
            removed += 1;
        }
    }

    info!(directory=%directory.display(), removed, "🧹 Stream files cleaned up");
    Ok(removed)
}
