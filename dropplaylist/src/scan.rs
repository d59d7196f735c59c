//! Construction de la playlist depuis un répertoire de fichiers audio

use crate::entry::PlaylistEntry;
use crate::error::{Error, Result};
use crate::playlist::Playlist;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Sonde de durée d'un fichier média
///
/// Implémentée par [`FfprobeDuration`] en production ; les tests
/// fournissent leurs propres sondes.
pub trait DurationProbe {
    /// Durée du fichier en microsecondes
    async fn duration_us(&self, path: &Path) -> Result<u64>;
}

/// Sonde basée sur `ffprobe -show_format`
#[derive(Debug, Clone, Copy, Default)]
pub struct FfprobeDuration;

impl DurationProbe for FfprobeDuration {
    async fn duration_us(&self, path: &Path) -> Result<u64> {
        let probe_error = |message: String| Error::Probe {
            path: path.display().to_string(),
            message,
        };
        let result = dropffmpeg::ffprobe_format(path)
            .await
            .map_err(|e| probe_error(e.to_string()))?;
        result
            .format
            .duration_us()
            .map_err(|e| probe_error(e.to_string()))
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    let wanted = extension.trim_start_matches('.');
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted))
}

/// Lit les fichiers `*.extension` de `directory` et construit la playlist
///
/// Les fichiers sont triés par nom pour que l'ordre de lecture ne dépende
/// pas du système de fichiers. Le titre est le nom du fichier sans son
/// extension.
pub async fn read_playlist_from_dir<P: DurationProbe>(
    directory: impl AsRef<Path>,
    extension: &str,
    probe: &P,
) -> Result<Playlist> {
    let directory = std::path::absolute(directory.as_ref())?;

    let mut files: Vec<PathBuf> = Vec::new();
    let mut dir = tokio::fs::read_dir(&directory).await?;
    while let Some(item) = dir.next_entry().await? {
        let path = item.path();
        if item.file_type().await?.is_file() && has_extension(&path, extension) {
            files.push(path);
        }
    }
    files.sort();

    let mut entries = Vec::with_capacity(files.len());
    for filepath in files {
        let duration = probe.duration_us(&filepath).await?;
        let filename = filepath
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let title = filepath
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| filename.clone());

        debug!(file=%filename, duration_us = duration, "Probed playlist entry");
        entries.push(PlaylistEntry {
            title,
            filename,
            filepath,
            duration,
        });
    }

    let playlist = Playlist::new(entries);
    info!(
        directory=%directory.display(),
        tracks = playlist.len(),
        duration_us = playlist.duration(),
        "📀 Playlist loaded"
    );
    Ok(playlist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct StubProbe(HashMap<String, u64>);

    impl DurationProbe for StubProbe {
        async fn duration_us(&self, path: &Path) -> Result<u64> {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            self.0.get(&name).copied().ok_or(Error::Probe {
                path: path.display().to_string(),
                message: "unknown file".into(),
            })
        }
    }

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"RIFF").unwrap();
    }

    #[tokio::test]
    async fn test_read_playlist_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b-side.wav");
        touch(dir.path(), "a-side.WAV");
        touch(dir.path(), "cover.jpg");
        touch(dir.path(), "notes.txt");
        std::fs::create_dir(dir.path().join("nested.wav")).unwrap();

        let probe = StubProbe(HashMap::from([
            ("a-side.WAV".to_string(), 1_500_000),
            ("b-side.wav".to_string(), 2_000_000),
        ]));
        let playlist = read_playlist_from_dir(dir.path(), "wav", &probe).await.unwrap();

        assert_eq!(playlist.len(), 2);
        assert_eq!(playlist.duration(), 3_500_000);
        let first = &playlist.entries()[0];
        assert_eq!(first.title, "a-side");
        assert_eq!(first.filename, "a-side.WAV");
        assert!(first.filepath.is_absolute());
        assert_eq!(playlist.entries()[1].title, "b-side");
    }

    #[tokio::test]
    async fn test_read_playlist_accepts_dotted_extension() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "only.flac");
        let probe = StubProbe(HashMap::from([("only.flac".to_string(), 42)]));

        let playlist = read_playlist_from_dir(dir.path(), ".flac", &probe).await.unwrap();
        assert_eq!(playlist.len(), 1);
        assert_eq!(playlist.duration(), 42);
    }

    #[tokio::test]
    async fn test_read_playlist_propagates_probe_error() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "broken.wav");
        let probe = StubProbe(HashMap::new());

        let result = read_playlist_from_dir(dir.path(), "wav", &probe).await;
        assert!(matches!(result, Err(Error::Probe { .. })));
    }

    #[tokio::test]
    async fn test_read_playlist_missing_directory() {
        let probe = StubProbe(HashMap::new());
        let result = read_playlist_from_dir("/definitely/not/here", "wav", &probe).await;
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
