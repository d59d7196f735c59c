//! Service de streaming : playlist, encodeur et progression
//!
//! [`StreamService::prepare`] construit la playlist et prépare le
//! répertoire de sortie ; [`StreamService::start`] lance l'encodeur au
//! point du direct et publie sa progression sur un canal `watch`.

use crate::cleanup::cleanup_stream_files;
use crate::error::Result;
use crate::start::StartInstant;
use dropffmpeg::{HlsStream, HlsStreamError, HlsStreamOptions, HlsStreamProgress};
use dropplaylist::{
    create_meta_playlist_file, read_playlist_from_dir, write_playlist_file, DurationProbe,
    Playlist, Progress, ProgressProjector,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// Fichier ffconcat listant les morceaux à partir du point de départ
pub const PLAYLIST_FILE_NAME: &str = "playlist.txt";
/// Fichier ffconcat lu par l'encodeur, qui boucle sur [`PLAYLIST_FILE_NAME`]
pub const META_PLAYLIST_FILE_NAME: &str = "meta-playlist.txt";
/// Exécutable de l'encodeur, cherché dans le `PATH`
pub const ENCODER_PROGRAM: &str = "ffmpeg";

/// Réglages du service de streaming
#[derive(Debug)]
pub struct StreamSettings {
    pub input_directory: PathBuf,
    pub output_directory: PathBuf,
    /// Extension des fichiers audio, avec ou sans point
    pub file_extension: String,
    pub start: StartInstant,
    /// Intervalle minimum entre deux rapports de progression traités
    pub progress_interval: Duration,
    /// Durée d'un segment HLS en secondes
    pub segment_duration: u32,
    /// Nombre de segments gardés dans les playlists HLS
    pub segment_count: u32,
}

/// Service de streaming prêt à démarrer
pub struct StreamService {
    settings: StreamSettings,
    playlist: Arc<Playlist>,
    playlist_file: PathBuf,
    meta_playlist_file: PathBuf,
    status: watch::Sender<Option<Progress>>,
    pub(crate) encoder_program: PathBuf,
}

impl StreamService {
    /// Lit la playlist et prépare le répertoire de sortie
    ///
    /// Les fichiers d'un précédent lancement sont supprimés et le
    /// méta-fichier ffconcat est écrit.
    pub async fn prepare<P: DurationProbe>(settings: StreamSettings, probe: &P) -> Result<Self> {
        let input_directory = std::path::absolute(&settings.input_directory)?;
        let output_directory = std::path::absolute(&settings.output_directory)?;
        let playlist_file = output_directory.join(PLAYLIST_FILE_NAME);
        let meta_playlist_file = output_directory.join(META_PLAYLIST_FILE_NAME);

        let playlist =
            read_playlist_from_dir(&input_directory, &settings.file_extension, probe).await?;
        if playlist.is_empty() {
            warn!(
                directory=%input_directory.display(),
                extension=%settings.file_extension,
                "No audio file found, the stream cannot start"
            );
        }

        tokio::fs::create_dir_all(&output_directory).await?;
        cleanup_stream_files(&output_directory)?;
        create_meta_playlist_file(&meta_playlist_file, &playlist_file).await?;

        let (status, _) = watch::channel(None);

        Ok(Self {
            settings: StreamSettings {
                input_directory,
                output_directory,
                ..settings
            },
            playlist: Arc::new(playlist),
            playlist_file,
            meta_playlist_file,
            status,
            encoder_program: PathBuf::from(ENCODER_PROGRAM),
        })
    }

    pub fn playlist(&self) -> &Arc<Playlist> {
        &self.playlist
    }

    pub fn settings(&self) -> &StreamSettings {
        &self.settings
    }

    pub fn output_directory(&self) -> &Path {
        &self.settings.output_directory
    }

    pub fn playlist_file(&self) -> &Path {
        &self.playlist_file
    }

    pub fn meta_playlist_file(&self) -> &Path {
        &self.meta_playlist_file
    }

    /// Position du direct, en microsecondes depuis le démarrage
    pub fn playhead(&self) -> i64 {
        self.settings.start.playhead_us()
    }

    /// Dernière progression publiée
    pub fn latest(&self) -> Option<Progress> {
        self.status.borrow().clone()
    }

    /// Abonnement aux progressions publiées
    pub fn subscribe(&self) -> watch::Receiver<Option<Progress>> {
        self.status.subscribe()
    }

    pub(crate) fn status_sender(&self) -> &watch::Sender<Option<Progress>> {
        &self.status
    }

    fn encoder_options(&self) -> HlsStreamOptions {
        HlsStreamOptions {
            concat: true,
            loop_count: Some(-1),
            segment_duration: self.settings.segment_duration,
            segment_count: self.settings.segment_count,
            ..Default::default()
        }
    }

    /// Lance l'encodeur au point du direct
    ///
    /// Le fichier playlist commence au morceau en cours ; quand le départ
    /// n'est pas au début de la boucle, il est réécrit depuis le début à
    /// mi-chemin du passage en cours, avant que le méta-fichier ne le relise.
    pub async fn start(&self) -> Result<RunningStream> {
        info!("Starting HLS stream...");

        let seek_time = self.playhead();
        info!("Seeking to time: {} microseconds", seek_time);
        write_playlist_file(&self.playlist, &self.playlist_file, seek_time).await?;

        let rewrite = rewrite_delay(self.playlist.duration(), seek_time).map(|delay| {
            let milliseconds = delay.as_millis();
            info!("Scheduling playlist replacement in {} ms", milliseconds);
            let playlist = self.playlist.clone();
            let playlist_file = self.playlist_file.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                match write_playlist_file(&playlist, &playlist_file, 0).await {
                    Ok(()) => info!("Replaced playlist after {} ms", milliseconds),
                    Err(e) => error!("Failed to replace playlist file: {}", e),
                }
            })
        });

        let (encoder, reports) = HlsStream::spawn_program(
            &self.encoder_program,
            &self.meta_playlist_file,
            &self.settings.output_directory,
            &self.encoder_options(),
        )?;

        // seek_time >= 0 : le seek vient de réussir
        let projector = ProgressProjector::new(self.playlist.clone(), seek_time.unsigned_abs());
        let pipeline = tokio::spawn(run_progress_pipeline(
            reports,
            projector,
            self.settings.progress_interval,
            self.status.clone(),
        ));

        Ok(RunningStream {
            encoder,
            pipeline,
            rewrite,
        })
    }
}

/// Délai avant la réécriture du fichier playlist depuis le début
///
/// Moitié du temps restant dans le passage en cours ; `None` quand le
/// départ est au début de la boucle.
pub fn rewrite_delay(duration: u64, seek_time: i64) -> Option<Duration> {
    if seek_time <= 0 || duration == 0 {
        return None;
    }
    let remaining = duration - seek_time.unsigned_abs() % duration;
    Some(Duration::from_millis(remaining / 2 / 1000))
}

/// Encodeur en cours et tâches associées
pub struct RunningStream {
    encoder: HlsStream,
    pipeline: JoinHandle<dropplaylist::Result<()>>,
    rewrite: Option<JoinHandle<()>>,
}

impl RunningStream {
    /// Attend la fin du flux
    ///
    /// Le flux se termine quand l'encodeur s'arrête ou quand une
    /// progression ne peut pas être calculée ; dans ce cas l'encodeur est
    /// arrêté.
    pub async fn wait(mut self) -> Result<()> {
        let pipeline = (&mut self.pipeline).await;
        if let Some(rewrite) = self.rewrite.take() {
            rewrite.abort();
        }

        match pipeline? {
            Ok(()) => {
                self.encoder.wait().await?;
                info!("Stream progress completed");
                Ok(())
            }
            Err(e) => {
                error!("Stream progress error: {}", e);
                if let Err(kill_error) = self.encoder.kill().await {
                    warn!("Failed to stop the encoder: {}", kill_error);
                }
                Err(e.into())
            }
        }
    }

    /// Arrête l'encodeur
    pub async fn stop(mut self) -> std::result::Result<(), HlsStreamError> {
        if let Some(rewrite) = self.rewrite.take() {
            rewrite.abort();
        }
        self.pipeline.abort();
        self.encoder.kill().await
    }
}

/// Laisse passer au plus un rapport par intervalle
///
/// Le premier rapport passe toujours ; les suivants sont ignorés jusqu'à la
/// fin de l'intervalle ouvert par le dernier rapport accepté.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn ready(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// Projette les rapports de l'encodeur et publie chaque progression
///
/// Rapports limités par `interval`, échantillons `N/A` ignorés. Se termine
/// quand le canal des rapports est fermé, ou sur la première erreur de
/// projection.
pub async fn run_progress_pipeline(
    mut reports: mpsc::Receiver<HlsStreamProgress>,
    projector: ProgressProjector,
    interval: Duration,
    status: watch::Sender<Option<Progress>>,
) -> dropplaylist::Result<()> {
    let mut throttle = Throttle::new(interval);

    while let Some(report) = reports.recv().await {
        if !throttle.ready(Instant::now()) || !report.is_available() {
            continue;
        }

        let progress = projector.project_sample(&report.out_time_us)?;
        log_progress(&progress);
        status.send_replace(Some(progress));
    }

    Ok(())
}

fn log_progress(progress: &Progress) {
    info!(
        "Stream progress: {} - Loop: {}, Entry Progress: {:.2}%, Total Progress: {:.2}%",
        progress.entry().title,
        progress.seek.loop_count,
        100.0 * progress.entry_ratio(),
        100.0 * progress.playlist_ratio()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use dropplaylist::{Error as PlaylistError, PlaylistEntry};

    struct FixedProbe(u64);

    impl DurationProbe for FixedProbe {
        async fn duration_us(&self, _path: &Path) -> dropplaylist::Result<u64> {
            Ok(self.0)
        }
    }

    fn playlist() -> Arc<Playlist> {
        Arc::new(Playlist::new(vec![
            PlaylistEntry::new("one", "one.wav", "/music/one.wav", 10_000_000),
            PlaylistEntry::new("two", "two.wav", "/music/two.wav", 20_000_000),
        ]))
    }

    fn report(out_time_us: &str) -> HlsStreamProgress {
        HlsStreamProgress {
            out_time_us: out_time_us.to_string(),
            ..Default::default()
        }
    }

    async fn run(
        samples: &[&str],
        offset: u64,
        interval: Duration,
    ) -> (dropplaylist::Result<()>, Option<Progress>) {
        let (tx, rx) = mpsc::channel(16);
        for sample in samples {
            tx.send(report(sample)).await.unwrap();
        }
        drop(tx);

        let (status, status_rx) = watch::channel(None);
        let projector = ProgressProjector::new(playlist(), offset);
        let result = run_progress_pipeline(rx, projector, interval, status).await;
        let latest = status_rx.borrow().clone();
        (result, latest)
    }

    #[tokio::test]
    async fn test_pipeline_projects_with_offset() {
        let (result, latest) = run(&["N/A", "5000000"], 8_000_000, Duration::ZERO).await;
        assert!(result.is_ok());

        let progress = latest.unwrap();
        assert_eq!(progress.entry().title, "two");
        assert_eq!(progress.seek.entry_offset, 3_000_000);
        assert_eq!(progress.seek.playlist_offset, 13_000_000);
        assert_eq!(progress.seek.loop_count, 0);
    }

    #[tokio::test]
    async fn test_pipeline_throttles_reports() {
        let (result, latest) = run(&["1000000", "2000000"], 0, Duration::from_secs(3600)).await;
        assert!(result.is_ok());
        assert_eq!(latest.unwrap().seek.playlist_offset, 1_000_000);
    }

    #[tokio::test]
    async fn test_pipeline_unavailable_sample_still_consumes_the_interval() {
        let (result, latest) = run(&["N/A", "2000000"], 0, Duration::from_secs(3600)).await;
        assert!(result.is_ok());
        assert!(latest.is_none());
    }

    #[tokio::test]
    async fn test_pipeline_stops_on_invalid_sample() {
        let (result, latest) = run(&["1000000", "garbage", "2000000"], 0, Duration::ZERO).await;
        assert!(matches!(result, Err(PlaylistError::InvalidSample(_))));
        assert_eq!(latest.unwrap().seek.playlist_offset, 1_000_000);
    }

    #[test]
    fn test_throttle_windows() {
        let mut throttle = Throttle::new(Duration::from_millis(1000));
        let t0 = Instant::now();
        assert!(throttle.ready(t0));
        assert!(!throttle.ready(t0 + Duration::from_millis(999)));
        assert!(throttle.ready(t0 + Duration::from_millis(1000)));
        assert!(!throttle.ready(t0 + Duration::from_millis(1500)));
        assert!(throttle.ready(t0 + Duration::from_millis(2000)));
    }

    #[test]
    fn test_rewrite_delay() {
        assert_eq!(rewrite_delay(30_000_000, 0), None);
        assert_eq!(rewrite_delay(0, 5), None);
        // 10 s restantes dans le passage → réécriture dans 5 s
        assert_eq!(
            rewrite_delay(30_000_000, 20_000_000),
            Some(Duration::from_millis(5000))
        );
        // Deuxième passage, même position dans la boucle
        assert_eq!(
            rewrite_delay(30_000_000, 50_000_000),
            Some(Duration::from_millis(5000))
        );
        assert_eq!(rewrite_delay(30_000_000, 1), Some(Duration::from_millis(14_999)));
    }

    fn settings(input: &Path, output: &Path) -> StreamSettings {
        StreamSettings {
            input_directory: input.to_path_buf(),
            output_directory: output.to_path_buf(),
            file_extension: "wav".to_string(),
            start: StartInstant::default(),
            progress_interval: Duration::from_millis(1000),
            segment_duration: 1,
            segment_count: 50,
        }
    }

    #[tokio::test]
    async fn test_prepare_cleans_and_writes_meta_playlist() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        std::fs::write(input.path().join("a.wav"), b"RIFF").unwrap();
        std::fs::write(input.path().join("b.wav"), b"RIFF").unwrap();
        std::fs::write(output.path().join("old.m3u8"), b"#EXTM3U").unwrap();

        let service = StreamService::prepare(
            settings(input.path(), output.path()),
            &FixedProbe(2_000_000),
        )
        .await
        .unwrap();

        assert_eq!(service.playlist().len(), 2);
        assert_eq!(service.playlist().duration(), 4_000_000);
        assert!(!output.path().join("old.m3u8").exists());
        assert!(service.latest().is_none());

        let meta = std::fs::read_to_string(service.meta_playlist_file()).unwrap();
        assert!(meta.starts_with("ffconcat version 1.0\n"));
        assert_eq!(
            meta.matches(&*service.playlist_file().to_string_lossy())
                .count(),
            2
        );
    }

    #[test]
    fn test_encoder_options() {
        let (status, _) = watch::channel(None);
        let service = StreamService {
            settings: StreamSettings {
                segment_count: 12,
                ..settings(Path::new("/in"), Path::new("/out"))
            },
            playlist: playlist(),
            playlist_file: PathBuf::from("/out/playlist.txt"),
            meta_playlist_file: PathBuf::from("/out/meta-playlist.txt"),
            status,
            encoder_program: PathBuf::from(ENCODER_PROGRAM),
        };
        let options = service.encoder_options();
        assert!(options.concat);
        assert_eq!(options.loop_count, Some(-1));
        assert_eq!(options.segment_duration, 1);
        assert_eq!(options.segment_count, 12);
    }

    #[cfg(unix)]
    async fn prepared_service(input: &Path, output: &Path, program: &Path) -> StreamService {
        std::fs::write(input.join("a.wav"), b"RIFF").unwrap();
        let mut service = StreamService::prepare(settings(input, output), &FixedProbe(2_000_000))
            .await
            .unwrap();
        service.encoder_program = program.to_path_buf();
        service
    }

    #[cfg(unix)]
    fn fake_encoder(dir: &Path, script: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("fake-ffmpeg");
        std::fs::write(&path, format!("#!/bin/sh\n{script}")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_wait_succeeds_when_encoder_exits_cleanly() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let service = prepared_service(input.path(), output.path(), Path::new("true")).await;

        let running = service.start().await.unwrap();
        assert!(output.path().join(PLAYLIST_FILE_NAME).exists());
        assert!(running.wait().await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_wait_reports_encoder_failure() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let service = prepared_service(input.path(), output.path(), Path::new("false")).await;

        let running = service.start().await.unwrap();
        match running.wait().await {
            Err(Error::Encoder(HlsStreamError::Exit { code, .. })) => assert_eq!(code, 1),
            other => panic!("unexpected result: {:?}", other.err()),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_invalid_progress_kills_encoder() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let bin = tempfile::tempdir().unwrap();
        // Le pid reste celui du script grâce à `exec`
        let program = fake_encoder(
            bin.path(),
            "echo $$ > encoder.pid\n\
             echo out_time_us=garbage\n\
             echo progress=continue\n\
             exec sleep 30\n",
        );
        let service = prepared_service(input.path(), output.path(), &program).await;

        let running = service.start().await.unwrap();
        let result = tokio::time::timeout(Duration::from_secs(10), running.wait())
            .await
            .unwrap();
        assert!(matches!(
            result,
            Err(Error::Playlist(PlaylistError::InvalidSample(_)))
        ));
        assert!(service.latest().is_none());

        let pid = std::fs::read_to_string(output.path().join("encoder.pid")).unwrap();
        let alive = std::process::Command::new("kill")
            .args(["-0", pid.trim()])
            .status()
            .unwrap();
        assert!(!alive.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stop_kills_encoder() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let bin = tempfile::tempdir().unwrap();
        let program = fake_encoder(bin.path(), "exec sleep 30\n");
        let service = prepared_service(input.path(), output.path(), &program).await;

        let running = service.start().await.unwrap();
        tokio::time::timeout(Duration::from_secs(10), running.stop())
            .await
            .unwrap()
            .unwrap();
    }
}
