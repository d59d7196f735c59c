//! Extension dropserver pour le service de streaming
//!
//! Ce module fournit le trait `StreamServerExt` qui enregistre les routes
//! de la radio sur un [`dropserver::Server`].

use crate::service::StreamService;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use dropplaylist::Progress;
use dropserver::Server;
use tokio::sync::watch;

/// Handler de `GET /progress`
///
/// Retourne la dernière progression publiée, ou `503` tant que l'encodeur
/// n'en a produit aucune.
async fn progress_handler(
    State(status): State<watch::Receiver<Option<Progress>>>,
) -> impl IntoResponse {
    let latest = status.borrow().clone();
    match latest {
        Some(progress) => Json(progress).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": "Stream progress not available yet" })),
        )
            .into_response(),
    }
}

/// Trait d'extension pour ajouter la radio à dropserver
pub trait StreamServerExt {
    /// Enregistre les routes du flux
    ///
    /// # Routes enregistrées
    ///
    /// - `GET /progress` - Position courante du flux dans la playlist
    /// - `GET /stream/...` - Fichiers HLS du répertoire de sortie
    ///
    /// # Exemple
    ///
    /// ```rust,ignore
    /// use dropserver::Server;
    /// use dropstream::{StreamServerExt, StreamService};
    ///
    /// let mut server = Server::new_configured();
    /// server.init_stream(&service).await;
    /// server.start().await?;
    /// ```
    async fn init_stream(&mut self, service: &StreamService);
}

impl StreamServerExt for Server {
    async fn init_stream(&mut self, service: &StreamService) {
        self.add_handler_with_state("/progress", progress_handler, service.subscribe())
            .await;
        self.add_dir("/stream", service.output_directory()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{run_progress_pipeline, StreamSettings};
    use crate::start::StartInstant;
    use axum::body::Body;
    use axum::http::Request;
    use dropffmpeg::HlsStreamProgress;
    use dropplaylist::{DurationProbe, ProgressProjector};
    use std::path::Path;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    struct FixedProbe;

    impl DurationProbe for FixedProbe {
        async fn duration_us(&self, _path: &Path) -> dropplaylist::Result<u64> {
            Ok(60_000_000)
        }
    }

    async fn get(router: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap_or_default())
    }

    #[tokio::test]
    async fn test_progress_route() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        std::fs::write(input.path().join("Morning Show.wav"), b"RIFF").unwrap();

        let service = StreamService::prepare(
            StreamSettings {
                input_directory: input.path().to_path_buf(),
                output_directory: output.path().to_path_buf(),
                file_extension: "wav".to_string(),
                start: StartInstant::default(),
                progress_interval: Duration::ZERO,
                segment_duration: 1,
                segment_count: 50,
            },
            &FixedProbe,
        )
        .await
        .unwrap();

        let mut server = Server::new("Test", "localhost", 0);
        server.init_stream(&service).await;
        let router = server.router().await;

        let (status, _) = get(router.clone(), "/progress").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        // Deux minutes et demie dans la boucle d'une minute
        let (tx, rx) = mpsc::channel(1);
        tx.send(HlsStreamProgress {
            out_time_us: "150000000".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
        drop(tx);
        let projector = ProgressProjector::new(service.playlist().clone(), 0);
        run_progress_pipeline(rx, projector, Duration::ZERO, service.status_sender().clone())
            .await
            .unwrap();

        let (status, body) = get(router.clone(), "/progress").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["index"], 0);
        assert_eq!(body["loop"], 2);
        assert_eq!(body["entryOffset"], 30_000_000);
        assert_eq!(body["playlistOffset"], 30_000_000);
        assert_eq!(body["playlist"]["entries"][0]["title"], "Morning Show");
        assert_eq!(body["playlist"]["duration"], 60_000_000);

        let (status, _) = get(router, "/stream/meta-playlist.txt").await;
        assert_eq!(status, StatusCode::OK);
    }
}
