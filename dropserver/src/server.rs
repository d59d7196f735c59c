//! # Module Server - API de haut niveau pour Axum
//!
//! Ce module fournit une abstraction simple pour créer le serveur HTTP de
//! DropRadio avec Axum, en cachant la configuration et le routage.
//!
//! ## Fonctionnalités
//!
//! - 🚀 **Routes JSON simples** : Ajoutez des endpoints API avec `add_route()`
//! - 📁 **Fichiers statiques** : Servez un répertoire avec `add_dir()`
//! - 🎯 **Handlers personnalisés** : Support SSE, état partagé, etc. avec `add_handler_with_state()`
//! - ⚡ **Gestion gracieuse** : Arrêt propre sur Ctrl+C ou via un [`ServerHandle`]

use crate::logs::{init_logging, log_dump, log_sse, LoggingOptions};
use anyhow::{Context, Result};
use axum::handler::Handler;
use axum::routing::get;
use axum::{Json, Router};
use dropconfig::get_config;
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::{
    signal,
    sync::{Notify, RwLock},
    task::JoinHandle,
};
use tower_http::services::ServeDir;
use tracing::{error, info};

/// Info serveur sérialisable
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub base_url: String,
    pub http_port: u16,
}

/// Permet d'arrêter le serveur depuis une autre tâche
#[derive(Clone, Default)]
pub struct ServerHandle {
    stop: Arc<Notify>,
}

impl ServerHandle {
    /// Demande l'arrêt gracieux du serveur
    pub fn shutdown(&self) {
        self.stop.notify_one();
    }
}

/// Serveur principal
pub struct Server {
    name: String,
    base_url: String,
    http_port: u16,
    router: Arc<RwLock<Router>>,
    handle: ServerHandle,
    join_handle: Option<JoinHandle<()>>,
}

impl Server {
    /// Crée une nouvelle instance de serveur
    ///
    /// # Arguments
    ///
    /// * `name` - Nom du serveur (pour les logs)
    /// * `base_url` - Hôte annoncé (ex: "localhost")
    /// * `http_port` - Port HTTP à écouter
    ///
    /// # Exemple
    ///
    /// ```rust
    /// # use dropserver::Server;
    /// let server = Server::new("MyRadio", "localhost", 3000);
    /// assert_eq!(server.info().http_port, 3000);
    /// ```
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, http_port: u16) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            http_port,
            router: Arc::new(RwLock::new(Router::new())),
            handle: ServerHandle::default(),
            join_handle: None,
        }
    }

    /// Crée un serveur à partir de `host.base_url` et `host.http_port`
    pub fn new_configured() -> Self {
        let config = get_config();
        let url = config.get_base_url();
        let port = config.get_http_port();
        Self::new("DropRadio", url, port)
    }

    /// Ajoute une route JSON dynamique
    ///
    /// La closure fournie est appelée à chaque requête GET sur le chemin.
    ///
    /// # Exemple
    ///
    /// ```rust,no_run
    /// # use dropserver::Server;
    /// # #[tokio::main]
    /// # async fn main() {
    /// # let mut server = Server::new("Test", "localhost", 3000);
    /// server.add_route("/api/status", || async {
    ///     serde_json::json!({"status": "online"})
    /// }).await;
    /// # }
    /// ```
    pub async fn add_route<F, Fut, T>(&mut self, path: &str, f: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Serialize + Send + 'static,
    {
        let f = Arc::new(f);
        let handler = move || {
            let f = f.clone();
            async move { Json(f().await) }
        };

        self.mount(path, Router::new().route("/", get(handler)))
            .await;
    }

    /// Ajoute un handler avec état
    pub async fn add_handler_with_state<H, T, S>(&mut self, path: &str, handler: H, state: S)
    where
        H: Handler<T, S> + Clone + 'static,
        T: 'static,
        S: Clone + Send + Sync + 'static,
    {
        let route = Router::new().route("/", get(handler)).with_state(state);
        self.mount(path, route).await;
    }

    /// Sert le contenu d'un répertoire du disque sous `path`
    ///
    /// Les fichiers sont relus à chaque requête, ce qui convient aux
    /// playlists HLS réécrites en continu.
    pub async fn add_dir(&mut self, path: &str, directory: impl AsRef<Path>) {
        let serve = ServeDir::new(directory.as_ref());
        let mut r = self.router.write().await;
        *r = if path == "/" {
            std::mem::take(&mut *r).fallback_service(serve)
        } else {
            std::mem::take(&mut *r).nest_service(path, serve)
        };
    }

    async fn mount(&mut self, path: &str, route: Router) {
        let mut r = self.router.write().await;
        *r = if path == "/" {
            std::mem::take(&mut *r).merge(route)
        } else {
            std::mem::take(&mut *r).nest(path, route)
        };
    }

    /// Router construit jusqu'ici
    pub async fn router(&self) -> Router {
        self.router.read().await.clone()
    }

    /// Handle permettant d'arrêter le serveur depuis une autre tâche
    pub fn handle(&self) -> ServerHandle {
        self.handle.clone()
    }

    /// Démarre le serveur HTTP
    ///
    /// Lance le serveur sur le port configuré. Le serveur s'arrête sur
    /// Ctrl+C ou sur [`ServerHandle::shutdown`].
    ///
    /// # Exemple
    ///
    /// ```rust,no_run
    /// # use dropserver::Server;
    /// # #[tokio::main]
    /// # async fn main() -> anyhow::Result<()> {
    /// # let mut server = Server::new("Test", "localhost", 3000);
    /// server.start().await?;
    /// server.wait().await;  // Attend Ctrl+C
    /// # Ok(())
    /// # }
    /// ```
    pub async fn start(&mut self) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.http_port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Cannot listen on {}", addr))?;

        info!(
            "📻 Server {} running at http://{}:{}",
            self.name, self.base_url, self.http_port
        );

        let router = self.router().await;
        let stop = self.handle.stop.clone();
        let shutdown = async move {
            tokio::select! {
                result = signal::ctrl_c() => match result {
                    Ok(()) => info!("Ctrl+C reçu, arrêt gracieux"),
                    Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
                },
                _ = stop.notified() => info!("Arrêt du serveur demandé"),
            }
        };

        self.join_handle = Some(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router.into_make_service())
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!("HTTP server error: {}", e);
            }
        }));

        Ok(())
    }

    /// Attend la fin du serveur
    pub async fn wait(&mut self) {
        if let Some(h) = self.join_handle.take() {
            let _ = h.await;
        }
    }

    /// Récupère les infos du serveur
    pub fn info(&self) -> ServerInfo {
        ServerInfo {
            name: self.name.clone(),
            base_url: self.base_url.clone(),
            http_port: self.http_port,
        }
    }

    /// Initialise le système de logging et enregistre les routes de logs
    ///
    /// Configure le système de tracing avec le buffer SSE et
    /// optionnellement la console, puis enregistre les routes `/log-sse`
    /// et `/log-dump`.
    ///
    /// # Exemple
    ///
    /// ```rust,no_run
    /// # use dropserver::{Server, logs::LoggingOptions};
    /// # #[tokio::main]
    /// # async fn main() {
    /// let mut server = Server::new_configured();
    /// server.init_logging(LoggingOptions::default()).await;
    /// # }
    /// ```
    pub async fn init_logging(&mut self, options: LoggingOptions) {
        let log_state = init_logging(options);

        self.add_handler_with_state("/log-sse", log_sse, log_state.clone())
            .await;
        self.add_handler_with_state("/log-dump", log_dump, log_state)
            .await;
    }
}
