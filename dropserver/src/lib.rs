//! # dropserver - Serveur web de DropRadio basé sur Axum
//!
//! Cette crate fournit le serveur HTTP de la radio et son système de logs.
//!
//! ## Architecture
//!
//! - [`server`] : le serveur principal, ses routes et son arrêt gracieux
//! - [`logs`] : buffer de logs en mémoire, diffusé en JSON et en SSE
//!
//! Les autres crates enregistrent leurs routes via des traits d'extension
//! implémentés sur [`Server`] (voir `dropstream::StreamServerExt`).
//!
//! ## Exemple d'utilisation
//!
//! ```rust,no_run
//! use dropserver::{Server, logs::LoggingOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut server = Server::new("MyRadio", "localhost", 8080);
//!     server.init_logging(LoggingOptions::default()).await;
//!
//!     server.add_route("/api/status", || async {
//!         serde_json::json!({"status": "ok"})
//!     }).await;
//!
//!     server.start().await?;
//!     server.wait().await;
//!     Ok(())
//! }
//! ```

pub mod logs;
pub mod server;

pub use logs::{log_dump, log_sse, LogState, LoggingOptions, SseLayer};
pub use server::{Server, ServerHandle, ServerInfo};
