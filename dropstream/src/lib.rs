//! # dropstream - Le service de radio HLS
//!
//! Relie les briques de DropRadio :
//!
//! 1. lecture du répertoire audio en [`Playlist`](dropplaylist::Playlist)
//! 2. écriture des fichiers ffconcat au point du direct
//! 3. lancement de l'encodeur ffmpeg en boucle infinie
//! 4. projection de ses rapports en [`Progress`](dropplaylist::Progress),
//!    publiés sur un canal `watch` et exposés par `GET /progress`
//!
//! La configuration vient de la section `stream` de dropconfig
//! ([`StreamConfigExt`]) et les routes HTTP sont ajoutées au serveur par
//! [`StreamServerExt`].

mod cleanup;
mod config_ext;
mod error;
mod server_ext;
mod service;
mod start;

pub use cleanup::cleanup_stream_files;
pub use config_ext::StreamConfigExt;
pub use error::{Error, Result};
pub use server_ext::StreamServerExt;
pub use service::{
    rewrite_delay, run_progress_pipeline, RunningStream, StreamService, StreamSettings, Throttle,
    META_PLAYLIST_FILE_NAME, PLAYLIST_FILE_NAME,
};
pub use start::StartInstant;
