//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'estrattore.
//!
//! ## Responsabilità:
//! - Definisce `ExtractError` enum per categorizzare gli errori dei collaboratori
//!   (loader dei bundle, codec audio, encoder immagini) e degli exporter
//! - Fornisce messaggi di errore descrittivi e strutturati
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `Io`: Errori di I/O (file non trovati, permessi, etc.)
//! - `Image`: Errori di encoding immagini
//! - `Wav`: Errori di scrittura WAV
//! - `Json`: Errori di (de)serializzazione di dump e GameObject.json
//! - `Load`: Bundle non leggibile o non riconosciuto (LoadFailure)
//! - `Payload`: Payload di un record non decodificabile
//! - `UnexpectedPayload`: Il record ha un tag ma un payload di altro tipo
//! - `Codec`: Errore del codec audio esterno
//! - `Hierarchy`: `GameObject.json` esistente illeggibile, merge rifiutati
//! - `Validation`: Errori di validazione input
//!
//! Gli errori per singolo record non escono mai dal task del record pool:
//! vengono loggati e contati (vedi `extractor::dispatcher`).

/// Custom error types for asset extraction
#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("WAV encoding error: {0}")]
    Wav(#[from] hound::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to load bundle {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("Payload error: {0}")]
    Payload(String),

    #[error("Unexpected payload: expected {expected}, found {found}")]
    UnexpectedPayload { expected: &'static str, found: &'static str },

    #[error("Audio codec error: {0}")]
    Codec(String),

    #[error("Scene hierarchy {path} unavailable: {reason}")]
    Hierarchy { path: String, reason: String },

    #[error("Validation error: {0}")]
    Validation(String),
}
