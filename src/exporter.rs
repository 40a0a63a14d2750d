//! # Exporter Module
//!
//! Writer finali per tipo di record: testo, immagini, audio.
//!
//! ## Responsabilità:
//! - Calcolo del path di output (nome sanitizzato o `unnamed_<id>`)
//! - Skip se il file di destinazione esiste già (rerun idempotenti)
//! - Encoding completo in memoria, poi una sola scrittura atomica su disco:
//!   un output presente è sempre completo, quindi lo skip è sicuro ai rerun
//!
//! ## Output:
//! - TextAsset → `<nome>.txt` (UTF-8, sequenze invalide sostituite)
//! - TextAsset `*.acb` → `<nome>.wav` tramite `AudioDecoder`
//! - Texture2D / Sprite → `<nome>.webp` lossless
//! - AudioClip → `<nome>.wav` oppure `<nome>/<entry>.wav`
//!
//! Gli errori risalgono al task del record, che li logga e li conta.

use crate::bundle::{AudioClip, AudioSamples, ImageAsset, TextAsset};
use crate::codec::{self, AudioDecoder};
use crate::error::ExtractError;
use crate::extractor::PathResolver;
use crate::file_manager::FileManager;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Estensione dei container audio impacchettati nei TextAsset
const PACKED_AUDIO_SUFFIX: &str = ".acb";

/// Risultato di un export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    /// File scritto; categoria del contatore
    Exported(&'static str),
    /// Destinazione già presente
    Skipped,
    /// Il record non ha dati da esportare
    MissingPayload,
    /// Il decoder non ha trovato nulla da esportare
    NothingToExport,
}

/// Per-type writers sharing the injected codec collaborators
#[derive(Clone)]
pub struct Exporter {
    audio_decoder: Arc<dyn AudioDecoder>,
}

impl Exporter {
    pub fn new(audio_decoder: Arc<dyn AudioDecoder>) -> Self {
        Self { audio_decoder }
    }

    /// TextAsset: testo oppure audio impacchettato
    pub async fn export_text(&self, asset: TextAsset, record_id: i64, out_dir: &Path) -> Result<ExportOutcome, ExtractError> {
        let base = PathResolver::resource_path(out_dir, asset.name.as_deref(), record_id);

        if is_packed_audio(&base) {
            let target = base.with_extension("wav");
            if skip_existing(&target) {
                return Ok(ExportOutcome::Skipped);
            }

            let decoder = self.audio_decoder.clone();
            let script = asset.script;
            let wav = tokio::task::spawn_blocking(move || -> Result<Option<Vec<u8>>, ExtractError> {
                match decoder.decode(&script)? {
                    Some(pcm) => Ok(Some(pcm.to_wav_bytes()?)),
                    None => Ok(None),
                }
            })
            .await
            .map_err(std::io::Error::other)??;

            return match wav {
                Some(bytes) => {
                    write_output(target, bytes).await?;
                    Ok(ExportOutcome::Exported("audio"))
                }
                None => {
                    debug!("No waveform in packed audio {}", base.display());
                    Ok(ExportOutcome::NothingToExport)
                }
            };
        }

        let target = base.with_extension("txt");
        if skip_existing(&target) {
            return Ok(ExportOutcome::Skipped);
        }
        let text = String::from_utf8_lossy(&asset.script).into_owned();
        write_output(target, text.into_bytes()).await?;
        Ok(ExportOutcome::Exported("text"))
    }

    /// Texture2D / Sprite: WebP lossless
    pub async fn export_image(&self, asset: ImageAsset, record_id: i64, out_dir: &Path) -> Result<ExportOutcome, ExtractError> {
        let target = PathResolver::resource_path(out_dir, asset.name.as_deref(), record_id).with_extension("webp");
        if skip_existing(&target) {
            return Ok(ExportOutcome::Skipped);
        }

        let image = asset.image;
        let bytes = tokio::task::spawn_blocking(move || codec::encode_webp_lossless(&image))
            .await
            .map_err(std::io::Error::other)??;
        write_output(target, bytes).await?;
        Ok(ExportOutcome::Exported("image"))
    }

    /// AudioClip: un buffer o una mappa nome → buffer
    pub async fn export_audio(&self, clip: AudioClip, record_id: i64, out_dir: &Path) -> Result<ExportOutcome, ExtractError> {
        let base = PathResolver::resource_path(out_dir, clip.name.as_deref(), record_id);

        let Some(samples) = clip.samples else {
            warn!("AudioClip without audio data: {}", base.display());
            return Ok(ExportOutcome::MissingPayload);
        };

        match samples {
            AudioSamples::Single(bytes) => {
                let target = base.with_extension("wav");
                if skip_existing(&target) {
                    return Ok(ExportOutcome::Skipped);
                }
                write_output(target, bytes).await?;
            }
            AudioSamples::Multi(entries) => {
                if skip_existing(&base) {
                    return Ok(ExportOutcome::Skipped);
                }
                write_output_dir(base, entry_files(entries)).await?;
            }
        }
        Ok(ExportOutcome::Exported("audio"))
    }
}

fn is_packed_audio(base: &Path) -> bool {
    base.file_name()
        .map(|name| name.to_string_lossy().ends_with(PACKED_AUDIO_SUFFIX))
        .unwrap_or(false)
}

fn skip_existing(target: &Path) -> bool {
    if target.exists() {
        debug!("[SKIP] Already exists: {}", target.display());
        return true;
    }
    false
}

/// Nomi dei file di una mappa di buffer audio: `<entry>.wav`, oppure
/// `unnamed_<posizione>` per nomi non utilizzabili
fn entry_files(entries: BTreeMap<String, Vec<u8>>) -> Vec<(String, Vec<u8>)> {
    entries
        .into_iter()
        .enumerate()
        .map(|(index, (entry, bytes))| {
            let name = PathResolver::safe_name(&entry).unwrap_or_else(|| format!("unnamed_{}", index));
            let file = Path::new(&name).with_extension("wav");
            (file.to_string_lossy().into_owned(), bytes)
        })
        .collect()
}

async fn write_output(target: PathBuf, bytes: Vec<u8>) -> Result<(), ExtractError> {
    let path = target.clone();
    tokio::task::spawn_blocking(move || FileManager::write_atomic(&path, &bytes))
        .await
        .map_err(std::io::Error::other)??;
    debug!("Exported {}", target.display());
    Ok(())
}

/// La cartella `target` compare solo quando tutte le entry sono scritte
async fn write_output_dir(target: PathBuf, files: Vec<(String, Vec<u8>)>) -> Result<(), ExtractError> {
    let path = target.clone();
    tokio::task::spawn_blocking(move || FileManager::write_atomic_dir(&path, files))
        .await
        .map_err(std::io::Error::other)??;
    debug!("Exported {}", target.display());
    Ok(())
}
