//! # Record Dispatcher
//!
//! Instrada ogni record al suo handler e lo schedula sul record pool.
//!
//! ## Flusso di `dispatch`:
//! 1. Dedup per `(file, record id)`: un record già visto viene contato come `skipped`
//! 2. Lookup del handler per tag di tipo; tipi senza handler vengono solo contati
//! 3. +1 al totale della progress bar, poi sottomissione al record pool
//!
//! I record AssetBundle non producono file: il loro handler rientra in
//! `dispatch` per ogni entry del manifest, ed è l'unica fonte di lavoro
//! scoperto dopo la scansione dei file.
//!
//! ## Isolamento errori:
//! Ogni task cattura errori e panic del proprio handler, li logga, li conta
//! sotto `error` e fa sempre avanzare la progress bar.

use crate::bundle::{ContainerManifest, Payload, RecordHandle, RecordKey, RecordType};
use crate::error::ExtractError;
use crate::exporter::ExportOutcome;
use crate::extractor::ExtractionContext;
use crate::hierarchy::{MergeOutcome, SceneNode};
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Handler registrati per tag di tipo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    Text,
    Image,
    Audio,
    Container,
    GameObject,
}

impl HandlerKind {
    /// Tipo di payload atteso dal handler
    fn expected_payload(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Container => "container",
            Self::GameObject => "game object",
        }
    }
}

/// Esito di una chiamata a `dispatch`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Scheduled(HandlerKind),
    Duplicate,
    Unhandled,
}

pub struct Dispatcher {
    context: Arc<ExtractionContext>,
    handlers: HashMap<RecordType, HandlerKind>,
}

impl Dispatcher {
    pub fn new(context: Arc<ExtractionContext>) -> Arc<Self> {
        let handlers = HashMap::from([
            (RecordType::TextAsset, HandlerKind::Text),
            (RecordType::Texture2D, HandlerKind::Image),
            (RecordType::Sprite, HandlerKind::Image),
            (RecordType::AudioClip, HandlerKind::Audio),
            (RecordType::AssetBundle, HandlerKind::Container),
            (RecordType::GameObject, HandlerKind::GameObject),
        ]);
        Arc::new(Self { context, handlers })
    }

    pub fn context(&self) -> &Arc<ExtractionContext> {
        &self.context
    }

    pub fn handler_for(&self, record_type: &RecordType) -> Option<HandlerKind> {
        self.handlers.get(record_type).copied()
    }

    /// Instrada un record. Non blocca: il lavoro vero gira sul record pool.
    pub fn dispatch(self: &Arc<Self>, record: RecordHandle, source: &Arc<Path>, out_dir: &Arc<Path>) -> DispatchOutcome {
        let progress = &self.context.progress;
        let key = RecordKey::new(source.clone(), record.record_id());
        if !self.context.mark_processed(key) {
            debug!("Record {} of {} already processed", record.record_id(), source.display());
            progress.count("skipped");
            return DispatchOutcome::Duplicate;
        }

        let record_type = record.record_type();
        let Some(kind) = self.handler_for(&record_type) else {
            progress.count(record_type.name());
            return DispatchOutcome::Unhandled;
        };

        progress.add_discovered();
        let dispatcher = self.clone();
        let source = source.clone();
        let out_dir = out_dir.clone();
        self.context.record_pool.spawn(async move {
            dispatcher.run_handler(kind, record, source, out_dir).await;
        });
        DispatchOutcome::Scheduled(kind)
    }

    /// Corpo del task del record pool
    async fn run_handler(self: Arc<Self>, kind: HandlerKind, record: RecordHandle, source: Arc<Path>, out_dir: Arc<Path>) {
        let progress = &self.context.progress;
        let record_id = record.record_id();
        let record_type = record.record_type();

        let result = AssertUnwindSafe(self.handle(kind, record, &source, &out_dir))
            .catch_unwind()
            .await;

        let message = match result {
            Ok(Ok(category)) => {
                if let Some(category) = category {
                    progress.count(category);
                }
                format!("[OK] {} {}", record_type, record_id)
            }
            Ok(Err(e)) => {
                error!("Failed to process {} {} from {}: {}", record_type, record_id, source.display(), e);
                progress.count("error");
                format!("[ERROR] {} {}", record_type, record_id)
            }
            Err(panic) => {
                error!(
                    "Handler panicked on {} {} from {}: {}",
                    record_type,
                    record_id,
                    source.display(),
                    panic_message(panic.as_ref())
                );
                progress.count("error");
                format!("[ERROR] {} {}", record_type, record_id)
            }
        };
        progress.advance(&message);
    }

    /// Esegue il handler; restituisce la categoria da contare, se c'è
    async fn handle(
        self: &Arc<Self>,
        kind: HandlerKind,
        record: RecordHandle,
        source: &Arc<Path>,
        out_dir: &Arc<Path>,
    ) -> Result<Option<&'static str>, ExtractError> {
        let record_id = record.record_id();
        let payload = tokio::task::spawn_blocking(move || record.read())
            .await
            .map_err(std::io::Error::other)??;
        let exporter = &self.context.exporter;

        let outcome = match (kind, payload) {
            (HandlerKind::Text, Payload::Text(asset)) => exporter.export_text(asset, record_id, out_dir).await?,
            (HandlerKind::Image, Payload::Image(asset)) => exporter.export_image(asset, record_id, out_dir).await?,
            (HandlerKind::Audio, Payload::Audio(clip)) => exporter.export_audio(clip, record_id, out_dir).await?,
            (HandlerKind::Container, Payload::Container(manifest)) => {
                self.expand_container(manifest, source, out_dir);
                return Ok(None);
            }
            (HandlerKind::GameObject, Payload::GameObject(game_object)) => {
                let node = SceneNode::from_game_object(record_id, game_object);
                return match self.context.merger.merge(out_dir, node).await? {
                    MergeOutcome::Inserted { .. } => Ok(Some("gameobject")),
                    MergeOutcome::Duplicate => Ok(Some("skipped")),
                };
            }
            (kind, payload) => {
                return Err(ExtractError::UnexpectedPayload {
                    expected: kind.expected_payload(),
                    found: payload.kind(),
                })
            }
        };

        Ok(match outcome {
            ExportOutcome::Exported(category) => Some(category),
            ExportOutcome::Skipped => Some("skipped"),
            ExportOutcome::MissingPayload | ExportOutcome::NothingToExport => None,
        })
    }

    /// Rientra in `dispatch` per ogni entry risolta del manifest
    fn expand_container(self: &Arc<Self>, manifest: ContainerManifest, source: &Arc<Path>, out_dir: &Arc<Path>) {
        debug!(
            "Expanding container {} with {} entries",
            manifest.name.as_deref().unwrap_or("unknown"),
            manifest.entries.len()
        );
        for entry in manifest.entries {
            match entry.asset {
                Some(asset) => {
                    self.dispatch(asset, source, out_dir);
                }
                None => warn!("Container entry without a readable asset: {}", entry.name),
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
