//! # JSON Dump Loader
//!
//! Loader per bundle che un decoder esterno ha già serializzato in JSON.
//! I media restano file accanto al dump e vengono letti solo in `read()`.
//!
//! ## Formato:
//! ```json
//! {
//!   "records": [
//!     { "id": 1, "type": "TextAsset", "name": "story.txt", "text": "..." },
//!     { "id": 2, "type": "Texture2D", "name": "bg", "image": "media/bg.png" },
//!     { "id": 3, "type": "AudioClip", "name": "bgm", "samples": "media/bgm.wav" },
//!     { "id": 4, "type": "AssetBundle", "name": "ui", "container": [["assets/bg.png", 2]] },
//!     { "id": 5, "type": "GameObject", "name": "Root", "active": true,
//!       "transform": { "local_position": { "x": 0.0, "y": 1.0, "z": 0.0 }, "parent_object_id": null } }
//!   ]
//! }
//! ```
//!
//! `samples` può anche essere una mappa nome → path; `script_file` sostituisce
//! `text` per contenuti binari (es. container `.acb`).

use super::*;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct DumpFile {
    records: Vec<DumpRecord>,
}

#[derive(Debug, Clone, Deserialize)]
struct DumpRecord {
    id: i64,
    #[serde(rename = "type")]
    type_tag: String,
    name: Option<String>,
    text: Option<String>,
    script_file: Option<PathBuf>,
    image: Option<PathBuf>,
    samples: Option<DumpSamples>,
    container: Option<Vec<(String, i64)>>,
    active: Option<bool>,
    transform: Option<TransformRecord>,
    renderer: Option<SpriteRendererRecord>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum DumpSamples {
    Single(PathBuf),
    Multi(BTreeMap<String, PathBuf>),
}

/// Contenuto condiviso di un dump caricato
struct DumpState {
    base_dir: PathBuf,
    order: Vec<i64>,
    records: HashMap<i64, DumpRecord>,
}

/// Bundle loader for pre-decoded JSON dumps
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonDumpLoader;

impl JsonDumpLoader {
    pub fn new() -> Self {
        Self
    }
}

impl BundleLoader for JsonDumpLoader {
    fn load(&self, path: &Path) -> Result<Arc<dyn Bundle>, ExtractError> {
        let load_error = |reason: String| ExtractError::Load {
            path: path.display().to_string(),
            reason,
        };

        let content = std::fs::read(path).map_err(|e| load_error(e.to_string()))?;
        let dump: DumpFile =
            serde_json::from_slice(&content).map_err(|e| load_error(format!("not a bundle dump: {}", e)))?;

        let mut order = Vec::with_capacity(dump.records.len());
        let mut records = HashMap::with_capacity(dump.records.len());
        for record in dump.records {
            if records.contains_key(&record.id) {
                debug!("Duplicate record id {} in {}, keeping the first", record.id, path.display());
                continue;
            }
            order.push(record.id);
            records.insert(record.id, record);
        }

        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(Arc::new(DumpBundle {
            state: Arc::new(DumpState {
                base_dir,
                order,
                records,
            }),
        }))
    }
}

struct DumpBundle {
    state: Arc<DumpState>,
}

impl Bundle for DumpBundle {
    fn records(&self) -> Vec<RecordHandle> {
        self.state
            .order
            .iter()
            .map(|&id| {
                let handle: RecordHandle = Arc::new(DumpRecordReader {
                    state: self.state.clone(),
                    id,
                });
                handle
            })
            .collect()
    }
}

struct DumpRecordReader {
    state: Arc<DumpState>,
    id: i64,
}

impl DumpRecordReader {
    fn record(&self) -> &DumpRecord {
        // gli id vengono solo da `order` o da `resolve`, che controllano la mappa
        &self.state.records[&self.id]
    }

    fn resolve(&self, id: i64) -> Option<RecordHandle> {
        if !self.state.records.contains_key(&id) {
            return None;
        }
        let handle: RecordHandle = Arc::new(DumpRecordReader {
            state: self.state.clone(),
            id,
        });
        Some(handle)
    }

    fn read_media(&self, relative: &Path) -> Result<Vec<u8>, ExtractError> {
        Ok(std::fs::read(self.state.base_dir.join(relative))?)
    }
}

impl RecordReader for DumpRecordReader {
    fn record_id(&self) -> i64 {
        self.id
    }

    fn record_type(&self) -> RecordType {
        RecordType::from_tag(&self.record().type_tag)
    }

    fn read(&self) -> Result<Payload, ExtractError> {
        let record = self.record();
        let name = record.name.clone();

        match self.record_type() {
            RecordType::TextAsset => {
                let script = match (&record.text, &record.script_file) {
                    (_, Some(file)) => self.read_media(file)?,
                    (Some(text), None) => text.as_bytes().to_vec(),
                    (None, None) => Vec::new(),
                };
                Ok(Payload::Text(TextAsset { name, script }))
            }
            RecordType::Texture2D | RecordType::Sprite => {
                let relative = record.image.as_ref().ok_or_else(|| {
                    ExtractError::Payload(format!("record {} has no image", self.id))
                })?;
                let image = image::open(self.state.base_dir.join(relative))?;
                Ok(Payload::Image(ImageAsset { name, image }))
            }
            RecordType::AudioClip => {
                let samples = match &record.samples {
                    None => None,
                    Some(DumpSamples::Single(file)) => Some(AudioSamples::Single(self.read_media(file)?)),
                    Some(DumpSamples::Multi(files)) => {
                        let mut buffers = BTreeMap::new();
                        for (entry, file) in files {
                            buffers.insert(entry.clone(), self.read_media(file)?);
                        }
                        Some(AudioSamples::Multi(buffers))
                    }
                };
                Ok(Payload::Audio(AudioClip { name, samples }))
            }
            RecordType::AssetBundle => {
                let entries = record
                    .container
                    .iter()
                    .flatten()
                    .map(|(entry_name, id)| ContainerEntry {
                        name: entry_name.clone(),
                        asset: self.resolve(*id),
                    })
                    .collect();
                Ok(Payload::Container(ContainerManifest { name, entries }))
            }
            RecordType::GameObject => Ok(Payload::GameObject(GameObjectRecord {
                name,
                is_active: record.active,
                transform: record.transform.clone(),
                renderer: record.renderer.clone(),
            })),
            RecordType::Other(tag) => Err(ExtractError::Payload(format!(
                "no payload decoder for type {}",
                tag
            ))),
        }
    }
}
