//! In-memory bundle doubles for tests.

use super::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

type PayloadFn = Box<dyn Fn() -> Result<Payload, ExtractError> + Send + Sync>;

/// Record whose payload comes from a closure; counts how often it is read
pub(crate) struct MemoryRecord {
    id: i64,
    record_type: RecordType,
    payload: PayloadFn,
    reads: AtomicUsize,
}

impl MemoryRecord {
    pub fn new<F>(id: i64, record_type: RecordType, payload: F) -> Arc<Self>
    where
        F: Fn() -> Result<Payload, ExtractError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            id,
            record_type,
            payload: Box::new(payload),
            reads: AtomicUsize::new(0),
        })
    }

    pub fn text(id: i64, name: &str, text: &str) -> Arc<Self> {
        let name = name.to_string();
        let script = text.as_bytes().to_vec();
        Self::new(id, RecordType::TextAsset, move || {
            Ok(Payload::Text(TextAsset {
                name: Some(name.clone()),
                script: script.clone(),
            }))
        })
    }

    pub fn game_object(id: i64, name: &str, parent: Option<i64>) -> Arc<Self> {
        let name = name.to_string();
        Self::new(id, RecordType::GameObject, move || {
            Ok(Payload::GameObject(GameObjectRecord {
                name: Some(name.clone()),
                is_active: Some(true),
                transform: Some(TransformRecord {
                    parent_object_id: parent,
                    ..Default::default()
                }),
                renderer: None,
            }))
        })
    }

    pub fn container(id: i64, entries: Vec<(&str, Option<RecordHandle>)>) -> Arc<Self> {
        let entries: Vec<(String, Option<RecordHandle>)> = entries
            .into_iter()
            .map(|(name, asset)| (name.to_string(), asset))
            .collect();
        Self::new(id, RecordType::AssetBundle, move || {
            Ok(Payload::Container(ContainerManifest {
                name: Some("bundle".to_string()),
                entries: entries
                    .iter()
                    .map(|(name, asset)| ContainerEntry {
                        name: name.clone(),
                        asset: asset.clone(),
                    })
                    .collect(),
            }))
        })
    }

    pub fn failing(id: i64, record_type: RecordType) -> Arc<Self> {
        Self::new(id, record_type, || Err(ExtractError::Payload("corrupt record".to_string())))
    }

    pub fn panicking(id: i64, record_type: RecordType) -> Arc<Self> {
        Self::new(id, record_type, || panic!("decoder blew up"))
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl RecordReader for MemoryRecord {
    fn record_id(&self) -> i64 {
        self.id
    }

    fn record_type(&self) -> RecordType {
        self.record_type.clone()
    }

    fn read(&self) -> Result<Payload, ExtractError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        (self.payload)()
    }
}

pub(crate) struct MemoryBundle {
    records: Vec<RecordHandle>,
}

impl Bundle for MemoryBundle {
    fn records(&self) -> Vec<RecordHandle> {
        self.records.clone()
    }
}

/// Loader keyed by file name; unknown files fail to load
#[derive(Default)]
pub(crate) struct MemoryLoader {
    bundles: HashMap<String, Arc<MemoryBundle>>,
}

impl MemoryLoader {
    pub fn with_bundle(mut self, file_name: &str, records: Vec<Arc<MemoryRecord>>) -> Self {
        let records = records.into_iter().map(|record| record as RecordHandle).collect();
        self.bundles
            .insert(file_name.to_string(), Arc::new(MemoryBundle { records }));
        self
    }
}

impl BundleLoader for MemoryLoader {
    fn load(&self, path: &Path) -> Result<Arc<dyn Bundle>, ExtractError> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        match self.bundles.get(&file_name) {
            Some(bundle) => {
                let bundle: Arc<dyn Bundle> = bundle.clone();
                Ok(bundle)
            }
            None => Err(ExtractError::Load {
                path: path.display().to_string(),
                reason: "not a bundle".to_string(),
            }),
        }
    }
}
