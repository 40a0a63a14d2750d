//! # Hierarchy Merger
//!
//! Ricostruisce la gerarchia di scena di ogni cartella di output a partire
//! dai record GameObject, che arrivano sparsi tra file e worker diversi.
//!
//! ## Responsabilità:
//! - Un lock per cartella (canonicalizzata), creato alla prima richiesta
//! - Idratazione lazy dell'albero da `GameObject.json` esistente, una volta sola
//!   (anche quando fallisce: il file illeggibile non viene più riletto)
//! - Merge dei nodi con dedup e riparazione degli orfani (vedi `tree`)
//! - Flush unico a fine run, con scrittura atomica (temp file + rename)
//!
//! ## Lock:
//! La mappa cartella → lock ha un proprio mutex, tenuto solo per il lookup.
//! L'albero vive dentro il lock della sua cartella: non si può leggere o
//! modificare senza averlo acquisito.

pub mod node;
pub mod tree;

pub use node::{MaterialInfo, SceneNode, SpriteInfo, SpriteRendererInfo, TransformInfo};
pub use tree::{MergeOutcome, SceneTree};

use crate::error::ExtractError;
use crate::file_manager::FileManager;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info, warn};

/// Nome del file gerarchia in ogni cartella di output
pub const SCENE_FILE_NAME: &str = "GameObject.json";

/// Stato dell'albero di una cartella
enum TreeState {
    /// `GameObject.json` non ancora letto
    Unloaded,
    Loaded(SceneTree),
    /// Il file esistente non è leggibile: i merge falliscono senza rileggerlo
    /// e il file non viene mai sovrascritto
    Failed(String),
}

struct FolderTree {
    json_path: PathBuf,
    state: TreeState,
}

impl FolderTree {
    /// Albero pronto per il merge, idratato alla prima richiesta
    async fn loaded_tree(&mut self) -> Result<&mut SceneTree, ExtractError> {
        if let TreeState::Unloaded = self.state {
            match HierarchyMerger::hydrate(&self.json_path).await {
                Ok(tree) => self.state = TreeState::Loaded(tree),
                Err(e) => {
                    warn!("Scene hierarchy {} is unreadable: {}", self.json_path.display(), e);
                    self.state = TreeState::Failed(e.to_string());
                    return Err(e);
                }
            }
        }

        let reason = match &mut self.state {
            TreeState::Loaded(tree) => return Ok(tree),
            TreeState::Failed(reason) => reason.clone(),
            TreeState::Unloaded => "not loaded".to_string(),
        };
        Err(ExtractError::Hierarchy {
            path: self.json_path.display().to_string(),
            reason,
        })
    }
}

/// Per-folder scene trees shared by all record workers of a run
#[derive(Default)]
pub struct HierarchyMerger {
    folders: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<FolderTree>>>>,
}

impl HierarchyMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Numero di cartelle toccate finora
    pub fn folder_count(&self) -> usize {
        self.folders.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    async fn folder_lock(&self, folder: &Path) -> Arc<tokio::sync::Mutex<FolderTree>> {
        let key = tokio::fs::canonicalize(folder)
            .await
            .unwrap_or_else(|_| folder.to_path_buf());

        let mut folders = self.folders.lock().unwrap_or_else(PoisonError::into_inner);
        folders
            .entry(key)
            .or_insert_with_key(|key| {
                Arc::new(tokio::sync::Mutex::new(FolderTree {
                    json_path: key.join(SCENE_FILE_NAME),
                    state: TreeState::Unloaded,
                }))
            })
            .clone()
    }

    /// Legge l'albero persistito, o ne crea uno vuoto se il file non esiste
    async fn hydrate(json_path: &Path) -> Result<SceneTree, ExtractError> {
        match tokio::fs::read_to_string(json_path).await {
            Ok(content) => {
                let tree = SceneTree::from_json(&content)?;
                debug!("Loaded {} nodes from {}", tree.len(), json_path.display());
                Ok(tree)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SceneTree::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Merge di un nodo nell'albero della cartella
    pub async fn merge(&self, folder: &Path, node: SceneNode) -> Result<MergeOutcome, ExtractError> {
        let lock = self.folder_lock(folder).await;
        let mut guard = lock.lock().await;
        let folder_tree = &mut *guard;
        let tree = folder_tree.loaded_tree().await?;

        let id = node.id.clone();
        let outcome = tree.merge(node);
        debug!("GameObject {} merged into {}: {:?}", id, folder_tree.json_path.display(), outcome);
        Ok(outcome)
    }

    /// Copia dell'albero corrente di una cartella, se già idratato
    #[cfg(test)]
    pub(crate) async fn snapshot(&self, folder: &Path) -> Option<SceneTree> {
        let lock = self.folder_lock(folder).await;
        let guard = lock.lock().await;
        match &guard.state {
            TreeState::Loaded(tree) => Some(tree.clone()),
            _ => None,
        }
    }

    /// Scrive tutti gli alberi in memoria, una volta sola, e svuota la cache.
    /// Prova tutte le cartelle anche in caso di errore; restituisce il numero
    /// di file scritti oppure il primo errore incontrato.
    pub async fn flush_all(&self) -> Result<usize, ExtractError> {
        let mut folders: Vec<_> = {
            let mut map = self.folders.lock().unwrap_or_else(PoisonError::into_inner);
            map.drain().collect()
        };
        folders.sort_by(|a, b| a.0.cmp(&b.0));

        let mut written = 0;
        let mut first_error = None;
        for (_, lock) in folders {
            let folder_tree = lock.lock().await;
            let TreeState::Loaded(tree) = &folder_tree.state else {
                continue;
            };

            match Self::write_tree(&folder_tree.json_path, tree).await {
                Ok(()) => written += 1,
                Err(e) => {
                    error!("Failed to write {}: {}", folder_tree.json_path.display(), e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!("Wrote {} scene hierarchy files", written);
                Ok(written)
            }
        }
    }

    async fn write_tree(json_path: &Path, tree: &SceneTree) -> Result<(), ExtractError> {
        let content = tree.to_json_pretty()?;
        let path = json_path.to_path_buf();
        tokio::task::spawn_blocking(move || FileManager::write_atomic(&path, content.as_bytes()))
            .await
            .map_err(std::io::Error::other)??;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tempfile::TempDir;

    fn node(id: &str, name: &str, parent: Option<&str>) -> SceneNode {
        let node = SceneNode::new(id, name);
        match parent {
            Some(parent) => node.with_parent(parent),
            None => node,
        }
    }

    #[tokio::test]
    async fn test_nothing_written_before_flush() {
        let temp_dir = TempDir::new().unwrap();
        let merger = HierarchyMerger::new();

        merger.merge(temp_dir.path(), node("2", "Child", Some("1"))).await.unwrap();
        merger.merge(temp_dir.path(), node("1", "Root", None)).await.unwrap();
        assert!(!temp_dir.path().join(SCENE_FILE_NAME).exists());

        assert_eq!(merger.flush_all().await.unwrap(), 1);
        let content = std::fs::read_to_string(temp_dir.path().join(SCENE_FILE_NAME)).unwrap();
        let value: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["1"]["Children"]["2"]["Name"], "Child");
        assert_eq!(merger.folder_count(), 0);
    }

    #[tokio::test]
    async fn test_existing_file_is_hydrated_once() {
        let temp_dir = TempDir::new().unwrap();
        let merger = HierarchyMerger::new();
        merger.merge(temp_dir.path(), node("1", "Root", None)).await.unwrap();
        merger.flush_all().await.unwrap();

        let merger = HierarchyMerger::new();
        assert_eq!(
            merger.merge(temp_dir.path(), node("1", "RootRenamed", None)).await.unwrap(),
            MergeOutcome::Duplicate
        );
        merger.merge(temp_dir.path(), node("2", "Child", Some("1"))).await.unwrap();

        // il file su disco non viene riletto dopo la prima idratazione
        std::fs::write(temp_dir.path().join(SCENE_FILE_NAME), "{}").unwrap();
        merger.merge(temp_dir.path(), node("3", "Other", None)).await.unwrap();

        let tree = merger.snapshot(temp_dir.path()).await.unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.get("1").unwrap().name, "Root");
        assert_eq!(tree.children("1"), ["2"]);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_not_overwritten() {
        let temp_dir = TempDir::new().unwrap();
        let json_path = temp_dir.path().join(SCENE_FILE_NAME);
        std::fs::write(&json_path, "{ not json").unwrap();

        let merger = HierarchyMerger::new();
        assert!(merger.merge(temp_dir.path(), node("1", "Root", None)).await.is_err());
        assert_eq!(merger.flush_all().await.unwrap(), 0);
        assert_eq!(std::fs::read_to_string(&json_path).unwrap(), "{ not json");
    }

    #[tokio::test]
    async fn test_failed_hydration_is_remembered() {
        let temp_dir = TempDir::new().unwrap();
        let json_path = temp_dir.path().join(SCENE_FILE_NAME);
        std::fs::write(&json_path, "{ not json").unwrap();

        let merger = HierarchyMerger::new();
        assert!(matches!(
            merger.merge(temp_dir.path(), node("1", "Root", None)).await,
            Err(ExtractError::Json(_))
        ));

        // il file non viene riletto: anche se ora è valido, i merge falliscono
        std::fs::write(&json_path, "{}").unwrap();
        for id in ["2", "3"] {
            assert!(matches!(
                merger.merge(temp_dir.path(), node(id, "Child", Some("1"))).await,
                Err(ExtractError::Hierarchy { .. })
            ));
        }
        assert!(merger.snapshot(temp_dir.path()).await.is_none());

        assert_eq!(merger.flush_all().await.unwrap(), 0);
        assert_eq!(std::fs::read_to_string(&json_path).unwrap(), "{}");
    }

    #[tokio::test]
    async fn test_same_folder_through_different_paths() {
        let temp_dir = TempDir::new().unwrap();
        let folder = temp_dir.path().join("out");
        std::fs::create_dir_all(&folder).unwrap();
        let indirect = temp_dir.path().join("out").join("..").join("out");

        let merger = HierarchyMerger::new();
        merger.merge(&folder, node("1", "Root", None)).await.unwrap();
        merger.merge(&indirect, node("2", "Child", Some("1"))).await.unwrap();

        assert_eq!(merger.folder_count(), 1);
        assert_eq!(merger.flush_all().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_merges_keep_every_node_once() {
        let temp_dir = TempDir::new().unwrap();
        let merger = Arc::new(HierarchyMerger::new());

        let mut handles = Vec::new();
        for worker in 0..4 {
            let merger = merger.clone();
            let folder = temp_dir.path().to_path_buf();
            handles.push(tokio::spawn(async move {
                // ogni worker vede tutti i nodi, in un ordine diverso
                for step in 0..50 {
                    let id = (step * 7 + worker * 13) % 50;
                    let parent = if id == 0 { None } else { Some((id / 2).to_string()) };
                    let mut n = SceneNode::new(id.to_string(), format!("n{:02}", id));
                    n.parent_id = parent;
                    merger.merge(&folder, n).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let tree = merger.snapshot(temp_dir.path()).await.unwrap();
        assert_eq!(tree.len(), 50);
        assert_eq!(tree.roots(), ["0"]);
        for id in 1..50 {
            assert_eq!(tree.container_of(&id.to_string()), Some((id / 2).to_string().as_str()));
        }
    }

    #[test]
    fn test_flush_writes_every_folder() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a");
        let b = temp_dir.path().join("b");
        std::fs::create_dir_all(&a).unwrap();
        std::fs::create_dir_all(&b).unwrap();

        let merger = HierarchyMerger::new();
        let written = tokio_test::block_on(async {
            merger.merge(&a, node("1", "A", None)).await.unwrap();
            merger.merge(&b, node("1", "B", None)).await.unwrap();
            merger.flush_all().await.unwrap()
        });

        assert_eq!(written, 2);
        assert!(a.join(SCENE_FILE_NAME).is_file());
        assert!(b.join(SCENE_FILE_NAME).is_file());
    }
}
