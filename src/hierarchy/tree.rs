//! # Scene Tree
//!
//! Gerarchia di una cartella di output, memorizzata come arena piatta.
//!
//! ## Struttura:
//! - `slots`: id → nodo + contenitore attuale + figli ordinati
//! - `roots`: id dei nodi al livello superiore, ordinati
//!
//! Ogni lista di fratelli resta ordinata per (Name, Id) dopo ogni mutazione:
//! gli inserimenti usano una ricerca binaria invece di riordinare tutto.
//!
//! ## Merge:
//! 1. Dedup: un id già presente non viene mai aggiornato (vince il primo)
//! 2. Placement: sotto il parent se già presente, altrimenti al top level
//! 3. Orphan repair: i nodi che dichiarano il nuovo nodo come parent vengono
//!    spostati sotto di esso
//!
//! La serializzazione ricostruisce l'annidamento `Children` del JSON.

use super::node::{SceneNode, SpriteRendererInfo, TransformInfo};
use serde::de::{MapAccess, Visitor};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// Risultato di un merge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Nodo inserito; `adopted` orfani spostati sotto di esso
    Inserted { adopted: usize },
    /// Id già presente, nessuna modifica
    Duplicate,
}

#[derive(Debug, Clone)]
struct Slot {
    node: SceneNode,
    /// Nodo che contiene attualmente questo slot (`None` = top level)
    container: Option<String>,
    children: Vec<String>,
}

/// Merged hierarchy of one output folder
#[derive(Debug, Clone, Default)]
pub struct SceneTree {
    slots: HashMap<String, Slot>,
    roots: Vec<String>,
}

impl SceneTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.slots.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&SceneNode> {
        self.slots.get(id).map(|slot| &slot.node)
    }

    /// Id dei nodi al top level, in ordine
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// Id dei figli di un nodo, in ordine
    pub fn children(&self, id: &str) -> &[String] {
        self.slots.get(id).map(|slot| slot.children.as_slice()).unwrap_or(&[])
    }

    /// Nodo che contiene `id` (`None` se top level o assente)
    pub fn container_of(&self, id: &str) -> Option<&str> {
        self.slots.get(id).and_then(|slot| slot.container.as_deref())
    }

    /// Merge di un nodo in arrivo
    pub fn merge(&mut self, node: SceneNode) -> MergeOutcome {
        if self.contains(&node.id) {
            return MergeOutcome::Duplicate;
        }

        let id = node.id.clone();
        let container = node
            .parent_id
            .as_ref()
            .filter(|parent| self.slots.contains_key(parent.as_str()))
            .cloned();

        let mut orphans: Vec<String> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.node.parent_id.as_deref() == Some(id.as_str()))
            .map(|(orphan, _)| orphan.clone())
            .collect();
        orphans.sort();

        self.slots.insert(
            id.clone(),
            Slot {
                node,
                container: None,
                children: Vec::new(),
            },
        );
        self.attach(&id, container);

        let mut adopted = 0;
        for orphan in orphans {
            if self.is_ancestor(&orphan, &id) {
                warn!(
                    "Node {} declares parent {} but is its ancestor, leaving it in place",
                    orphan, id
                );
                continue;
            }
            self.detach(&orphan);
            self.attach(&orphan, Some(id.clone()));
            adopted += 1;
        }

        MergeOutcome::Inserted { adopted }
    }

    /// Chiave di ordinamento tra fratelli
    fn sort_key<'a>(&'a self, id: &'a str) -> (&'a str, &'a str) {
        let name = self.slots.get(id).map(|slot| slot.node.name.as_str()).unwrap_or("");
        (name, id)
    }

    /// Inserisce `id` nella lista di fratelli di `container`, in ordine
    fn attach(&mut self, id: &str, container: Option<String>) {
        let key = {
            let (name, id) = self.sort_key(id);
            (name.to_string(), id.to_string())
        };

        let siblings = match container.as_deref() {
            Some(parent) => self.slots.get(parent).map(|slot| &slot.children),
            None => Some(&self.roots),
        };
        let position = siblings
            .map(|siblings| {
                siblings.partition_point(|other| self.sort_key(other) < (key.0.as_str(), key.1.as_str()))
            })
            .unwrap_or(0);

        let siblings = match container.as_deref() {
            Some(parent) => match self.slots.get_mut(parent) {
                Some(slot) => &mut slot.children,
                None => &mut self.roots,
            },
            None => &mut self.roots,
        };
        siblings.insert(position, id.to_string());

        if let Some(slot) = self.slots.get_mut(id) {
            slot.container = container;
        }
    }

    /// Rimuove `id` dal suo contenitore attuale
    fn detach(&mut self, id: &str) {
        let container = self.slots.get(id).and_then(|slot| slot.container.clone());
        let siblings = match container.as_deref().and_then(|parent| self.slots.get_mut(parent)) {
            Some(slot) => &mut slot.children,
            None => &mut self.roots,
        };
        siblings.retain(|sibling| sibling != id);

        if let Some(slot) = self.slots.get_mut(id) {
            slot.container = None;
        }
    }

    /// `true` se `candidate` è `id` o un suo antenato
    fn is_ancestor(&self, candidate: &str, id: &str) -> bool {
        let mut current = Some(id);
        let mut steps = 0;
        while let Some(node) = current {
            if node == candidate {
                return true;
            }
            steps += 1;
            if steps > self.slots.len() {
                return false;
            }
            current = self.container_of(node);
        }
        false
    }

    /// Ricostruisce l'albero da un `GameObject.json` esistente.
    ///
    /// I nodi vengono visitati nell'ordine del documento (pre-order): per un
    /// id ripetuto resta la prima occorrenza, e i figli delle copie scartate
    /// passano sotto la copia tenuta.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let StoredChildren(stored) = serde_json::from_str(json)?;
        let mut tree = Self::new();

        let mut pending: Vec<(Option<String>, String, StoredNode)> = stored
            .into_iter()
            .rev()
            .map(|(id, node)| (None, id, node))
            .collect();
        while let Some((container, id, stored)) = pending.pop() {
            let (node, StoredChildren(children)) = stored.into_parts(&id);

            if tree.contains(&id) {
                warn!(
                    "Duplicate node id {} in stored hierarchy, keeping the first copy ({} children moved)",
                    id,
                    children.len()
                );
            } else {
                tree.slots.insert(
                    id.clone(),
                    Slot {
                        node,
                        container: None,
                        children: Vec::new(),
                    },
                );
                tree.attach(&id, container);
            }

            pending.extend(
                children
                    .into_iter()
                    .rev()
                    .map(|(child_id, child)| (Some(id.clone()), child_id, child)),
            );
        }

        Ok(tree)
    }

    /// JSON con indentazione a 2 spazi, nell'ordine dell'albero
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Forma di un nodo in `GameObject.json`
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StoredNode {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    parent_id: Option<String>,
    #[serde(default)]
    transform: Option<TransformInfo>,
    #[serde(default)]
    sprite_renderer: Option<SpriteRendererInfo>,
    #[serde(default)]
    is_active: Option<bool>,
    #[serde(default)]
    children: StoredChildren,
}

/// Mappa id → nodo di `GameObject.json`, nell'ordine del documento.
/// Le chiavi ripetute restano tutte: il dedup avviene in `from_json`.
#[derive(Default)]
struct StoredChildren(Vec<(String, StoredNode)>);

impl<'de> Deserialize<'de> for StoredChildren {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = StoredChildren;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of node id to node")
            }

            fn visit_map<A>(self, mut map: A) -> Result<StoredChildren, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, StoredNode>()? {
                    entries.push(entry);
                }
                Ok(StoredChildren(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

impl StoredNode {
    fn into_parts(self, id: &str) -> (SceneNode, StoredChildren) {
        let node = SceneNode {
            id: id.to_string(),
            name: self.name.unwrap_or_default(),
            parent_id: self.parent_id,
            transform: self.transform,
            sprite_renderer: self.sprite_renderer,
            is_active: self.is_active,
        };
        (node, self.children)
    }
}

impl Serialize for SceneTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ChildrenView { tree: self, ids: &self.roots }.serialize(serializer)
    }
}

struct ChildrenView<'a> {
    tree: &'a SceneTree,
    ids: &'a [String],
}

impl Serialize for ChildrenView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.ids.len()))?;
        for id in self.ids {
            if let Some(slot) = self.tree.slots.get(id) {
                map.serialize_entry(id, &NodeView { tree: self.tree, slot })?;
            }
        }
        map.end()
    }
}

struct NodeView<'a> {
    tree: &'a SceneTree,
    slot: &'a Slot,
}

impl Serialize for NodeView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let node = &self.slot.node;
        let mut state = serializer.serialize_struct("SceneNode", 7)?;
        state.serialize_field("Name", &node.name)?;
        state.serialize_field("Id", &node.id)?;
        state.serialize_field("ParentId", &node.parent_id)?;
        state.serialize_field("Transform", &node.transform)?;
        state.serialize_field("SpriteRenderer", &node.sprite_renderer)?;
        state.serialize_field("IsActive", &node.is_active)?;
        state.serialize_field(
            "Children",
            &ChildrenView {
                tree: self.tree,
                ids: &self.slot.children,
            },
        )?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn node(id: &str, name: &str, parent: Option<&str>) -> SceneNode {
        let node = SceneNode::new(id, name);
        match parent {
            Some(parent) => node.with_parent(parent),
            None => node,
        }
    }

    fn to_value(tree: &SceneTree) -> Value {
        serde_json::from_str(&tree.to_json_pretty().unwrap()).unwrap()
    }

    /// Tutti gli id raggiungibili dal top level, con ripetizioni
    fn reachable_ids(tree: &SceneTree) -> Vec<String> {
        let mut ids = Vec::new();
        let mut stack: Vec<String> = tree.roots().to_vec();
        while let Some(id) = stack.pop() {
            stack.extend(tree.children(&id).iter().cloned());
            ids.push(id);
        }
        ids.sort();
        ids
    }

    #[test]
    fn test_child_before_parent_is_repaired() {
        let mut tree = SceneTree::new();
        assert_eq!(tree.merge(node("2", "Child", Some("1"))), MergeOutcome::Inserted { adopted: 0 });
        assert_eq!(tree.roots(), ["2"]);

        assert_eq!(tree.merge(node("1", "Root", None)), MergeOutcome::Inserted { adopted: 1 });
        assert_eq!(tree.roots(), ["1"]);
        assert_eq!(tree.children("1"), ["2"]);
        assert_eq!(tree.container_of("2"), Some("1"));

        let value = to_value(&tree);
        assert_eq!(value["1"]["Name"], "Root");
        assert_eq!(value["1"]["Children"]["2"]["Name"], "Child");
        assert_eq!(value["1"]["Children"]["2"]["ParentId"], "1");
        assert_eq!(value.as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_arrival_order_does_not_change_output() {
        let nodes = vec![
            node("1", "Root", None),
            node("2", "Body", Some("1")),
            node("3", "Arm", Some("2")),
            node("4", "Arm", Some("2")),
            node("5", "Hat", Some("1")),
            node("6", "Loose", Some("99")),
        ];

        let mut forward = SceneTree::new();
        for n in nodes.iter().cloned() {
            forward.merge(n);
        }
        let mut backward = SceneTree::new();
        for n in nodes.iter().rev().cloned() {
            backward.merge(n);
        }
        let mut shuffled = SceneTree::new();
        for index in [3, 0, 5, 2, 4, 1] {
            shuffled.merge(nodes[index].clone());
        }

        let expected = forward.to_json_pretty().unwrap();
        assert_eq!(backward.to_json_pretty().unwrap(), expected);
        assert_eq!(shuffled.to_json_pretty().unwrap(), expected);

        // i fratelli sono ordinati per nome, a parità di nome per id
        assert_eq!(forward.roots(), ["6", "1"]);
        assert_eq!(forward.children("1"), ["2", "5"]);
        assert_eq!(forward.children("2"), ["3", "4"]);
    }

    #[test]
    fn test_first_seen_wins() {
        let mut tree = SceneTree::new();
        tree.merge(node("1", "Root", None));
        tree.merge(node("2", "Child", Some("1")));

        assert_eq!(tree.merge(node("1", "RootRenamed", None)), MergeOutcome::Duplicate);
        assert_eq!(tree.get("1").unwrap().name, "Root");
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_conflicting_parent_keeps_first_version() {
        let mut tree = SceneTree::new();
        tree.merge(node("1", "A", None));
        tree.merge(node("2", "B", None));
        tree.merge(node("3", "C", Some("1")));

        assert_eq!(tree.merge(node("3", "C", Some("2"))), MergeOutcome::Duplicate);
        assert_eq!(tree.get("3").unwrap().parent_id.as_deref(), Some("1"));
        assert_eq!(tree.children("1"), ["3"]);
        assert!(tree.children("2").is_empty());
    }

    #[test]
    fn test_nested_orphans_move_with_their_subtree() {
        let mut tree = SceneTree::new();
        tree.merge(node("3", "Hand", Some("2")));
        tree.merge(node("2", "Arm", Some("1")));
        assert_eq!(tree.roots(), ["2"]);
        assert_eq!(tree.children("2"), ["3"]);

        tree.merge(node("1", "Body", None));
        assert_eq!(tree.roots(), ["1"]);
        assert_eq!(tree.children("1"), ["2"]);
        assert_eq!(tree.children("2"), ["3"]);
    }

    #[test]
    fn test_cycle_is_not_created() {
        let mut tree = SceneTree::new();
        tree.merge(node("a", "A", Some("b")));
        assert_eq!(tree.merge(node("b", "B", Some("a"))), MergeOutcome::Inserted { adopted: 0 });

        assert_eq!(tree.roots(), ["a"]);
        assert_eq!(tree.children("a"), ["b"]);
        assert_eq!(reachable_ids(&tree), ["a", "b"]);
        assert!(tree.to_json_pretty().is_ok());
    }

    #[test]
    fn test_self_parent_stays_top_level() {
        let mut tree = SceneTree::new();
        assert_eq!(tree.merge(node("1", "Loop", Some("1"))), MergeOutcome::Inserted { adopted: 0 });
        assert_eq!(tree.roots(), ["1"]);
    }

    #[test]
    fn test_ids_are_unique_and_reachable() {
        let mut tree = SceneTree::new();
        for (id, parent) in [("5", Some("4")), ("4", Some("3")), ("2", Some("1")), ("3", Some("1")), ("1", None), ("4", None)] {
            tree.merge(node(id, &format!("n{}", id), parent));
        }
        assert_eq!(reachable_ids(&tree), ["1", "2", "3", "4", "5"]);
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn test_json_shape_and_key_order() {
        let mut tree = SceneTree::new();
        tree.merge(node("1", "Root", None));

        let json = tree.to_json_pretty().unwrap();
        let expected = r#"{
  "1": {
    "Name": "Root",
    "Id": "1",
    "ParentId": null,
    "Transform": null,
    "SpriteRenderer": null,
    "IsActive": null,
    "Children": {}
  }
}"#;
        assert_eq!(json, expected);
    }

    #[test]
    fn test_json_roundtrip_is_stable() {
        let mut tree = SceneTree::new();
        let mut root = node("10", "ルート", None);
        root.transform = Some(TransformInfo {
            position: Some(crate::bundle::Vec3 { x: 0.1, y: -2.5, z: 1e-7 }),
            rotation: None,
            scale: None,
        });
        root.is_active = Some(true);
        tree.merge(root);
        tree.merge(node("11", "b", Some("10")));
        tree.merge(node("12", "a", Some("10")));
        tree.merge(node("13", "orphan", Some("77")));

        let json = tree.to_json_pretty().unwrap();
        assert!(json.contains("ルート"));

        let reloaded = SceneTree::from_json(&json).unwrap();
        assert_eq!(reloaded.len(), 4);
        assert_eq!(reloaded.children("10"), ["12", "11"]);
        assert_eq!(reloaded.to_json_pretty().unwrap(), json);
    }

    #[test]
    fn test_reloaded_tree_still_repairs_orphans() {
        let stored = json!({
            "5": {"Name": "Child", "Id": "5", "ParentId": "4", "Children": {}},
            "1": {"Name": "Other", "Id": "1", "ParentId": null, "Children": {}}
        });
        let mut tree = SceneTree::from_json(&stored.to_string()).unwrap();

        tree.merge(node("4", "Parent", None));
        assert_eq!(tree.roots(), ["1", "4"]);
        assert_eq!(tree.children("4"), ["5"]);
    }

    #[test]
    fn test_from_json_keeps_first_copy_in_document_order() {
        // "9" precede "1" nel documento: l'ordine delle chiavi non conta
        let stored = r#"{
            "9": {"Name": "Late", "Children": {"5": {"Name": "First", "Children": {"6": {"Name": "Kept"}}}}},
            "1": {"Name": "Early", "Children": {"5": {"Name": "Second", "Children": {"7": {"Name": "Moved"}}}}}
        }"#;

        let tree = SceneTree::from_json(stored).unwrap();
        assert_eq!(tree.get("5").unwrap().name, "First");
        assert_eq!(tree.container_of("5"), Some("9"));
        assert!(tree.children("1").is_empty());
        // i figli della copia scartata finiscono sotto la copia tenuta
        assert_eq!(tree.children("5"), ["6", "7"]);
        assert_eq!(tree.container_of("7"), Some("5"));
        assert_eq!(reachable_ids(&tree), ["1", "5", "6", "7", "9"]);
    }

    #[test]
    fn test_from_json_drops_duplicate_ids() {
        let stored = json!({
            "1": {"Name": "A", "Children": {"2": {"Name": "B"}}},
            "3": {"Name": "C", "Children": {"2": {"Name": "B"}}}
        });
        let tree = SceneTree::from_json(&stored.to_string()).unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(reachable_ids(&tree), ["1", "2", "3"]);
    }
}
