//! # Scene Node
//!
//! Dati di un nodo della gerarchia, senza figli: la struttura ad albero vive
//! nell'arena di `SceneTree`. I nomi dei campi serde sono quelli letti dal
//! viewer a valle (`GameObject.json`).

use crate::bundle::{ColorRgba, GameObjectRecord, MaterialRecord, Quat, SpriteRendererRecord, TransformRecord, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Proprietà float dei materiali che finiscono nel JSON
const SELECTED_MATERIAL_FLOATS: [&str; 2] = ["_StencilRef", "_StencilComp"];

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub transform: Option<TransformInfo>,
    pub sprite_renderer: Option<SpriteRendererInfo>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransformInfo {
    pub position: Option<Vec3>,
    pub rotation: Option<Quat>,
    pub scale: Option<Vec3>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SpriteRendererInfo {
    pub sprite: Option<SpriteInfo>,
    pub enabled: Option<bool>,
    pub sorting_order: Option<i32>,
    pub color: Option<ColorRgba>,
    #[serde(default)]
    pub materials: Vec<MaterialInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SpriteInfo {
    pub name: Option<String>,
    pub pixels_to_units: Option<f64>,
    pub pivot: Option<Vec2>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MaterialInfo {
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floats: Option<BTreeMap<String, f64>>,
}

impl SceneNode {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parent_id: None,
            transform: None,
            sprite_renderer: None,
            is_active: None,
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Costruisce il nodo da un record GameObject
    pub fn from_game_object(record_id: i64, record: GameObjectRecord) -> Self {
        let id = record_id.to_string();
        let name = record.name.unwrap_or_else(|| format!("unnamed_{}", id));
        let parent_id = record
            .transform
            .as_ref()
            .and_then(|transform| transform.parent_object_id)
            .map(|parent| parent.to_string());

        Self {
            id,
            name,
            parent_id,
            transform: record.transform.map(TransformInfo::from),
            sprite_renderer: record.renderer.map(SpriteRendererInfo::from),
            is_active: record.is_active,
        }
    }
}

impl From<TransformRecord> for TransformInfo {
    fn from(transform: TransformRecord) -> Self {
        Self {
            position: transform.local_position,
            rotation: transform.local_rotation,
            scale: transform.local_scale,
        }
    }
}

impl From<SpriteRendererRecord> for SpriteRendererInfo {
    fn from(renderer: SpriteRendererRecord) -> Self {
        Self {
            sprite: renderer.sprite.map(|sprite| SpriteInfo {
                name: sprite.name,
                pixels_to_units: sprite.pixels_to_units,
                pivot: sprite.pivot,
            }),
            enabled: renderer.enabled,
            sorting_order: renderer.sorting_order,
            color: renderer.color,
            materials: renderer.materials.into_iter().filter_map(MaterialInfo::from_record).collect(),
        }
    }
}

impl MaterialInfo {
    /// `None` per riferimenti nulli (path id 0) o materiali senza proprietà
    fn from_record(material: MaterialRecord) -> Option<Self> {
        if material.path_id == 0 {
            return None;
        }
        let saved = material.saved_floats?;

        let mut floats = BTreeMap::new();
        for selected in SELECTED_MATERIAL_FLOATS {
            // a parità di nome vince l'ultimo valore salvato
            if let Some((_, value)) = saved.iter().rev().find(|(name, _)| name == selected) {
                floats.insert(selected.to_string(), *value);
            }
        }

        Some(Self {
            name: material.name,
            floats: if floats.is_empty() { None } else { Some(floats) },
        })
    }
}
