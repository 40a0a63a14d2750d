//! # Record Payloads
//!
//! Payload già decodificati restituiti da `RecordReader::read`.
//! Il decoder del formato bundle è un collaboratore esterno: qui ci sono solo
//! le forme dei dati che la pipeline consuma.

use super::RecordHandle;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorRgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

/// Decoded payload of one record
pub enum Payload {
    Text(TextAsset),
    Image(ImageAsset),
    Audio(AudioClip),
    Container(ContainerManifest),
    GameObject(GameObjectRecord),
}

impl Payload {
    /// Nome del tipo di payload, per i messaggi di errore
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Text(_) => "text",
            Payload::Image(_) => "image",
            Payload::Audio(_) => "audio",
            Payload::Container(_) => "container",
            Payload::GameObject(_) => "game object",
        }
    }
}

/// Text-like record. `script` holds the raw bytes, which may not be UTF-8
/// (packed audio containers travel as text assets).
#[derive(Debug, Clone)]
pub struct TextAsset {
    pub name: Option<String>,
    pub script: Vec<u8>,
}

/// Image-like record, already decoded to pixels by the external codec
#[derive(Debug, Clone)]
pub struct ImageAsset {
    pub name: Option<String>,
    pub image: DynamicImage,
}

/// Audio-like record
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub name: Option<String>,
    pub samples: Option<AudioSamples>,
}

/// Encoded audio buffers of an AudioClip
#[derive(Debug, Clone, PartialEq)]
pub enum AudioSamples {
    Single(Vec<u8>),
    Multi(BTreeMap<String, Vec<u8>>),
}

/// Manifest of a container record (AssetBundle)
pub struct ContainerManifest {
    pub name: Option<String>,
    pub entries: Vec<ContainerEntry>,
}

/// Named entry of a container. `asset` is `None` when the reference
/// could not be resolved by the decoder.
pub struct ContainerEntry {
    pub name: String,
    pub asset: Option<RecordHandle>,
}

/// Scene node record with the components the hierarchy needs
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GameObjectRecord {
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub transform: Option<TransformRecord>,
    pub renderer: Option<SpriteRendererRecord>,
}

/// Local transform. `parent_object_id` is the id of the game object that owns
/// the parent transform, as resolved by the decoder.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransformRecord {
    pub local_position: Option<Vec3>,
    pub local_rotation: Option<Quat>,
    pub local_scale: Option<Vec3>,
    pub parent_object_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpriteRendererRecord {
    pub sprite: Option<SpriteRecord>,
    pub enabled: Option<bool>,
    pub sorting_order: Option<i32>,
    pub color: Option<ColorRgba>,
    #[serde(default)]
    pub materials: Vec<MaterialRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpriteRecord {
    pub name: Option<String>,
    pub pixels_to_units: Option<f64>,
    pub pivot: Option<Vec2>,
}

/// Material reference. `saved_floats` is `None` when the material carries
/// no saved properties.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MaterialRecord {
    pub path_id: i64,
    pub name: Option<String>,
    pub saved_floats: Option<Vec<(String, f64)>>,
}
