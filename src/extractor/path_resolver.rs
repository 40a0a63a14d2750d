//! # Path Resolution Module
//!
//! Centralizza tutta la logica di calcolo dei path di output.
//! Evita duplicazione tra driver, exporter e merger della gerarchia.

use anyhow::Result;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Caratteri non ammessi nei nomi di file/cartella di output
const ILLEGAL_CHARS: [char; 10] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*', '#'];

/// Utility per calcolare i path di output in modo centralizzato
pub struct PathResolver;

impl PathResolver {
    /// Sostituisce i caratteri illegali con `_`
    pub fn sanitize_name(name: &str) -> String {
        name.chars()
            .map(|c| if ILLEGAL_CHARS.contains(&c) { '_' } else { c })
            .collect()
    }

    /// Calcola la cartella di output di un file di input:
    /// `output_root / sanitize(dir relative...) / sanitize(stem)`
    pub fn get_output_dir(input_path: &Path, input_base_dir: &Path, output_root: &Path) -> Result<PathBuf> {
        let relative_path = input_path.strip_prefix(input_base_dir).map_err(|_| {
            anyhow::anyhow!(
                "{} is not inside input directory {}",
                input_path.display(),
                input_base_dir.display()
            )
        })?;

        let file_stem = input_path
            .file_stem()
            .ok_or_else(|| anyhow::anyhow!("Invalid file name: {}", input_path.display()))?
            .to_string_lossy();

        let mut out_dir = output_root.to_path_buf();
        if let Some(parent) = relative_path.parent() {
            for component in parent.components() {
                if let Component::Normal(segment) = component {
                    out_dir.push(Self::sanitize_name(&segment.to_string_lossy()));
                }
            }
        }
        out_dir.push(Self::sanitize_name(&file_stem));

        debug!("Resolved output dir: {} -> {}", input_path.display(), out_dir.display());
        Ok(out_dir)
    }

    /// Prepara la cartella di output. `Ok(None)` segnala che il file va
    /// saltato perché la cartella è già popolata e `skip_populated` è attivo.
    pub async fn prepare_output_dir(
        input_path: &Path,
        input_base_dir: &Path,
        output_root: &Path,
        skip_populated: bool,
    ) -> Result<Option<PathBuf>> {
        let out_dir = Self::get_output_dir(input_path, input_base_dir, output_root)?;

        if skip_populated && Self::has_entries(&out_dir).await {
            debug!("[SKIP] Output directory already populated: {}", out_dir.display());
            return Ok(None);
        }

        tokio::fs::create_dir_all(&out_dir)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create output directory {}: {}", out_dir.display(), e))?;
        Ok(Some(out_dir))
    }

    async fn has_entries(dir: &Path) -> bool {
        match tokio::fs::read_dir(dir).await {
            Ok(mut entries) => matches!(entries.next_entry().await, Ok(Some(_))),
            Err(_) => false,
        }
    }

    /// Nome sanitizzato utilizzabile come singolo componente di path.
    /// `None` per nomi vuoti o fatti solo di punti (`.`, `..`).
    pub fn safe_name(name: &str) -> Option<String> {
        if name.chars().all(|c| c == '.') {
            return None;
        }
        Some(Self::sanitize_name(name))
    }

    /// Path base (senza estensione) di una risorsa esportata.
    /// Nome mancante o non utilizzabile → `unnamed_<record id>`.
    pub fn resource_path(out_dir: &Path, name: Option<&str>, record_id: i64) -> PathBuf {
        let name = name
            .and_then(Self::safe_name)
            .unwrap_or_else(|| format!("unnamed_{}", record_id));
        out_dir.join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(PathResolver::sanitize_name("a<b>c:d\"e"), "a_b_c_d_e");
        assert_eq!(PathResolver::sanitize_name("x/y\\z|w?v*u#t"), "x_y_z_w_v_u_t");
        assert_eq!(PathResolver::sanitize_name("キャラ_01.png"), "キャラ_01.png");
    }

    #[test]
    fn test_output_dir_layout() {
        let out = PathResolver::get_output_dir(
            Path::new("/in/chars/a#b/sprite?01.bundle"),
            Path::new("/in"),
            Path::new("/out"),
        )
        .unwrap();
        assert_eq!(out, PathBuf::from("/out/chars/a_b/sprite_01"));
    }

    #[test]
    fn test_output_dir_rejects_outside_input() {
        let result = PathResolver::get_output_dir(
            Path::new("/elsewhere/x.bundle"),
            Path::new("/in"),
            Path::new("/out"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_resource_path_fallback() {
        let dir = Path::new("/out/x");
        assert_eq!(PathResolver::resource_path(dir, Some("bg:1"), 5), PathBuf::from("/out/x/bg_1"));
        assert_eq!(PathResolver::resource_path(dir, Some(""), 5), PathBuf::from("/out/x/unnamed_5"));
        assert_eq!(PathResolver::resource_path(dir, None, -3), PathBuf::from("/out/x/unnamed_-3"));
    }

    #[test]
    fn test_dot_names_stay_inside_folder() {
        let dir = Path::new("/out/x");
        assert_eq!(PathResolver::resource_path(dir, Some("."), 1), PathBuf::from("/out/x/unnamed_1"));
        assert_eq!(PathResolver::resource_path(dir, Some(".."), 2), PathBuf::from("/out/x/unnamed_2"));
        assert_eq!(PathResolver::resource_path(dir, Some("..."), 3), PathBuf::from("/out/x/unnamed_3"));
        assert_eq!(PathResolver::resource_path(dir, Some(".hidden"), 4), PathBuf::from("/out/x/.hidden"));
        assert_eq!(PathResolver::safe_name("../up"), Some(".._up".to_string()));
        assert_eq!(PathResolver::safe_name(""), None);
    }

    #[tokio::test]
    async fn test_prepare_creates_and_skips_populated() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("in");
        let output = temp_dir.path().join("out");
        let file = input.join("sub").join("a.bundle");

        let dir = PathResolver::prepare_output_dir(&file, &input, &output, true)
            .await
            .unwrap()
            .unwrap();
        assert!(dir.is_dir());

        // cartella vuota: non viene saltata
        assert!(PathResolver::prepare_output_dir(&file, &input, &output, true)
            .await
            .unwrap()
            .is_some());

        std::fs::write(dir.join("x.txt"), b"x").unwrap();
        assert!(PathResolver::prepare_output_dir(&file, &input, &output, true)
            .await
            .unwrap()
            .is_none());
        assert!(PathResolver::prepare_output_dir(&file, &input, &output, false)
            .await
            .unwrap()
            .is_some());
    }
}
