//! # File Management Module
//!
//! Questo modulo gestisce la discovery dei file di input e le scritture
//! atomiche su disco.
//!
//! ## Responsabilità:
//! - Discovery ricorsiva dei file da estrarre (ordine deterministico)
//! - Esclusione della directory di output se annidata nell'input
//! - Scrittura atomica (temp file nella stessa directory + rename)
//! - Scrittura atomica di cartelle intere (staging dir + rename)
//!
//! ## Esempio:
//! ```rust,ignore
//! let files = FileManager::find_input_files(&input_dir, &output_dir)?;
//! FileManager::write_atomic(&out_dir.join("GameObject.json"), json.as_bytes())?;
//! ```

use anyhow::Result;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Manages file discovery and atomic writes
pub struct FileManager;

impl FileManager {
    /// Find all regular files under `input_dir`, skipping `output_root`
    pub fn find_input_files(input_dir: &Path, output_root: &Path) -> Result<Vec<PathBuf>> {
        if !input_dir.is_dir() {
            return Err(anyhow::anyhow!("Input directory does not exist: {}", input_dir.display()));
        }

        let mut files = Vec::new();

        for entry in WalkDir::new(input_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.path() != output_root)
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            files.push(entry.into_path());
        }

        debug!("Found {} input files under {}", files.len(), input_dir.display());
        Ok(files)
    }

    /// Scrive `contents` in `path` passando da un file temporaneo nella
    /// stessa directory: il file finale è sempre completo o assente.
    pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(contents)?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Crea la cartella `path` con tutti i `files` (nome → contenuto), oppure
    /// niente: i file vengono scritti in una cartella di staging accanto a
    /// `path`, rinominata al suo posto solo alla fine.
    pub fn write_atomic_dir(path: &Path, files: Vec<(String, Vec<u8>)>) -> std::io::Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let staging = tempfile::Builder::new().prefix(".staging-").tempdir_in(dir)?;
        for (name, contents) in files {
            let mut file = std::fs::File::create(staging.path().join(name))?;
            file.write_all(&contents)?;
            file.sync_all()?;
        }
        // tempdir nasce con permessi 0700
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(staging.path(), std::fs::Permissions::from_mode(0o755))?;
        }
        std::fs::rename(staging.path(), path)?;
        Ok(())
    }
}
