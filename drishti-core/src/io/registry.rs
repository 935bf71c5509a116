//! Named model registry over a directory.
//!
//! Models are kept in memory under a name and mirrored to
//! `<dir>/<name>.dmod` files in the codec format of [`super::model`].

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::object::CharacterizedObject;
use crate::error::{Error, Result};
use crate::io::model;

/// File extension for persisted models.
pub const MODEL_EXTENSION: &str = "dmod";

/// Directory-backed model store.
pub struct ModelRegistry {
    dir: PathBuf,
    models: HashMap<String, CharacterizedObject>,
}

impl ModelRegistry {
    /// Open a registry over `dir`, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            models: HashMap::new(),
        })
    }

    fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, MODEL_EXTENSION))
    }

    /// Register a model in memory under a name.
    pub fn insert(&mut self, name: impl Into<String>, object: CharacterizedObject) {
        self.models.insert(name.into(), object);
    }

    /// Look up a model loaded in memory.
    pub fn get(&self, name: &str) -> Option<&CharacterizedObject> {
        self.models.get(name)
    }

    /// Persist a registered model to disk.
    pub fn save(&self, name: &str) -> Result<()> {
        let object = self
            .models
            .get(name)
            .ok_or_else(|| Error::Model(format!("no model named `{}`", name)))?;
        model::save_file(object, self.path_of(name))?;
        log::info!("Saved model `{}` to {}", name, self.dir.display());
        Ok(())
    }

    /// Load a model from disk into the registry and return it.
    pub fn load(&mut self, name: &str) -> Result<&CharacterizedObject> {
        let object = model::load_file(self.path_of(name))?;
        Ok(self.models.entry(name.to_string()).or_insert(object))
    }

    /// Drop a model from memory and disk.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        self.models.remove(name);
        let path = self.path_of(name);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Names of every model on disk, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(MODEL_EXTENSION) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
