//! Where class file bytes come from.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use crate::error::ClassNotFound;

/// Supplies the bytes of a class file given a fully-qualified internal class name such as
/// `java/lang/Object`.
pub trait ClassSource {
    fn find_class(&self, name: &str) -> Result<Vec<u8>, ClassNotFound>;
}

/// Class files held in memory.
#[derive(Debug, Default)]
pub struct MemoryClassSource {
    classes: HashMap<String, Vec<u8>>,
}

impl MemoryClassSource {
    pub fn new() -> Self {
        MemoryClassSource::default()
    }

    pub fn add(&mut self, name: &str, bytes: Vec<u8>) -> &mut Self {
        self.classes.insert(String::from(name), bytes);
        self
    }
}

impl ClassSource for MemoryClassSource {
    fn find_class(&self, name: &str) -> Result<Vec<u8>, ClassNotFound> {
        self.classes.get(name).cloned()
            .ok_or_else(|| ClassNotFound { name: String::from(name), cause: None })
    }
}

/// Looks up `a/b/C` as the file `a/b/C.class` below a root directory.
#[derive(Debug, Clone)]
pub struct DirectoryClassSource {
    root: PathBuf,
}

impl DirectoryClassSource {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        DirectoryClassSource { root: root.into() }
    }
}

impl ClassSource for DirectoryClassSource {
    fn find_class(&self, name: &str) -> Result<Vec<u8>, ClassNotFound> {
        let path = self.root.join(String::from(name) + ".class");
        trace!("looking for class {} at {}", name, path.display());
        File::open(&path).and_then(|mut file| {
            let mut bytes = vec![];
            file.read_to_end(&mut bytes).map(|_| bytes)
        }).map_err(|e| ClassNotFound { name: String::from(name), cause: Some(e) })
    }
}
