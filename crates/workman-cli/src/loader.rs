//! Filesystem module loader.

use workman_compiler::resolve::ModuleLoader;

pub struct FsLoader;

impl ModuleLoader for FsLoader {
    fn exists(&self, path: &str) -> bool {
        std::path::Path::new(path).is_file()
    }

    fn load(&self, path: &str) -> Result<String, String> {
        std::fs::read_to_string(path).map_err(|err| err.to_string())
    }
}
