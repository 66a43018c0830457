use std::path::{Path, PathBuf};

/// The slice of filesystem access venv discovery needs.
pub trait DirectoryListing {
    fn is_dir(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
}

pub struct RealFs;

impl DirectoryListing for RealFs {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualEnv {
    pub root: PathBuf,
    pub interpreter: PathBuf,
}

const UNIX_INTERPRETER: &[&str] = &["bin", "python"];
const WINDOWS_INTERPRETER: &[&str] = &["Scripts", "python.exe"];

fn interpreter_layouts() -> [&'static [&'static str]; 2] {
    if cfg!(windows) {
        [WINDOWS_INTERPRETER, UNIX_INTERPRETER]
    } else {
        [UNIX_INTERPRETER, WINDOWS_INTERPRETER]
    }
}

/// Interpreter inside `candidate`, if it is a real environment rather than a
/// folder that merely has the right name.
pub fn environment_interpreter(candidate: &Path, fs: &dyn DirectoryListing) -> Option<PathBuf> {
    if !fs.is_dir(candidate) {
        return None;
    }
    interpreter_layouts().into_iter().find_map(|layout| {
        let interpreter = layout.iter().fold(candidate.to_path_buf(), |p, part| p.join(part));
        fs.is_file(&interpreter).then_some(interpreter)
    })
}

/// Walk from `start` towards the filesystem root, checking each of `names`
/// in every directory, and return the first genuine environment found.
pub fn find_virtualenv(
    start: &Path,
    names: &[String],
    fs: &dyn DirectoryListing,
) -> Option<VirtualEnv> {
    start.ancestors().find_map(|dir| {
        names.iter().find_map(|name| {
            let root = dir.join(name);
            environment_interpreter(&root, fs).map(|interpreter| VirtualEnv { root, interpreter })
        })
    })
}
