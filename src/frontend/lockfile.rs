/*
Project files around the compiler.
The manifest is only read and given back. The lockfile lists the modules of a
project; each one is parsed and registered in the code generator, so that
later compilations can resolve calls to any of them.

lockfile format :
{ "modules": [ { "file": "path/to/module.rppa", "name": "optional_name" }, ... ] }
Paths are relative to the lockfile, the name defaults to the file stem.
*/

use std::fmt::Display;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};

use codespan_reporting::files::SimpleFiles;
use serde::Deserialize;
use tracing::debug;

use super::codegen::Codegen;
use super::parser_wrapper::{parse_file, FileError, ParserError};

#[derive(Debug, Deserialize)]
struct Lockfile {
    modules: Vec<LockEntry>,
}

#[derive(Debug, Deserialize)]
struct LockEntry {
    file: PathBuf,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug)]
pub enum ProjectError {
    File(FileError),
    Format(PathBuf, String),
    Module(ParserError),
    NoModuleName(PathBuf),
}

impl From<FileError> for ProjectError {
    fn from(err: FileError) -> Self {
        ProjectError::File(err)
    }
}

impl From<ParserError> for ProjectError {
    fn from(err: ParserError) -> Self {
        ProjectError::Module(err)
    }
}

impl Display for ProjectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectError::File(err) => write!(f, "Cannot open {}", err),
            ProjectError::Format(path, err) => {
                write!(f, "Malformed file {}: {}", path.to_string_lossy(), err)
            }
            ProjectError::Module(err) => write!(f, "{}", err),
            ProjectError::NoModuleName(path) => write!(
                f,
                "Cannot derive a module name from {}",
                path.to_string_lossy()
            ),
        }
    }
}

impl std::error::Error for ProjectError {}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ProjectError> {
    let text = read_to_string(path).map_err(|e| FileError::from((path.to_path_buf(), e)))?;
    serde_json::from_str(&text).map_err(|e| ProjectError::Format(path.to_path_buf(), e.to_string()))
}

pub fn load_manifest(path: &Path) -> Result<serde_json::Value, ProjectError> {
    read_json(path)
}

//registers every module of the lockfile, in order, and returns their names
pub fn register_from_lock(
    lockfile: &Path,
    files: &mut SimpleFiles<String, String>,
    codegen: &mut Codegen,
    max_nesting: usize,
) -> Result<Vec<String>, ProjectError> {
    let lock: Lockfile = read_json(lockfile)?;
    let mut root = lockfile.to_path_buf();
    root.pop();
    let mut names = Vec::new();
    for entry in lock.modules {
        let path = root.join(&entry.file);
        let name = match entry.name {
            Some(name) => name,
            None => path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(|s| s.to_string())
                .ok_or_else(|| ProjectError::NoModuleName(path.clone()))?,
        };
        let expr = parse_file(files, &path, max_nesting)?;
        debug!(module = %name, file = %path.display(), "registered module");
        codegen.register(name.clone(), expr);
        names.push(name);
    }
    Ok(names)
}
