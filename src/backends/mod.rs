pub mod pnml;
pub mod record;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::ast::petri::PetriModule;
use crate::frontend::parser_wrapper::FileError;
use crate::util::viz::render_dot;

fn create(path: &Path) -> Result<BufWriter<File>, FileError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| FileError::from((path.to_path_buf(), e)))
}

//writes <module>.json and <module>.pnml (and <module>.dot if asked) in out_dir,
//returns the written paths
pub fn write_artifacts(
    module: &PetriModule,
    out_dir: &Path,
    with_dot: bool,
) -> Result<Vec<PathBuf>, FileError> {
    let io_error = |path: &Path| {
        let path = path.to_path_buf();
        move |e: std::io::Error| FileError::from((path, e))
    };
    let mut written = Vec::new();

    let json_path = out_dir.join(format!("{}.json", module.name));
    let json = record::to_json(module).map_err(|e| FileError {
        file: json_path.clone(),
        error: e.to_string(),
    })?;
    let mut f = create(&json_path)?;
    f.write_all(json.as_bytes())
        .and_then(|_| f.flush())
        .map_err(io_error(&json_path))?;
    written.push(json_path);

    let pnml_path = out_dir.join(format!("{}.pnml", module.name));
    let xml = pnml::to_pnml_string(module).map_err(io_error(&pnml_path))?;
    let mut f = create(&pnml_path)?;
    f.write_all(xml.as_bytes())
        .and_then(|_| f.flush())
        .map_err(io_error(&pnml_path))?;
    written.push(pnml_path);

    if with_dot {
        let dot_path = out_dir.join(format!("{}.dot", module.name));
        let mut f = create(&dot_path)?;
        render_dot(&mut f, module)
            .and_then(|_| f.flush())
            .map_err(io_error(&dot_path))?;
        written.push(dot_path);
    }
    for path in &written {
        info!(module = %module.name, path = %path.display(), "wrote artifact");
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{codegen::Codegen, parser_wrapper::parse_str};
    use std::fs::{create_dir_all, read_to_string, remove_dir_all};

    #[test]
    fn test_write_artifacts() {
        let dir = std::env::temp_dir().join(format!("flownet_artifacts_{}", std::process::id()));
        create_dir_all(&dir).unwrap();
        let mut cg = Codegen::new();
        cg.register("main", parse_str("a . [b || c]").unwrap());
        let module = cg.generate("main").unwrap();
        let written = write_artifacts(&module, &dir, true).unwrap();
        assert_eq!(
            written,
            vec![dir.join("main.json"), dir.join("main.pnml"), dir.join("main.dot")]
        );
        assert_eq!(
            read_to_string(dir.join("main.pnml")).unwrap(),
            pnml::to_pnml_string(&module).unwrap()
        );
        assert_eq!(
            read_to_string(dir.join("main.json")).unwrap(),
            record::to_json(&module).unwrap()
        );
        remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_dir() {
        let mut cg = Codegen::new();
        cg.register("main", parse_str("a").unwrap());
        let module = cg.generate("main").unwrap();
        let res = write_artifacts(&module, Path::new("/nonexistent/flownet/out"), false);
        assert!(res.is_err());
    }
}
