//Module declaration
mod ast;
mod backends;
mod frontend;
mod selftest;
mod util;
use codespan_reporting::files::SimpleFiles;
use docopt::Docopt;
use frontend::{codegen::Codegen, lockfile, parser_wrapper};
use serde::Deserialize;
use std::{
    path::{Path, PathBuf},
    process::exit,
    rc::Rc,
};
use tracing::{debug, info};
use util::errors::{ErrorType, FlownetError};

//Docopt generates a CLI automatically from this usage string.
const USAGE: &str = include_str!("USAGE.docopt");
//Docopt will generate this struct from the CLI
#[derive(Debug, Deserialize)]
struct Args {
    cmd_compile: bool,
    cmd_lock: bool,
    cmd_manifest: bool,
    cmd_selftest: bool,
    arg_file: String,
    arg_module: Vec<String>,
    arg_lockfile: String,
    arg_manifest: String,
    flag_out_dir: String,
    flag_dot: bool,
    flag_ast: bool,
    flag_max_depth: usize,
    flag_verbose: bool,
    flag_version: bool,
}

fn print_ast(expr: &ast::parse_ast::Expr, source: &str) -> Result<(), ErrorType> {
    let json = serde_json::to_string_pretty(expr).map_err(|e| parser_wrapper::FileError {
        file: PathBuf::from(source),
        error: e.to_string(),
    })?;
    println!("{}", json);
    Ok(())
}

//compiles a registered module and writes its artifacts
fn emit(codegen: &mut Codegen, name: &str, args: &Args) -> Result<(), ErrorType> {
    let module = codegen.generate(name)?;
    debug!(
        module = name,
        places = module.places.len(),
        transitions = module.transitions.len(),
        arcs = module.arcs.len(),
        "compiled"
    );
    let written = backends::write_artifacts(&module, Path::new(&args.flag_out_dir), args.flag_dot)?;
    for path in written {
        println!("Emitted {}", path.display());
    }
    Ok(())
}

fn compile(args: &Args, files: &mut SimpleFiles<String, String>) -> Result<(), ErrorType> {
    let module = &args.arg_module[0];
    let expr = parser_wrapper::parse_file(files, Path::new(&args.arg_file), args.flag_max_depth)?;
    if args.flag_ast {
        print_ast(&expr, &args.arg_file)?;
    }
    let mut codegen = Codegen::with_max_depth(args.flag_max_depth);
    codegen.register(module.clone(), expr);
    emit(&mut codegen, module, args)
}

//without module names, loading the lockfile is only a validation pass
fn lock(args: &Args, files: &mut SimpleFiles<String, String>) -> Result<(), ErrorType> {
    let mut codegen = Codegen::with_max_depth(args.flag_max_depth);
    let names = lockfile::register_from_lock(
        Path::new(&args.arg_lockfile),
        files,
        &mut codegen,
        args.flag_max_depth,
    )?;
    codegen.check_calls()?;
    info!(count = names.len(), "registered modules from lockfile");
    if args.arg_module.is_empty() {
        println!(
            "Registered {} modules from lockfile: {}",
            names.len(),
            codegen.module_names().join(", ")
        );
    }
    for name in &args.arg_module {
        emit(&mut codegen, name, args)?;
    }
    Ok(())
}

fn manifest(args: &Args) -> Result<(), ErrorType> {
    let path = Path::new(&args.arg_manifest);
    let value = lockfile::load_manifest(path)?;
    let text = serde_json::to_string_pretty(&value)
        .map_err(|e| lockfile::ProjectError::Format(path.to_path_buf(), e.to_string()))?;
    println!("{}", text);
    Ok(())
}

fn main() {
    //gets the args from docopt
    let args: Args = Docopt::new(USAGE)
        .and_then(|d| d.deserialize())
        .unwrap_or_else(|e| e.exit());
    //prints the version
    if args.flag_version {
        println!("flownet version {}", env!("CARGO_PKG_VERSION"));
        return;
    }
    //RUST_LOG wins over --verbose
    let default_level = if args.flag_verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.to_string()))
        .with_writer(std::io::stderr)
        .init();

    if args.cmd_selftest {
        let stdout = std::io::stdout();
        match selftest::run(&mut stdout.lock()) {
            Ok(true) => return,
            Ok(false) => exit(1),
            Err(e) => {
                eprintln!("Error: {}", e);
                exit(1)
            }
        }
    }

    //every source read goes in files, so errors can show where they come from
    let mut files = SimpleFiles::new();
    let result = if args.cmd_compile {
        compile(&args, &mut files)
    } else if args.cmd_lock {
        lock(&args, &mut files)
    } else if args.cmd_manifest {
        manifest(&args)
    } else {
        Ok(())
    };
    if let Err(error) = result {
        if FlownetError::new(error, Rc::new(files)).print().is_err() {
            eprintln!("Error: cannot render the diagnostic");
        }
        exit(1)
    }
}
