use clap::{value_parser, Arg, ArgAction, Command};
use oledsim::config::InterpreterConfig;
use oledsim::framebuffer::{PixelBuffer, BUFFER_BYTES};
use oledsim::{repl, runner};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let matches = Command::new("oledsim")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Sandboxed preview interpreter for 128x64 OLED drawing scripts")
        .arg(
            Arg::new("file")
                .help("The script file to execute")
                .value_name("FILE")
                .index(1),
        )
        .arg(
            Arg::new("interactive")
                .short('i')
                .long("interactive")
                .help("Start in interactive REPL mode")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_name("FILE")
                .help("Raw 1024-byte framebuffer to draw on top of")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Write the resulting raw framebuffer to FILE")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Interpreter settings (TOML)")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("max-steps")
                .long("max-steps")
                .value_name("N")
                .help("Override the evaluation step budget")
                .value_parser(value_parser!(u64).range(1..)),
        )
        .get_matches();

    init_logging();

    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => InterpreterConfig::load(path).unwrap_or_else(|e| fail(&e.to_string())),
        None => InterpreterConfig::default(),
    };
    if let Some(&max_steps) = matches.get_one::<u64>("max-steps") {
        config.max_steps = max_steps;
    }

    let seed = matches
        .get_one::<PathBuf>("seed")
        .map(|path| read_seed(path));

    match matches.get_one::<String>("file") {
        Some(file_path) if !matches.get_flag("interactive") => {
            let pixels = run_file(Path::new(file_path), seed.as_ref(), &config);
            print!("{}", pixels.to_ascii());
            if let Some(output) = matches.get_one::<PathBuf>("output") {
                if let Err(e) = fs::write(output, pixels.as_bytes()) {
                    fail(&format!("Error writing '{}': {}", output.display(), e));
                }
            }
        }
        _ => repl::start(&config, seed),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_file(path: &Path, seed: Option<&PixelBuffer>, config: &InterpreterConfig) -> PixelBuffer {
    if !path.exists() {
        fail(&format!("Error: File '{}' not found", path.display()));
    }

    let source = fs::read_to_string(path)
        .unwrap_or_else(|e| fail(&format!("Error reading file '{}': {}", path.display(), e)));

    let filename = path.to_string_lossy();
    match runner::run(&source, Some(&filename), seed, config) {
        Some(pixels) => pixels,
        None => process::exit(1),
    }
}

fn read_seed(path: &Path) -> PixelBuffer {
    let bytes = fs::read(path)
        .unwrap_or_else(|e| fail(&format!("Error reading seed '{}': {}", path.display(), e)));
    PixelBuffer::from_bytes(&bytes).unwrap_or_else(|| {
        fail(&format!(
            "Seed '{}' must be exactly {} bytes, got {}",
            path.display(),
            BUFFER_BYTES,
            bytes.len()
        ))
    })
}

fn fail(message: &str) -> ! {
    eprintln!("{}", message);
    process::exit(1);
}
