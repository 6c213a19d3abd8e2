//! jackc CLI - compiles Jack files to VM code or an XML parse trace.
//!
//! Usage:
//!     jackc <file.jack | directory>
//!     jackc --xml <file.jack | directory>

use clap::Parser;
use jackc::{CompileOptions, OutputMode, compile_directory_with_options, compile_file_with_options, write_result};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "jackc")]
#[command(version)]
#[command(about = "Single-pass Jack to VM compiler")]
struct Args {
    /// Input .jack file or directory of .jack files
    #[arg(value_name = "PATH")]
    input: PathBuf,

    /// Emit an XML parse trace instead of VM code
    #[arg(short = 'x', long)]
    xml: bool,

    /// Output directory (defaults to the input's directory)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let options = CompileOptions {
        mode: if args.xml {
            OutputMode::Xml
        } else {
            OutputMode::Vm
        },
    };

    let (results, output_dir) = if args.input.is_file() {
        let result = compile_file_with_options(&args.input, options);
        let output_dir = args.output.unwrap_or_else(|| {
            args.input
                .parent()
                .unwrap_or(&PathBuf::from("."))
                .to_path_buf()
        });
        (vec![result], output_dir)
    } else if args.input.is_dir() {
        let results = compile_directory_with_options(&args.input, options);
        let output_dir = args.output.unwrap_or_else(|| args.input.clone());
        (results, output_dir)
    } else {
        eprintln!("Error: Input not found: {}", args.input.display());
        return ExitCode::from(2);
    };

    if results.is_empty() {
        eprintln!("Error: No .jack files found in {}", args.input.display());
        return ExitCode::from(2);
    }

    let mut has_errors = false;

    for result in &results {
        // Writing also clears stale artifacts for failed results.
        if let Err(e) = write_result(result, &output_dir) {
            eprintln!("{}", e);
            has_errors = true;
            continue;
        }

        if result.is_ok() {
            println!(
                "Compiled {}.jack -> {}.{}",
                result.filename,
                result.filename,
                result.mode.extension()
            );
        } else {
            has_errors = true;
            if let Some(report) = result.report() {
                eprint!("{}", report);
            }
        }
    }

    if has_errors {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}
