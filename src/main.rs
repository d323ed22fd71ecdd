use std::env;
use std::fs;
use std::process;

const USAGE: &str = "usage: pdftext [-q] <file.pdf>

Extracts the text of a PDF file to stdout.

options:
  -q, --quiet   suppress warnings
  -h, --help    show this help";

fn main() {
    let mut quiet = false;
    let mut input: Option<String> = None;

    for arg in env::args().skip(1) {
        match arg.as_str() {
            "-q" | "--quiet" => quiet = true,
            "-h" | "--help" => {
                println!("{USAGE}");
                return;
            }
            _ if arg.starts_with('-') => {
                eprintln!("pdftext: unknown option {arg}\n{USAGE}");
                process::exit(1);
            }
            _ => {
                if input.replace(arg).is_some() {
                    eprintln!("pdftext: expected exactly one input file\n{USAGE}");
                    process::exit(1);
                }
            }
        }
    }

    let path = match input {
        Some(p) => p,
        None => {
            eprintln!("{USAGE}");
            process::exit(1);
        }
    };

    if !quiet {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
            .init();
    }

    let bytes = match fs::read(&path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("pdftext: cannot read {path}: {e}");
            process::exit(1);
        }
    };

    match pdftext::extract_with_warnings(bytes) {
        Ok(extraction) => {
            if !quiet {
                for warning in &extraction.warnings {
                    log::warn!("{warning}");
                }
            }
            println!("{}", extraction.text);
        }
        Err(e) => {
            eprintln!("pdftext: {path}: {e}");
            process::exit(1);
        }
    }
}
