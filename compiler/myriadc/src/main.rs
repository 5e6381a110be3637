//! Myriad generator CLI.

use myriadc::commands::{generate, runtime_header, Emitted, OutputOptions};
use myriadc::DriverError;

fn main() {
    myriadc::init_tracing();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let command = &args[1];

    match command.as_str() {
        "gen" => {
            let (output, paths) = parse_output(&args[2..]);
            if paths.is_empty() {
                eprintln!("Usage: myriadc gen <descriptor.json>... [-o <dir>] [--print]");
                std::process::exit(1);
            }
            finish(generate(&paths, &output));
        }
        "runtime" => {
            let (output, rest) = parse_output(&args[2..]);
            if let Some(extra) = rest.first() {
                eprintln!("error: unexpected argument '{extra}'");
                eprintln!("Usage: myriadc runtime [-o <dir>] [--print]");
                std::process::exit(1);
            }
            finish(runtime_header(&output));
        }
        "help" | "--help" | "-h" => {
            print_usage();
        }
        "version" | "--version" | "-V" => {
            println!("myriadc {}", env!("CARGO_PKG_VERSION"));
        }
        _ => {
            eprintln!("Unknown command: {command}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}

fn parse_output(args: &[String]) -> (OutputOptions, Vec<String>) {
    match OutputOptions::parse(args) {
        Ok(parsed) => parsed,
        Err(message) => {
            eprintln!("error: {message}");
            std::process::exit(1);
        }
    }
}

fn finish(result: Result<Vec<Emitted>, DriverError>) {
    match result {
        Ok(emitted) => {
            for file in emitted {
                match file {
                    Emitted::Written(path) => println!("wrote {}", path.display()),
                    Emitted::Printed { name, text } => {
                        println!("// ---- {name} ----");
                        print!("{text}");
                    }
                }
            }
        }
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!("Myriad object system generator");
    println!();
    println!("Usage: myriadc <command> [options]");
    println!();
    println!("Commands:");
    println!("  gen <descriptor.json>...  Generate C for class descriptors, in order");
    println!("  runtime                   Generate the MyriadObject.h runtime header");
    println!("  help                      Show this help message");
    println!("  version                   Show version information");
    println!();
    println!("Options:");
    println!("  -o, --out <dir>     Output directory (default: current directory)");
    println!("  -p, --print         Print generated files instead of writing them");
    println!();
    println!("Environment:");
    println!("  RUST_LOG=myriad_codegen=debug   Trace module and class resolution");
    println!();
    println!("Examples:");
    println!("  myriadc runtime -o build/");
    println!("  myriadc gen Compartment.json HHSomaCompartment.json -o build/");
    println!("  myriadc gen Mechanism.json --print");
}
