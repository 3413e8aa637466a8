//! Clean a single logo image and print what was kept.
//!
//! Usage:
//! ```sh
//! cargo run --example clean_logo -- input.png output.png
//! ```

use std::env;
use std::process;

use logo_cleanup::{CleanOptions, CleanupEngine, Strategy};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <input> <output> [hard]", args[0]);
        process::exit(1);
    }

    let input = &args[1];
    let output = &args[2];

    let mut opts = CleanOptions::default();
    if args.get(3).is_some_and(|a| a == "hard") {
        opts.strategy = Strategy::hard();
    }

    let engine = CleanupEngine::new();
    let result = engine.process_file(input.as_ref(), output.as_ref(), &opts);

    if result.success {
        println!("Done: {}", result.message);
    } else {
        eprintln!("Error: {}", result.message);
        process::exit(1);
    }
}
