use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, ValueEnum};
use tracing::Level;

use logo_cleanup::composite::{DEFAULT_BACKGROUND_SIGMA, DEFAULT_FEATHER_FRACTION};
use logo_cleanup::{
    default_output_path, Background, CleanOptions, CleanupEngine, ProcessResult, Strategy,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
    /// Repaint everything outside the logo with white
    Hard,
    /// Blend the logo over a synthesized background
    Feathered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackgroundArg {
    /// Flat color averaged from the border
    Solid,
    /// Heavily blurred copy of the image
    Blurred,
}

#[derive(Parser)]
#[command(
    name = "logo-cleanup",
    about = "Isolate generated logo artwork and strip captions and watermark text",
    version,
    after_help = "Simple usage: logo-cleanup <image>  (writes {name}_clean.{ext} next to it)\n\n\
                  Text detection is not bundled with the CLI; cleanup relies on pixel statistics."
)]
struct Cli {
    /// Input image file or directory
    input: String,

    /// Output file or directory (default: {name}_clean.{ext})
    #[arg(short, long)]
    output: Option<String>,

    /// How the area outside the logo is removed
    #[arg(long, value_enum, default_value_t = StrategyArg::Feathered)]
    strategy: StrategyArg,

    /// Background behind the feathered composite
    #[arg(long, value_enum, default_value_t = BackgroundArg::Solid)]
    background: BackgroundArg,

    /// Feather radius as a fraction of the shorter image side
    #[arg(long, default_value_t = DEFAULT_FEATHER_FRACTION)]
    feather: f32,

    /// Gaussian sigma for the blurred background
    #[arg(long, default_value_t = DEFAULT_BACKGROUND_SIGMA)]
    blur_sigma: f32,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.quiet {
        Level::WARN
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if !(0.0..=0.5).contains(&cli.feather) {
        eprintln!("Error: Feather must be between 0.0 and 0.5");
        process::exit(1);
    }
    if cli.blur_sigma <= 0.0 {
        eprintln!("Error: Blur sigma must be positive");
        process::exit(1);
    }

    let strategy = match cli.strategy {
        StrategyArg::Hard => Strategy::hard(),
        StrategyArg::Feathered => Strategy::Feathered {
            feather_fraction: cli.feather,
            background: match cli.background {
                BackgroundArg::Solid => Background::Solid,
                BackgroundArg::Blurred => Background::Blurred {
                    sigma: cli.blur_sigma,
                },
            },
        },
    };

    let opts = CleanOptions { strategy };

    let engine = CleanupEngine::new();

    let input_path = Path::new(&cli.input);
    if !input_path.exists() {
        eprintln!("Error: Input path does not exist: {}", cli.input);
        process::exit(1);
    }

    let results = if input_path.is_dir() {
        let output_dir = if let Some(o) = &cli.output {
            PathBuf::from(o)
        } else {
            eprintln!("Error: Output directory is required for batch processing");
            eprintln!("Usage: logo-cleanup <input_dir> -o <output_dir>");
            process::exit(1);
        };
        engine.process_directory(input_path, &output_dir, &opts)
    } else {
        let output_path = match &cli.output {
            Some(o) => PathBuf::from(o),
            None => default_output_path(input_path),
        };
        vec![engine.process_file(input_path, &output_path, &opts)]
    };

    let mut success_count = 0u32;
    let mut fallback_count = 0u32;
    let mut fail_count = 0u32;

    for r in &results {
        print_result(r, &cli);
        if r.success {
            success_count += 1;
            if r.used_center_fallback {
                fallback_count += 1;
            }
        } else {
            fail_count += 1;
        }
    }

    if results.len() > 1 && !cli.quiet {
        eprintln!();
        eprint!("[Summary] Processed: {success_count}");
        if fallback_count > 0 {
            eprint!(", Center fallback: {fallback_count}");
        }
        if fail_count > 0 {
            eprint!(", Failed: {fail_count}");
        }
        eprintln!(" (Total: {})", results.len());
    }

    if fail_count > 0 {
        process::exit(1);
    }
}

fn print_result(result: &ProcessResult, cli: &Cli) {
    if cli.quiet && result.success {
        return;
    }

    let filename = result.path.file_name().map_or_else(
        || result.path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    );

    if result.success {
        if !cli.quiet {
            if result.used_center_fallback {
                eprintln!("[WARN] {filename}: no logo component, kept center third");
            } else {
                eprintln!("[OK] {filename}");
            }
        }
    } else {
        eprintln!("[FAIL] {filename}: {}", result.message);
    }

    if cli.verbose && !result.message.is_empty() {
        eprintln!("  -> {}", result.message);
    }
}
