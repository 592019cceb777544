//! Binary entry point for the `litmatch` command-line tool.
//!
//! Dispatches the `compile` and `match` subcommands, maps files, and prints
//! results and optional statistics. All index and scan logic lives in the
//! library; this file is plumbing and exit codes.

use std::fs::File;
use std::io::Write;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use litmatch::cli::args::{Cli, Command, CompileArgs, MatchArgs};
use litmatch::cli::report::print_matches;
use litmatch::mapping::map_path;
use litmatch::{compile_patterns_file, MatchStats, Matcher};

fn run_compile(args: &CompileArgs, verbose: bool) -> anyhow::Result<()> {
    let stats = compile_patterns_file(&args.compiled, &args.patterns, args.transform.flags())
        .with_context(|| format!("compiling {}", args.patterns.display()))?;

    if verbose {
        eprintln!("{}", stats.summary_line());
        eprintln!("Compile completed successfully.");
    }
    Ok(())
}

fn run_match(args: &MatchArgs, verbose: bool) -> anyhow::Result<()> {
    let mut matcher = Matcher::open_or_compile(&args.compiled, args.transform.flags())
        .with_context(|| format!("opening {}", args.compiled.display()))?;

    if let Some(threads) = args.threads {
        matcher
            .set_threads(threads)
            .context("invalid --threads value")?;
    }
    if let Some(chunk) = args.chunk_size {
        matcher
            .set_chunk_size(chunk)
            .context("invalid --chunk-size value")?;
    }

    if verbose {
        if let Some(stats) = matcher.compile_stats() {
            eprintln!("{}", stats.summary_line());
        }
        matcher.header().emit_info(&mut std::io::stderr())?;
        eprintln!(
            "Scan threads: {}, chunk size: {}",
            matcher.threads(),
            matcher.chunk_size()
        );
    }

    // An empty haystack cannot be mapped and cannot contain matches.
    let hay_len = std::fs::metadata(&args.haystack)
        .with_context(|| format!("reading {}", args.haystack.display()))?
        .len();
    if hay_len == 0 {
        return Ok(());
    }
    let haystack = map_path(&args.haystack, true)
        .with_context(|| format!("mapping {}", args.haystack.display()))?;

    let mut stats = MatchStats::default();
    let matches = matcher.find_with_stats(&haystack, &args.options(), &mut stats)?;

    if verbose {
        eprintln!("{}", stats.summary_line(matches.len()));
    }

    match &args.output {
        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            print_matches(&mut file, &matches)?;
            file.flush()?;
        }
        None => {
            let stdout = std::io::stdout();
            print_matches(&mut stdout.lock(), &matches)?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let result = match &cli.command {
        Command::Compile(args) => run_compile(args, cli.verbose),
        Command::Match(args) => run_match(args, cli.verbose),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("litmatch: {e:#}");
            ExitCode::FAILURE
        }
    }
}
