//! Class-file test-case reducer CLI.
//!
//! **Usage**
//! - Reduce every class in the current directory against every `*.sh` there:
//!   `class-reducer`
//! - Explicit inputs: `class-reducer -c Foo.class -i crash.sh --timeout 30`
//! - Restrict modules: `class-reducer -m RemoveEmptyMethods -m RemoveWriteOnlyFields`
//! - Inspect the catalog: `class-reducer --list-modules [--json]`
//!
//! Reduced classes are written to `out/` (mirroring package directories) as
//! soon as a reduction is accepted, so an interrupted run keeps its progress.
use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing::error;

use class_reducer::args::Args;
use class_reducer::context::ContextFactory;
use class_reducer::logging;
use class_reducer_core::paths::atomic_write_json;
use class_reducer_core::{Registry, Session};

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = logging::init(args.verbose, args.log_format) {
        eprintln!("{:#}", e);
    }
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    if args.list_modules {
        return list_modules(args.json);
    }

    let factory = ContextFactory::from_args(args)?;
    let context = factory.create_context()?;
    let suite = factory.test_suite()?;
    let store = factory.load_store()?;

    let report = Session::new(&context, &suite, &store).run()?;

    if let Some(path) = &args.report {
        atomic_write_json(path, &report)?;
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for artifact in &report.artifacts {
            println!(
                "{}: {} -> {} bytes ({:.1}% smaller, {} tests) -> {}",
                artifact.name,
                artifact.original_size,
                artifact.final_size,
                artifact.reduction_ratio() * 100.0,
                artifact.stats.tests_run,
                artifact.output
            );
        }
        println!("{}", report.summary());
    }
    Ok(())
}

fn list_modules(json: bool) -> Result<()> {
    let modules = Registry::describe();
    if json {
        println!("{}", serde_json::to_string_pretty(&modules)?);
        return Ok(());
    }
    for m in &modules {
        println!(
            "{:<28} {:<8} {:<7} {:<9} {}",
            m.id,
            m.shape,
            format!("{:?}", m.soundness).to_lowercase(),
            format!("{:?}", m.cost).to_lowercase(),
            m.description
        );
    }
    Ok(())
}
