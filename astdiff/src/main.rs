//! Command-line front end: print the edit script between two Python inputs.

use anyhow::{Context, Result, anyhow};
use astdiff::{ParseOptions, ParserKind};
use clap::{Parser, ValueEnum};
use gumdiff::{DiffOptions, GeneratorKind, MatcherKind, MatchingConfig, condense};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MatcherArg {
    Gumtree,
    Stub,
    ChangeDistiller,
}

impl From<MatcherArg> for MatcherKind {
    fn from(arg: MatcherArg) -> Self {
        match arg {
            MatcherArg::Gumtree => MatcherKind::GumTree,
            MatcherArg::Stub => MatcherKind::Stub,
            MatcherArg::ChangeDistiller => MatcherKind::ChangeDistiller,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ParserArg {
    Concrete,
    Abstract,
}

impl From<ParserArg> for ParserKind {
    fn from(arg: ParserArg) -> Self {
        match arg {
            ParserArg::Concrete => ParserKind::Concrete,
            ParserArg::Abstract => ParserKind::Abstract,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum GeneratorArg {
    WithMove,
}

impl From<GeneratorArg> for GeneratorKind {
    fn from(arg: GeneratorArg) -> Self {
        match arg {
            GeneratorArg::WithMove => GeneratorKind::WithMove,
        }
    }
}

/// Prints an edit script describing the differences between the syntax
/// trees of SOURCE and TARGET.
#[derive(Debug, Parser)]
#[command(name = "astdiff", version, about)]
struct Args {
    /// Python file (ending in .py) or code to diff from
    source: String,

    /// Python file (ending in .py) or code to diff to
    target: String,

    /// Syntax tree shape: concrete keeps keyword and operator tokens
    #[arg(long, value_enum, default_value_t = ParserArg::Concrete)]
    parser: ParserArg,

    /// Matching algorithm
    #[arg(long, value_enum, default_value_t = MatcherArg::Gumtree)]
    matcher: MatcherArg,

    /// Edit script generator
    #[arg(long, value_enum, default_value_t = GeneratorArg::WithMove)]
    generator: GeneratorArg,

    /// Minimum height of subtrees matched by hash (at least 1)
    #[arg(
        long,
        default_value_t = gumdiff::matching::DEFAULT_MIN_HEIGHT,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    min_height: usize,

    /// Largest subtree for which recovery matching runs
    #[arg(long, default_value_t = gumdiff::matching::DEFAULT_MAX_SIZE)]
    max_size: usize,

    /// Minimum Dice coefficient for container matches
    #[arg(long, default_value_t = gumdiff::matching::DEFAULT_MIN_DICE)]
    min_dice: f64,

    /// Hide inserts and deletes covered by an ancestor's
    #[arg(long)]
    condense: bool,

    /// Print the operations as JSON
    #[arg(long)]
    json: bool,

    /// Log filter (overrides RUST_LOG), e.g. `debug` or `gumdiff=trace`
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn diff_options(&self) -> DiffOptions {
        DiffOptions {
            matcher: self.matcher.into(),
            generator: self.generator.into(),
            matching: MatchingConfig {
                min_height: self.min_height,
                max_size: self.max_size,
                min_dice: self.min_dice,
            },
        }
    }

    fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            kind: self.parser.into(),
            ..ParseOptions::default()
        }
    }
}

fn init_logging(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_level.as_deref());

    tracing::debug!(source = %args.source, target = %args.target, "comparing");

    let (_, ctx) = astdiff::diff_paths_with(
        &args.source,
        &args.target,
        &args.diff_options(),
        args.parse_options(),
    )
    .context("could not diff the inputs")?;

    let script = if args.condense {
        condense(&ctx.edit_script)
    } else {
        ctx.edit_script
    };
    let ops = script.standalone(&ctx.source);

    if args.json {
        let json = facet_json::to_string(&ops)
            .map_err(|e| anyhow!("could not serialize the edit script: {e:?}"))?;
        println!("{json}");
    } else {
        println!("Edit script ({} ops):", ops.len());
        for op in &ops {
            println!("{op}");
        }
    }

    Ok(())
}
