use anatomist::{CandidateProgram, NodeClassifier, NodeKindCategory, ParserHost, ScanMode, Scope};
use clap::{Parser, Subcommand};
use common::snapshot::MappedSnapshot;
use common::StructureIntrospectable;
use oracle::{
    AnnotationMode, EntryOutcome, Facet, MatchPolicy, OracleVerifier, PrefixRedactor,
    VerificationReport,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "structor")]
#[command(about = "Structural oracle verification for Java submissions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a candidate program against an oracle file.
    Verify {
        /// Oracle JSON file.
        #[arg(long, env = "STRUCTOR_ORACLE")]
        oracle: PathBuf,
        /// Root of the candidate's Java sources.
        #[arg(long, conflicts_with = "snapshot", required_unless_present = "snapshot")]
        sources: Option<PathBuf>,
        /// Previously saved structure snapshot.
        #[arg(long)]
        snapshot: Option<PathBuf>,
        /// Check only this facet (e.g. `methods`, `enum-values`).
        #[arg(long)]
        facet: Option<Facet>,
        /// `equal` or `contains`.
        #[arg(long, env = "STRUCTOR_ANNOTATION_MODE", default_value = "equal")]
        annotation_mode: AnnotationMode,
        /// Also compare annotation element values.
        #[arg(long, env = "STRUCTOR_STRICT_ANNOTATIONS")]
        strict_annotations: bool,
        /// Let inherited non-private members satisfy expectations.
        #[arg(long, env = "STRUCTOR_INHERITED")]
        inherited: bool,
        /// Verify entries in parallel.
        #[arg(long)]
        concurrent: bool,
        /// Per-entry wall-clock budget in milliseconds (implies --concurrent).
        #[arg(long, env = "STRUCTOR_BUDGET_MS")]
        budget_ms: Option<u64>,
        /// Fragments to scrub from report text (comma separated).
        #[arg(long, env = "STRUCTOR_REDACT", value_delimiter = ',')]
        redact: Vec<String>,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Introspect a source tree and save it as a memory-mappable snapshot.
    Snapshot {
        /// Root of the Java sources.
        sources: PathBuf,
        /// Output file.
        #[arg(long, short)]
        out: PathBuf,
    },
    /// Report which node-kind categories occur in Java sources.
    Detect {
        /// Java file or directory.
        path: PathBuf,
        /// Categories to look for (e.g. `loop,if,local-record`).
        #[arg(long, short, required = true, value_delimiter = ',')]
        category: Vec<NodeKindCategory>,
        /// Restrict the search to methods of this name (single file only).
        #[arg(long)]
        method: Option<String>,
        /// Only methods of the type with this simple name.
        #[arg(long, requires = "method")]
        class: Option<String>,
        /// Count every occurrence instead of stopping at the first hits.
        #[arg(long)]
        exhaustive: bool,
        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("warning: .env: {}", e);
        }
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Verify {
            oracle,
            sources,
            snapshot,
            facet,
            annotation_mode,
            strict_annotations,
            inherited,
            concurrent,
            budget_ms,
            redact,
            json,
        } => {
            let policy = MatchPolicy::default()
                .with_annotation_mode(annotation_mode)
                .with_annotation_attributes(strict_annotations)
                .with_inherited(inherited);
            let options = VerifyOptions {
                facet,
                concurrent: concurrent || budget_ms.is_some(),
                budget: budget_ms.map(Duration::from_millis),
                redact,
                json,
            };
            let passed =
                cmd_verify(&oracle, sources.as_deref(), snapshot.as_deref(), policy, options)
                    .await?;
            if !passed {
                std::process::exit(1);
            }
        }
        Commands::Snapshot { sources, out } => cmd_snapshot(&sources, &out)?,
        Commands::Detect {
            path,
            category,
            method,
            class,
            exhaustive,
            json,
        } => {
            let scope = match method {
                Some(name) => Scope::Method { class, name },
                None => Scope::WholeFile,
            };
            let mode = if exhaustive {
                ScanMode::Exhaustive
            } else {
                ScanMode::FirstHit
            };
            cmd_detect(&path, &category, &scope, mode, json)?;
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// verify
// ---------------------------------------------------------------------------

struct VerifyOptions {
    facet: Option<Facet>,
    concurrent: bool,
    budget: Option<Duration>,
    redact: Vec<String>,
    json: bool,
}

async fn cmd_verify(
    oracle_path: &Path,
    sources: Option<&Path>,
    snapshot: Option<&Path>,
    policy: MatchPolicy,
    options: VerifyOptions,
) -> anyhow::Result<bool> {
    let oracle = oracle::load_path(oracle_path)?;
    let program: Arc<dyn StructureIntrospectable> = match (sources, snapshot) {
        (Some(root), _) => Arc::new(CandidateProgram::load_dir(root)?),
        (None, Some(path)) => Arc::new(MappedSnapshot::open(path)?),
        (None, None) => anyhow::bail!("either --sources or --snapshot is required"),
    };
    let verifier = Arc::new(OracleVerifier::new(oracle).with_policy(policy));

    let report = match options.facet {
        Some(facet) => {
            if options.concurrent {
                tracing::warn!("--facet runs sequentially; ignoring --concurrent");
            }
            verifier.verify_facet(program.as_ref(), facet)?
        }
        None if options.concurrent => verifier.verify_concurrent(program, options.budget).await,
        None => verifier.verify(program.as_ref()),
    };

    let report = if options.redact.is_empty() {
        report
    } else {
        report.redacted(&PrefixRedactor::new(options.redact))
    };

    if options.json {
        println!("{}", report.to_json()?);
    } else {
        print_report(&report);
    }
    Ok(report.passed())
}

fn print_report(report: &VerificationReport) {
    let summary = report.summary();
    println!("+------------------------------------------+");
    println!("| STRUCTOR VERIFY                          |");
    println!("+------------------------------------------+");
    println!("| Entries        : {:>22} |", summary.entries);
    println!("| Passed         : {:>22} |", summary.passed);
    println!("| Failed         : {:>22} |", summary.failed);
    println!("| Not found      : {:>22} |", summary.not_found);
    println!("| Misconfigured  : {:>22} |", summary.misconfigured);
    println!("| Timed out      : {:>22} |", summary.timed_out);
    println!("+------------------------------------------+");

    for (name, entry) in &report.entries {
        match &entry.outcome {
            EntryOutcome::Resolved { facets } => {
                let failing: Vec<_> = facets.iter().filter(|v| !v.passed).collect();
                if failing.is_empty() {
                    println!("PASS  {name}");
                    continue;
                }
                println!("FAIL  {name}");
                for verdict in failing {
                    for d in &verdict.discrepancies {
                        println!("  [{}] {}", verdict.facet, d.message);
                    }
                }
            }
            EntryOutcome::NotFound => {
                println!("FAIL  {name}");
                println!("  The class '{name}' was not found or is named wrongly.");
            }
            EntryOutcome::Misconfigured { reason } => println!("ERROR {name}: {reason}"),
            EntryOutcome::TimedOut { budget_ms } => {
                println!("FAIL  {name}: exceeded the {budget_ms} ms budget")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// snapshot
// ---------------------------------------------------------------------------

fn cmd_snapshot(sources: &Path, out: &Path) -> anyhow::Result<()> {
    let program = CandidateProgram::load_dir(sources)?;
    program.to_snapshot().save(out)?;
    println!("Saved {} types to {}", program.len(), out.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// detect
// ---------------------------------------------------------------------------

fn cmd_detect(
    path: &Path,
    categories: &[NodeKindCategory],
    scope: &Scope,
    mode: ScanMode,
    json: bool,
) -> anyhow::Result<()> {
    let classifier = NodeClassifier::java();
    let report = if path.is_dir() {
        if *scope != Scope::WholeFile {
            anyhow::bail!("--method needs a single Java file, not a directory");
        }
        classifier.scan_directory(path, categories, mode)?
    } else {
        let mut host = ParserHost::new()?;
        let tree = host.parse_file(path)?;
        classifier.presence(&tree, categories, scope, mode)?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for presence in report.categories.values() {
        let mark = if presence.present { "yes" } else { "no " };
        println!("{mark}  {:<24} {:>4}", presence.category, presence.count);
        for occ in &presence.occurrences {
            println!("       {}:{}-{} ({})", occ.path, occ.start_line, occ.end_line, occ.node_kind);
        }
    }
    Ok(())
}
