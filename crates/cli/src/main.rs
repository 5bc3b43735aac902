mod serve;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Laurel achievement review service.
#[derive(Parser)]
#[command(name = "laurel", version, about = "Laurel achievement review service")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Laurel HTTP API server
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8080")]
        port: u16,
    },

    /// Run the storage conformance suite against the in-memory backend
    Conformance,
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve { port } => {
            let rt = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");
            if let Err(e) = rt.block_on(serve::start_server(port)) {
                eprintln!("Server error: {}", e);
                process::exit(1);
            }
        }
        Commands::Conformance => {
            let rt = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");
            let report = rt.block_on(laurel_storage::conformance::run_conformance_suite(|| {
                async { laurel_storage::MemoryStore::new() }
            }));
            match cli.output {
                OutputFormat::Text => print!("{}", report),
                OutputFormat::Json => {
                    let results: Vec<serde_json::Value> = report
                        .results
                        .iter()
                        .map(|r| {
                            serde_json::json!({
                                "category": r.category,
                                "name": r.name,
                                "passed": r.passed,
                                "message": r.message,
                            })
                        })
                        .collect();
                    let out = serde_json::json!({
                        "passed": report.passed,
                        "failed": report.failed,
                        "total": report.total,
                        "results": results,
                    });
                    println!("{}", serde_json::to_string_pretty(&out).unwrap_or_default());
                }
            }
            if report.failed > 0 {
                process::exit(1);
            }
        }
    }
}

/// Initialize structured logging. `RUST_LOG` controls verbosity; the
/// default keeps laurel at info and everything else at warn.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,laurel=info,laurel_engine=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
