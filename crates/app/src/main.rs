//! swarmbench - spawn an ephemeral node in a content-addressed P2P
//! network, watch it discover peers, probe their round-trip latency,
//! then benchmark sequential content retrieval.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use common::config::HarnessConfig;
use common::error::HarnessError;
use common::suite::{BenchmarkSuite, SuitePaths, SuiteReport};
use peer::{parse_node_addr, Node};

/// Benchmark peer discovery, latency, and retrieval in a
/// content-addressed P2P network
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Peer-discovery observation window in seconds (default: 60)
    #[arg(long)]
    window_secs: Option<u64>,

    /// Seconds between discovery samples (default: 1)
    #[arg(long)]
    tick_interval_secs: Option<u64>,

    /// Round-trip probes issued per connected peer (default: 10)
    #[arg(long)]
    probes_per_peer: Option<u32>,

    /// Retrieval counts at which to emit a cumulative checkpoint
    /// (default: 10,20,40)
    #[arg(long, value_delimiter = ',')]
    checkpoints: Option<Vec<u64>>,

    /// TOML file with harness options; explicit flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// Newline-delimited list of content identifiers to retrieve
    #[arg(long, default_value = "input.txt")]
    input: PathBuf,

    /// Output path for per-tick peer counts
    #[arg(long, default_value = "peers-sec.csv")]
    peers_out: PathBuf,

    /// Output path for retrieval checkpoints
    #[arg(long, default_value = "query.csv")]
    query_out: PathBuf,

    /// UDP port for the node (ephemeral if not set)
    #[arg(long)]
    peer_port: Option<u16>,

    /// Filesystem path for blob storage (in-memory if not set)
    #[arg(long)]
    blobs: Option<PathBuf>,

    /// Known peer to introduce up front, as
    /// <node-id>[@<sock-addr>,...]; repeatable
    #[arg(long)]
    bootstrap: Vec<String>,

    /// Disable mainline DHT discovery (closed networks)
    #[arg(long)]
    no_discovery: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    let (writer, _guard) = tracing_appender::non_blocking(std::io::stdout());
    let log_level: tracing::Level = args.log_level.parse().unwrap_or(tracing::Level::INFO);
    let env_filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();
    let fmt_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(writer)
        .with_filter(env_filter);
    tracing_subscriber::registry().with(fmt_layer).init();

    std::process::exit(run(args).await);
}

async fn run(args: Args) -> i32 {
    let config = match resolve_config(&args) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("invalid configuration: {}", e);
            return 1;
        }
    };

    let suite = match BenchmarkSuite::new(config) {
        Ok(suite) => suite,
        Err(e) => {
            tracing::error!("invalid configuration: {}", e);
            return 1;
        }
    };

    // acquiring the network provider is the only failure that aborts
    // before any measurement runs
    let node = match acquire_node(&args).await {
        Ok(node) => node,
        Err(e) => {
            tracing::error!("{}", HarnessError::ProviderAcquisition(e));
            return 2;
        }
    };

    let paths = SuitePaths {
        request_list: args.input.clone(),
        peer_series: args.peers_out.clone(),
        retrieval_series: args.query_out.clone(),
    };

    match suite.run(node, &paths).await {
        Ok(report) => {
            print_summary(&report, &paths);
            0
        }
        Err(e) => {
            tracing::error!("benchmark suite failed: {}", e);
            1
        }
    }
}

/// Config file as the base, explicit flags on top.
fn resolve_config(args: &Args) -> Result<HarnessConfig, common::config::ConfigError> {
    let base = match &args.config {
        Some(path) => HarnessConfig::load(path)?,
        None => HarnessConfig::default(),
    };
    Ok(HarnessConfig {
        window_secs: args.window_secs.unwrap_or(base.window_secs),
        tick_interval_secs: args.tick_interval_secs.unwrap_or(base.tick_interval_secs),
        probes_per_peer: args.probes_per_peer.unwrap_or(base.probes_per_peer),
        checkpoint_counts: match &args.checkpoints {
            Some(counts) => counts.iter().copied().collect(),
            None => base.checkpoint_counts,
        },
    })
}

/// Spawn the ephemeral node and introduce any bootstrap peers.
async fn acquire_node(args: &Args) -> anyhow::Result<Node> {
    let mut builder = Node::builder();
    if let Some(port) = args.peer_port {
        builder = builder.port(port);
    }
    if let Some(path) = &args.blobs {
        builder = builder.blobs_path(path.clone());
    }
    if args.no_discovery {
        builder = builder.disable_discovery();
    }
    let node = builder.spawn().await?;

    for spec in &args.bootstrap {
        let addr = parse_node_addr(spec)?;
        node.add_bootstrap(addr)?;
    }

    Ok(node)
}

fn print_summary(report: &SuiteReport, paths: &SuitePaths) {
    println!(
        "discovery: {} samples written to {} (peak {} peers)",
        report.samples.len(),
        paths.peer_series.display(),
        report.peak_peer_count()
    );
    match report.latency.average_rtt() {
        Ok(avg) => println!(
            "latency:   {} successful probes, average rtt {} msec",
            report.latency.successful_probes(),
            avg.as_millis()
        ),
        Err(_) => println!("latency:   no successful probes"),
    }
    println!(
        "retrieval: {} requests ({} failed), {} checkpoints written to {}",
        report.requests,
        report.failed_retrievals,
        report.checkpoints.len(),
        paths.retrieval_series.display()
    );
}
