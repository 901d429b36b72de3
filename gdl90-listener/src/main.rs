//! gdl90: GDL90 decoder CLI.
//!
//! Supports:
//! - Listening for GDL90 datagrams on UDP
//! - Replaying binary or hex-dump capture files
//! - Decoding a single hex frame
//! - Showing and initializing `~/.gdl90/config.yaml`

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use comfy_table::{Cell, Table};
use tracing_subscriber::EnvFilter;

use gdl90_core::config::{self, Config, OutputFormat};
use gdl90_core::decode::decode_frame_with;
use gdl90_core::types::hex_decode;
use gdl90_core::{StreamDecoder, StreamStats};

mod capture;
mod listen;
mod render;

use render::Renderer;

#[derive(Parser)]
#[command(name = "gdl90", version, about = "GDL90 decoder and listener")]
struct Cli {
    /// Config file (default: ~/.gdl90/config.yaml)
    #[arg(long, global = true, env = "GDL90_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Listen for GDL90 datagrams and print each message
    Listen {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// UDP port
        #[arg(short, long)]
        port: Option<u16>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Replay a capture file (binary stream or hex dump, `-` for stdin)
    Decode {
        file: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Decode one hex-encoded frame (flag bytes optional)
    Frame {
        #[arg(required = true, num_args = 1..)]
        hex: Vec<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Print the effective configuration
    Config {
        /// Write the default configuration file
        #[arg(long)]
        init: bool,
    },
}

#[derive(Args)]
struct OutputArgs {
    /// Emit one JSON object per line
    #[arg(long)]
    json: bool,

    /// Include raw frame bytes
    #[arg(long)]
    hex: bool,

    /// Skip CRC verification
    #[arg(long)]
    no_verify: bool,

    /// Return device info fields even when its embedded checks fail
    #[arg(long)]
    best_effort: bool,
}

impl OutputArgs {
    /// Flags override values from the config file.
    fn apply(&self, config: &mut Config) {
        if self.json {
            config.output.format = OutputFormat::Json;
        }
        if self.hex {
            config.output.hex = true;
        }
        if self.no_verify {
            config.decoder.verify_checksum = false;
        }
        if self.best_effort {
            config.decoder.best_effort = true;
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    };

    match cli.command {
        Commands::Listen { host, port, output } => {
            output.apply(&mut config);
            if let Some(host) = host {
                config.listener.host = host;
            }
            if let Some(port) = port {
                config.listener.port = port;
            }
            cmd_listen(&config).await
        }
        Commands::Decode { file, output } => {
            output.apply(&mut config);
            cmd_decode(file, &config)
        }
        Commands::Frame { hex, output } => {
            output.apply(&mut config);
            cmd_frame(&hex.concat(), &config)
        }
        Commands::Config { init } => cmd_config(init, cli.config, &config),
    }
}

fn renderer_for(config: &Config) -> Renderer {
    Renderer::new(config.output.format, config.output.hex)
}

async fn cmd_listen(config: &Config) {
    let addr = format!("{}:{}", config.listener.host, config.listener.port);
    let renderer = renderer_for(config);

    let stats = match listen::run(&addr, config.decoder.clone(), renderer).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error listening on {addr}: {e}");
            std::process::exit(1);
        }
    };

    match config.output.format {
        OutputFormat::Json => {
            for (_, s) in &stats {
                println!("{}", renderer.summary_json(s));
            }
        }
        OutputFormat::Text => print_source_summary(&stats),
    }
}

fn cmd_decode(file: PathBuf, config: &Config) {
    let reader = capture::CaptureReader::new(&file);
    let (stream, format) = match reader.read_stream() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error reading {}: {e}", file.display());
            std::process::exit(1);
        }
    };

    tracing::info!(
        file = %file.display(),
        bytes = stream.len(),
        format = ?format,
        "replaying capture"
    );

    let renderer = renderer_for(config);
    let mut decoder = StreamDecoder::new(config.decoder.clone());

    for chunk in stream.chunks(capture::CHUNK_SIZE) {
        for event in decoder.decode_all(chunk) {
            println!("{}", renderer.event(&event));
        }
    }
    if let Some(event) = decoder.finish() {
        println!("{}", renderer.event(&event));
    }

    match config.output.format {
        OutputFormat::Json => println!("{}", renderer.summary_json(decoder.stats())),
        OutputFormat::Text => print_summary(decoder.stats()),
    }
}

fn cmd_frame(hex: &str, config: &Config) {
    let Some(bytes) = hex_decode(hex) else {
        eprintln!("Error: not a hex string: {hex}");
        std::process::exit(2);
    };

    let renderer = renderer_for(config);
    match decode_frame_with(&bytes, &config.decoder) {
        Ok(decoded) => println!("{}", renderer.decoded(&decoded, Some(&bytes))),
        Err(fault) => {
            println!("{}", renderer.fault(&fault));
            std::process::exit(1);
        }
    }
}

fn cmd_config(init: bool, path: Option<PathBuf>, config: &Config) {
    if init {
        let written = match &path {
            Some(p) => config::save_config_to(&Config::default(), p).map(|_| p.clone()),
            None => config::save_config(&Config::default()),
        };
        match written {
            Ok(p) => eprintln!("Wrote {}", p.display()),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    let source = path.unwrap_or_else(config::config_file);
    println!("# {}", source.display());
    print!("{}", config::serialize_config(config));
}

fn print_summary(stats: &StreamStats) {
    println!();
    println!(
        "Bytes: {}, frames: {} ({} decoded, {} suspect, {} unsupported, {} faults)",
        stats.bytes,
        stats.frames,
        stats.decoded,
        stats.suspect,
        stats.unsupported,
        stats.faults()
    );
    println!();

    let mut faults = Table::new();
    faults.set_header(vec!["Framing", "Integrity", "Length", "Field"]);
    faults.add_row(vec![
        Cell::new(stats.framing_faults),
        Cell::new(stats.integrity_faults),
        Cell::new(stats.length_faults),
        Cell::new(stats.field_faults),
    ]);
    println!("{faults}");

    if stats.by_kind.is_empty() {
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Message", "Count"]);
    for (kind, count) in &stats.by_kind {
        table.add_row(vec![Cell::new(format!("{kind:?}")), Cell::new(count)]);
    }
    println!("{table}");
}

fn print_source_summary(stats: &[(SocketAddr, StreamStats)]) {
    println!();
    if stats.is_empty() {
        println!("No datagrams received");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Source", "Bytes", "Frames", "Decoded", "Suspect", "Unsupported", "Faults",
    ]);
    for (peer, s) in stats {
        table.add_row(vec![
            Cell::new(peer),
            Cell::new(s.bytes),
            Cell::new(s.frames),
            Cell::new(s.decoded),
            Cell::new(s.suspect),
            Cell::new(s.unsupported),
            Cell::new(s.faults()),
        ]);
    }
    println!("{table}");
}
