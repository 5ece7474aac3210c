//! prefcli - A Serial Command Shell for Typed Preferences
//!
//! This is the main entry point for the preference shell.
//! It sets up the storage engine and serves the shell on stdin/stdout, or on
//! a TCP port acting as a serial bridge.

use anyhow::Context;
use prefcli::commands::{PreferencesCli, DEFAULT_RESPONSE_CAPACITY, MIN_RESPONSE_CAPACITY};
use prefcli::connection::{handle_connection, run_stdio, ConnectionStats, Shell};
use prefcli::storage::{FlashArea, StorageEngine, Unsupported};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Shell configuration
struct Config {
    /// Snapshot file; memory-only when unset
    data: Option<PathBuf>,
    /// Serial bridge address; stdin/stdout when unset
    listen: Option<String>,
    /// Response line capacity in bytes
    buffer_size: usize,
    /// Whether a bare `clearpreference` may erase everything
    erase: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: None,
            listen: None,
            buffer_size: DEFAULT_RESPONSE_CAPACITY,
            erase: true,
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let mut config = Config::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--data" | "-d" => {
                    config.data = Some(PathBuf::from(required_value(&args, i)));
                    i += 2;
                }
                "--listen" | "-l" => {
                    config.listen = Some(required_value(&args, i).to_string());
                    i += 2;
                }
                "--buffer-size" | "-b" => {
                    let size: usize = required_value(&args, i).parse().unwrap_or_else(|_| {
                        eprintln!("Error: invalid buffer size");
                        std::process::exit(1);
                    });
                    if size < MIN_RESPONSE_CAPACITY {
                        eprintln!(
                            "Error: --buffer-size must be at least {}",
                            MIN_RESPONSE_CAPACITY
                        );
                        std::process::exit(1);
                    }
                    config.buffer_size = size;
                    i += 2;
                }
                "--no-erase" => {
                    config.erase = false;
                    i += 1;
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("prefcli version {}", prefcli::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        config
    }
}

/// Returns the value following the option at `i`, or exits.
fn required_value(args: &[String], i: usize) -> &str {
    match args.get(i + 1) {
        Some(value) => value,
        None => {
            eprintln!("Error: {} requires a value", args[i]);
            std::process::exit(1);
        }
    }
}

fn print_help() {
    println!(
        r#"
prefcli - A Serial Command Shell for Typed Preferences

USAGE:
    prefcli [OPTIONS]

OPTIONS:
    -d, --data <FILE>          Persist preferences to a snapshot file
    -l, --listen <ADDR>        Serve TCP clients instead of stdin/stdout
    -b, --buffer-size <N>      Response line capacity (default: 256, minimum: 8)
        --no-erase             Refuse to erase all preferences at once
    -v, --version              Print version information
    -h, --help                 Print this help message

EXAMPLES:
    prefcli                              # Interactive shell, memory only
    prefcli --data prefs.bin             # Keep preferences between runs
    prefcli --listen 127.0.0.1:2323      # Serial bridge over TCP

COMMANDS:
    > setp wifi ssid String home
    'home' stored as a String (4 Bytes) in wifi/ssid
    > getp wifi ssid
    String
    > getp wifi ssid String
    home
    > clearp wifi ssid
    'ssid' has been cleared from namespace 'wifi'

Type `help` in the shell for the full command reference.
"#
    );
}

fn print_banner(config: &Config) {
    let storage = match &config.data {
        Some(path) => path.display().to_string(),
        None => "memory only".to_string(),
    };
    let session = config.listen.as_deref().unwrap_or("stdin/stdout");

    // Stdout belongs to the shell
    eprintln!(
        r#"
prefcli v{} - Serial Command Shell for Typed Preferences
──────────────────────────────────────────────────────────────
Storage:  {}
Session:  {}
Full erase: {}

Type `help` for commands. Use Ctrl+C to shutdown gracefully.
"#,
        prefcli::VERSION,
        storage,
        session,
        if config.erase { "enabled" } else { "disabled" }
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = Config::from_args();

    // Set up logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    print_banner(&config);

    // Create the storage engine (shared across all sessions)
    let storage = match &config.data {
        Some(path) => StorageEngine::with_snapshot(path)
            .with_context(|| format!("failed to load snapshot {}", path.display()))?,
        None => StorageEngine::new(),
    };
    let storage = Arc::new(storage);

    let flash: Arc<dyn FlashArea> = if config.erase {
        storage.clone()
    } else {
        Arc::new(Unsupported)
    };

    let cli = PreferencesCli::new(Arc::clone(&storage), flash)
        .with_response_capacity(config.buffer_size);
    let shell = Shell::new(cli);
    info!(
        commands = shell.registry().commands().len(),
        buffer_size = config.buffer_size,
        "Shell initialized"
    );

    let stats = Arc::new(ConnectionStats::new());

    // Set up graceful shutdown
    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received, stopping shell...");
    };

    let interrupted = match &config.listen {
        Some(addr) => {
            let listener = TcpListener::bind(addr)
                .await
                .with_context(|| format!("failed to bind {}", addr))?;
            info!("Listening on {}", addr);

            tokio::select! {
                _ = accept_loop(listener, shell, Arc::clone(&stats)) => false,
                _ = shutdown => true,
            }
        }
        None => {
            tokio::select! {
                result = run_stdio(shell, Arc::clone(&stats)) => {
                    result?;
                    false
                }
                _ = shutdown => true,
            }
        }
    };

    let storage_stats = storage.stats();
    info!(
        namespaces = storage_stats.namespaces,
        keys = storage_stats.keys,
        gets = storage_stats.get_ops,
        sets = storage_stats.set_ops,
        deletes = storage_stats.del_ops,
        lines = stats.commands_processed.load(Ordering::Relaxed),
        "Shell shutdown complete"
    );

    if interrupted && config.listen.is_none() {
        // A pending blocking stdin read would hold up runtime shutdown
        std::process::exit(0);
    }
    Ok(())
}

/// Main loop that accepts serial bridge clients
async fn accept_loop(listener: TcpListener, shell: Shell, stats: Arc<ConnectionStats>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let shell = shell.clone();
                let stats = Arc::clone(&stats);

                // Spawn a task to handle this client
                tokio::spawn(async move {
                    handle_connection(stream, addr, shell, stats).await;
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
