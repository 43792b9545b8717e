use chrono::Local;
use clap::{Parser, Subcommand};
use report_overlay::serve::{self, ServeOptions};
use report_overlay::{load_config, Error, OverlayConfig, ReportExporter, Session};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "report-overlay")]
#[command(author, version, about = "Scroll, preview and export behaviour for analysis result pages")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Overlay configuration (TOML); defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a JSON session against the in-memory page and print the transcript
    Replay {
        /// Session file
        session: PathBuf,

        /// Pretty-print the transcript
        #[arg(long)]
        pretty: bool,
    },

    /// Wrap a saved results fragment into a standalone report
    Export {
        /// HTML fragment holding the rendered results
        fragment: PathBuf,

        /// Directory for the generated report
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        /// Don't open the report afterwards
        #[arg(long)]
        no_open: bool,
    },

    /// Serve a results page with the wasm overlay injected
    Serve {
        /// Page to serve at `/`
        page: PathBuf,

        /// Port to listen on
        #[arg(short, long, default_value = "3001")]
        port: u16,

        /// wasm-pack output directory served under /pkg/
        #[arg(long, default_value = "pkg")]
        pkg_dir: PathBuf,

        /// Don't open the browser
        #[arg(long)]
        no_open: bool,
    },

    /// Print the default configuration as TOML
    Config,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("report_overlay=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = match args.config {
        Some(ref path) => load_config(path),
        None => OverlayConfig::default(),
    };

    let result = match args.command {
        Command::Replay { session, pretty } => run_replay(&session, &config, pretty),
        Command::Export { fragment, out_dir, no_open } => run_export(&fragment, &out_dir, &config, !no_open),
        Command::Serve { page, port, pkg_dir, no_open } => serve::start(ServeOptions {
            port,
            page,
            pkg_dir,
            open_browser: !no_open,
        })
        .map_err(Error::from),
        Command::Config => config.to_toml_string().map(|toml| print!("{}", toml)),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run_replay(path: &Path, config: &OverlayConfig, pretty: bool) -> Result<(), Error> {
    let session = Session::load(path)?;
    let transcript = report_overlay::replay(&session, config)?;
    let json = if pretty {
        serde_json::to_string_pretty(&transcript)?
    } else {
        serde_json::to_string(&transcript)?
    };
    println!("{}", json);
    Ok(())
}

fn run_export(fragment: &Path, out_dir: &Path, config: &OverlayConfig, open_report: bool) -> Result<(), Error> {
    let exporter = ReportExporter::new(&config.export)?;
    let content = fs::read_to_string(fragment)?;
    let path = exporter.write_to_dir(&content, out_dir, &Local::now()).map_err(|e| match e {
        Error::NoReportContent => {
            eprintln!("{}", exporter.missing_notice());
            e
        }
        other => other,
    })?;

    eprintln!("\x1b[32mReport saved: {}\x1b[0m", path.display());
    if open_report {
        if let Err(e) = open::that(&path) {
            eprintln!("Failed to open report: {}", e);
        }
    }
    Ok(())
}
