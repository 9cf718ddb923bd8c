use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use log::error;
use std::fs::File;
use std::path::PathBuf;

use rs_mail_forwarder::config::load_config;
use rs_mail_forwarder::forward::event::NotificationBatch;
use rs_mail_forwarder::forward::sender::{HttpMailSender, MailSender, StdoutMailSender};
use rs_mail_forwarder::forward::{ForwardConfig, run_forwarder};
use rs_mail_forwarder::mail::{Converter, DEFAULT_MAX_DEPTH, RawMessage};
use rs_mail_forwarder::store::fs::FsObjectStore;

#[derive(Parser)]
#[command(name = "rs_mail_forwarder")]
#[command(about = "Flatten stored emails and forward them through a mail API", long_about = None)]
struct Cli {
    /// Config file (defaults to the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Forward every object named in a notification batch
    Forward {
        /// Event JSON file; read from stdin when omitted
        #[arg(long)]
        event: Option<PathBuf>,

        /// Print the outgoing messages instead of sending them
        #[arg(long)]
        dry_run: bool,
    },

    /// Convert a local .eml file and print the result
    Convert {
        path: PathBuf,

        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let result = match cli.cmd {
        Command::Forward { event, dry_run } => forward(cli.config, event, dry_run),
        Command::Convert { path, max_depth } => convert(path, max_depth),
    };
    if let Err(e) = result {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn forward(config: Option<PathBuf>, event: Option<PathBuf>, dry_run: bool) -> Result<()> {
    let cfg = load_config(config.as_deref()).map_err(|e| anyhow!("Configuration error: {e}"))?;

    let batch = match &event {
        Some(path) => NotificationBatch::from_reader(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )?,
        None => NotificationBatch::from_reader(std::io::stdin().lock())?,
    };

    let store = FsObjectStore::open(cfg.storage_root())?;
    let sender: Box<dyn MailSender> = match (&cfg.dispatch_endpoint, dry_run) {
        (Some(endpoint), false) => Box::new(HttpMailSender::new(
            endpoint.clone(),
            cfg.dispatch_token.clone(),
        )?),
        _ => Box::new(StdoutMailSender),
    };

    let sent = run_forwarder(
        &store,
        sender.as_ref(),
        &batch,
        &ForwardConfig {
            forward_to: cfg.forward_to_addresses(),
            max_depth: cfg.max_depth,
        },
    )?;
    eprintln!("Forwarded {sent} message(s)");
    Ok(())
}

fn convert(path: PathBuf, max_depth: usize) -> Result<()> {
    let raw = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
    let message = RawMessage::parse(&raw)?;
    let converted = Converter::with_max_depth(max_depth).convert(message)?;

    println!("Subject: {}", converted.subject);
    println!("Body ({}):", converted.body.kind());
    println!("{}", converted.body.as_str());
    Ok(())
}
