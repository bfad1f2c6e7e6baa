use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use quill::areas::config::{Config, EnvSecretStore, SecretStore};
use quill::areas::history::History;
use quill::areas::sync::{CheckoutConflict, SyncEngine, remote_is_empty};
use quill::artifacts::share::ShareDescriptor;
use quill::remote::RemoteFs;
use quill::remote::local::LocalRemote;
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "quill",
    version = "0.1.0",
    about = "A minimal content-addressed VCS syncing one working tree against one remote",
    long_about = "quill stores a repository's history as content-addressed objects on a \
    remote filesystem and exchanges commits as small manifest files. \
    One user, one working directory, one remote; no branches, no merges."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        name = "init",
        about = "Initialize a repository here and create the initial commit"
    )]
    Init {
        #[arg(long, help = "Remote host (use \"localhost\" for a mounted remote)")]
        host: String,
        #[arg(long, default_value_t = 22, help = "Remote port")]
        port: u16,
        #[arg(long, help = "Remote user")]
        user: String,
        #[arg(long, help = "Remote repository root path")]
        path: String,
        #[arg(
            long,
            help = "Skip the remote-emptiness check; may overwrite an existing remote repository"
        )]
        force: bool,
    },
    #[command(
        name = "commit",
        alias = "push",
        about = "Commit the working tree and push it to the remote"
    )]
    Commit {
        #[arg(
            short,
            long,
            required = true,
            help = "Commit message; repeated -m values become separate paragraphs"
        )]
        message: Vec<String>,
    },
    #[command(name = "pull", about = "Pull the latest commits and check out the remote head")]
    Pull,
    #[command(name = "status", about = "View local changes against the current commit")]
    Status,
    #[command(name = "share", about = "Print the clone descriptor for this repository")]
    Share,
    #[command(name = "clone", about = "Clone a repository into a new directory")]
    Clone {
        #[arg(index = 1, help = "Share descriptor, user@host:port#path")]
        share: String,
        #[arg(index = 2, help = "Target directory")]
        directory: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("quill=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        if let Some(conflict) = err.downcast_ref::<CheckoutConflict>() {
            eprintln!("{} {conflict}", "conflict:".yellow().bold());
        } else {
            eprintln!("{} {err:#}", "error:".red().bold());
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let secrets = EnvSecretStore;

    match cli.command {
        Commands::Init {
            host,
            port,
            user,
            path,
            force,
        } => init(host, port, user, path, force, &secrets),
        Commands::Commit { message } => commit(&message.join("\n\n"), &secrets),
        Commands::Pull => pull(&secrets),
        Commands::Status => status(&secrets),
        Commands::Share => share(&secrets),
        Commands::Clone { share, directory } => clone(&share, Path::new(&directory), &secrets),
    }
}

fn init(
    host: String,
    port: u16,
    user: String,
    path: String,
    force: bool,
    secrets: &dyn SecretStore,
) -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("Unable to determine working directory")?;

    let mut config = Config::fresh(host, port, user, path);
    config.secret = secrets
        .get(&config.full_user())
        .context("Unable to retrieve remote credential")?
        .unwrap_or_default();

    let remote = open_remote(&config)?;
    if !force {
        let empty = remote_is_empty(remote.as_ref(), &config.path)
            .context("Unable to check whether the remote repository is empty")?;
        anyhow::ensure!(
            empty,
            "remote directory exists and is not empty; delete it manually, choose another path, or pass --force"
        );
    }

    History::init(&cwd).context("Unable to initialize local history")?;
    config
        .save_new(&cwd, secrets)
        .context("Unable to save new config file")?;

    let mut engine = SyncEngine::new(remote.as_ref(), config)?;
    engine
        .commit("init")
        .context("Unable to create initial commit")?;
    Ok(())
}

fn commit(message: &str, secrets: &dyn SecretStore) -> anyhow::Result<()> {
    let config = load_config(secrets)?;
    let remote = open_remote(&config)?;

    let mut engine = SyncEngine::new(remote.as_ref(), config)?;
    engine.commit(message).context("Unable to create commit")?;
    Ok(())
}

fn pull(secrets: &dyn SecretStore) -> anyhow::Result<()> {
    let config = load_config(secrets)?;
    let remote = open_remote(&config)?;
    let mut engine = SyncEngine::new(remote.as_ref(), config)?;

    engine.pull().context("Unable to pull commits")?;
    let head = engine
        .head()
        .context("Unable to resolve the remote head commit")?;
    engine.checkout(&head)
}

fn status(secrets: &dyn SecretStore) -> anyhow::Result<()> {
    let config = load_config(secrets)?;
    let remote = open_remote(&config)?;
    let engine = SyncEngine::new(remote.as_ref(), config)?;

    for entry in engine.status()?.iter() {
        println!("{entry}");
    }
    Ok(())
}

fn share(secrets: &dyn SecretStore) -> anyhow::Result<()> {
    let config = load_config(secrets)?;
    println!("{}", config.share());
    Ok(())
}

fn clone(share: &str, directory: &Path, secrets: &dyn SecretStore) -> anyhow::Result<()> {
    let descriptor = ShareDescriptor::parse(share)?;

    std::fs::create_dir_all(directory)
        .with_context(|| format!("Unable to create directory {}", directory.display()))?;
    let existing = std::fs::read_dir(directory)
        .with_context(|| format!("Unable to read directory {}", directory.display()))?
        .count();
    anyhow::ensure!(
        existing == 0,
        "directory {} exists and is not empty",
        directory.display()
    );

    let mut config = Config::from_share(&descriptor);
    config.secret = secrets
        .get(&config.full_user())
        .context("Unable to retrieve remote credential")?
        .unwrap_or_default();

    History::init(directory).context("Unable to initialize local history")?;
    config
        .save_new(directory, secrets)
        .context("Unable to save new config file")?;

    let remote = open_remote(&config)?;
    let mut engine = SyncEngine::new(remote.as_ref(), config)?;

    engine.pull().context("Unable to pull commits")?;
    let head = engine
        .head()
        .context("Unable to resolve the remote head commit")?;
    engine
        .clone_commit(&head)
        .context("Unable to check out the head commit")
}

fn load_config(secrets: &dyn SecretStore) -> anyhow::Result<Config> {
    let cwd = std::env::current_dir().context("Unable to determine working directory")?;
    Config::load(&cwd, secrets).context("Unable to load config")
}

/// The transport adapter for a configured remote. The binary ships the
/// local-filesystem adapter; network transports supply the same trait.
fn open_remote(config: &Config) -> anyhow::Result<Box<dyn RemoteFs>> {
    match config.host.as_str() {
        "" | "localhost" | "127.0.0.1" | "::1" => {
            Ok(Box::new(LocalRemote::new(config.path.clone())))
        }
        host => anyhow::bail!(
            "no transport adapter is built in for host {host}; reach the remote through a mount and use host \"localhost\""
        ),
    }
}
