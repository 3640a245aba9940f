use clap::{Args, Command, CommandFactory, FromArgMatches, Parser, Subcommand};
use clap_complete::Shell;
use kdev::commands;
use kdev::progress::{ProgressSink, TerminalProgress, WriterProgress};
use kdev::registry::Registry;
use kdev::ui;
use std::ffi::OsString;
use std::io::{self, IsTerminal};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "kdev")]
#[command(author, version, about = "Run Kubernetes tools, downloading them on first use", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

// Tool subcommands take their help text from the registry
#[derive(Subcommand)]
enum Commands {
    #[command(disable_help_flag = true)]
    Kubectl(ToolArgs),

    #[command(disable_help_flag = true)]
    Kind(ToolArgs),

    #[command(disable_help_flag = true)]
    Cilium(ToolArgs),

    /// Manage cached tools
    #[command(subcommand)]
    Tools(ToolsCommand),

    /// Print the kdev version
    Version,

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

/// Arguments after the tool name, `--help` included.
///
/// clap drops a leading `--`, so what is forwarded comes from the raw argv
/// (see [`forwarded_args`]); this only keeps parsing permissive.
#[derive(Args)]
struct ToolArgs {
    #[arg(
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_parser = clap::value_parser!(OsString)
    )]
    args: Vec<OsString>,
}

#[derive(Subcommand)]
enum ToolsCommand {
    /// Show cached tool versions and their sizes
    Info {
        /// Tool names (all if empty)
        tools: Vec<String>,
    },

    /// Remove cached tool versions
    Clean {
        /// Only remove versions older than the newest cached one
        #[arg(long)]
        old: bool,

        /// Tool names (all if empty)
        tools: Vec<String>,
    },

    /// Download the latest version of tools
    Update {
        /// Tool names (all if empty)
        tools: Vec<String>,
    },
}

fn cli_command(registry: &Registry) -> Command {
    registry.descriptors().iter().fold(Cli::command(), |cmd, tool| {
        cmd.mut_subcommand(tool.name(), |sub| sub.about(tool.about().to_string()))
    })
}

/// Everything after the tool's subcommand token, exactly as given.
///
/// Only `-v`/`--verbose` can precede the subcommand, so its first occurrence
/// is the token itself.
fn forwarded_args(argv: &[OsString], tool: &str) -> Option<Vec<OsString>> {
    let position = argv.iter().skip(1).position(|arg| arg == tool)?;
    Some(argv[position + 2..].to_vec())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("kdev=debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn progress_sink() -> Arc<dyn ProgressSink> {
    if io::stdout().is_terminal() {
        Arc::new(TerminalProgress::new())
    } else {
        Arc::new(WriterProgress::new(io::stdout()))
    }
}

/// Cancel in-flight work on Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });
    cancel
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let registry = Registry::builtin();
    let argv: Vec<OsString> = std::env::args_os().collect();
    let matches = cli_command(&registry).get_matches_from(&argv);
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());
    init_logging(cli.verbose);
    ui::init_colors();

    let (tool, parsed) = match cli.command {
        Commands::Kubectl(tool_args) => ("kubectl", tool_args.args),
        Commands::Kind(tool_args) => ("kind", tool_args.args),
        Commands::Cilium(tool_args) => ("cilium", tool_args.args),
        Commands::Tools(command) => return tools(command, &registry).await,
        Commands::Version => {
            println!("kdev {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut cli_command(&registry), "kdev", &mut io::stdout());
            return Ok(());
        }
    };

    let args = forwarded_args(&argv, tool).unwrap_or(parsed);
    let launcher = commands::build_launcher(progress_sink(), cancel_on_ctrl_c())?;
    commands::run(&launcher, &registry, tool, args).await
}

async fn tools(command: ToolsCommand, registry: &Registry) -> anyhow::Result<()> {
    let launcher = commands::build_launcher(progress_sink(), cancel_on_ctrl_c())?;
    let cache = launcher.cache();
    let mut stdout = io::stdout();

    match command {
        ToolsCommand::Info { tools } => commands::info(registry, &cache, &tools, &mut stdout),
        ToolsCommand::Clean { old, tools } => {
            commands::clean(registry, &cache, &tools, old, &mut stdout)
        }
        ToolsCommand::Update { tools } => {
            commands::update(&launcher, registry, &tools, &mut stdout).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    fn forwarded(args: &[&str]) -> Vec<OsString> {
        let argv = argv(args);
        let matches = cli_command(&Registry::builtin())
            .try_get_matches_from(&argv)
            .unwrap();
        let tool = matches.subcommand_name().unwrap();
        forwarded_args(&argv, tool).unwrap()
    }

    #[test]
    fn test_leading_double_dash_is_forwarded() {
        assert_eq!(forwarded(&["kdev", "kubectl", "--", "version"]), argv(&["--", "version"]));
    }

    #[test]
    fn test_args_forwarded_unmodified() {
        assert_eq!(
            forwarded(&["kdev", "kubectl", "exec", "pod", "--", "ls"]),
            argv(&["exec", "pod", "--", "ls"])
        );
        assert_eq!(
            forwarded(&["kdev", "-v", "kind", "create", "cluster", "--name", "kind", "-v", "1"]),
            argv(&["create", "cluster", "--name", "kind", "-v", "1"])
        );
        assert!(forwarded(&["kdev", "cilium"]).is_empty());
    }

    #[test]
    fn test_every_registered_tool_has_a_subcommand() {
        let cli = Cli::command();
        for name in Registry::builtin().names() {
            assert!(cli.find_subcommand(name).is_some(), "no subcommand for {name}");
        }
        cli_command(&Registry::builtin()).debug_assert();
    }
}
