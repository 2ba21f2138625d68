use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use rpm_get::commands::{self, ListMode};
use rpm_get::error::{SUCCESS_EXIT_CODE, USAGE_EXIT_CODE};
use rpm_get::output::{self, Severity};
use rpm_get::{Context, RpmGetError};
use std::process::ExitCode;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const USAGE: &str = "
Usage

rpm-get {update [--repos-only] [--quiet] | upgrade [--dg-only] | info <pkg list> | install <pkg list>
        | reinstall <pkg list> | remove [--remove-repo] <pkg list>
        | search [--include-unsupported] <regex> | cache | clean
        | list [--include-unsupported] [--raw|--installed|--not-installed]
        | help | version}

rpm-get installs packages published as RPMs on GitHub or GitLab releases, in
third-party .repo repositories or on Copr, and hands the installation to dnf.

update
    Refresh the package list and manifests, then report installed packages
    with a newer upstream version.
    --repos-only  only refresh the package list and manifests.
    --quiet       no progress output while downloading.

upgrade
    Upgrade all installed packages through dnf.
    --dg-only     only upgrade packages installed by rpm-get.

install
    Install the given packages.

reinstall
    Reinstall the given packages.

remove
    Remove the given packages.
    --remove-repo also remove the repository rpm-get added for them.

search
    Search available package names with a regular expression.
    --include-unsupported  include packages unavailable for this architecture.

info
    Show information about the given packages.

list
    List available packages and which ones are installed.
    --include-unsupported  include packages unavailable for this architecture.
    --raw                  names only, without install status.
    --installed            only installed packages.
    --not-installed        only packages that are not installed.

cache
    List the contents of the download cache.

clean
    Delete everything in the download cache.

help
    Show this help.

version
    Show the rpm-get version.
";

#[derive(Parser)]
#[command(name = "rpm-get")]
#[command(
    disable_help_flag = true,
    disable_version_flag = true,
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Show usage
    #[arg(short = 'h', long = "help", short_alias = '?', action = ArgAction::SetTrue)]
    help: bool,

    /// Show version
    #[arg(short = 'v', long = "version", action = ArgAction::SetTrue)]
    version: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh the package list and manifests
    Update {
        /// Only refresh the package list and manifests
        #[arg(long)]
        repos_only: bool,

        /// No progress output
        #[arg(long)]
        quiet: bool,
    },

    /// Upgrade installed packages
    Upgrade {
        /// Only upgrade packages installed by rpm-get
        #[arg(long)]
        dg_only: bool,
    },

    /// Show information about packages
    Info {
        #[arg(required = true)]
        packages: Vec<String>,
    },

    /// Install packages
    Install {
        #[arg(required = true)]
        packages: Vec<String>,
    },

    /// Reinstall packages
    Reinstall {
        #[arg(required = true)]
        packages: Vec<String>,
    },

    /// Remove packages
    Remove {
        /// Also remove the repository added for each package
        #[arg(long)]
        remove_repo: bool,

        #[arg(required = true)]
        packages: Vec<String>,
    },

    /// Search package names
    Search {
        /// Include packages unavailable for this architecture
        #[arg(long)]
        include_unsupported: bool,

        /// Regular expression
        regex: String,
    },

    /// List the download cache
    Cache,

    /// Empty the download cache
    Clean,

    /// List packages
    List {
        /// Include packages unavailable for this architecture
        #[arg(long)]
        include_unsupported: bool,

        /// Names only
        #[arg(long, group = "mode")]
        raw: bool,

        /// Only installed packages
        #[arg(long, group = "mode")]
        installed: bool,

        /// Only packages that are not installed
        #[arg(long, group = "mode")]
        not_installed: bool,
    },

    /// Show usage
    Help,

    /// Show version
    Version,

    /// Generate shell completions
    #[command(hide = true)]
    Completions { shell: clap_complete::Shell },
}

fn print_usage() {
    print!("{}", USAGE);
}

fn print_version() {
    println!("rpm-get version: {}", VERSION);
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

/// Single-dash long flags (`-help`, `-version`) would otherwise be parsed as
/// bundles of short flags.
fn single_dash_long_flag(args: &[String]) -> Option<(&str, &'static str)> {
    args.iter().skip(1).find_map(|arg| match arg.as_str() {
        "-help" => Some((arg.as_str(), "--help")),
        "-version" => Some((arg.as_str(), "--version")),
        _ => None,
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
    output::init_colors();

    let args: Vec<String> = std::env::args().collect();
    if let Some((given, correct)) = single_dash_long_flag(&args) {
        output::printc(
            format!("Unknown flag {}; did you mean {}?", given, correct),
            Severity::Warning,
            false,
        );
        return exit_code(USAGE_EXIT_CODE);
    }

    let cli = match Cli::try_parse_from(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprint!("{}", e);
            print_usage();
            return exit_code(USAGE_EXIT_CODE);
        }
    };

    if cli.help {
        print_usage();
        return exit_code(SUCCESS_EXIT_CODE);
    }
    if cli.version {
        print_version();
        return exit_code(SUCCESS_EXIT_CODE);
    }

    let command = match cli.command {
        Some(command) => command,
        None => {
            print_usage();
            return exit_code(USAGE_EXIT_CODE);
        }
    };

    // Commands that need no configuration
    match &command {
        Commands::Help => {
            print_usage();
            return exit_code(SUCCESS_EXIT_CODE);
        }
        Commands::Version => {
            print_version();
            return exit_code(SUCCESS_EXIT_CODE);
        }
        Commands::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "rpm-get", &mut std::io::stdout());
            return exit_code(SUCCESS_EXIT_CODE);
        }
        _ => {}
    }

    let ctx = match Context::system() {
        Ok(ctx) => ctx,
        Err(e) => {
            output::printc(format!("Cannot start rpm-get: {}", e), Severity::Fatal, false);
            return exit_code(e.exit_code());
        }
    };
    tracing::debug!(
        "cache={} config={} data={}",
        ctx.config.cache_dir.display(),
        ctx.config.config_dir.display(),
        ctx.config.data_dir.display()
    );

    match run(&ctx, command).await {
        Ok(()) => exit_code(SUCCESS_EXIT_CODE),
        Err(e) => {
            output::printc(e.to_string(), Severity::Error, false);
            if matches!(e, RpmGetError::Usage(_)) {
                print_usage();
            }
            exit_code(e.exit_code())
        }
    }
}

async fn run(ctx: &Context, command: Commands) -> rpm_get::Result<()> {
    match command {
        Commands::Update { repos_only, quiet } => commands::update(ctx, repos_only, quiet).await,
        Commands::Upgrade { dg_only } => commands::upgrade(ctx, dg_only),
        Commands::Info { packages } => commands::info(ctx, &packages),
        Commands::Install { packages } => commands::install(ctx, &packages).await,
        Commands::Reinstall { packages } => commands::reinstall(ctx, &packages),
        Commands::Remove {
            remove_repo,
            packages,
        } => commands::remove(ctx, &packages, remove_repo),
        Commands::Search {
            include_unsupported,
            regex,
        } => commands::search(ctx, &regex, include_unsupported),
        Commands::Cache => commands::cache(ctx),
        Commands::Clean => commands::clean(ctx),
        Commands::List {
            include_unsupported,
            raw,
            installed,
            not_installed,
        } => {
            let mode = if raw {
                ListMode::Raw
            } else if installed {
                ListMode::Installed
            } else if not_installed {
                ListMode::NotInstalled
            } else {
                ListMode::Status
            };
            commands::list(ctx, mode, include_unsupported)
        }
        Commands::Help | Commands::Version | Commands::Completions { .. } => Ok(()),
    }
}
