use clap::Parser;
use miette::{IntoDiagnostic, Result};
use larder::cli::{Cli, Commands};

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;

    // Logs go to stderr so they never mix with command output
    let default_level = if global.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;

    match cli.command {
        Commands::Init(args) => larder::cli::commands::init::run(args),
        Commands::Recipe(cmd) => runtime.block_on(larder::cli::commands::recipe::run(cmd, &global)),
        Commands::Migrate(args) => runtime.block_on(larder::cli::commands::migrate::run(args, &global)),
        Commands::Reset(args) => larder::cli::commands::reset::run(args, &global),
        Commands::Completions(args) => larder::cli::commands::completions::run(args),
    }
}
