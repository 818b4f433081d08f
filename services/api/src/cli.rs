use crate::commands::{run_check, run_resolve, CheckArgs, ResolveArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use prospectus::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Personalised Prospectus",
    about = "Serve personalised school prospectuses and inspect their visibility rules",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Resolve module visibility and the tour for one family profile
    Resolve(ResolveArgs),
    /// Validate school configuration without starting the service
    Check(CheckArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Load school configuration from this directory instead of the built-in schools
    #[arg(long)]
    pub(crate) schools_dir: Option<std::path::PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Resolve(args) => run_resolve(args),
        Command::Check(args) => run_check(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["prospectus-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn resolve_requires_school_and_profile() {
        assert!(Cli::try_parse_from(["prospectus-api", "resolve", "--school", "clc"]).is_err());

        let cli = Cli::try_parse_from([
            "prospectus-api",
            "resolve",
            "--school",
            "clc",
            "--profile",
            "family.json",
        ])
        .expect("parses");
        match cli.command {
            Some(Command::Resolve(args)) => {
                assert_eq!(args.school, "clc");
                assert_eq!(args.profile, std::path::PathBuf::from("family.json"));
            }
            other => panic!("expected resolve, got {other:?}"),
        }
    }

    #[test]
    fn serve_accepts_overrides() {
        let cli = Cli::try_parse_from(["prospectus-api", "serve", "--port", "8080"])
            .expect("parses");
        match cli.command {
            Some(Command::Serve(args)) => assert_eq!(args.port, Some(8080)),
            other => panic!("expected serve, got {other:?}"),
        }
    }
}
