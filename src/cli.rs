use clap::{Parser, Subcommand};

/// Approval Desk: two-level approval workflow for change requests
#[derive(Parser)]
#[command(name = "approval-desk", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to bind (defaults to APP_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Create or upgrade the database schema
    Migrate,

    /// Inspect change requests
    Requests {
        #[command(subcommand)]
        command: RequestCommands,
    },

    /// Print request counts per status
    Stats,
}

#[derive(Subcommand)]
pub enum RequestCommands {
    /// List requests, newest first by default
    List {
        /// all, pending_l1, pending_l2, approved, rejected
        #[arg(long, default_value = "all")]
        filter: String,
        /// latest, project, unit
        #[arg(long, default_value = "latest")]
        sort: String,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        unit: Option<String>,
    },
    /// Show one request with its decision history
    Show { id: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_without_any_configuration() {
        let cli = Cli::try_parse_from(["approval-desk", "requests", "show", "7"]).unwrap();
        match cli.command {
            Some(Commands::Requests {
                command: RequestCommands::Show { id },
            }) => assert_eq!(id, 7),
            _ => panic!("expected requests show"),
        }
    }

    #[test]
    fn test_help_is_handled_by_the_parser() {
        let err = Cli::try_parse_from(["approval-desk", "--help"]).err().unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_list_defaults() {
        let cli = Cli::try_parse_from(["approval-desk", "requests", "list"]).unwrap();
        match cli.command {
            Some(Commands::Requests {
                command: RequestCommands::List { filter, sort, project, unit },
            }) => {
                assert_eq!(filter, "all");
                assert_eq!(sort, "latest");
                assert!(project.is_none() && unit.is_none());
            }
            _ => panic!("expected requests list"),
        }
    }
}
