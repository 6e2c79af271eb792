use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "git-memento",
    about = "Attach scrubbed AI session transcripts to git commits",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run as if started in this directory
    #[arg(short = 'C', long = "repo", global = true, default_value = ".")]
    pub repo: PathBuf,
}

#[derive(Subcommand)]
pub enum Command {
    /// Attach the sessions of a commit or range
    Add(AddArgs),
    /// Rebuild missing notes
    Repair(RepairArgs),
    /// Remove a session from a commit or range
    Remove(RemoveArgs),
    /// Blank one record of a stored transcript
    Redact(RedactArgs),
    /// Exclude a session from future capture
    Ban(BanArgs),
    /// Lift a ban
    Unban(UnbanArgs),
    /// Show the sessions attached to a commit
    Show(ShowArgs),
}

#[derive(Args)]
pub struct AddArgs {
    /// Commit or `A..B` range
    #[arg(default_value = "HEAD")]
    pub target: String,
    /// Merge into an existing note
    #[arg(short, long)]
    pub force: bool,
    /// Report what would be attached without writing
    #[arg(long)]
    pub dry_run: bool,
    /// Store transcripts as found
    #[arg(long)]
    pub no_scrub: bool,
}

#[derive(Args)]
pub struct RepairArgs {
    /// Commit or `A..B` range
    #[arg(conflicts_with = "scan")]
    pub target: Option<String>,
    /// Repair every commit reachable from HEAD
    #[arg(long)]
    pub scan: bool,
    #[arg(short, long)]
    pub force: bool,
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct RemoveArgs {
    /// Session as `tool/id`
    pub session: String,
    /// Commit or `A..B` range
    #[arg(default_value = "HEAD")]
    pub target: String,
    /// Also ban the session
    #[arg(long)]
    pub ban: bool,
    /// Reason recorded with the ban
    #[arg(long, default_value = "", requires = "ban")]
    pub reason: String,
    /// Push the notes and transcripts refs afterwards
    #[arg(long)]
    pub push: bool,
    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args)]
pub struct RedactArgs {
    /// Record as `tool/id@timestamp`
    pub target: String,
}

#[derive(Args)]
pub struct BanArgs {
    /// Session as `tool/id`
    pub session: String,
    #[arg(long, default_value = "")]
    pub reason: String,
}

#[derive(Args)]
pub struct UnbanArgs {
    /// `tool/id`, or a bare id to unban it for every tool
    pub id: String,
}

#[derive(Args)]
pub struct ShowArgs {
    #[arg(default_value = "HEAD")]
    pub commit: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_add_defaults_to_head() {
        let cli = Cli::try_parse_from(["git-memento", "add"]).unwrap();
        if let Command::Add(args) = cli.command {
            assert_eq!(args.target, "HEAD");
            assert!(!args.force && !args.dry_run && !args.no_scrub);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_add_range_with_flags() {
        let cli =
            Cli::try_parse_from(["git-memento", "add", "main..topic", "--force", "--no-scrub"]).unwrap();
        if let Command::Add(args) = cli.command {
            assert_eq!(args.target, "main..topic");
            assert!(args.force);
            assert!(args.no_scrub);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_repair_scan() {
        let cli = Cli::try_parse_from(["git-memento", "repair", "--scan", "--dry-run"]).unwrap();
        if let Command::Repair(args) = cli.command {
            assert!(args.scan);
            assert!(args.dry_run);
            assert_eq!(args.target, None);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn repair_scan_conflicts_with_target() {
        assert!(Cli::try_parse_from(["git-memento", "repair", "HEAD", "--scan"]).is_err());
    }

    #[test]
    fn parse_remove() {
        let cli = Cli::try_parse_from([
            "git-memento", "remove", "claude/abc", "HEAD~3..", "--ban", "--reason", "leak", "--push", "-y",
        ])
        .unwrap();
        if let Command::Remove(args) = cli.command {
            assert_eq!(args.session, "claude/abc");
            assert_eq!(args.target, "HEAD~3..");
            assert!(args.ban && args.push && args.yes);
            assert_eq!(args.reason, "leak");
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn remove_reason_requires_ban() {
        assert!(Cli::try_parse_from(["git-memento", "remove", "claude/abc", "--reason", "x"]).is_err());
    }

    #[test]
    fn parse_redact() {
        let cli = Cli::try_parse_from(["git-memento", "redact", "codex/r1@2025-01-01T10:00:00Z"]).unwrap();
        assert!(matches!(cli.command, Command::Redact(_)));
    }

    #[test]
    fn parse_unban_bare_id() {
        let cli = Cli::try_parse_from(["git-memento", "unban", "abc"]).unwrap();
        if let Command::Unban(args) = cli.command {
            assert_eq!(args.id, "abc");
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from(["git-memento", "show", "-v", "-C", "/tmp/repo"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.repo, PathBuf::from("/tmp/repo"));
    }
}
