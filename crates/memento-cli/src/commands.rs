use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use colored::Colorize;
use memento_engine::{
    BatchReport, CaptureOptions, Memento, MementoConfig, Outcome, RedactTarget, RemoveOptions,
};
use memento_sessions::{BanList, Discovery};
use memento_store::GitStore;
use memento_types::{format_timestamp, SessionKey};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut engine = open(&cli.repo)?;
    match cli.command {
        Command::Add(args) => cmd_add(&engine, args),
        Command::Repair(args) => cmd_repair(&engine, args),
        Command::Remove(args) => cmd_remove(&mut engine, args),
        Command::Redact(args) => cmd_redact(&engine, args),
        Command::Ban(args) => cmd_ban(&mut engine, args),
        Command::Unban(args) => cmd_unban(&mut engine, args),
        Command::Show(args) => cmd_show(&engine, args),
    }
}

fn open(repo: &Path) -> anyhow::Result<Memento<GitStore>> {
    let store = GitStore::discover(repo)
        .with_context(|| format!("{} is not inside a git repository", repo.display()))?;
    let config = MementoConfig::load_for_repo(store.root())?;
    let ban_path = MementoConfig::ban_list_path(&store.git_dir()?);
    let bans = BanList::load(&ban_path)?;
    let sources = config.sessions.sources(store.root())?;
    let engine = Memento::new(store, config, Discovery::new(sources, bans))?;
    Ok(engine.with_ban_file(ban_path))
}

fn cmd_add(engine: &Memento<GitStore>, args: AddArgs) -> anyhow::Result<ExitCode> {
    let options = CaptureOptions {
        force: args.force,
        dry_run: args.dry_run,
        no_scrub: args.no_scrub,
    };
    let report = engine.add(&args.target, options)?;
    Ok(print_batch(&report))
}

fn cmd_repair(engine: &Memento<GitStore>, args: RepairArgs) -> anyhow::Result<ExitCode> {
    let options = CaptureOptions {
        force: args.force,
        dry_run: args.dry_run,
        no_scrub: false,
    };
    let report = match (&args.target, args.scan) {
        (_, true) => engine.repair_scan(options)?,
        (Some(target), false) => engine.repair(target, options)?,
        (None, false) => anyhow::bail!("give a commit or range, or --scan"),
    };
    Ok(print_batch(&report))
}

fn cmd_remove(engine: &mut Memento<GitStore>, args: RemoveArgs) -> anyhow::Result<ExitCode> {
    let key: SessionKey = args.session.parse()?;
    if !args.yes {
        let commits = engine.resolve_targets(&args.target)?;
        println!(
            "Remove {} from {} commit(s) and delete its stored transcript?",
            key.to_string().bold(),
            commits.len()
        );
        if engine.remote_has_copy() && !args.push {
            println!(
                "  {} remote {} has memento refs; the transcript stays there until you push",
                "!".yellow().bold(),
                engine.config().refs.remote.bold()
            );
        }
        if !confirm()? {
            println!("Aborted.");
            return Ok(ExitCode::SUCCESS);
        }
    }

    let options = RemoveOptions {
        ban: args.ban,
        push: args.push,
        reason: args.reason,
    };
    let report = engine.remove(&args.target, &key, &options)?;
    let code = print_batch(&report.batch);
    if report.blob_deleted {
        println!("{} Deleted stored transcript {}", "✓".green().bold(), key);
    }
    if report.banned {
        println!("{} Banned {}", "✓".green().bold(), key);
    }
    if report.pushed {
        println!("{} Pushed to {}", "✓".green().bold(), engine.config().refs.remote.bold());
    } else if report.remote_has_copy {
        let refs = &engine.config().refs;
        println!(
            "{} Remote {} still has a copy. Run `git push --force {} {} {}` or re-run with --push.",
            "!".yellow().bold(),
            refs.remote.bold(),
            refs.remote,
            refs.notes,
            refs.transcripts
        );
    }
    Ok(code)
}

fn cmd_redact(engine: &Memento<GitStore>, args: RedactArgs) -> anyhow::Result<ExitCode> {
    let target: RedactTarget = args.target.parse()?;
    let outcome = engine.redact(&target)?;
    print_outcome(&target.to_string(), &outcome);
    Ok(ExitCode::SUCCESS)
}

fn cmd_ban(engine: &mut Memento<GitStore>, args: BanArgs) -> anyhow::Result<ExitCode> {
    let key: SessionKey = args.session.parse()?;
    if engine.ban(&key, &args.reason)? {
        println!("{} Banned {}", "✓".green().bold(), key.to_string().bold());
    } else {
        println!("{} is already banned", key.to_string().bold());
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_unban(engine: &mut Memento<GitStore>, args: UnbanArgs) -> anyhow::Result<ExitCode> {
    match engine.unban(&args.id)? {
        0 => println!("{} is not banned", args.id.bold()),
        n => println!("{} Lifted {} ban(s) for {}", "✓".green().bold(), n, args.id.bold()),
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_show(engine: &Memento<GitStore>, args: ShowArgs) -> anyhow::Result<ExitCode> {
    let Some(report) = engine.show(&args.commit)? else {
        println!("No sessions attached to {}.", args.commit.yellow());
        return Ok(ExitCode::SUCCESS);
    };
    let (start, end) = report.period.bounds();
    println!("Commit {}", report.commit.short_hex().yellow().bold());
    println!(
        "  Work period: {} .. {}",
        format_timestamp(&start),
        format_timestamp(&end)
    );
    if report.sessions.is_empty() {
        println!("  No live sessions.");
    }
    for session in &report.sessions {
        let records = match session.records_in_period {
            Some(n) => format!("{n} record(s) in period"),
            None => "not stored".red().to_string(),
        };
        println!(
            "  {}  {} .. {}  {}",
            session.entry.key().to_string().cyan(),
            format_timestamp(&session.entry.created).dimmed(),
            format_timestamp(&session.entry.modified).dimmed(),
            records
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn print_outcome(subject: &str, outcome: &Outcome) {
    let mark = match outcome {
        Outcome::Applied(_) => "✓".green().bold(),
        Outcome::Skipped(_) => "-".dimmed(),
        Outcome::Failed(_) => "✗".red().bold(),
    };
    println!("  {} {} {}", mark, subject.yellow(), outcome);
}

fn print_batch(report: &BatchReport) -> ExitCode {
    for entry in &report.per_commit {
        print_outcome(&entry.commit.short_hex(), &entry.outcome);
    }
    let summary = report.to_string();
    if report.has_failures() {
        println!("{}", summary.red().bold());
        ExitCode::FAILURE
    } else {
        println!("{}", summary.bold());
        ExitCode::SUCCESS
    }
}

fn confirm() -> anyhow::Result<bool> {
    print!("Proceed? [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
