//! Interactive shell for versioned message queues
//!
//! This binary:
//! 1. Builds an in-memory store configured from the environment
//! 2. Reads one command per line from stdin
//! 3. Prints each reply in a redis-cli like format
//!
//! Commands:
//! - `MSGCREATE key max_fields max_field_len ttl_secs`
//! - `MSGAPPEND key field current previous value`
//! - `MSGAPPENDX key field current previous value`
//! - `MSGLEN key`
//! - `MSGFETCH key [vbegin]`
//! - `MSGREMBYVERSION key [vbegin]`
//! - `help` - Show help
//! - `q` or `quit` - Exit

use std::io::{self, BufRead, Write};

use msgq_store::{Command, Reply, Store, StoreConfig};
use tracing::info;

/// Lines handled by the shell itself rather than the store.
enum ShellCommand {
    Help,
    Quit,
    Empty,
    Store(Vec<String>),
}

fn main() -> eyre::Result<()> {
    // Logs go to stderr so replies on stdout stay clean
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("msgq=info".parse()?)
                .add_directive("msgq_store=info".parse()?)
                .add_directive("msgq_core=info".parse()?),
        )
        .init();

    let config = StoreConfig::from_env();
    info!(
        "Starting msgq shell (implicit limits {}x{}, unaligned {} records / {}s)",
        config.default_max_fields,
        config.default_max_field_len,
        config.max_unalign_count,
        config.max_unalign_timeout
    );

    let mut store = Store::in_memory(config);
    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();

    prompt(&mut stdout)?;
    for line in stdin.lock().lines() {
        match parse_line(&line?) {
            ShellCommand::Quit => break,
            ShellCommand::Empty => {}
            ShellCommand::Help => write_help(&mut stdout)?,
            ShellCommand::Store(args) => {
                let reply = match Command::parse(&args) {
                    Ok(command) => store.execute(command),
                    Err(err) => Reply::Error(err.to_string()),
                };
                writeln!(stdout, "{reply}")?;
            }
        }
        prompt(&mut stdout)?;
    }

    info!("Shutting down...");
    Ok(())
}

fn parse_line(line: &str) -> ShellCommand {
    let args: Vec<String> = line.split_whitespace().map(str::to_owned).collect();
    match args.first().map(|name| name.to_lowercase()).as_deref() {
        None => ShellCommand::Empty,
        Some("q" | "quit" | "exit") => ShellCommand::Quit,
        Some("help" | "h" | "?") => ShellCommand::Help,
        Some(_) => ShellCommand::Store(args),
    }
}

fn prompt(out: &mut impl Write) -> io::Result<()> {
    write!(out, "msgq> ")?;
    out.flush()
}

fn write_help(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Commands:")?;
    writeln!(out, "  MSGCREATE key max_fields max_field_len ttl_secs")?;
    writeln!(out, "  MSGAPPEND key field current previous value")?;
    writeln!(out, "  MSGAPPENDX key field current previous value")?;
    writeln!(out, "  MSGLEN key")?;
    writeln!(out, "  MSGFETCH key [vbegin]")?;
    writeln!(out, "  MSGREMBYVERSION key [vbegin]")?;
    writeln!(out, "  help       - Show this help")?;
    writeln!(out, "  q, quit    - Exit")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        assert!(matches!(parse_line("   "), ShellCommand::Empty));
        assert!(matches!(parse_line("QUIT"), ShellCommand::Quit));
        assert!(matches!(parse_line("?"), ShellCommand::Help));

        let ShellCommand::Store(args) = parse_line("MSGLEN  events ") else {
            panic!("expected a store command");
        };
        assert_eq!(args, vec!["MSGLEN", "events"]);
    }

    #[test]
    fn test_help_lists_every_command() {
        let mut out = Vec::new();
        write_help(&mut out).unwrap();
        let help = String::from_utf8(out).unwrap();
        for name in [
            "MSGCREATE",
            "MSGAPPEND",
            "MSGAPPENDX",
            "MSGLEN",
            "MSGFETCH",
            "MSGREMBYVERSION",
        ] {
            assert!(help.contains(name), "{name} missing from help");
        }
    }
}
