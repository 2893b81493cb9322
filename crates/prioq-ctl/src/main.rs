//! prioq-ctl — command-line interface for the prioq daemon.

mod cmd;

use anyhow::{Context, Result, bail};

use cmd::produce::EnqueueArgs;

const DEFAULT_PORT: u16 = 8404;

// ── Option parsing ────────────────────────────────────────────────────────────

/// `--name value` pairs pulled out of argv; everything else is positional.
#[derive(Default)]
struct Flags {
    pairs: Vec<(String, String)>,
}

impl Flags {
    fn take(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn number<T: std::str::FromStr>(&self, name: &str, default: T) -> Result<T> {
        match self.take(name) {
            None => Ok(default),
            Some(v) => v
                .parse()
                .ok()
                .with_context(|| format!("--{} must be a number", name)),
        }
    }

    fn reject_unknown(&self, allowed: &[&str]) -> Result<()> {
        for (k, _) in &self.pairs {
            if k != "port" && !allowed.contains(&k.as_str()) {
                bail!("unknown option --{}", k);
            }
        }
        Ok(())
    }
}

fn split_args(args: &[String]) -> Result<(Vec<&str>, Flags)> {
    let mut flags = Flags::default();
    let mut positional = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].strip_prefix("--") {
            Some("help") => positional.push("help"),
            Some(name) if !name.is_empty() => {
                i += 1;
                let value = args
                    .get(i)
                    .with_context(|| format!("--{} requires a value", name))?;
                flags.pairs.push((name.to_string(), value.clone()));
            }
            _ => positional.push(args[i].as_str()),
        }
        i += 1;
    }
    Ok((positional, flags))
}

fn print_usage() {
    println!("Usage: prioq-ctl [--port <port>] <command>");
    println!();
    println!("Commands:");
    println!("  enqueue <topic> <meta> <payload>   Enqueue a message");
    println!("      --priority <p>                 Lower is more urgent (default: 0)");
    println!("      --after <ms>                   Hold back delivery for <ms>");
    println!("      --repeat <n>                   Send <n> copies, meta suffixed -1..-n");
    println!("  dequeue <topic>                    Take messages, most urgent first");
    println!("      --count <n>                    Batch size (default: 1)");
    println!("      --lease <ms>                   Lease instead of removing");
    println!("  ack <topic> <id>                   Settle a leased message");
    println!("  nack <topic> <id>                  Return a leased message");
    println!("      --meta <m>                     Replace meta on the way back");
    println!("      --after <ms>                   Delay the redelivery");
    println!("  topics                             List topics and depths");
    println!("  topic <name>                       Show one topic");
    println!("  status                             Show daemon status and counters");
    println!("  shutdown                           Stop the daemon");
    println!();
    println!("Options:");
    println!("  --port <port>   API port (default: {})", DEFAULT_PORT);
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (positional, flags) = split_args(&args)?;
    let port: u16 = flags.number("port", DEFAULT_PORT)?;

    match positional.as_slice() {
        ["enqueue", topic, meta, payload] => {
            flags.reject_unknown(&["priority", "after", "repeat"])?;
            let args = EnqueueArgs {
                topic,
                meta,
                payload: payload.as_bytes(),
                priority: flags.number("priority", 0)?,
                after_ms: flags.number("after", 0)?,
                repeat: flags.number("repeat", 1)?,
            };
            cmd::produce::cmd_enqueue(port, args).await
        }
        ["dequeue", topic] => {
            flags.reject_unknown(&["count", "lease"])?;
            let count = flags.number("count", 1)?;
            let lease = flags.number("lease", 0)?;
            cmd::consume::cmd_dequeue(port, topic, count, lease).await
        }
        ["ack", topic, id] => {
            flags.reject_unknown(&[])?;
            let id = id.parse().context("message id must be a number")?;
            cmd::consume::cmd_ack(port, topic, id).await
        }
        ["nack", topic, id] => {
            flags.reject_unknown(&["meta", "after"])?;
            let id = id.parse().context("message id must be a number")?;
            let meta = flags.take("meta").map(str::to_string);
            let after = flags.number("after", 0)?;
            cmd::consume::cmd_nack(port, topic, id, meta, after).await
        }
        ["topics"] => cmd::topics::cmd_topics(port).await,
        ["topic", name] => cmd::topics::cmd_topic(port, name).await,
        ["status"] | [] => cmd::topics::cmd_status(port).await,
        ["shutdown"] => cmd::topics::cmd_shutdown(port).await,
        ["help"] | ["-h"] => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
