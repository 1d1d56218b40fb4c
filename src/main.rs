use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{arg, crate_version, value_parser, Command};
use log::info;

use lazytreap::{script, ImplicitTreap};

fn parse_values(list: &str) -> Result<Vec<i64>> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<i64>()
                .with_context(|| format!("`{item}` in --values is not an integer"))
        })
        .collect()
}

fn main() -> Result<()> {
    env_logger::init();

    // Generate a CLI, and get the script to run
    let params = Command::new("lazytreap")
        .version(crate_version!())
        .about("Run a script of positional edits, range updates and range queries against an implicit treap")
        .arg(arg!(<SCRIPT> "A text file with one command per line (insert, push, erase, add, reverse, sum, min, max, kth, get, len, print)").value_parser(value_parser!(PathBuf)))
        .arg(arg!(-v --values <VALUES> "Initial sequence as comma-separated integers, e.g. 1,2,3").allow_hyphen_values(true))
        .arg(arg!(-s --seed <SEED> "Seed for the priority generator, for reproducible tree shapes").value_parser(value_parser!(u64)))
        .get_matches();

    let path = params
        .get_one::<PathBuf>("SCRIPT")
        .context("missing script path")?;
    let source = fs::read_to_string(path)
        .with_context(|| format!("couldn't read script {}", path.display()))?;
    let commands = script::parse(&source)
        .with_context(|| format!("couldn't parse {}", path.display()))?;

    let initial = match params.get_one::<String>("values") {
        Some(list) => parse_values(list)?,
        None => Vec::new(),
    };
    let mut builder = ImplicitTreap::<i64>::builder().capacity(initial.len() + commands.len());
    if let Some(&seed) = params.get_one::<u64>("seed") {
        builder = builder.seed(seed);
    }
    let mut treap = builder.build_from(initial);
    info!(
        "running {} command(s) on a sequence of {} element(s)",
        commands.len(),
        treap.len()
    );

    let output = script::run(&mut treap, &commands)
        .with_context(|| format!("{} failed", path.display()))?;
    for line in output {
        println!("{line}");
    }
    Ok(())
}
