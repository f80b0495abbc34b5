use std::collections::{BTreeSet, HashMap};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

/// Relays each node's outbound lines to its topology successors' inbound
/// files, once per tick. Grounded directly on `controller.py::Controller`;
/// unlike a node, the controller holds no protocol state of its own — it is
/// pure file plumbing.
#[derive(Debug, Parser)]
#[command(name = "dvmesh-controller", about = "Relay node output to neighbor input over the topology")]
struct Cli {
    /// Number of ticks to run before exiting.
    duration: u32,

    /// Directory holding `topology`, `log/`, and `out/`.
    #[arg(long, default_value = ".")]
    base_dir: PathBuf,
}

#[derive(Debug, Error)]
enum ControllerError {
    #[error("failed to read topology file {path}: {source}")]
    ReadTopology { path: PathBuf, source: std::io::Error },
    #[error("malformed topology line {line:?}: expected two node ids")]
    MalformedEdge { line: String },
    #[error("failed to open log file {path}: {source}")]
    OpenLog { path: PathBuf, source: std::io::Error },
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("dvmesh-controller: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), ControllerError> {
    let log_path = cli.base_dir.join("log").join("controller.log");
    fs::create_dir_all(log_path.parent().unwrap()).ok();
    let mut log = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&log_path)
        .map_err(|source| ControllerError::OpenLog { path: log_path.clone(), source })?;
    writeln!(log, "*****STARTING CONTROLLER*****").ok();
    writeln!(log, "Duration: {}", cli.duration).ok();

    let topology_path = cli.base_dir.join("topology");
    let neighbors = read_topology(&topology_path)?;
    writeln!(log, "Neighbors: {neighbors:?}").ok();

    let mut nodes: BTreeSet<u8> = neighbors.keys().copied().collect();
    nodes.extend(neighbors.values().flatten().copied());
    let mut read_counts: HashMap<u8, usize> = nodes.iter().map(|&id| (id, 0)).collect();

    for current_time in 0..cli.duration {
        for &node in &nodes {
            let outbound_path = cli.base_dir.join("out").join(format!("output_{node}"));
            let lines = match fs::read_to_string(&outbound_path) {
                Ok(contents) => contents.lines().map(str::to_string).collect::<Vec<_>>(),
                Err(_) => Vec::new(),
            };
            if lines.is_empty() {
                continue;
            }

            let already_read = read_counts.get(&node).copied().unwrap_or(0);
            if lines.len() > already_read {
                let fresh = &lines[already_read..];
                if let Some(targets) = neighbors.get(&node) {
                    for &neighbor in targets {
                        let inbound_path = cli.base_dir.join("out").join(format!("input_{neighbor}"));
                        if let Err(err) = append_lines(&inbound_path, fresh) {
                            writeln!(log, "failed to write {}: {err}", inbound_path.display()).ok();
                        }
                    }
                }
                read_counts.insert(node, lines.len());
            }
        }
        writeln!(log, "finished for time={current_time}").ok();
        thread::sleep(Duration::from_secs(1));
    }

    writeln!(log, "****END****").ok();
    Ok(())
}

fn read_topology(path: &PathBuf) -> Result<HashMap<u8, Vec<u8>>, ControllerError> {
    let contents =
        fs::read_to_string(path).map_err(|source| ControllerError::ReadTopology { path: path.clone(), source })?;

    let mut neighbors: HashMap<u8, Vec<u8>> = HashMap::new();
    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        let [from, to] = parts[..] else {
            return Err(ControllerError::MalformedEdge { line: line.to_string() });
        };
        let from: u8 = from.parse().map_err(|_| ControllerError::MalformedEdge { line: line.to_string() })?;
        let to: u8 = to.parse().map_err(|_| ControllerError::MalformedEdge { line: line.to_string() })?;
        neighbors.entry(from).or_default().push(to);
    }
    Ok(neighbors)
}

fn append_lines(path: &PathBuf, lines: &[String]) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    for line in lines {
        writeln!(file, "{line}")?;
    }
    Ok(())
}
