use std::thread;
use std::time::Duration;

use clap::Parser;
use dvmesh::config::{Cli, NodeConfig};
use dvmesh::engine::{Engine, EngineConfig, NodeEffect, NodeEvent};
use dvmesh::message::Message;
use dvmesh::protocol::Protocol;
use dvmesh::transport::FileTransport;

/// The runtime shell. Builds a [`Engine`] from CLI input and drives it over
/// a real [`FileTransport`], one tick per wall-clock second, for `duration`
/// ticks, mirroring `node.py::Node.execute`.
fn main() {
    let cli = Cli::parse();
    let config = match NodeConfig::from_cli(cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("dvmesh-node: {err}");
            std::process::exit(1);
        }
    };

    let mut transport = match FileTransport::open(&config) {
        Ok(transport) => transport,
        Err(err) => {
            eprintln!("dvmesh-node: {err}");
            std::process::exit(1);
        }
    };

    transport.log_line("*****STARTED NODE SERVICE*****");
    transport.log_line(&format!("ID: {}", config.id));
    transport.log_line(&format!("Mode: {:?}", config.mode));
    transport.log_line(&format!("Duration: {}", config.duration));

    let mut engine = Engine::new(config.id, config.mode.clone(), EngineConfig::default());

    for now in 0..config.duration {
        transport.log_line(&format!("=== t={now} ==="));

        for effect in engine.update(NodeEvent::Tick(now)) {
            apply(&mut transport, effect);
        }

        match transport.poll_inbound() {
            Ok(lines) => {
                for line in lines {
                    match Message::parse_line(&line) {
                        Ok(message) => {
                            transport.log_line(&format!("processing: {line}"));
                            for effect in engine.update(NodeEvent::Handle(now, message)) {
                                apply(&mut transport, effect);
                            }
                        }
                        Err(err) => transport.log_line(&format!("unhandled message {line:?}: {err}")),
                    }
                }
            }
            Err(err) => transport.log_line(&format!("{err}")),
        }

        thread::sleep(Duration::from_secs(1));
    }

    transport.log_line("****END****");
}

fn apply(transport: &mut FileTransport, effect: NodeEffect) {
    match effect {
        NodeEffect::Emit(message) => {
            let line = message.to_line();
            if let Err(err) = transport.emit_outbound(&line) {
                transport.log_line(&format!("{err}"));
            }
        }
        NodeEffect::Deliver { root, payload } => {
            if let Err(err) = transport.deliver(root, &payload) {
                transport.log_line(&format!("{err}"));
            }
        }
        NodeEffect::Note(note) => transport.log_line(&note),
    }
}
