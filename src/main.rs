use std::io::{self, BufRead};
use std::process::ExitCode;
use std::thread;

use stockfish_bridge::config::BridgeConfig;
use stockfish_bridge::engines::protocol_engine::ProtocolEngine;
use stockfish_bridge::host::host_client::HostClient;
use stockfish_bridge::host::output_parser::EngineMessage;

fn main() -> ExitCode {
    let config = BridgeConfig::from_env();
    let client = match HostClient::start(ProtocolEngine::new(), &config) {
        Ok(client) => client,
        Err(err) => {
            eprintln!("failed to start engine: {}", err);
            return ExitCode::FAILURE;
        }
    };

    // Relay terminal input into the embedded engine.
    let sender = client.command_sender();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let trimmed = line.trim_end();
            if trimmed.is_empty() {
                continue;
            }
            if let Err(err) = sender.send(trimmed) {
                eprintln!("{}", err);
                break;
            }
            if trimmed == "quit" {
                return;
            }
        }
        // End of input ends the session too.
        if let Err(err) = sender.send("quit") {
            eprintln!("{}", err);
        }
    });

    while let Some(message) = client.recv() {
        if message == EngineMessage::QuitOk {
            break;
        }
        println!("{}", message);
    }

    match client.shutdown() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}
