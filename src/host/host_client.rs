//! Host-side driver for an embedded engine.
//!
//! Starts the engine loop on its own thread and a listener thread that drains
//! the response channel, splits chunks into lines and forwards typed messages
//! over an mpsc channel. Commands go straight into the session.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, warn};

use crate::bridge::pipe_bridge::StreamBinding;
use crate::bridge::session::Session;
use crate::config::BridgeConfig;
use crate::engines::engine_loader::EngineLoader;
use crate::engines::engine_trait::{CommandLoop, EngineContext};
use crate::errors::{BridgeError, BridgeResult};
use crate::host::analysis::{analysis_commands, computer_move_commands, AnalysisOptions};
use crate::host::output_parser::{parse_line, split_lines, EngineMessage};
use crate::resolver::resolver_chain::ResolverChain;
use crate::resolver::staging::stage_configured;

/// Cloneable handle for sending commands from any thread.
#[derive(Debug, Clone)]
pub struct CommandSender {
    session: Arc<Session>,
}

impl CommandSender {
    pub fn send(&self, command: &str) -> BridgeResult<()> {
        self.session.write(command).map(|_| ())
    }
}

pub struct HostClient {
    session: Arc<Session>,
    engine_thread: Option<JoinHandle<BridgeResult<()>>>,
    listener_thread: Option<JoinHandle<()>>,
    messages: Receiver<EngineMessage>,
}

impl HostClient {
    /// Stages the network files when an asset directory is configured, then
    /// starts `engine` with the resolver chain for this platform.
    pub fn start<E>(engine: E, config: &BridgeConfig) -> BridgeResult<Self>
    where
        E: CommandLoop + 'static,
    {
        stage_configured(config);
        let resolver = Arc::new(ResolverChain::for_platform(config));
        Self::start_with_context(engine, config, EngineContext::new(resolver))
    }

    pub fn start_with_context<E>(
        engine: E,
        config: &BridgeConfig,
        context: EngineContext,
    ) -> BridgeResult<Self>
    where
        E: CommandLoop + 'static,
    {
        let session = Arc::new(Session::with_config(config)?);

        let engine_session = Arc::clone(&session);
        let engine_thread = thread::Builder::new()
            .name("uci-engine".to_owned())
            .spawn(move || {
                EngineLoader::new(engine, context)
                    .run_blocking(engine_session.bridge(), &StreamBinding::Direct)
            })
            .map_err(BridgeError::Engine)?;

        let (tx, rx) = mpsc::channel();
        let listener_session = Arc::clone(&session);
        let listener_thread = match thread::Builder::new()
            .name("uci-listener".to_owned())
            .spawn(move || listen(&listener_session, &tx))
        {
            Ok(handle) => handle,
            Err(err) => {
                abandon_engine(&session, engine_thread);
                return Err(BridgeError::Engine(err));
            }
        };

        Ok(Self {
            session,
            engine_thread: Some(engine_thread),
            listener_thread: Some(listener_thread),
            messages: rx,
        })
    }

    pub fn command_sender(&self) -> CommandSender {
        CommandSender {
            session: Arc::clone(&self.session),
        }
    }

    pub fn send_command(&self, command: &str) -> BridgeResult<()> {
        self.session.write(command).map(|_| ())
    }

    fn send_all(&self, commands: &[String]) -> BridgeResult<()> {
        commands.iter().try_for_each(|c| self.send_command(c))
    }

    pub fn analyze_position(&self, fen: &str, options: &AnalysisOptions) -> BridgeResult<()> {
        self.send_all(&analysis_commands(fen, options))
    }

    pub fn stop_analysis(&self) -> BridgeResult<()> {
        self.send_command("stop")
    }

    pub fn request_computer_move(&self, fen: &str, movetime_ms: u64, depth: u32) -> BridgeResult<()> {
        self.send_all(&computer_move_commands(fen, movetime_ms, depth))
    }

    /// Blocks for the next message; `None` once the listener has stopped.
    pub fn recv(&self) -> Option<EngineMessage> {
        self.messages.recv().ok()
    }

    pub fn try_recv(&self) -> Option<EngineMessage> {
        self.messages.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineMessage> {
        self.messages.recv_timeout(timeout).ok()
    }

    /// Waits for the first message matching `predicate`, dropping the others.
    pub fn wait_for<P>(&self, timeout: Duration, mut predicate: P) -> Option<EngineMessage>
    where
        P: FnMut(&EngineMessage) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.messages.recv_timeout(remaining) {
                Ok(msg) if predicate(&msg) => return Some(msg),
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return None
                }
            }
        }
    }

    /// Sends `quit` and waits for both threads.
    pub fn shutdown(mut self) -> BridgeResult<()> {
        self.stop_threads()
    }

    fn stop_threads(&mut self) -> BridgeResult<()> {
        let Some(engine_thread) = self.engine_thread.take() else {
            return Ok(());
        };
        // A finished engine has closed its input; writing would hit a broken pipe.
        if !engine_thread.is_finished() {
            if let Err(err) = self.send_command("quit") {
                warn!("could not send quit to engine: {}", err);
            }
        }

        let result = match engine_thread.join() {
            Ok(result) => result,
            Err(_) => {
                error!("engine thread panicked");
                Ok(())
            }
        };
        if let Some(listener) = self.listener_thread.take() {
            if listener.join().is_err() {
                error!("listener thread panicked");
            }
        }
        result
    }
}

impl Drop for HostClient {
    fn drop(&mut self) {
        if let Err(err) = self.stop_threads() {
            warn!("engine did not shut down cleanly: {}", err);
        }
    }
}

/// Stops an engine thread that no client will ever own.
fn abandon_engine(session: &Session, engine_thread: JoinHandle<BridgeResult<()>>) {
    if let Err(err) = session.write("quit") {
        warn!("could not send quit to engine: {}", err);
    }
    match engine_thread.join() {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!("engine did not shut down cleanly: {}", err),
        Err(_) => error!("engine thread panicked"),
    }
}

fn listen(session: &Session, tx: &Sender<EngineMessage>) {
    loop {
        let chunk = match session.read() {
            Ok(chunk) => chunk,
            Err(err) => {
                error!("listener stopped: {}", err);
                return;
            }
        };
        if chunk.is_empty() {
            debug!("engine output closed");
            return;
        }
        for line in split_lines(&chunk) {
            let Some(message) = parse_line(line) else {
                continue;
            };
            let finished = message == EngineMessage::QuitOk;
            if tx.send(message).is_err() || finished {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use tempfile::tempdir;

    use super::{abandon_engine, HostClient};
    use crate::bridge::pipe_bridge::StreamBinding;
    use crate::bridge::session::Session;
    use crate::config::BridgeConfig;
    use crate::engines::engine_loader::EngineLoader;
    use crate::engines::engine_trait::EngineContext;
    use crate::engines::protocol_engine::ProtocolEngine;
    use crate::host::analysis::AnalysisOptions;
    use crate::host::output_parser::EngineMessage;
    use crate::resolver::resolver_chain::{BIG_NETWORK_FILE, SMALL_NETWORK_FILE};

    const WAIT: Duration = Duration::from_secs(5);
    const FEN: &str = "8/8/8/8/8/8/4P3/4K3 w - - 0 1";

    #[test]
    fn analysis_request_yields_bestmove() {
        let client = HostClient::start(ProtocolEngine::new(), &BridgeConfig::default())
            .expect("client should start");

        client
            .analyze_position(FEN, &AnalysisOptions::default())
            .unwrap();
        assert_eq!(
            client.wait_for(WAIT, |m| *m == EngineMessage::UciOk),
            Some(EngineMessage::UciOk)
        );
        assert_eq!(
            client.wait_for(WAIT, |m| *m == EngineMessage::ReadyOk),
            Some(EngineMessage::ReadyOk)
        );
        let best = client.wait_for(WAIT, |m| matches!(m, EngineMessage::BestMove { .. }));
        assert_eq!(
            best,
            Some(EngineMessage::BestMove {
                best_move: "0000".into(),
                ponder: None,
            })
        );

        client.shutdown().expect("engine should stop cleanly");
    }

    #[test]
    fn quit_ends_the_message_stream() {
        let client = HostClient::start(ProtocolEngine::new(), &BridgeConfig::default()).unwrap();
        let sender = client.command_sender();
        sender.send("isready").unwrap();
        assert_eq!(client.recv_timeout(WAIT), Some(EngineMessage::ReadyOk));

        sender.send("quit").unwrap();
        assert_eq!(client.recv_timeout(WAIT), Some(EngineMessage::QuitOk));
        // The listener exits after the sentinel, closing the channel.
        assert_eq!(client.recv_timeout(Duration::from_millis(200)), None);
        assert_eq!(client.try_recv(), None);
    }

    #[test]
    fn start_stages_networks_into_files_dir() {
        let assets = tempdir().unwrap();
        let files = tempdir().unwrap();
        fs::write(assets.path().join(BIG_NETWORK_FILE), b"big").unwrap();
        fs::write(assets.path().join(SMALL_NETWORK_FILE), b"small").unwrap();
        let config = BridgeConfig::default()
            .with_assets_dir(assets.path())
            .with_files_dir(files.path());

        let client = HostClient::start(ProtocolEngine::new(), &config).unwrap();
        assert!(files.path().join(BIG_NETWORK_FILE).is_file());
        assert!(files.path().join(SMALL_NETWORK_FILE).is_file());

        client.send_command("uci").unwrap();
        let expected = format!(
            "option name EvalFile type string default {}",
            files.path().join(BIG_NETWORK_FILE).display()
        );
        let option = client.wait_for(WAIT, |m| m.to_string() == expected);
        assert!(option.is_some(), "engine did not report the staged network");
        client.shutdown().unwrap();
    }

    #[test]
    fn start_survives_missing_assets() {
        let assets = tempdir().unwrap();
        let files = tempdir().unwrap();
        let config = BridgeConfig::default()
            .with_assets_dir(assets.path())
            .with_files_dir(files.path());

        let client = HostClient::start(ProtocolEngine::new(), &config).unwrap();
        client.send_command("isready").unwrap();
        assert_eq!(client.recv_timeout(WAIT), Some(EngineMessage::ReadyOk));
        client.shutdown().unwrap();
    }

    #[test]
    fn abandoned_engine_is_stopped_and_joined() {
        let session = Arc::new(Session::initialize().unwrap());
        let engine_session = Arc::clone(&session);
        let engine = thread::spawn(move || {
            EngineLoader::new(ProtocolEngine::new(), EngineContext::default())
                .run_blocking(engine_session.bridge(), &StreamBinding::Direct)
        });

        abandon_engine(&session, engine);
        assert!(session.read().unwrap().ends_with("quitok\n"));
    }
}
