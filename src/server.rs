//! Command server
//!
//! Listens on a local socket and speaks newline-delimited JSON: one
//! request document per line in, the same document with `result` and
//! `error` fields added per line out. Connections are handled one at a
//! time on the single dispatcher thread the command contract assumes.

use crate::commands::{respond, CommandRegistry, CMD_KEY, RESULT_KEY};
use crate::facade::BtBinderFacade;
use anyhow::{Context, Result};
use interprocess::local_socket::{
    traits::ListenerExt, GenericFilePath, ListenerOptions, Stream as LocalStream, ToFsName,
};
use interprocess::TryClone;
use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
use tracing::{error, info, warn};

/// Error code for a command name no handler is registered under.
pub const UNKNOWN_COMMAND: &str = "unknown command";
/// Error code the dispatcher writes when a wrapper declined a request
/// over its parameter count.
pub const INVALID_PARAM_COUNT: &str = "invalid parameter count";

pub struct CommandServer {
    facade: BtBinderFacade,
    registry: CommandRegistry,
}

impl CommandServer {
    pub fn new(facade: BtBinderFacade, registry: CommandRegistry) -> Self {
        Self { facade, registry }
    }

    /// Dispatch one request document in place.
    ///
    /// Every document comes back answered: unregistered names get
    /// [`UNKNOWN_COMMAND`], and a document the wrapper returned untouched
    /// (arity mismatch) gets [`INVALID_PARAM_COUNT`].
    pub fn dispatch(&mut self, doc: &mut Value) {
        let Some(cmd) = doc.get(CMD_KEY).and_then(Value::as_str).map(str::to_owned) else {
            warn!("Request carries no command name");
            respond(doc, Value::Null, json!(UNKNOWN_COMMAND));
            return;
        };
        match self.registry.get(&cmd) {
            Some(handler) => {
                handler(&mut self.facade, doc);
                if doc.get(RESULT_KEY).is_none() {
                    respond(doc, Value::Null, json!(INVALID_PARAM_COUNT));
                }
            }
            None => {
                warn!(command = %cmd, "Unknown command");
                respond(doc, Value::Null, json!(UNKNOWN_COMMAND));
            }
        }
    }

    /// Answer one raw request line with one response line.
    fn response_line(&mut self, line: &str) -> Result<String> {
        let mut doc = match serde_json::from_str::<Value>(line) {
            Ok(doc) if doc.is_object() => doc,
            _ => {
                warn!("Malformed request line");
                json!({})
            }
        };
        self.dispatch(&mut doc);
        Ok(serde_json::to_string(&doc)? + "\n")
    }

    fn handle_connection(&mut self, mut stream: LocalStream) -> Result<()> {
        let mut reader = BufReader::new(stream.try_clone()?);
        let mut buffer = String::new();

        loop {
            buffer.clear();
            match reader.read_line(&mut buffer) {
                Ok(0) => break, // EOF
                Ok(_) => {
                    let line = buffer.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let reply = self.response_line(line)?;
                    stream.write_all(reply.as_bytes())?;
                    stream.flush()?;
                }
                Err(e) => {
                    error!("Read error: {}", e);
                    break;
                }
            }
        }
        Ok(())
    }

    /// Run the accept loop until the process is killed.
    pub fn run(&mut self, listen_name: &str) -> Result<()> {
        let name = listen_name
            .to_fs_name::<GenericFilePath>()
            .context("Invalid listen socket name")?;
        let listener = ListenerOptions::new()
            .name(name)
            .create_sync()
            .context("Failed to bind the command socket")?;

        info!(
            socket = listen_name,
            commands = self.registry.len(),
            "Command server listening"
        );

        for conn in listener.incoming().filter_map(|c| c.ok()) {
            info!("Client connected");
            if let Err(e) = self.handle_connection(conn) {
                error!("Connection error: {}", e);
            }
        }

        Ok(())
    }
}
