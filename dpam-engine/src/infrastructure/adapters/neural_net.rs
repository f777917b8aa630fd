// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Neural-net inference adapter backed by a long-lived model-serving
//! subprocess.
//!
//! Loading a TensorFlow/Keras-style graph per protein is the dominant cost
//! of this step, which is exactly why it is registered as `SharedResource`
//! rather than `PerProtein`: `open()` starts one subprocess that loads the
//! model once in eager-execution mode and keeps it resident for the whole
//! step. A dedicated OS thread owns the child's stdin/stdout pipes and
//! serializes access to them; `predict()` calls hand it a request over a
//! `crossbeam_channel` and block (inside `spawn_blocking`) on a one-shot
//! reply channel, the same request/response-over-a-channel shape the
//! teacher uses for its worker-to-runner progress reporting.
//!
//! Wire protocol: one line of request, one line of response, both
//! newline-terminated JSON — a flattened `[n_rows, FEATURE_WIDTH]` input
//! matrix in, a flattened `[n_rows, OUTPUT_WIDTH]` output matrix out.

use super::tool_locator::ToolLocator;
use async_trait::async_trait;
use crossbeam_channel::Sender;
use dpam_engine_domain::error::DpamError;
use dpam_engine_domain::ports::{NeuralNetAdapter, NeuralNetHandle, FEATURE_WIDTH};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;

pub struct ModelServerAdapter {
    locator: ToolLocator,
    explicit_override: Option<PathBuf>,
}

impl ModelServerAdapter {
    pub fn new(explicit_override: Option<PathBuf>) -> Self {
        Self {
            locator: ToolLocator::new("dpam-model-server", "DPAM_MODEL_SERVER_PATH", "/usr/local/dpam/bin"),
            explicit_override,
        }
    }

    fn resolve(&self) -> Result<PathBuf, DpamError> {
        self.locator.resolve(self.explicit_override.as_deref()).ok_or_else(|| DpamError::ToolMissing {
            tool: self.locator.exe_name().to_string(),
            reason: "not found via override, env var, canonical prefix, or PATH".to_string(),
        })
    }
}

#[async_trait]
impl NeuralNetAdapter for ModelServerAdapter {
    async fn check_availability(&self) -> bool {
        self.resolve().is_ok()
    }

    async fn open(&self, model_path: &Path) -> Result<Box<dyn NeuralNetHandle>, DpamError> {
        let exe = self.resolve()?;
        let model_path = model_path.to_path_buf();

        tokio::task::spawn_blocking(move || -> Result<Box<dyn NeuralNetHandle>, DpamError> {
            let model_arg = model_path.display().to_string();
            let child = Command::new(&exe)
                .arg("--model")
                .arg(&model_arg)
                .arg("--eager")
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .spawn()
                .map_err(|source| DpamError::ToolFailed {
                    tool: "dpam-model-server".to_string(),
                    exit_status: "spawn failed".to_string(),
                    stderr_tail: source.to_string(),
                })?;

            Ok(Box::new(ModelServerHandle::spawn_io_thread(child)))
        })
        .await
        .map_err(|e| DpamError::InternalError(format!("model server open task join error: {e}")))?
    }
}

/// One request/response round trip posted to the server's I/O thread.
struct InferenceJob {
    request_line: String,
    reply: mpsc::Sender<Result<PredictResponse, DpamError>>,
}

enum ServerMessage {
    Infer(InferenceJob),
    Shutdown,
}

struct ModelServerHandle {
    tx: Sender<ServerMessage>,
    io_thread: parking_lot::Mutex<Option<std::thread::JoinHandle<()>>>,
}

impl ModelServerHandle {
    fn spawn_io_thread(mut child: Child) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded::<ServerMessage>();
        let mut stdin = child.stdin.take().expect("model server spawned with piped stdin");
        let stdout = child.stdout.take().expect("model server spawned with piped stdout");
        let mut reader = BufReader::new(stdout);

        let io_thread = std::thread::Builder::new()
            .name("dpam-model-server-io".to_string())
            .spawn(move || {
                for message in rx {
                    match message {
                        ServerMessage::Infer(job) => {
                            let result = run_one_request(&mut stdin, &mut reader, &job.request_line);
                            let _ = job.reply.send(result);
                        }
                        ServerMessage::Shutdown => break,
                    }
                }
                let _ = child.kill();
                let _ = child.wait();
            })
            .expect("spawning model server I/O thread");

        Self {
            tx,
            io_thread: parking_lot::Mutex::new(Some(io_thread)),
        }
    }
}

fn run_one_request(
    stdin: &mut impl Write,
    reader: &mut impl BufRead,
    request_line: &str,
) -> Result<PredictResponse, DpamError> {
    writeln!(stdin, "{request_line}").map_err(|source| DpamError::ToolFailed {
        tool: "dpam-model-server".to_string(),
        exit_status: "write failed".to_string(),
        stderr_tail: source.to_string(),
    })?;
    stdin.flush().map_err(|source| DpamError::ToolFailed {
        tool: "dpam-model-server".to_string(),
        exit_status: "flush failed".to_string(),
        stderr_tail: source.to_string(),
    })?;

    let mut response_line = String::new();
    reader.read_line(&mut response_line).map_err(|source| DpamError::ToolFailed {
        tool: "dpam-model-server".to_string(),
        exit_status: "read failed".to_string(),
        stderr_tail: source.to_string(),
    })?;
    if response_line.is_empty() {
        return Err(DpamError::ToolFailed {
            tool: "dpam-model-server".to_string(),
            exit_status: "eof".to_string(),
            stderr_tail: "model server closed its stdout unexpectedly".to_string(),
        });
    }
    serde_json::from_str(&response_line).map_err(DpamError::from)
}

#[derive(Serialize)]
struct PredictRequest {
    n_rows: usize,
    features: Vec<f32>,
}

#[derive(Deserialize)]
struct PredictResponse {
    outputs: Vec<f32>,
    #[serde(default)]
    error: Option<String>,
}

#[async_trait]
impl NeuralNetHandle for ModelServerHandle {
    async fn predict(&self, features: &[f32], n_rows: usize) -> Result<Vec<f32>, DpamError> {
        if features.len() != n_rows * FEATURE_WIDTH {
            return Err(DpamError::InvariantViolation(format!(
                "predict called with {} feature values but n_rows={n_rows} implies {}",
                features.len(),
                n_rows * FEATURE_WIDTH
            )));
        }

        let request_line = serde_json::to_string(&PredictRequest {
            n_rows,
            features: features.to_vec(),
        })?;
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(ServerMessage::Infer(InferenceJob { request_line, reply: reply_tx }))
            .map_err(|_| DpamError::InternalError("model server I/O thread has exited".to_string()))?;

        let response = tokio::task::spawn_blocking(move || {
            reply_rx
                .recv()
                .map_err(|_| DpamError::InternalError("model server I/O thread dropped the reply channel".to_string()))
        })
        .await
        .map_err(|e| DpamError::InternalError(format!("model server predict task join error: {e}")))??;

        let response = response?;
        if let Some(reason) = response.error {
            return Err(DpamError::ToolFailed {
                tool: "dpam-model-server".to_string(),
                exit_status: "inference error".to_string(),
                stderr_tail: reason,
            });
        }
        Ok(response.outputs)
    }

    async fn close(&self) -> Result<(), DpamError> {
        let _ = self.tx.send(ServerMessage::Shutdown);
        let handle = self.io_thread.lock().take();
        if let Some(handle) = handle {
            tokio::task::spawn_blocking(move || {
                let _ = handle.join();
            })
            .await
            .map_err(|e| DpamError::InternalError(format!("model server close task join error: {e}")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_request_round_trips_through_serde() {
        let req = PredictRequest {
            n_rows: 2,
            features: vec![0.0; 2 * FEATURE_WIDTH],
        };
        let line = serde_json::to_string(&req).unwrap();
        assert!(line.contains("\"n_rows\":2"));
    }

    #[test]
    fn predict_response_error_field_is_optional() {
        let parsed: PredictResponse = serde_json::from_str(r#"{"outputs":[0.1,0.9]}"#).unwrap();
        assert!(parsed.error.is_none());
        assert_eq!(parsed.outputs.len(), 2);
    }

    #[test]
    fn run_one_request_round_trips_through_an_in_memory_pipe() {
        let mut stdin_buf: Vec<u8> = Vec::new();
        let response = br#"{"outputs":[0.2,0.8]}"#;
        let mut reader = std::io::Cursor::new(response.to_vec());
        let result = run_one_request(&mut stdin_buf, &mut reader, r#"{"n_rows":1,"features":[]}"#).unwrap();
        assert_eq!(result.outputs, vec![0.2, 0.8]);
        assert!(String::from_utf8(stdin_buf).unwrap().contains("n_rows"));
    }
}
