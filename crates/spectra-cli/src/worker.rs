//! Line-delimited JSON worker on stdin/stdout.
//!
//! Each request runs on the blocking pool, so responses may arrive out of
//! order; callers match them by id. `cancel` sets the flag of the in-flight
//! request with the same id. EOF or Ctrl-C stops reading, and the process
//! exits once every in-flight request has answered.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use spectra_core::{
    CancelFlag, RequestType, Tolerances, WorkerRequest, WorkerResponse, handle_request,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{Mutex, mpsc};
use tokio_util::task::TaskTracker;

type InFlight = Arc<Mutex<HashMap<String, CancelFlag>>>;

pub async fn run(tol: Tolerances) -> Result<()> {
    let (tx, rx) = mpsc::unbounded_channel::<WorkerResponse>();
    let writer = tokio::spawn(write_responses(rx));

    let tracker = TaskTracker::new();
    let in_flight: InFlight = Arc::new(Mutex::new(HashMap::new()));
    let tol = Arc::new(tol);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut interrupted = false;
    tracing::info!("worker ready");

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, cancelling in-flight requests");
                for flag in in_flight.lock().await.values() {
                    flag.cancel();
                }
                interrupted = true;
                None
            }
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        let req = match WorkerRequest::parse(&line) {
            Ok(req) => req,
            Err(resp) => {
                tracing::debug!(error = ?resp.error, "rejected request");
                let _ = tx.send(resp);
                continue;
            }
        };
        let key = id_key(&req.id);

        if req.kind == RequestType::Cancel {
            let resp = match in_flight.lock().await.get(&key) {
                Some(flag) => {
                    flag.cancel();
                    WorkerResponse::ok(req.id, serde_json::json!({ "cancelled": true }))
                }
                None => WorkerResponse::failure(req.id, "no running request with this id"),
            };
            let _ = tx.send(resp);
            continue;
        }

        let cancel = CancelFlag::new();
        {
            let mut map = in_flight.lock().await;
            if map.contains_key(&key) {
                let _ = tx.send(WorkerResponse::failure(
                    req.id,
                    "a request with this id is already running",
                ));
                continue;
            }
            map.insert(key.clone(), cancel.clone());
        }

        let tx = tx.clone();
        let tol = Arc::clone(&tol);
        let in_flight = Arc::clone(&in_flight);
        tracker.spawn(async move {
            let id = req.id.clone();
            tracing::debug!(id = %key, kind = ?req.kind, "request started");
            let resp = tokio::task::spawn_blocking(move || handle_request(&req, &tol, &cancel))
                .await
                .unwrap_or_else(|e| WorkerResponse::failure(id, format!("request failed: {e}")));
            in_flight.lock().await.remove(&key);
            tracing::debug!(id = %key, success = resp.success, "request finished");
            let _ = tx.send(resp);
        });
    }

    tracker.close();
    tracker.wait().await;
    drop(tx);
    writer.await.context("response writer failed")??;
    tracing::info!("worker stopped");
    if interrupted {
        // the blocking stdin reader would hold runtime shutdown until the next line
        std::process::exit(0);
    }
    Ok(())
}

async fn write_responses(mut rx: mpsc::UnboundedReceiver<WorkerResponse>) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    while let Some(resp) = rx.recv().await {
        let mut line = serde_json::to_string(&resp)?;
        line.push('\n');
        stdout.write_all(line.as_bytes()).await?;
        stdout.flush().await?;
    }
    Ok(())
}

/// Ids compare by their JSON text, so `7` and `"7"` are distinct.
fn id_key(id: &Value) -> String {
    id.to_string()
}
