use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info, warn};

use super::manager::DuckDbStore;
use super::{KeyValueStore, StoreError};
use crate::types::StoreTask;

/// Store thread entry point. Owns the DuckDB connection and serves
/// `StoreTask`s until shutdown or until every `StoreHandle` is dropped.
pub fn run_store_handler(
    db_path: PathBuf,
    task_receiver: Receiver<StoreTask>,
    shutdown_signal: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = match DuckDbStore::open(&db_path) {
        Ok(store) => {
            info!("Store thread: DuckDB initialized successfully");
            store
        }
        Err(e) => {
            error!("Store thread: Failed to initialize DuckDB: {}", e);
            return Err(e.into());
        }
    };

    info!("Store thread started");
    serve_tasks(&store, &task_receiver, &shutdown_signal);
    info!("Store thread exiting gracefully");
    Ok(())
}

pub(crate) fn serve_tasks(store: &dyn KeyValueStore, task_receiver: &Receiver<StoreTask>, shutdown_signal: &AtomicBool) {
    while !shutdown_signal.load(Ordering::Relaxed) {
        match task_receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(task) => {
                debug!("Store thread: handling {}", task.name());
                handle_task(store, task);
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                info!("Store thread: task channel disconnected, exiting");
                break;
            }
        }
    }

    // queued writes are still flushed on shutdown
    while let Ok(task) = task_receiver.try_recv() {
        handle_task(store, task);
    }
}

fn handle_task(store: &dyn KeyValueStore, task: StoreTask) {
    match task {
        StoreTask::Get { key, response_sender } => {
            let result = store.get(&key);
            reply(&response_sender, result, "get");
        }
        StoreTask::Set { key, value, response_sender } => {
            let result = store.set(&key, &value);
            if let Err(e) = &result {
                error!("Store thread: failed to write {}: {}", key, e);
            }
            if let Some(sender) = response_sender {
                reply(&sender, result, "set");
            }
        }
        StoreTask::ListKeys { response_sender } => {
            let result = store.list_keys();
            reply(&response_sender, result, "list_keys");
        }
        StoreTask::Delete { key, response_sender } => {
            let result = store.delete(&key);
            if let Err(e) = &result {
                error!("Store thread: failed to delete {}: {}", key, e);
            }
            if let Some(sender) = response_sender {
                reply(&sender, result, "delete");
            }
        }
    }
}

fn reply<T>(sender: &Sender<Result<T, StoreError>>, result: Result<T, StoreError>, task: &str) {
    // the requester may have timed out and dropped its receiver
    if let Err(e) = sender.try_send(result) {
        warn!("Store thread: failed to send {} result: {}", task, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crossbeam_channel::bounded;

    #[test]
    fn pending_writes_are_flushed_before_exit() {
        let store = MemoryStore::new();
        let (task_tx, task_rx) = bounded(8);
        for i in 0..3 {
            task_tx
                .send(StoreTask::Set {
                    key: format!("k{}", i),
                    value: i.to_string(),
                    response_sender: None,
                })
                .unwrap();
        }
        drop(task_tx);

        serve_tasks(&store, &task_rx, &AtomicBool::new(false));
        assert_eq!(store.list_keys().unwrap(), vec!["k0", "k1", "k2"]);
    }

    #[test]
    fn get_replies_on_the_response_channel() {
        let store = MemoryStore::new();
        store.set("gravityOffset", "{}").unwrap();
        let (task_tx, task_rx) = bounded(2);
        let (resp_tx, resp_rx) = bounded(1);
        task_tx
            .send(StoreTask::Get {
                key: "gravityOffset".to_string(),
                response_sender: resp_tx,
            })
            .unwrap();
        drop(task_tx);

        serve_tasks(&store, &task_rx, &AtomicBool::new(false));
        assert_eq!(resp_rx.try_recv().unwrap(), Ok(Some("{}".to_string())));
    }
}
