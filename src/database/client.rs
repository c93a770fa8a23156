use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use log::warn;

use super::{KeyValueStore, StoreError};
use crate::types::StoreTask;

/// UI-thread side of the store thread. Reads block up to `timeout`;
/// writes are queued without waiting for the result.
#[derive(Clone)]
pub struct StoreHandle {
    task_sender: Sender<StoreTask>,
    timeout: Duration,
}

impl StoreHandle {
    pub fn new(task_sender: Sender<StoreTask>, timeout: Duration) -> Self {
        Self { task_sender, timeout }
    }

    fn submit(&self, task: StoreTask) -> Result<(), StoreError> {
        match self.task_sender.try_send(task) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(task)) => {
                // queue is full: wait briefly rather than losing the task
                warn!("Store queue full, waiting to submit {}", task.name());
                self.task_sender
                    .send_timeout(task, self.timeout)
                    .map_err(|_| StoreError::Timeout(self.timeout))
            }
            Err(TrySendError::Disconnected(_)) => Err(StoreError::Disconnected),
        }
    }

    fn wait<T>(&self, receiver: Receiver<Result<T, StoreError>>) -> Result<T, StoreError> {
        match receiver.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(StoreError::Timeout(self.timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(StoreError::Disconnected),
        }
    }
}

impl KeyValueStore for StoreHandle {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let (response_sender, response_receiver) = bounded(1);
        self.submit(StoreTask::Get {
            key: key.to_string(),
            response_sender,
        })?;
        self.wait(response_receiver)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.submit(StoreTask::Set {
            key: key.to_string(),
            value: value.to_string(),
            response_sender: None,
        })
    }

    fn list_keys(&self) -> Result<Vec<String>, StoreError> {
        let (response_sender, response_receiver) = bounded(1);
        self.submit(StoreTask::ListKeys { response_sender })?;
        self.wait(response_receiver)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.submit(StoreTask::Delete {
            key: key.to_string(),
            response_sender: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::run_store_handler;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn handle_round_trips_through_store_thread() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("store.db");
        let (task_tx, task_rx) = bounded(16);
        let shutdown = Arc::new(AtomicBool::new(false));

        let thread_shutdown = Arc::clone(&shutdown);
        let worker = thread::spawn(move || {
            run_store_handler(db_path, task_rx, thread_shutdown).map_err(|e| e.to_string())
        });

        let handle = StoreHandle::new(task_tx, Duration::from_secs(10));
        handle.set("savedSessions", "[\"a\"]").unwrap();
        assert_eq!(handle.get("savedSessions").unwrap().as_deref(), Some("[\"a\"]"));
        assert_eq!(handle.list_keys().unwrap(), vec!["savedSessions".to_string()]);

        shutdown.store(true, Ordering::Relaxed);
        drop(handle);
        assert!(worker.join().unwrap().is_ok());
    }

    #[test]
    fn stopped_store_reports_disconnected() {
        let (task_tx, task_rx) = bounded(1);
        drop(task_rx);
        let handle = StoreHandle::new(task_tx, Duration::from_millis(10));
        assert_eq!(handle.get("x"), Err(StoreError::Disconnected));
        assert_eq!(handle.set("x", "1"), Err(StoreError::Disconnected));
    }
}
