use crate::database::StoreError;

/// Key-value store task enumeration for the store thread
#[derive(Clone, Debug)]
pub enum StoreTask {
    Get {
        key: String,
        response_sender: crossbeam_channel::Sender<Result<Option<String>, StoreError>>,
    },
    Set {
        key: String,
        value: String,
        response_sender: Option<crossbeam_channel::Sender<Result<(), StoreError>>>,
    },
    ListKeys {
        response_sender: crossbeam_channel::Sender<Result<Vec<String>, StoreError>>,
    },
    Delete {
        key: String,
        response_sender: Option<crossbeam_channel::Sender<Result<(), StoreError>>>,
    },
}

impl StoreTask {
    pub fn name(&self) -> &'static str {
        match self {
            StoreTask::Get { .. } => "get",
            StoreTask::Set { .. } => "set",
            StoreTask::ListKeys { .. } => "list_keys",
            StoreTask::Delete { .. } => "delete",
        }
    }
}
