use crate::relay::RelayDispatcher;

pub const DEFAULT_MAX_BODY_BYTES: usize = 1_048_576;

/// Shared state handed to every inbound request handler.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: RelayDispatcher,
    pub max_payload_bytes: usize,
}

impl AppState {
    pub fn new(dispatcher: RelayDispatcher) -> Self {
        Self {
            dispatcher,
            max_payload_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}
