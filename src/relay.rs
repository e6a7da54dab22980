pub mod dispatcher;
pub mod mapping;
pub mod pipeline;
pub mod record;

pub use dispatcher::RelayDispatcher;
pub use mapping::{RelayMapping, RelayMappingError};
pub use pipeline::{RelayOutcome, RelayPipeline};
pub use record::{MessageRecord, RelayEnvelope};
