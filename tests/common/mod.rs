#![allow(dead_code)]

use async_trait::async_trait;
use std::io::Write;
use std::sync::{Arc, Mutex};
use text_relay::delivery::{DeliveryError, DeliveryRequest, DeliveryResponse, DeliverySink};
use text_relay::relay::{RelayMapping, RelayPipeline};
use text_relay::telemetry::KeyValueFormatter;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

pub fn alice_to_bob() -> Arc<RelayMapping> {
    Arc::new([("alice", "bob")].into_iter().collect())
}

#[derive(Clone, Debug)]
pub enum ScriptedReply {
    Accept { guid: &'static str, status: &'static str },
    Reject { data: &'static str },
    Status(u16),
}

/// In-process sink that records every request and answers from a script.
pub struct RecordingSink {
    reply: ScriptedReply,
    requests: Mutex<Vec<DeliveryRequest>>,
}

impl RecordingSink {
    pub fn new(reply: ScriptedReply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn accepting() -> Arc<Self> {
        Self::new(ScriptedReply::Accept {
            guid: "abc123",
            status: "queued",
        })
    }

    pub fn requests(&self) -> Vec<DeliveryRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }
}

#[async_trait]
impl DeliverySink for RecordingSink {
    async fn deliver(
        &self,
        request: &DeliveryRequest,
    ) -> Result<DeliveryResponse, DeliveryError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());

        match &self.reply {
            ScriptedReply::Accept { guid, status } => Ok(DeliveryResponse {
                code: Some(200),
                status: Some(status.to_string()),
                data: serde_json::Value::String("accepted".to_string()),
                guid: Some(guid.to_string()),
            }),
            ScriptedReply::Reject { data } => Ok(DeliveryResponse {
                data: serde_json::Value::String(data.to_string()),
                guid: Some(String::new()),
                ..DeliveryResponse::default()
            }),
            ScriptedReply::Status(status) => Err(DeliveryError::Status { status: *status }),
        }
    }
}

pub fn pipeline_with(mapping: Arc<RelayMapping>, sink: Arc<RecordingSink>) -> RelayPipeline {
    RelayPipeline::new(mapping, Some(sink as Arc<dyn DeliverySink>))
}

#[derive(Clone, Default)]
pub struct LogBuffer {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogBuffer {
    pub fn contents(&self) -> String {
        let contents = self.buffer.lock().expect("log buffer lock");
        String::from_utf8(contents.clone()).expect("utf8 logs")
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = BufferGuard;

    fn make_writer(&'a self) -> Self::Writer {
        BufferGuard {
            buffer: self.buffer.clone(),
        }
    }
}

pub struct BufferGuard {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl Write for BufferGuard {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut guard = self.buffer.lock().expect("log buffer lock");
        guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Routes events on the current thread into a buffer using the service's
/// own key=value format. Keep the guard alive for the duration of the test.
pub fn capture_logs() -> (LogBuffer, DefaultGuard) {
    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .event_format(KeyValueFormatter::new().without_time())
        .finish();

    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}
