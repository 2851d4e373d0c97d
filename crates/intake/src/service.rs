//! The intake flow: capture every message, classify the sender, extract
//! transactions from bank traffic, hand everything to the sink.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use kharcha_core::{BankDirectory, CapturedMessage, InboundMessage};
use kharcha_extract::{ExtractionPipeline, InferenceBackend};

use crate::sink::{PersistenceSink, SinkError};

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeOutcome {
    /// Recorded, sender is not a configured bank.
    NotBank { message_id: i64 },
    /// Recorded as a bank message; extraction deferred (auto-parse off).
    Deferred { message_id: i64 },
    Parsed { message_id: i64, transaction_id: i64 },
    Failed { message_id: i64, reason: String },
}

pub struct IntakeService<B: InferenceBackend, S: PersistenceSink> {
    directory: BankDirectory,
    pipeline: Arc<ExtractionPipeline<B>>,
    sink: Arc<S>,
    auto_parse: bool,
}

impl<B, S> IntakeService<B, S>
where
    B: InferenceBackend + 'static,
    S: PersistenceSink,
{
    pub fn new(directory: BankDirectory, pipeline: ExtractionPipeline<B>, sink: Arc<S>) -> Self {
        IntakeService {
            directory,
            pipeline: Arc::new(pipeline),
            sink,
            auto_parse: false,
        }
    }

    /// Enable extraction on capture. Off by default — captured messages can
    /// always be processed later.
    pub fn with_auto_parse(mut self, enabled: bool) -> Self {
        self.auto_parse = enabled;
        self
    }

    /// Process one message end to end. The directory snapshot taken here is
    /// stable for the whole extraction; concurrent configuration changes
    /// apply from the next message on.
    pub async fn handle(&self, message: InboundMessage) -> Result<IntakeOutcome, SinkError> {
        let matched = self.directory.classify(&message.sender).cloned();
        let captured = CapturedMessage::capture(&message, matched.as_ref());
        let message_id = self.sink.store_captured(&captured).await?;

        let Some(bank) = matched else {
            debug!("sender {} is not a configured bank", message.sender);
            return Ok(IntakeOutcome::NotBank { message_id });
        };

        if !self.auto_parse {
            debug!("auto-parse disabled, message {message_id} stored for later");
            return Ok(IntakeOutcome::Deferred { message_id });
        }

        // The inference call can block for seconds; keep it off the async
        // runtime threads.
        let pipeline = Arc::clone(&self.pipeline);
        let bank_name = bank.bank_name.clone();
        let extraction =
            tokio::task::spawn_blocking(move || pipeline.extract(&message, &bank_name)).await;

        match extraction {
            Ok(Ok(record)) => {
                let transaction_id = self.sink.store_transaction(&record).await?;
                self.sink.mark_parsed(message_id, transaction_id).await?;
                info!(
                    "transaction stored: {} {} ({})",
                    record.formatted_amount(),
                    record.merchant,
                    record.bank_name
                );
                Ok(IntakeOutcome::Parsed { message_id, transaction_id })
            }
            Ok(Err(e)) => {
                let reason = e.to_string();
                self.sink.mark_failed(message_id, &reason).await?;
                Ok(IntakeOutcome::Failed { message_id, reason })
            }
            Err(join_error) => {
                warn!("extraction task failed: {join_error}");
                let reason = "extraction task failed".to_string();
                self.sink.mark_failed(message_id, &reason).await?;
                Ok(IntakeOutcome::Failed { message_id, reason })
            }
        }
    }
}

/// Drain an mpsc channel of inbound messages through the service. The
/// channel bridges whatever platform boundary delivers messages and the
/// async processor.
pub fn spawn_intake_worker<B, S>(
    service: IntakeService<B, S>,
    mut rx: mpsc::Receiver<InboundMessage>,
) -> JoinHandle<()>
where
    B: InferenceBackend + 'static,
    S: PersistenceSink + 'static,
{
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = service.handle(message).await {
                warn!("intake persistence error: {e}");
            }
        }
    })
}
