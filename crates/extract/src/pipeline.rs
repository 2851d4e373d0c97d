use thiserror::Error;
use tracing::debug;

use kharcha_core::{InboundMessage, TransactionRecord};

use crate::backend::{InferenceBackend, InferenceError};
use crate::cascade;
use crate::generative;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("unable to extract required fields (amount or merchant)")]
    FieldsMissing,
}

/// The one result shape callers see: a fully valid record, or a failure with
/// a displayable reason. Nothing in between, and nothing panics or escapes.
pub type ExtractionOutcome = Result<TransactionRecord, ExtractError>;

/// Placeholder backend for rules-only pipelines. Never invoked — a pipeline
/// built with [`ExtractionPipeline::rules_only`] holds no backend at all.
pub struct NoBackend;

impl InferenceBackend for NoBackend {
    fn generate(&self, _prompt: &str) -> Result<String, InferenceError> {
        Err(InferenceError::Unavailable("no backend configured".into()))
    }
}

/// Two-stage extractor: generative attempt first, deterministic pattern
/// cascade as the safety net.
///
/// The backend is owned by the pipeline; dropping the pipeline releases the
/// backend's session on every exit path. A validated generative result is
/// final — the cascade never overrides it.
pub struct ExtractionPipeline<B: InferenceBackend> {
    backend: Option<B>,
}

impl ExtractionPipeline<NoBackend> {
    /// A pipeline that goes straight to the pattern cascade.
    pub fn rules_only() -> Self {
        ExtractionPipeline { backend: None }
    }
}

impl<B: InferenceBackend> ExtractionPipeline<B> {
    pub fn with_backend(backend: B) -> Self {
        ExtractionPipeline { backend: Some(backend) }
    }

    /// Extract a transaction from one message.
    ///
    /// Deterministic over its inputs: the same message, bank name and backend
    /// state always produce the same outcome.
    pub fn extract(&self, message: &InboundMessage, bank_name: &str) -> ExtractionOutcome {
        if let Some(backend) = &self.backend {
            if let Some(record) = self.generative_attempt(backend, message, bank_name) {
                debug!("generative extraction succeeded");
                return Ok(record);
            }
            debug!("generative extraction yielded nothing, trying pattern cascade");
        }

        let fields = cascade::extract_fields(&message.body);
        match fields.into_record(message, bank_name) {
            Some(record) => {
                debug!("pattern cascade extraction succeeded");
                Ok(record)
            }
            None => Err(ExtractError::FieldsMissing),
        }
    }

    /// Stage A. Every failure — unreachable backend, timeout, malformed or
    /// invalid reply — collapses to `None` here and never reaches the caller.
    fn generative_attempt(
        &self,
        backend: &B,
        message: &InboundMessage,
        bank_name: &str,
    ) -> Option<TransactionRecord> {
        let prompt = generative::build_prompt(&message.body);
        let response = match backend.generate(&prompt) {
            Ok(response) => response,
            Err(e) => {
                debug!("inference backend failed: {e}");
                return None;
            }
        };

        let fields = generative::parse_response(&response)?;
        fields.into_record(message, bank_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, UnavailableBackend};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn msg(body: &str) -> InboundMessage {
        InboundMessage::new("VM-HDFCBK", body, 1_700_000_000_000)
    }

    const DEBIT_ALERT: &str =
        "Rs. 500.00 debited from A/C XX1234 To SUPERMART On 12-01-24 UPI Ref 123456789012";

    #[test]
    fn cascade_alone_extracts_known_format() {
        let pipeline = ExtractionPipeline::rules_only();
        let record = pipeline.extract(&msg(DEBIT_ALERT), "HDFC Bank").unwrap();

        assert_eq!(record.amount, dec("500.00"));
        assert_eq!(record.merchant, "SUPERMART");
        assert_eq!(record.account, "XX1234");
        assert_eq!(record.reference, "123456789012");
        assert_eq!(record.bank_name, "HDFC Bank");
        assert_eq!(record.currency, "INR");
        assert_eq!(record.raw_text, DEBIT_ALERT);
        assert_eq!(record.category, "");
    }

    #[test]
    fn valid_generative_result_takes_absolute_precedence() {
        // The cascade would say SUPERMART; the backend says otherwise and its
        // reply validates, so the backend wins.
        let backend = MockBackend::new(
            r#"{"amount":"750.25","merchant":"SUPERMART RETAIL PVT LTD","reference":"UPIREF99","account":"9876"}"#,
        );
        let pipeline = ExtractionPipeline::with_backend(backend);
        let record = pipeline.extract(&msg(DEBIT_ALERT), "HDFC Bank").unwrap();

        assert_eq!(record.amount, dec("750.25"));
        assert_eq!(record.merchant, "SUPERMART RETAIL PVT LTD");
        assert_eq!(record.reference, "UPIREF99");
        assert_eq!(record.account, "9876");
    }

    #[test]
    fn generative_precedence_survives_surrounding_prose() {
        let backend = MockBackend::new(concat!(
            "Here you go:\n",
            r#"{"amount":"321","merchant":"CHAIWALA"}"#,
            "\nHope that helps!"
        ));
        let pipeline = ExtractionPipeline::with_backend(backend);
        let record = pipeline.extract(&msg(DEBIT_ALERT), "HDFC Bank").unwrap();
        assert_eq!(record.amount, dec("321"));
        assert_eq!(record.merchant, "CHAIWALA");
    }

    #[test]
    fn braceless_reply_falls_back_to_cascade() {
        let backend = MockBackend::new("I could not find a JSON object, sorry.");
        let pipeline = ExtractionPipeline::with_backend(backend);
        let record = pipeline.extract(&msg(DEBIT_ALERT), "HDFC Bank").unwrap();

        // Stage B values, not anything the backend said.
        assert_eq!(record.amount, dec("500.00"));
        assert_eq!(record.merchant, "SUPERMART");
    }

    #[test]
    fn null_merchant_reply_falls_back_to_cascade() {
        let backend = MockBackend::new(r#"{"amount":"500.00","merchant":"null"}"#);
        let pipeline = ExtractionPipeline::with_backend(backend);
        let record = pipeline.extract(&msg(DEBIT_ALERT), "HDFC Bank").unwrap();
        assert_eq!(record.merchant, "SUPERMART");
    }

    #[test]
    fn unreachable_backend_degrades_to_cascade() {
        let pipeline = ExtractionPipeline::with_backend(UnavailableBackend);
        let record = pipeline.extract(&msg(DEBIT_ALERT), "HDFC Bank").unwrap();
        assert_eq!(record.merchant, "SUPERMART");
    }

    #[test]
    fn otp_body_fails_with_fixed_reason() {
        let pipeline = ExtractionPipeline::rules_only();
        let outcome = pipeline.extract(&msg("Your OTP is 4532"), "HDFC Bank");

        assert_eq!(outcome, Err(ExtractError::FieldsMissing));
        assert_eq!(
            ExtractError::FieldsMissing.to_string(),
            "unable to extract required fields (amount or merchant)"
        );
    }

    #[test]
    fn both_stages_failing_is_the_only_failure_surface() {
        // Backend reply is garbage AND the body matches no pattern.
        let backend = MockBackend::new("}{");
        let pipeline = ExtractionPipeline::with_backend(backend);
        let outcome = pipeline.extract(&msg("Hello, your parcel has shipped"), "HDFC Bank");
        assert_eq!(outcome, Err(ExtractError::FieldsMissing));
    }

    #[test]
    fn extraction_is_idempotent() {
        let pipeline = ExtractionPipeline::rules_only();
        let message = msg(DEBIT_ALERT);
        let first = pipeline.extract(&message, "HDFC Bank");
        let second = pipeline.extract(&message, "HDFC Bank");
        assert_eq!(first, second);
    }

    #[test]
    fn payee_first_policy_end_to_end() {
        let pipeline = ExtractionPipeline::rules_only();
        let body = "Rs. 120 debited To SUPERMART On 12-01 UPI A/C 1234 From JOHN DOE";
        let record = pipeline.extract(&msg(body), "HDFC Bank").unwrap();
        assert_eq!(record.merchant, "SUPERMART");
    }

    #[test]
    fn thousands_separators_are_stripped() {
        let pipeline = ExtractionPipeline::rules_only();
        let record = pipeline
            .extract(&msg("Rs. 12,345.50 debited To SUPERMART"), "HDFC Bank")
            .unwrap();
        assert_eq!(record.amount, dec("12345.50"));
    }

    #[test]
    fn derived_date_time_comes_from_message_timestamp() {
        let pipeline = ExtractionPipeline::rules_only();
        let message = msg(DEBIT_ALERT);
        let record = pipeline.extract(&message, "HDFC Bank").unwrap();
        let (date, time) = kharcha_core::derive_date_time(message.received_at_ms);
        assert_eq!(record.date, date);
        assert_eq!(record.time, time);
    }
}
