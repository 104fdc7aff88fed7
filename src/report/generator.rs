use std::sync::Arc;

use super::client::ChatCompletionClient;
use super::fallback::template_report;
use super::parser::normalize_report;
use super::prompt::build_report_messages;
use super::ReportError;
use crate::models::{Prediction, Report};

pub const RAW_OUTPUT_START: &str = "================ RAW MODEL OUTPUT START ================";
pub const RAW_OUTPUT_END: &str = "================ RAW MODEL OUTPUT END ==================";

/// prediction → messages → completion → normalized report
pub struct ReportGenerator {
    client: Arc<dyn ChatCompletionClient>,
    /// Serve a template report instead of failing when the model is unavailable.
    fallback: bool,
}

impl ReportGenerator {
    pub fn new(client: Arc<dyn ChatCompletionClient>, fallback: bool) -> Self {
        Self { client, fallback }
    }

    pub async fn generate(&self, prediction: &Prediction) -> Result<Report, ReportError> {
        let messages = build_report_messages(prediction);

        let raw = match self.client.complete(&messages).await {
            Ok(raw) => raw,
            Err(e) if self.fallback => {
                tracing::warn!(
                    label = %prediction.prediction,
                    error = %e,
                    "Report model unavailable, serving template report"
                );
                return Ok(template_report(prediction));
            }
            Err(e) => return Err(e),
        };

        tracing::info!("{RAW_OUTPUT_START}");
        tracing::info!("{raw}");
        tracing::info!("{RAW_OUTPUT_END}");

        Ok(normalize_report(&raw))
    }
}
