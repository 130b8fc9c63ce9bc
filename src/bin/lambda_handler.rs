//! AWS Lambda handler for running a work-order forecast
//!
//! Accepts the CSV export and an optional pipeline configuration as JSON and
//! returns the chart payload and projection table. Each request is an
//! isolated pipeline run.
//!
//! Supports Lambda Function URLs for direct HTTP access.

use aws_lambda_events::event::lambda_function_urls::{
    LambdaFunctionUrlRequest, LambdaFunctionUrlResponse,
};
use chrono::NaiveDate;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde::{Deserialize, Serialize};
use workorder_forecast::cleaning::{clean, CleaningRules};
use workorder_forecast::pipeline::{run_pipeline, PipelineConfig, PipelineOutput};
use workorder_forecast::projection::ProjectionTable;
use workorder_forecast::records::load_records_from_reader;
use workorder_forecast::PipelineError;

/// Input for one forecast
#[derive(Debug, Deserialize)]
pub struct ForecastRequest {
    /// CSV export, header row first
    pub csv: String,

    /// Pipeline configuration (defaults apply to missing fields)
    #[serde(default)]
    pub config: PipelineConfig,

    /// Reference date for the future-record filter (default: today)
    #[serde(default)]
    pub today: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct ForecastResponse {
    pub output: PipelineOutput,
    pub table: ProjectionTable,
    pub execution_time_ms: u64,
}

fn error_body(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}

fn status_for(error: &PipelineError) -> u16 {
    match error {
        PipelineError::EmptyAfterFilter { .. } => 422,
        PipelineError::SourceUnavailable { .. }
        | PipelineError::MissingColumn { .. }
        | PipelineError::InvalidConfig(_) => 400,
    }
}

/// Run a request body through the pipeline, returning the HTTP status and JSON body
fn process(body: &str) -> (u16, String) {
    let start = std::time::Instant::now();

    let request: ForecastRequest = match serde_json::from_str(body) {
        Ok(r) => r,
        Err(e) => return (400, error_body(&format!("Invalid JSON: {}", e))),
    };
    let config = request.config;

    let raw = match load_records_from_reader(request.csv.as_bytes(), &config.columns) {
        Ok(raw) => raw,
        Err(e) => return (status_for(&e), error_body(&e.to_string())),
    };

    let mut rules = config.cleaning_rules();
    if let Some(today) = request.today.and_then(|d| d.and_hms_opt(23, 59, 59)) {
        rules = CleaningRules { today, ..rules };
    }

    let output = match clean(&raw, &rules).and_then(|dataset| run_pipeline(&dataset, &config)) {
        Ok(output) => output,
        Err(e) => {
            log::warn!("forecast request rejected: {}", e);
            return (status_for(&e), error_body(&e.to_string()));
        }
    };

    let response = ForecastResponse {
        table: ProjectionTable::from_output(&output),
        output,
        execution_time_ms: start.elapsed().as_millis() as u64,
    };
    match serde_json::to_string(&response) {
        Ok(json) => (200, json),
        Err(e) => (500, error_body(&format!("Failed to serialize response: {}", e))),
    }
}

fn response(status: u16, body: String) -> LambdaFunctionUrlResponse {
    LambdaFunctionUrlResponse {
        status_code: status as i64,
        headers: Default::default(),
        body: Some(body),
        is_base64_encoded: false,
        cookies: Vec::new(),
    }
}

/// Lambda handler function
async fn handler(
    event: LambdaEvent<LambdaFunctionUrlRequest>,
) -> Result<LambdaFunctionUrlResponse, Error> {
    let request = event.payload;

    if request.is_base64_encoded {
        return Ok(response(400, error_body("Binary request bodies are not supported")));
    }

    let body = request.body.unwrap_or_else(|| "{}".to_string());
    let (status, body) = process(&body);
    Ok(response(status, body))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();
    run(service_fn(handler)).await
}
