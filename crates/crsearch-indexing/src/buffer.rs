//! Bulk write buffer.
//!
//! Operations are queued without I/O and submitted as one newline-delimited
//! bulk request on [`BulkWriteBuffer::flush`].

use serde_json::Value;
use tracing::{debug, error};

use crsearch_client::SearchBackend;
use crsearch_types::BulkOperation;

use crate::error::IndexingError;

/// One bulk item the backend rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedItem {
    pub action: String,
    pub id: String,
    pub status: u64,
    pub reason: String,
}

/// Outcome of one flush.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlushReport {
    /// Operations sent to the backend
    pub submitted: usize,
    /// Operations dropped because they could not be encoded
    pub skipped: usize,
    /// Response lines that were not objects or carried an error flag
    pub error_lines: usize,
    /// Items the backend reported as failed
    pub failed_items: Vec<FailedItem>,
}

impl FlushReport {
    pub fn is_clean(&self) -> bool {
        self.skipped == 0 && self.error_lines == 0 && self.failed_items.is_empty()
    }
}

/// Accumulates bulk operations until flushed.
#[derive(Debug, Default)]
pub struct BulkWriteBuffer {
    operations: Vec<BulkOperation>,
}

impl BulkWriteBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an operation; no I/O.
    pub fn enqueue(&mut self, operation: BulkOperation) {
        self.operations.push(operation);
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn operations(&self) -> &[BulkOperation] {
        &self.operations
    }

    /// Submit everything queued as one bulk request against `index`.
    ///
    /// Per-item failures are logged and reported, never raised. A transport
    /// failure is raised and the operations are put back for a later flush.
    pub async fn flush(
        &mut self,
        backend: &dyn SearchBackend,
        index: &str,
    ) -> Result<FlushReport, IndexingError> {
        let mut report = FlushReport::default();
        if self.operations.is_empty() {
            return Ok(report);
        }

        let mut sent = Vec::with_capacity(self.operations.len());
        let mut body = String::new();
        for operation in std::mem::take(&mut self.operations) {
            match operation.to_ndjson() {
                Ok(lines) => {
                    body.push_str(&lines);
                    sent.push(operation);
                }
                Err(e) => {
                    error!(
                        action = operation.action(),
                        doc_id = %operation.id(),
                        error = %e,
                        "Bulk operation could not be encoded, skipping"
                    );
                    report.skipped += 1;
                }
            }
        }

        if body.is_empty() {
            return Ok(report);
        }

        let response = match backend.bulk(index, body).await {
            Ok(response) => response,
            Err(e) => {
                let queued_meanwhile = std::mem::take(&mut self.operations);
                self.operations = sent;
                self.operations.extend(queued_meanwhile);
                return Err(e.into());
            }
        };
        report.submitted = sent.len();

        for line in response.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let parsed: Option<Value> = serde_json::from_str(line).ok();
            let Some(Value::Object(object)) = parsed else {
                error!(line = %line, "Indexing error: unreadable bulk response line");
                report.error_lines += 1;
                continue;
            };

            let flagged = object
                .get("errors")
                .map(|errors| errors != &Value::Bool(false))
                .unwrap_or(false);
            if !flagged {
                continue;
            }
            report.error_lines += 1;
            error!(line = %line, "Indexing error in bulk response");

            let items = object.get("items").and_then(Value::as_array);
            for item in items.into_iter().flatten() {
                if let Some(failed) = failed_item(item) {
                    report.failed_items.push(failed);
                }
            }
        }

        debug!(
            submitted = report.submitted,
            failed = report.failed_items.len(),
            "Flushed bulk request"
        );
        Ok(report)
    }
}

fn failed_item(item: &Value) -> Option<FailedItem> {
    let (action, result) = item.as_object()?.iter().next()?;
    let error = result.get("error")?;
    Some(FailedItem {
        action: action.clone(),
        id: result.get("_id").and_then(Value::as_str).unwrap_or_default().to_string(),
        status: result.get("status").and_then(Value::as_u64).unwrap_or_default(),
        reason: error
            .get("reason")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
    })
}
