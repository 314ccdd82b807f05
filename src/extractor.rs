use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{ExtractionError, Result};
use crate::models::{ChatTurn, CompletionRequest, TripPatch, TripRecord};
use crate::relay::RelayClient;
use crate::store::TripStore;

pub const EXTRACTION_PROMPT: &str = r#"You are a travel data extraction expert. Extract trip information from user messages and return ONLY a valid JSON object with this exact structure:

{
  "destination": "city, country",
  "origin": "departure city/country or 'Not specified'",
  "travelers": number,
  "duration": "X days",
  "startDate": "YYYY-MM-DD or 'Not specified'",
  "endDate": "YYYY-MM-DD or 'Not specified'",
  "budget": "amount or 'Not specified'",
  "interests": ["interest1", "interest2"] or [],
  "travelMode": "Flight/Train/Bus or 'Flight'"
}

Examples:
- "Planning a 7-day trip for 4 people from Hyderabad to Dubai (Oct 10–17 by flight)" should extract:
  - destination: "Dubai, UAE"
  - origin: "Hyderabad, India"
  - travelers: 4
  - duration: "7 days"
  - startDate: "2024-10-10"
  - endDate: "2024-10-17"
  - travelMode: "Flight"

If information is missing, use sensible defaults or "Not specified". Return ONLY the JSON, no other text."#;

/// Strictly parse a model reply into a validated [`TripRecord`].
pub fn parse_trip_record(raw: &str) -> std::result::Result<TripRecord, ExtractionError> {
    TripRecord::from_reply(raw)
}

/// Turns free-form trip descriptions into stored [`TripRecord`]s.
pub struct TripExtractor {
    relay: Arc<dyn RelayClient>,
    store: Arc<dyn TripStore>,
    generation: AtomicU64,
}

impl TripExtractor {
    pub fn new(relay: Arc<dyn RelayClient>, store: Arc<dyn TripStore>) -> Self {
        Self {
            relay,
            store,
            generation: AtomicU64::new(0),
        }
    }

    /// One extraction attempt.
    ///
    /// Relay failures are returned as errors. A reply that is not a valid trip
    /// record is logged and yields `Ok(None)`; the stored record is untouched
    /// in both cases. On success the record replaces the stored one.
    pub async fn extract(&self, text: &str) -> Result<Option<TripRecord>> {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!(generation, "Extracting trip data");

        let request =
            CompletionRequest::new(vec![ChatTurn::user(text)]).with_system_prompt(EXTRACTION_PROMPT);
        let result = self.relay.complete(&request).await?;

        let record = match parse_trip_record(&result.content) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(
                    generation,
                    "Failed to extract trip data: {}. Raw: {}",
                    e,
                    result.content
                );
                return Ok(None);
            }
        };

        self.store.set(&record).await?;
        tracing::info!(
            generation,
            destination = %record.destination,
            travelers = record.travelers,
            "Stored extracted trip"
        );
        Ok(Some(record))
    }

    pub async fn current(&self) -> Result<Option<TripRecord>> {
        self.store.get().await
    }

    /// Merge field overrides into the stored record; no-op when none is stored.
    pub async fn update(&self, patch: &TripPatch) -> Result<Option<TripRecord>> {
        self.store.merge(patch).await
    }

    pub async fn clear(&self) -> Result<()> {
        tracing::info!("Clearing stored trip");
        self.store.clear().await
    }
}
