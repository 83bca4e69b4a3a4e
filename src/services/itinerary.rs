//! Destination suggestion and full-plan generation.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::info;

use crate::error::{PlannerError, Result};
use crate::services::gemini::GeminiClient;
use crate::services::parser;
use crate::services::prompts;
use crate::types::{Destination, DestinationList, Plan, PlanParams};

/// Inputs for plan generation, after budget reconciliation.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub activity: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Budget ceiling passed to the AI, in yen
    pub budget: u32,
    pub preferences: Option<String>,
}

/// Inclusive day count between two dates: June 1st through June 3rd is a
/// three-day trip.
pub fn day_count(start_date: NaiveDate, end_date: NaiveDate) -> i64 {
    (end_date - start_date).num_days() + 1
}

/// Generator for destination suggestions and day-by-day itineraries.
#[derive(Debug, Clone)]
pub struct ItineraryGenerator {
    client: Arc<GeminiClient>,
}

impl ItineraryGenerator {
    pub fn new(client: Arc<GeminiClient>) -> Self {
        Self { client }
    }

    /// Suggest destinations for an activity.
    ///
    /// `exclude_ids` lists already-shown suggestions; avoidance is
    /// best-effort on the AI side, the client does not re-filter.
    pub async fn suggest_destinations(
        &self,
        activity: &str,
        exclude_ids: &[String],
    ) -> Result<Vec<Destination>> {
        let prompt = prompts::destination_prompt(activity, exclude_ids);
        let response = self.client.generate(&prompt).await?;
        let list: DestinationList = parser::decode(&response)?;

        info!(
            target: "trip_planner::itinerary",
            activity,
            count = list.destinations.len(),
            "destinations suggested"
        );
        Ok(list.destinations)
    }

    /// Generate the full plan and stamp it with the generation time and an
    /// echo of the request.
    ///
    /// The AI-returned budget total is trusted as-is; whether it exceeds
    /// the requested ceiling is a display concern.
    pub async fn generate_plan(&self, request: &PlanRequest) -> Result<Plan> {
        let days = day_count(request.start_date, request.end_date);
        if days < 1 {
            return Err(PlannerError::Validation {
                field: "endDate".to_string(),
                message: "end date precedes start date".to_string(),
            });
        }

        let prompt = prompts::itinerary_prompt(
            &request.activity,
            &request.destination,
            request.start_date,
            request.end_date,
            days,
            request.budget,
            request.preferences.as_deref(),
        );

        let response = self.client.generate(&prompt).await?;
        let mut plan: Plan = parser::decode(&response)?;

        plan.generated_at = Some(Utc::now());
        plan.params = Some(PlanParams {
            activity: request.activity.clone(),
            destination: request.destination.clone(),
            start_date: request.start_date,
            end_date: request.end_date,
            budget: request.budget,
        });

        info!(
            target: "trip_planner::itinerary",
            destination = %request.destination,
            days,
            total = plan.budget_breakdown.total,
            "plan generated"
        );
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn day_count_is_inclusive() {
        assert_eq!(day_count(date(2025, 6, 1), date(2025, 6, 3)), 3);
        assert_eq!(day_count(date(2025, 6, 1), date(2025, 6, 1)), 1);
        assert_eq!(day_count(date(2025, 12, 30), date(2026, 1, 2)), 4);
    }

    #[test]
    fn day_count_goes_negative_on_reversed_dates() {
        assert!(day_count(date(2025, 6, 3), date(2025, 6, 1)) < 1);
    }
}
