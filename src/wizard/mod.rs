//! Four-stage wizard driving the plan-generation pipeline.
//!
//! Activity → Destination → Details → Plan, strictly linear with backward
//! steps. The wizard owns the accumulated input, invokes the services on
//! stage transitions and guards against duplicate in-flight requests.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{FieldError, PlannerError, Result};
use crate::services::fare::FareEstimator;
use crate::services::itinerary::{ItineraryGenerator, PlanRequest};
use crate::services::location::LocationProvider;
use crate::services::prompts::Origin;
use crate::storage::plans::{PlanStore, SavedPlanRecord};
use crate::storage::share;
use crate::types::{Coordinates, Destination, Plan};

/// Budget suggested when none was entered yet: transport cost plus a
/// 50,000 yen allowance.
const BUDGET_SUGGESTION_MARGIN: u32 = 50_000;

/// The four wizard stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    Activity,
    Destination,
    Details,
    Plan,
}

impl Stage {
    pub fn number(self) -> u8 {
        match self {
            Stage::Activity => 1,
            Stage::Destination => 2,
            Stage::Details => 3,
            Stage::Plan => 4,
        }
    }

    /// Progress label shown to the user.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Activity => "キーワード",
            Stage::Destination => "行き先",
            Stage::Details => "詳細",
            Stage::Plan => "完了",
        }
    }
}

/// Accumulated wizard input, also the snapshot persisted with a saved plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardParams {
    #[serde(default)]
    pub activity: String,
    #[serde(default)]
    pub destination: Option<Destination>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub budget: Option<u32>,
    #[serde(default)]
    pub preferences: String,
    #[serde(default = "default_include_transport")]
    pub include_transport: bool,
    #[serde(default)]
    pub transport_cost: u32,
    #[serde(default)]
    pub user_location: Option<Coordinates>,
}

fn default_include_transport() -> bool {
    true
}

impl Default for WizardParams {
    fn default() -> Self {
        Self {
            activity: String::new(),
            destination: None,
            start_date: None,
            end_date: None,
            budget: None,
            preferences: String::new(),
            include_transport: true,
            transport_cost: 0,
            user_location: None,
        }
    }
}

/// Token handed out when the wizard enters the detail stage; the host
/// resolves it into a [`CostUpdate`] and hands that back.
#[derive(Debug, Clone)]
pub struct CostRequest {
    epoch: u64,
    destination: String,
}

/// Resolved transport-cost estimate, tagged with the epoch it belongs to.
#[derive(Debug, Clone)]
pub struct CostUpdate {
    epoch: u64,
    pub position: Option<Coordinates>,
    pub cost: u32,
}

/// Bootstrap inputs present on session start, both normally absent.
#[derive(Debug, Clone, Default)]
pub struct BootstrapQuery {
    /// Id of a previously saved plan to resume
    pub plan_id: Option<String>,
    /// Encoded shared-plan payload
    pub shared_plan: Option<String>,
}

/// Budget actually handed to the generator: the transport cost is deducted
/// only when the user chose to include it, and a deduction that would leave
/// nothing falls back to the full budget.
pub fn effective_budget(budget: u32, include_transport: bool, transport_cost: u32) -> u32 {
    let deduction = if include_transport { transport_cost } else { 0 };
    match budget.checked_sub(deduction) {
        Some(remaining) if remaining > 0 => remaining,
        _ => budget,
    }
}

/// Format yen with thousands separators: 50000 → "50,000".
pub fn format_yen(amount: u32) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// The wizard session. Exclusively owned; no sharing across sessions.
pub struct Wizard {
    stage: Stage,
    params: WizardParams,
    generated_plan: Option<Plan>,
    destinations: Vec<Destination>,
    generator: ItineraryGenerator,
    fares: FareEstimator,
    location: Arc<dyn LocationProvider>,
    store: PlanStore,
    in_flight: bool,
    cost_epoch: u64,
}

impl Wizard {
    pub fn new(
        generator: ItineraryGenerator,
        fares: FareEstimator,
        location: Arc<dyn LocationProvider>,
        store: PlanStore,
    ) -> Self {
        Self {
            stage: Stage::Activity,
            params: WizardParams::default(),
            generated_plan: None,
            destinations: Vec::new(),
            generator,
            fares,
            location,
            store,
            in_flight: false,
            cost_epoch: 0,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn params(&self) -> &WizardParams {
        &self.params
    }

    pub fn destinations(&self) -> &[Destination] {
        &self.destinations
    }

    pub fn generated_plan(&self) -> Option<&Plan> {
        self.generated_plan.as_ref()
    }

    /// Whether a stage request is outstanding; hosts disable the matching
    /// control while this is set.
    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    /// Resume from a saved plan or a shared link, jumping straight to the
    /// plan stage. Returns whether a bootstrap happened; on a corrupt share
    /// link the wizard stays in its normal initial state.
    pub async fn bootstrap(&mut self, query: &BootstrapQuery) -> bool {
        if let Some(plan_id) = &query.plan_id {
            if let Some(record) = self.store.get(plan_id).await {
                info!(target: "trip_planner::wizard", plan_id = %plan_id, "resuming saved plan");
                self.params = record.params;
                self.generated_plan = Some(record.plan);
                self.stage = Stage::Plan;
                return true;
            }
            warn!(target: "trip_planner::wizard", plan_id = %plan_id, "saved plan not found");
            return false;
        }

        if let Some(encoded) = &query.shared_plan {
            match share::decode_shared_plan(encoded) {
                Ok(plan) => {
                    if let Some(params) = &plan.params {
                        self.params.activity = params.activity.clone();
                        self.params.start_date = Some(params.start_date);
                        self.params.end_date = Some(params.end_date);
                        self.params.budget = Some(params.budget);
                    }
                    self.generated_plan = Some(plan);
                    self.stage = Stage::Plan;
                    info!(target: "trip_planner::wizard", "restored shared plan");
                    return true;
                }
                Err(err) => {
                    warn!(target: "trip_planner::wizard", error = %err, "failed to decode shared plan");
                    return false;
                }
            }
        }

        false
    }

    /// Stage 1: record what the user wants to do and advance.
    pub fn submit_activity(&mut self, activity: &str) -> std::result::Result<(), FieldError> {
        if self.stage != Stage::Activity {
            return Err(FieldError::new("stage", "already past the activity stage"));
        }

        let trimmed = activity.trim();
        if trimmed.is_empty() {
            return Err(FieldError::new("activity", "やりたいことを入力してください"));
        }

        self.params.activity = trimmed.to_string();
        self.stage = Stage::Destination;
        Ok(())
    }

    /// Stage 2: fetch the initial suggestion batch. A repeated call with
    /// suggestions already loaded is a no-op.
    pub async fn load_destinations(&mut self) -> Result<&[Destination]> {
        self.ensure_stage(Stage::Destination)?;
        if !self.destinations.is_empty() {
            return Ok(&self.destinations);
        }
        self.fetch_destinations(&[]).await
    }

    /// Stage 2: fetch more suggestions, excluding everything already shown.
    /// The batch accumulates, it never replaces.
    pub async fn load_more(&mut self) -> Result<&[Destination]> {
        self.ensure_stage(Stage::Destination)?;
        let exclude: Vec<String> = self.destinations.iter().map(|d| d.id.clone()).collect();
        self.fetch_destinations(&exclude).await
    }

    async fn fetch_destinations(&mut self, exclude: &[String]) -> Result<&[Destination]> {
        if self.in_flight {
            return Err(PlannerError::Busy);
        }

        self.in_flight = true;
        let result = self
            .generator
            .suggest_destinations(&self.params.activity, exclude)
            .await;
        self.in_flight = false;

        self.destinations.extend(result?);
        Ok(&self.destinations)
    }

    /// Stage 2 → 3: pick a destination. Entering the detail stage starts a
    /// transport-cost estimation; the returned request is resolved by the
    /// host and applied back when done.
    pub fn choose_destination(&mut self, destination: Destination) -> Result<CostRequest> {
        self.ensure_stage(Stage::Destination)?;

        self.cost_epoch += 1;
        let request = CostRequest {
            epoch: self.cost_epoch,
            destination: destination.name.clone(),
        };

        self.params.destination = Some(destination);
        self.stage = Stage::Details;
        Ok(request)
    }

    /// Resolve a transport-cost request: geolocation first, then the
    /// estimate keyed off it. Fail-soft, never an error.
    pub async fn resolve_transport_cost(&self, request: &CostRequest) -> CostUpdate {
        let position = match self.location.current_position().await {
            Ok(position) => Some(position),
            Err(err) => {
                warn!(target: "trip_planner::wizard", error = %err, "geolocation unavailable");
                None
            }
        };

        let origin = match position {
            Some(coords) => Origin::Position(coords),
            None => {
                // Without a position the estimate has no origin; keep cost 0.
                return CostUpdate {
                    epoch: request.epoch,
                    position: None,
                    cost: 0,
                };
            }
        };

        let cost = self
            .fares
            .estimate_transport_cost(&origin, &request.destination)
            .await;

        CostUpdate {
            epoch: request.epoch,
            position,
            cost,
        }
    }

    /// Apply a resolved estimate. Stale updates (the user navigated away
    /// and back, starting a newer estimation) are discarded.
    pub fn apply_transport_cost(&mut self, update: CostUpdate) -> bool {
        if update.epoch != self.cost_epoch || self.stage != Stage::Details {
            return false;
        }

        self.params.user_location = update.position;
        self.params.transport_cost = update.cost;

        if self.params.budget.is_none() && update.cost > 0 {
            self.params.budget = Some(update.cost + BUDGET_SUGGESTION_MARGIN);
        }
        true
    }

    // Detail-form edits. These stay legal while a cost estimation is in
    // flight; the estimate lands underneath them via the epoch guard.

    pub fn set_dates(&mut self, start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) {
        self.params.start_date = start_date;
        self.params.end_date = end_date;
    }

    pub fn set_budget(&mut self, budget: Option<u32>) {
        self.params.budget = budget;
    }

    pub fn set_preferences(&mut self, preferences: &str) {
        self.params.preferences = preferences.to_string();
    }

    pub fn set_include_transport(&mut self, include: bool) {
        self.params.include_transport = include;
    }

    /// Field-level checks for the detail form. Empty means valid.
    pub fn validate_details(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        let start = self.params.start_date;
        let end = self.params.end_date;

        if start.is_none() {
            errors.push(FieldError::new("startDate", "開始日を選択してください"));
        }
        match (start, end) {
            (_, None) => errors.push(FieldError::new("endDate", "終了日を選択してください")),
            (Some(start), Some(end)) if end < start => errors.push(FieldError::new(
                "endDate",
                "終了日は開始日より後に設定してください",
            )),
            _ => {}
        }

        match self.params.budget {
            None | Some(0) => {
                errors.push(FieldError::new("budget", "予算を入力してください"));
            }
            Some(budget)
                if self.params.include_transport
                    && self.params.transport_cost > 0
                    && budget < self.params.transport_cost =>
            {
                errors.push(FieldError::new(
                    "budget",
                    format!(
                        "予算は最低でも交通費（¥{}）以上に設定してください",
                        format_yen(self.params.transport_cost)
                    ),
                ));
            }
            _ => {}
        }

        errors
    }

    /// Stage 3 → 4. Validation failures block the transition and never
    /// reach the network layer.
    pub fn submit_details(&mut self) -> std::result::Result<(), Vec<FieldError>> {
        if self.stage != Stage::Details {
            return Err(vec![FieldError::new("stage", "not at the detail stage")]);
        }

        let errors = self.validate_details();
        if !errors.is_empty() {
            return Err(errors);
        }

        self.stage = Stage::Plan;
        Ok(())
    }

    /// Stage 4: generate the plan unless one is already attached.
    ///
    /// On failure the stage stays interactive and the call can simply be
    /// retried.
    pub async fn generate(&mut self) -> Result<&Plan> {
        self.ensure_stage(Stage::Plan)?;

        if self.generated_plan.is_none() {
            if self.in_flight {
                return Err(PlannerError::Busy);
            }

            let request = self.plan_request()?;
            self.in_flight = true;
            let result = self.generator.generate_plan(&request).await;
            self.in_flight = false;

            return Ok(&*self.generated_plan.insert(result?));
        }

        self.require_plan()
    }

    fn plan_request(&self) -> Result<PlanRequest> {
        let destination = self
            .params
            .destination
            .as_ref()
            .ok_or_else(|| PlannerError::Validation {
                field: "destination".to_string(),
                message: "旅行先を選択してください".to_string(),
            })?;
        let (start_date, end_date, budget) = match (
            self.params.start_date,
            self.params.end_date,
            self.params.budget,
        ) {
            (Some(start), Some(end), Some(budget)) => (start, end, budget),
            _ => {
                return Err(PlannerError::Validation {
                    field: "details".to_string(),
                    message: "日程と予算を入力してください".to_string(),
                })
            }
        };

        Ok(PlanRequest {
            activity: self.params.activity.clone(),
            destination: destination.name.clone(),
            start_date,
            end_date,
            budget: effective_budget(
                budget,
                self.params.include_transport,
                self.params.transport_cost,
            ),
            preferences: (!self.params.preferences.trim().is_empty())
                .then(|| self.params.preferences.clone()),
        })
    }

    /// Step one stage backward. A pending generation keeps running; its
    /// eventual result is discarded by the epoch guard.
    pub fn back(&mut self) {
        self.stage = match self.stage {
            Stage::Activity => Stage::Activity,
            Stage::Destination => {
                // Leaving the suggestion stage drops the batch; returning
                // re-fetches a fresh one.
                self.destinations.clear();
                Stage::Activity
            }
            Stage::Details => {
                self.cost_epoch += 1;
                Stage::Destination
            }
            Stage::Plan => Stage::Details,
        };
    }

    /// Persist the generated plan with the inputs that produced it.
    pub async fn save(&self) -> Result<SavedPlanRecord> {
        let plan = self.require_plan()?;
        self.store.save(plan, &self.params).await
    }

    /// Encode the generated plan for sharing.
    pub fn share_link(&self) -> Result<String> {
        share::encode_for_sharing(self.require_plan()?)
    }

    fn require_plan(&self) -> Result<&Plan> {
        self.generated_plan
            .as_ref()
            .ok_or_else(|| PlannerError::Validation {
                field: "generatedPlan".to_string(),
                message: "プランがまだ生成されていません".to_string(),
            })
    }

    fn ensure_stage(&self, expected: Stage) -> Result<()> {
        if self.stage != expected {
            return Err(PlannerError::Validation {
                field: "stage".to_string(),
                message: format!(
                    "expected stage {} ({}), currently at {}",
                    expected.number(),
                    expected.label(),
                    self.stage.number()
                ),
            });
        }
        Ok(())
    }
}
