// Search form controller.
//
// Owns one `SearchParameters` record, two typeahead selectors (destination
// and origin airport), and the state of the last submission:
//
// Editing ──submit──▶ Submitting ──ok──▶ Results ──submit──▶ Submitting ...
//                          └──────err──▶ Failed  ──submit──▶ Submitting ...
//
// Network work runs in spawned tasks that report back over a channel; the
// owner applies those completions with `SearchForm::next_update`. The form
// owns its tasks: `SearchForm::cancel` or dropping the form aborts them.
// A task that ends without reporting (it panicked or was aborted) still
// reports, as `Completion::Interrupted`, so the form never waits on it forever.

use reqwest::Url;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::api::{ApiResult, SearchApi};
use crate::error::ValidationError;
use crate::events::Document;
use crate::models::{
    Airport, Destination, Interest, RecommendationResult, SearchField, SearchParameters, SearchResponse,
    UserSession,
};
use crate::typeahead::{AIRPORT_SEARCH_KEYS, CandidateOption, DESTINATION_SEARCH_KEYS, TypeaheadSelector};

// The only failure text the user ever sees; details go to the log
pub const SEARCH_FAILED_MESSAGE: &str = "Failed to search. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Picker {
    Destination,
    Origin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceList {
    Destinations,
    Airports,
}

// One rendered recommendation with its UI-only expansion flag
#[derive(Debug, Clone, PartialEq)]
pub struct ResultCard {
    pub recommendation: RecommendationResult,
    pub expanded: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormState {
    Editing,
    Submitting,
    Results(Vec<ResultCard>),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Dispatched,
    // A search from this form is already in flight; nothing was sent
    AlreadySubmitting,
    // The record could not be turned into a request; the form shows the failure message
    Invalid(ValidationError),
}

// What applying one background completion changed
#[derive(Debug, Clone, PartialEq)]
pub enum FormUpdate {
    ReferenceLoaded { list: ReferenceList, count: usize },
    ReferenceFailed(ReferenceList),
    SearchSucceeded { count: usize },
    SearchFailed,
    // Completion of a cancelled submission, discarded
    Stale,
}

#[derive(Debug, Clone, Copy)]
enum Job {
    Reference(ReferenceList),
    Search { generation: u64 },
}

enum Completion {
    Destinations(ApiResult<Vec<Destination>>),
    Airports(ApiResult<Vec<Airport>>),
    Search {
        generation: u64,
        result: ApiResult<SearchResponse>,
    },
    Interrupted(Job),
}

// Moved into each spawned task. Sends `Interrupted` on drop unless the task
// got to report its result.
struct Reporter {
    tx: UnboundedSender<Completion>,
    job: Option<Job>,
}

impl Reporter {
    fn new(tx: UnboundedSender<Completion>, job: Job) -> Self {
        Self { tx, job: Some(job) }
    }

    fn send(mut self, completion: Completion) {
        self.job = None;
        let _ = self.tx.send(completion);
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        if let Some(job) = self.job.take() {
            let _ = self.tx.send(Completion::Interrupted(job));
        }
    }
}

pub struct SearchForm {
    api: Arc<dyn SearchApi>,
    user: Option<UserSession>,
    params: SearchParameters,
    destination: TypeaheadSelector,
    origin: TypeaheadSelector,
    state: FormState,
    // Bumped on every dispatch so late completions of cancelled searches can be told apart
    generation: u64,
    completions_tx: UnboundedSender<Completion>,
    completions_rx: UnboundedReceiver<Completion>,
    reference_tasks: Vec<JoinHandle<()>>,
    reference_pending: usize,
    in_flight: Option<JoinHandle<()>>,
}

impl SearchForm {
    /// Mounts the form: seeds the destination from the `destination` query
    /// parameter of `location` right away, then starts loading both reference
    /// lists in the background. Must be called inside a tokio runtime.
    pub fn mount(
        api: Arc<dyn SearchApi>,
        document: &Document,
        location: &Url,
        user: Option<UserSession>,
        default_origin: &str,
    ) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let mut form = Self {
            api,
            user,
            params: SearchParameters::with_origin(default_origin),
            destination: TypeaheadSelector::mount(document, DESTINATION_SEARCH_KEYS),
            origin: TypeaheadSelector::mount(document, AIRPORT_SEARCH_KEYS),
            state: FormState::Editing,
            generation: 0,
            completions_tx,
            completions_rx,
            reference_tasks: Vec::with_capacity(2),
            reference_pending: 0,
            in_flight: None,
        };
        form.origin.sync_value(default_origin);

        if let Some(destination) = destination_from_location(location) {
            tracing::debug!(destination = %destination, "Seeding destination from URL");
            form.update(SearchField::Destination(destination));
        }

        form.load_reference_data();
        form
    }

    fn load_reference_data(&mut self) {
        let api = Arc::clone(&self.api);
        let reporter = Reporter::new(self.completions_tx.clone(), Job::Reference(ReferenceList::Destinations));
        self.reference_tasks.push(tokio::spawn(async move {
            let result = api.destinations().await;
            reporter.send(Completion::Destinations(result));
        }));

        let api = Arc::clone(&self.api);
        let reporter = Reporter::new(self.completions_tx.clone(), Job::Reference(ReferenceList::Airports));
        self.reference_tasks.push(tokio::spawn(async move {
            let result = api.airports().await;
            reporter.send(Completion::Airports(result));
        }));

        self.reference_pending = 2;
    }

    // --- Accessors ---

    pub fn params(&self) -> &SearchParameters {
        &self.params
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn selector(&self, picker: Picker) -> &TypeaheadSelector {
        match picker {
            Picker::Destination => &self.destination,
            Picker::Origin => &self.origin,
        }
    }

    fn selector_mut(&mut self, picker: Picker) -> &mut TypeaheadSelector {
        match picker {
            Picker::Destination => &mut self.destination,
            Picker::Origin => &mut self.origin,
        }
    }

    pub fn user(&self) -> Option<&UserSession> {
        self.user.as_ref()
    }

    pub fn set_user(&mut self, user: Option<UserSession>) {
        self.user = user;
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self.state, FormState::Submitting)
    }

    pub fn results(&self) -> &[ResultCard] {
        match &self.state {
            FormState::Results(cards) => cards.as_slice(),
            _ => &[],
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            FormState::Failed(message) => Some(message.as_str()),
            _ => None,
        }
    }

    pub fn has_pending_work(&self) -> bool {
        self.reference_pending > 0 || self.in_flight.is_some()
    }

    // --- Field edits ---

    pub fn update(&mut self, field: SearchField) {
        match &field {
            SearchField::Destination(value) => self.destination.sync_value(value.clone()),
            SearchField::Origin(value) => self.origin.sync_value(value.clone()),
            _ => {}
        }
        self.params.apply(field);
    }

    pub fn focus(&mut self, picker: Picker) {
        self.selector_mut(picker).focus();
    }

    // A keystroke in one of the pickers; free text is stored as-is
    pub fn input(&mut self, picker: Picker, text: impl Into<String>) {
        let value = self.selector_mut(picker).input(text);
        self.params.apply(picker_field(picker, value));
    }

    pub fn choose(&mut self, picker: Picker, index: usize) -> Option<String> {
        let value = self.selector_mut(picker).select(index)?;
        self.params.apply(picker_field(picker, value.clone()));
        Some(value)
    }

    pub fn toggle_interest(&mut self, interest: Interest) -> bool {
        self.params.toggle_interest(interest)
    }

    // --- Submission ---

    pub fn submit(&mut self) -> SubmitOutcome {
        if self.is_submitting() {
            tracing::debug!("Search already in flight, ignoring submit");
            return SubmitOutcome::AlreadySubmitting;
        }

        let request = match self.params.to_request() {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Search parameters rejected before dispatch");
                self.state = FormState::Failed(SEARCH_FAILED_MESSAGE.to_string());
                return SubmitOutcome::Invalid(e);
            }
        };

        self.generation += 1;
        let generation = self.generation;
        let api = Arc::clone(&self.api);
        let reporter = Reporter::new(self.completions_tx.clone(), Job::Search { generation });
        let user_id = self.user.as_ref().map(|u| u.user_id);

        tracing::info!(generation, personalized = user_id.is_some(), destination = ?request.destination, "Submitting search");
        self.state = FormState::Submitting;
        self.in_flight = Some(tokio::spawn(async move {
            let result = match user_id {
                Some(id) => api.search_personalized(id, &request).await,
                None => api.search(&request).await,
            };
            reporter.send(Completion::Search { generation, result });
        }));

        SubmitOutcome::Dispatched
    }

    /// Aborts the in-flight search, if any. Returns whether one was running.
    pub fn cancel(&mut self) -> bool {
        match self.in_flight.take() {
            Some(task) => {
                task.abort();
                self.state = FormState::Editing;
                tracing::info!(generation = self.generation, "Search cancelled");
                true
            }
            None => false,
        }
    }

    // --- Results ---

    /// Flips the expansion flag of the result at `index`. Returns the new flag.
    pub fn toggle_expansion(&mut self, index: usize) -> Option<bool> {
        match &mut self.state {
            FormState::Results(cards) => cards.get_mut(index).map(|card| {
                card.expanded = !card.expanded;
                card.expanded
            }),
            _ => None,
        }
    }

    // --- Applying background completions ---

    /// Waits for the next background completion and applies it.
    /// Returns `None` straight away when nothing is outstanding.
    pub async fn next_update(&mut self) -> Option<FormUpdate> {
        if !self.has_pending_work() {
            return None;
        }
        let completion = self.completions_rx.recv().await?;
        Some(self.apply(completion))
    }

    // Applies whatever has already completed without waiting
    pub fn apply_ready(&mut self) -> Vec<FormUpdate> {
        let mut updates = Vec::new();
        while let Ok(completion) = self.completions_rx.try_recv() {
            updates.push(self.apply(completion));
        }
        updates
    }

    // False for completions of cancelled or superseded submissions
    fn is_current(&self, generation: u64) -> bool {
        generation == self.generation && self.in_flight.is_some()
    }

    fn apply(&mut self, completion: Completion) -> FormUpdate {
        match completion {
            Completion::Destinations(result) => {
                self.reference_pending = self.reference_pending.saturating_sub(1);
                match result {
                    Ok(destinations) => {
                        let count = destinations.len();
                        self.destination
                            .set_options(destinations.iter().map(CandidateOption::from).collect());
                        tracing::debug!(count, "Destinations loaded");
                        FormUpdate::ReferenceLoaded { list: ReferenceList::Destinations, count }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to load destinations");
                        FormUpdate::ReferenceFailed(ReferenceList::Destinations)
                    }
                }
            }
            Completion::Airports(result) => {
                self.reference_pending = self.reference_pending.saturating_sub(1);
                match result {
                    Ok(airports) => {
                        let count = airports.len();
                        self.origin.set_options(airports.iter().map(CandidateOption::from).collect());
                        tracing::debug!(count, "Airports loaded");
                        FormUpdate::ReferenceLoaded { list: ReferenceList::Airports, count }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to load airports");
                        FormUpdate::ReferenceFailed(ReferenceList::Airports)
                    }
                }
            }
            Completion::Interrupted(Job::Reference(list)) => {
                self.reference_pending = self.reference_pending.saturating_sub(1);
                tracing::warn!(?list, "Reference data task ended without a result");
                FormUpdate::ReferenceFailed(list)
            }
            Completion::Interrupted(Job::Search { generation }) => {
                if !self.is_current(generation) {
                    tracing::debug!(generation, current = self.generation, "Discarding interrupted stale search");
                    return FormUpdate::Stale;
                }
                self.in_flight = None;
                tracing::error!(generation, "Search task ended without a result");
                self.state = FormState::Failed(SEARCH_FAILED_MESSAGE.to_string());
                FormUpdate::SearchFailed
            }
            Completion::Search { generation, result } => {
                if !self.is_current(generation) {
                    tracing::debug!(generation, current = self.generation, "Discarding stale search completion");
                    return FormUpdate::Stale;
                }
                self.in_flight = None;
                match result {
                    Ok(response) => {
                        let cards: Vec<ResultCard> = response
                            .recommendations
                            .into_iter()
                            .map(|recommendation| ResultCard {
                                recommendation,
                                expanded: false,
                            })
                            .collect();
                        let count = cards.len();
                        tracing::info!(generation, count, "Search returned recommendations");
                        self.state = FormState::Results(cards);
                        FormUpdate::SearchSucceeded { count }
                    }
                    Err(e) => {
                        tracing::error!(generation, error = %e, "Search request failed");
                        self.state = FormState::Failed(SEARCH_FAILED_MESSAGE.to_string());
                        FormUpdate::SearchFailed
                    }
                }
            }
        }
    }
}

impl Drop for SearchForm {
    fn drop(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
        for task in self.reference_tasks.drain(..) {
            task.abort();
        }
    }
}

fn picker_field(picker: Picker, value: String) -> SearchField {
    match picker {
        Picker::Destination => SearchField::Destination(value),
        Picker::Origin => SearchField::Origin(value),
    }
}

fn destination_from_location(location: &Url) -> Option<String> {
    location
        .query_pairs()
        .find(|(key, _)| key == "destination")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}
