// Typeahead selector: a text input that filters a supplied option list and
// resolves free text or a picked option to a canonical value.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::events::{Document, ElementId, PointerDown, Subscription};
use crate::models::{Airport, Destination};

/// A selectable record. Selection and equality go through `value`.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateOption {
    pub display: String,
    pub value: String,
    pub subtitle: Option<String>,
    fields: BTreeMap<String, String>,
}

impl CandidateOption {
    pub fn new(display: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            display: display.into(),
            value: value.into(),
            subtitle: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.fields.insert(name.into(), text.into());
        self
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    // `needle` must already be lowercased
    fn matches(&self, needle: &str, search_keys: &[String]) -> bool {
        search_keys
            .iter()
            .filter_map(|key| self.field(key))
            .any(|text| text.to_lowercase().contains(needle))
    }
}

impl From<&Destination> for CandidateOption {
    fn from(d: &Destination) -> Self {
        CandidateOption::new(&d.name, &d.name)
            .with_subtitle(format!("{} - {}", d.airport, d.country))
            .with_field("name", &d.name)
            .with_field("country", &d.country)
            .with_field("airport", &d.airport)
    }
}

impl From<&Airport> for CandidateOption {
    fn from(a: &Airport) -> Self {
        CandidateOption::new(format!("{} ({})", a.city, a.code), &a.code)
            .with_subtitle(format!("{} - {}", a.code, a.name))
            .with_field("city", &a.city)
            .with_field("code", &a.code)
            .with_field("name", &a.name)
    }
}

pub const DESTINATION_SEARCH_KEYS: [&str; 3] = ["name", "country", "airport"];
pub const AIRPORT_SEARCH_KEYS: [&str; 3] = ["city", "code", "name"];

/// Case-insensitive substring filter over the configured fields.
/// An empty query keeps every option; input order is preserved.
pub fn filter_options<'a>(
    options: &'a [CandidateOption],
    query: &str,
    search_keys: &[String],
) -> Vec<&'a CandidateOption> {
    if query.is_empty() {
        return options.iter().collect();
    }
    let needle = query.to_lowercase();
    options
        .iter()
        .filter(|option| option.matches(&needle, search_keys))
        .collect()
}

pub struct TypeaheadSelector {
    id: ElementId,
    options: Vec<CandidateOption>,
    search_keys: Vec<String>,
    // Text shown in the input
    query: String,
    // Last value reported to the owner
    value: String,
    // Shared with the outside-click listener
    open: Arc<AtomicBool>,
    _outside_click: Subscription,
}

impl TypeaheadSelector {
    /// Mounts the selector and attaches its outside-click listener to `document`.
    /// The listener is detached when the selector is dropped.
    pub fn mount<I, K>(document: &Document, search_keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let id = ElementId::next();
        let open = Arc::new(AtomicBool::new(false));

        let listener_open = Arc::clone(&open);
        let subscription = document.subscribe(move |event: &PointerDown| {
            if event.target != Some(id) {
                listener_open.store(false, Ordering::SeqCst);
            }
        });

        Self {
            id,
            options: Vec::new(),
            search_keys: search_keys.into_iter().map(Into::into).collect(),
            query: String::new(),
            value: String::new(),
            open,
            _outside_click: subscription,
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn options(&self) -> &[CandidateOption] {
        &self.options
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub fn focus(&mut self) {
        self.open.store(true, Ordering::SeqCst);
    }

    /// A keystroke: the text becomes both the filter query and the provisional
    /// value, which is returned for the owner to store.
    pub fn input(&mut self, text: impl Into<String>) -> String {
        let text = text.into();
        self.query = text.clone();
        self.value = text.clone();
        self.open.store(true, Ordering::SeqCst);
        text
    }

    pub fn filtered(&self) -> Vec<&CandidateOption> {
        filter_options(&self.options, &self.query, &self.search_keys)
    }

    // What the dropdown shows right now; empty while closed
    pub fn visible_options(&self) -> Vec<&CandidateOption> {
        if self.is_open() { self.filtered() } else { Vec::new() }
    }

    /// Picks the option at `index` of the filtered list and closes the dropdown.
    pub fn select(&mut self, index: usize) -> Option<String> {
        let option = self.filtered().get(index).map(|o| (*o).clone())?;
        self.query = option.display;
        self.value = option.value.clone();
        self.open.store(false, Ordering::SeqCst);
        Some(option.value)
    }

    pub fn set_options(&mut self, options: Vec<CandidateOption>) {
        self.options = options;
        self.resync();
    }

    /// The bound value changed outside the selector (URL seed, programmatic update).
    pub fn sync_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.resync();
    }

    // While closed, show the matching option's display text, or the raw value
    // when the option list does not (yet) contain it
    fn resync(&mut self) {
        if self.value.is_empty() || self.is_open() {
            return;
        }
        self.query = self
            .options
            .iter()
            .find(|o| o.value == self.value)
            .map(|o| o.display.clone())
            .unwrap_or_else(|| self.value.clone());
    }
}

impl std::fmt::Debug for TypeaheadSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeaheadSelector")
            .field("id", &self.id)
            .field("query", &self.query)
            .field("value", &self.value)
            .field("open", &self.is_open())
            .field("options", &self.options.len())
            .finish()
    }
}
