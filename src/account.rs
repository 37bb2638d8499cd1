// Pages that belong to a logged-in user: preferences, favorites and trips

use reqwest::StatusCode;

use crate::api::{AccountApi, ItineraryApi};
use crate::busy::BusyFlag;
use crate::models::{Favorite, Interest, Itinerary, NewFavorite, Preferences, Tag, TravelStyle, UserSession, toggle_tag};

pub const PREFERENCES_SAVED_NOTICE: &str = "Preferences saved!";

// Result of loading a page's data
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLoad {
    Loaded,
    // Call failed; the page keeps what it had and the error is logged
    Failed,
    // No session, nothing was requested
    NeedsLogin,
}

#[derive(Debug, Default)]
pub struct PreferencesForm {
    preferences: Preferences,
    loading: bool,
    saving: bool,
    // Set once the server has told us what it stores; until then `save` would
    // overwrite it with defaults
    loaded: bool,
    notice: Option<String>,
}

impl PreferencesForm {
    pub fn new() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    // A 404 means the user has no stored preferences yet. The defaults stand
    // in for them and may be saved.
    pub async fn load(&mut self, api: &dyn AccountApi, user: Option<&UserSession>) -> PageLoad {
        let Some(user) = user else {
            self.loading = false;
            return PageLoad::NeedsLogin;
        };
        let _busy = BusyFlag::raise(&mut self.loading);
        match api.preferences(user.user_id).await {
            Ok(preferences) => {
                self.preferences = preferences;
                self.loaded = true;
                PageLoad::Loaded
            }
            Err(e) if e.status() == Some(StatusCode::NOT_FOUND) => {
                tracing::debug!(user_id = user.user_id, "No stored preferences, using defaults");
                self.loaded = true;
                PageLoad::Loaded
            }
            Err(e) => {
                tracing::warn!(user_id = user.user_id, error = %e, "Failed to load preferences");
                PageLoad::Failed
            }
        }
    }

    pub fn toggle_activity(&mut self, activity: Interest) -> bool {
        toggle_tag(&mut self.preferences.preferred_activities, Tag::Known(activity))
    }

    pub fn set_budget_max(&mut self, budget_max: f64) {
        self.preferences.preferred_budget_max = Some(budget_max);
    }

    pub fn set_travel_style(&mut self, style: TravelStyle) {
        self.preferences.preferred_travel_style = Some(Tag::Known(style));
    }

    pub async fn save(&mut self, api: &dyn AccountApi, user: &UserSession) -> bool {
        self.notice = None;
        if !self.loaded {
            tracing::warn!(user_id = user.user_id, "Preferences were never loaded, not saving");
            return false;
        }
        let _busy = BusyFlag::raise(&mut self.saving);
        match api.update_preferences(user.user_id, &self.preferences).await {
            Ok(preferences) => {
                self.preferences = preferences;
                self.notice = Some(PREFERENCES_SAVED_NOTICE.to_string());
                true
            }
            Err(e) => {
                tracing::error!(user_id = user.user_id, error = %e, "Failed to save preferences");
                false
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct FavoritesList {
    favorites: Vec<Favorite>,
}

impl FavoritesList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn favorites(&self) -> &[Favorite] {
        &self.favorites
    }

    pub async fn load(&mut self, api: &dyn AccountApi, user: Option<&UserSession>) -> PageLoad {
        let Some(user) = user else {
            return PageLoad::NeedsLogin;
        };
        match api.favorites(user.user_id).await {
            Ok(favorites) => {
                self.favorites = favorites;
                PageLoad::Loaded
            }
            Err(e) => {
                tracing::warn!(user_id = user.user_id, error = %e, "Failed to load favorites");
                PageLoad::Failed
            }
        }
    }

    pub async fn add(&mut self, api: &dyn AccountApi, user: &UserSession, favorite: NewFavorite) -> bool {
        match api.add_favorite(user.user_id, &favorite).await {
            Ok(stored) => {
                self.favorites.push(stored);
                true
            }
            Err(e) => {
                tracing::error!(user_id = user.user_id, error = %e, "Failed to add favorite");
                false
            }
        }
    }

    // The local list only changes once the server confirmed the delete
    pub async fn remove(&mut self, api: &dyn AccountApi, user: &UserSession, favorite_id: i64) -> bool {
        match api.remove_favorite(user.user_id, favorite_id).await {
            Ok(()) => {
                self.favorites.retain(|f| f.id != favorite_id);
                true
            }
            Err(e) => {
                tracing::error!(user_id = user.user_id, favorite_id, error = %e, "Failed to remove favorite");
                false
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct ItineraryList {
    itineraries: Vec<Itinerary>,
}

impl ItineraryList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn itineraries(&self) -> &[Itinerary] {
        &self.itineraries
    }

    pub async fn load(&mut self, api: &dyn ItineraryApi, user: Option<&UserSession>) -> PageLoad {
        let Some(user) = user else {
            return PageLoad::NeedsLogin;
        };
        match api.user_itineraries(user.user_id).await {
            Ok(itineraries) => {
                self.itineraries = itineraries;
                PageLoad::Loaded
            }
            Err(e) => {
                tracing::warn!(user_id = user.user_id, error = %e, "Failed to load itineraries");
                PageLoad::Failed
            }
        }
    }
}
