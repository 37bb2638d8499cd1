// Login form and account pages against in-memory API fakes

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use reqwest::StatusCode;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tempfile::TempDir;

use smart_travel_client::account::{
    FavoritesList, ItineraryList, PREFERENCES_SAVED_NOTICE, PageLoad, PreferencesForm,
};
use smart_travel_client::api::ApiResult;
use smart_travel_client::auth::{AuthMode, AuthOutcome, GENERIC_AUTH_ERROR, LoginForm, REGISTERED_NOTICE};
use smart_travel_client::models::{
    ActivityBooking, Booked, Credentials, Favorite, FlightBooking, HotelBooking, Interest, Itinerary,
    ItineraryStatus, NewFavorite, NewItinerary, Preferences, Registration, StatusUpdate, Tag, TravelStyle, UserProfile,
    UserSession,
};
use smart_travel_client::nav::Route;
use smart_travel_client::session::SessionStore;
use smart_travel_client::{AccountApi, ApiError, ItineraryApi};

fn noon() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(12, 0, 0).unwrap()
}

fn rejected(path: &str, status: StatusCode, detail: Option<&str>) -> ApiError {
    ApiError::Status {
        path: path.to_string(),
        status,
        detail: detail.map(str::to_string),
    }
}

fn alice() -> UserSession {
    UserSession {
        user_id: 7,
        name: "Alice".into(),
        email: "alice@example.com".into(),
        message: Some("Login successful".into()),
    }
}

fn favorite(id: i64, name: &str) -> Favorite {
    Favorite {
        id,
        user_id: 7,
        destination_name: name.into(),
        country: None,
        notes: None,
        created_at: noon(),
    }
}

#[derive(Default)]
struct FakeAccount {
    // Returned by the next call, whatever it is
    fail_next: Mutex<Option<ApiError>>,
    // The next login or preferences save never answers
    hang_next: AtomicBool,
    preferences: Mutex<Option<Preferences>>,
    saved: Mutex<Vec<Preferences>>,
    favorites: Mutex<Vec<Favorite>>,
    registrations: Mutex<Vec<String>>,
}

impl FakeAccount {
    fn fail_next(&self, err: ApiError) {
        *self.fail_next.lock().unwrap() = Some(err);
    }

    fn check(&self) -> ApiResult<()> {
        match self.fail_next.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn maybe_hang(&self) {
        if self.hang_next.swap(false, Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
    }
}

#[async_trait]
impl AccountApi for FakeAccount {
    async fn register(&self, registration: &Registration) -> ApiResult<UserProfile> {
        self.check()?;
        self.registrations.lock().unwrap().push(registration.email.clone());
        Ok(UserProfile {
            id: 8,
            email: registration.email.clone(),
            name: registration.name.clone(),
            created_at: noon(),
        })
    }

    async fn login(&self, credentials: &Credentials) -> ApiResult<UserSession> {
        self.check()?;
        self.maybe_hang().await;
        if credentials.password != "secret" {
            return Err(rejected("/users/login", StatusCode::UNAUTHORIZED, Some("Invalid email or password")));
        }
        Ok(alice())
    }

    async fn user(&self, _user_id: i64) -> ApiResult<UserProfile> {
        self.check()?;
        Err(rejected("/users/7", StatusCode::NOT_FOUND, Some("User not found")))
    }

    async fn preferences(&self, _user_id: i64) -> ApiResult<Preferences> {
        self.check()?;
        self.preferences
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| rejected("/users/7/preferences", StatusCode::NOT_FOUND, Some("Preferences not found")))
    }

    async fn update_preferences(&self, user_id: i64, preferences: &Preferences) -> ApiResult<Preferences> {
        self.check()?;
        self.maybe_hang().await;
        self.saved.lock().unwrap().push(preferences.clone());
        let stored = Preferences {
            id: Some(1),
            user_id: Some(user_id),
            ..preferences.clone()
        };
        *self.preferences.lock().unwrap() = Some(stored.clone());
        Ok(stored)
    }

    async fn favorites(&self, _user_id: i64) -> ApiResult<Vec<Favorite>> {
        self.check()?;
        Ok(self.favorites.lock().unwrap().clone())
    }

    async fn add_favorite(&self, _user_id: i64, new: &NewFavorite) -> ApiResult<Favorite> {
        self.check()?;
        let mut favorites = self.favorites.lock().unwrap();
        let stored = Favorite {
            country: new.country.clone(),
            notes: new.notes.clone(),
            ..favorite(favorites.len() as i64 + 1, &new.destination_name)
        };
        favorites.push(stored.clone());
        Ok(stored)
    }

    async fn remove_favorite(&self, _user_id: i64, favorite_id: i64) -> ApiResult<()> {
        self.check()?;
        self.favorites.lock().unwrap().retain(|f| f.id != favorite_id);
        Ok(())
    }
}

struct FakeTrips {
    trips: Vec<Itinerary>,
}

fn unsupported<T>() -> ApiResult<T> {
    Err(rejected("/itineraries", StatusCode::METHOD_NOT_ALLOWED, None))
}

#[async_trait]
impl ItineraryApi for FakeTrips {
    async fn create_itinerary(&self, _user_id: i64, _itinerary: &NewItinerary) -> ApiResult<Itinerary> {
        unsupported()
    }

    async fn user_itineraries(&self, user_id: i64) -> ApiResult<Vec<Itinerary>> {
        Ok(self.trips.iter().filter(|t| t.user_id == user_id).cloned().collect())
    }

    async fn itinerary(&self, _itinerary_id: i64) -> ApiResult<Itinerary> {
        unsupported()
    }

    async fn update_itinerary_status(&self, _itinerary_id: i64, _status: ItineraryStatus) -> ApiResult<StatusUpdate> {
        unsupported()
    }

    async fn delete_itinerary(&self, _itinerary_id: i64) -> ApiResult<()> {
        unsupported()
    }

    async fn add_flight(&self, _itinerary_id: i64, _flight: &FlightBooking) -> ApiResult<Booked<FlightBooking>> {
        unsupported()
    }

    async fn add_hotel(&self, _itinerary_id: i64, _hotel: &HotelBooking) -> ApiResult<Booked<HotelBooking>> {
        unsupported()
    }

    async fn add_activity(&self, _itinerary_id: i64, _activity: &ActivityBooking) -> ApiResult<Booked<ActivityBooking>> {
        unsupported()
    }
}

fn store() -> (TempDir, SessionStore) {
    let dir = TempDir::new().unwrap();
    let sessions = SessionStore::open(dir.path().join("session.json")).unwrap();
    (dir, sessions)
}

// --- Login / registration ---

#[tokio::test]
async fn login_stores_session_and_redirects_home() {
    let api = FakeAccount::default();
    let (_dir, sessions) = store();
    let mut form = LoginForm::new();
    form.email = "alice@example.com".into();
    form.password = "secret".into();

    let outcome = form.submit(&api, &sessions).await;
    assert_eq!(
        outcome,
        AuthOutcome::LoggedIn {
            session: alice(),
            redirect: Route::Home
        }
    );
    assert!(!form.is_loading());
    assert_eq!(form.error(), None);
    assert_eq!(sessions.current().map(|s| s.user_id), Some(7));

    let reopened = SessionStore::open(sessions.path()).unwrap();
    assert_eq!(reopened.current(), Some(alice()));
}

#[tokio::test]
async fn login_failure_shows_server_detail() {
    let api = FakeAccount::default();
    let (_dir, sessions) = store();
    let mut form = LoginForm::new();
    form.email = "alice@example.com".into();
    form.password = "wrong".into();

    assert_eq!(form.submit(&api, &sessions).await, AuthOutcome::Failed);
    assert_eq!(form.error(), Some("Invalid email or password"));
    assert!(!sessions.is_authenticated());
}

#[tokio::test]
async fn failure_without_detail_uses_generic_message() {
    let api = FakeAccount::default();
    api.fail_next(rejected("/users/login", StatusCode::BAD_GATEWAY, None));
    let (_dir, sessions) = store();
    let mut form = LoginForm::new();
    form.password = "secret".into();

    assert_eq!(form.submit(&api, &sessions).await, AuthOutcome::Failed);
    assert_eq!(form.error(), Some(GENERIC_AUTH_ERROR));

    // A retry clears the previous error
    assert!(matches!(form.submit(&api, &sessions).await, AuthOutcome::LoggedIn { .. }));
    assert_eq!(form.error(), None);
}

#[tokio::test]
async fn abandoned_login_does_not_block_the_next_one() {
    let api = FakeAccount::default();
    api.hang_next.store(true, Ordering::SeqCst);
    let (_dir, sessions) = store();
    let mut form = LoginForm::new();
    form.email = "alice@example.com".into();
    form.password = "secret".into();

    let abandoned = tokio::time::timeout(Duration::from_millis(20), form.submit(&api, &sessions)).await;
    assert!(abandoned.is_err());
    assert!(!form.is_loading());

    assert!(matches!(form.submit(&api, &sessions).await, AuthOutcome::LoggedIn { .. }));
    assert!(!form.is_loading());
}

#[tokio::test]
async fn registration_switches_back_to_login_with_notice() {
    let api = FakeAccount::default();
    let (_dir, sessions) = store();
    let mut form = LoginForm::new();
    form.toggle_mode();
    assert_eq!(form.mode(), AuthMode::Register);
    form.name = "Bob".into();
    form.email = "bob@example.com".into();
    form.password = "hunter2".into();

    assert_eq!(form.submit(&api, &sessions).await, AuthOutcome::Registered);
    assert_eq!(form.mode(), AuthMode::Login);
    assert_eq!(form.notice(), Some(REGISTERED_NOTICE));
    assert_eq!(*api.registrations.lock().unwrap(), ["bob@example.com"]);
    // Registering does not log in
    assert!(!sessions.is_authenticated());
}

#[tokio::test]
async fn duplicate_registration_reports_detail() {
    let api = FakeAccount::default();
    api.fail_next(rejected("/users/register", StatusCode::BAD_REQUEST, Some("Email already registered")));
    let (_dir, sessions) = store();
    let mut form = LoginForm::new();
    form.toggle_mode();

    assert_eq!(form.submit(&api, &sessions).await, AuthOutcome::Failed);
    assert_eq!(form.mode(), AuthMode::Register);
    assert_eq!(form.error(), Some("Email already registered"));

    form.toggle_mode();
    assert_eq!(form.error(), None);
}

// --- Preferences ---

#[tokio::test]
async fn preferences_need_a_session() {
    let api = FakeAccount::default();
    let mut form = PreferencesForm::new();
    assert!(form.is_loading());
    assert_eq!(form.load(&api, None).await, PageLoad::NeedsLogin);
}

#[tokio::test]
async fn missing_preferences_keep_defaults() {
    let api = FakeAccount::default();
    let user = alice();
    let mut form = PreferencesForm::new();

    // Nothing stored yet: the defaults stand in and can be saved
    assert_eq!(form.load(&api, Some(&user)).await, PageLoad::Loaded);
    assert!(!form.is_loading());
    let prefs = form.preferences();
    assert_eq!(prefs.preferred_budget_min, Some(0.0));
    assert_eq!(prefs.preferred_budget_max, Some(5000.0));
    assert_eq!(prefs.preferred_travel_style, Some(Tag::Known(TravelStyle::MidRange)));
    assert!(prefs.preferred_activities.is_empty());

    assert!(form.save(&api, &user).await);
    assert_eq!(api.saved.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn failed_load_never_saves_over_stored_preferences() {
    let api = FakeAccount::default();
    let stored = Preferences {
        preferred_budget_max: Some(9000.0),
        ..Preferences::default()
    };
    *api.preferences.lock().unwrap() = Some(stored.clone());
    api.fail_next(rejected("/users/7/preferences", StatusCode::SERVICE_UNAVAILABLE, None));
    let user = alice();
    let mut form = PreferencesForm::new();

    assert_eq!(form.load(&api, Some(&user)).await, PageLoad::Failed);
    assert!(!form.is_loading());
    form.set_budget_max(100.0);

    assert!(!form.save(&api, &user).await);
    assert_eq!(form.notice(), None);
    assert!(api.saved.lock().unwrap().is_empty());
    assert_eq!(*api.preferences.lock().unwrap(), Some(stored));
}

#[tokio::test]
async fn edited_preferences_are_saved() {
    let api = FakeAccount::default();
    let user = alice();
    let mut form = PreferencesForm::new();
    assert_eq!(form.load(&api, Some(&user)).await, PageLoad::Loaded);

    assert!(form.toggle_activity(Interest::Culture));
    assert!(form.toggle_activity(Interest::Food));
    assert!(!form.toggle_activity(Interest::Culture));
    form.set_budget_max(8000.0);
    form.set_travel_style(TravelStyle::Luxury);

    assert!(form.save(&api, &user).await);
    assert_eq!(form.notice(), Some(PREFERENCES_SAVED_NOTICE));
    assert_eq!(form.preferences().id, Some(1));

    let saved = api.saved.lock().unwrap().clone();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].preferred_activities, vec![Tag::Known(Interest::Food)]);
    assert_eq!(saved[0].preferred_budget_max, Some(8000.0));
    assert_eq!(saved[0].preferred_travel_style, Some(Tag::Known(TravelStyle::Luxury)));

    // Reloading picks up what the server stored
    let mut reloaded = PreferencesForm::new();
    assert_eq!(reloaded.load(&api, Some(&user)).await, PageLoad::Loaded);
    assert_eq!(reloaded.preferences().preferred_activities, vec![Tag::Known(Interest::Food)]);
}

#[tokio::test]
async fn unknown_activities_survive_a_save() {
    let api = FakeAccount::default();
    *api.preferences.lock().unwrap() = Some(Preferences {
        preferred_activities: vec![Tag::Unknown("scuba".into())],
        preferred_travel_style: Some(Tag::Unknown("backpacker".into())),
        ..Preferences::default()
    });
    let user = alice();
    let mut form = PreferencesForm::new();
    assert_eq!(form.load(&api, Some(&user)).await, PageLoad::Loaded);

    form.toggle_activity(Interest::Food);
    assert!(form.save(&api, &user).await);

    let saved = api.saved.lock().unwrap().clone();
    assert_eq!(
        saved[0].preferred_activities,
        vec![Tag::Unknown("scuba".into()), Tag::Known(Interest::Food)]
    );
    assert_eq!(saved[0].preferred_travel_style, Some(Tag::Unknown("backpacker".into())));
}

#[tokio::test]
async fn failed_save_shows_no_notice() {
    let api = FakeAccount::default();
    let user = alice();
    let mut form = PreferencesForm::new();
    assert_eq!(form.load(&api, Some(&user)).await, PageLoad::Loaded);
    form.set_budget_max(100.0);
    api.fail_next(rejected("/users/7/preferences", StatusCode::INTERNAL_SERVER_ERROR, None));

    assert!(!form.save(&api, &user).await);
    assert_eq!(form.notice(), None);
    assert!(!form.is_saving());
    assert_eq!(form.preferences().preferred_budget_max, Some(100.0));
}

#[tokio::test]
async fn abandoned_save_does_not_block_the_next_one() {
    let api = FakeAccount::default();
    let user = alice();
    let mut form = PreferencesForm::new();
    assert_eq!(form.load(&api, Some(&user)).await, PageLoad::Loaded);
    form.set_budget_max(6000.0);

    api.hang_next.store(true, Ordering::SeqCst);
    let abandoned = tokio::time::timeout(Duration::from_millis(20), form.save(&api, &user)).await;
    assert!(abandoned.is_err());
    assert!(!form.is_saving());

    assert!(form.save(&api, &user).await);
    assert_eq!(form.notice(), Some(PREFERENCES_SAVED_NOTICE));
    let saved = api.saved.lock().unwrap().clone();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].preferred_budget_max, Some(6000.0));
}

// --- Favorites ---

#[tokio::test]
async fn favorites_are_removed_only_after_the_server_agrees() {
    let api = FakeAccount::default();
    api.favorites.lock().unwrap().extend([favorite(1, "Paris"), favorite(2, "Tokyo")]);
    let user = alice();
    let mut page = FavoritesList::new();
    assert_eq!(page.load(&api, Some(&user)).await, PageLoad::Loaded);
    assert_eq!(page.favorites().len(), 2);

    api.fail_next(rejected("/users/7/favorites/1", StatusCode::INTERNAL_SERVER_ERROR, None));
    assert!(!page.remove(&api, &user, 1).await);
    assert_eq!(page.favorites().len(), 2);

    assert!(page.remove(&api, &user, 1).await);
    let names: Vec<_> = page.favorites().iter().map(|f| f.destination_name.as_str()).collect();
    assert_eq!(names, ["Tokyo"]);
}

#[tokio::test]
async fn added_favorite_appears_in_the_list() {
    let api = FakeAccount::default();
    let user = alice();
    let mut page = FavoritesList::new();
    assert_eq!(page.load(&api, None).await, PageLoad::NeedsLogin);

    let added = page
        .add(
            &api,
            &user,
            NewFavorite {
                destination_name: "Lisbon".into(),
                country: Some("Portugal".into()),
                notes: None,
            },
        )
        .await;
    assert!(added);
    assert_eq!(page.favorites()[0].country.as_deref(), Some("Portugal"));
}

// --- Trips ---

#[tokio::test]
async fn trips_load_for_the_logged_in_user() {
    let trip = |id, user_id| Itinerary {
        id,
        user_id,
        name: format!("Trip {id}"),
        destination: "Paris".into(),
        start_date: noon(),
        end_date: noon(),
        total_budget: 3000.0,
        status: ItineraryStatus::Draft,
        created_at: noon(),
        flights: Vec::new(),
        hotels: Vec::new(),
        activities: Vec::new(),
    };
    let api = FakeTrips {
        trips: vec![trip(1, 7), trip(2, 9), trip(3, 7)],
    };

    let mut page = ItineraryList::new();
    assert_eq!(page.load(&api, None).await, PageLoad::NeedsLogin);
    assert!(page.itineraries().is_empty());

    assert_eq!(page.load(&api, Some(&alice())).await, PageLoad::Loaded);
    let ids: Vec<_> = page.itineraries().iter().map(|t| t.id).collect();
    assert_eq!(ids, [1, 3]);
}
