// Headless client for the Smart Travel planner.
//
// Page controllers (search form, login, account pages) hold UI state and talk
// to the remote travel API through `api::ApiClient`. Nothing here ranks or
// prices trips; that all happens server-side.

pub mod account;
pub mod api;
pub mod auth;
mod busy;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod nav;
pub mod search_form;
pub mod session;
pub mod typeahead;

pub use api::{AccountApi, ApiClient, ItineraryApi, SearchApi};
pub use error::{ApiError, SessionError, ValidationError};
pub use search_form::{FormState, FormUpdate, Picker, SearchForm, SubmitOutcome};
