// Data structures exchanged with the travel API and held by the form controllers

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

// --- Search vocabulary ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interest {
    Adventure,
    Culture,
    Relaxation,
    Food,
    Nightlife,
}

impl Interest {
    pub const ALL: [Interest; 5] = [
        Interest::Adventure,
        Interest::Culture,
        Interest::Relaxation,
        Interest::Food,
        Interest::Nightlife,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Interest::Adventure => "adventure",
            Interest::Culture => "culture",
            Interest::Relaxation => "relaxation",
            Interest::Food => "food",
            Interest::Nightlife => "nightlife",
        }
    }
}

impl FromStr for Interest {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Interest::ALL
            .into_iter()
            .find(|i| i.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown interest {:?}", s))
    }
}

impl fmt::Display for Interest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TravelStyle {
    Budget,
    #[default]
    MidRange,
    Luxury,
}

impl TravelStyle {
    pub const ALL: [TravelStyle; 3] = [TravelStyle::Budget, TravelStyle::MidRange, TravelStyle::Luxury];

    pub fn as_str(self) -> &'static str {
        match self {
            TravelStyle::Budget => "budget",
            TravelStyle::MidRange => "mid-range",
            TravelStyle::Luxury => "luxury",
        }
    }
}

impl FromStr for TravelStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TravelStyle::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown travel style {:?}", s))
    }
}

impl fmt::Display for TravelStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// A vocabulary value as the server stores it. Values this client does not
// know are kept verbatim, so loading never fails on them and saving sends them back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Tag<T> {
    Known(T),
    Unknown(String),
}

impl<T> Tag<T> {
    pub fn known(&self) -> Option<&T> {
        match self {
            Tag::Known(value) => Some(value),
            Tag::Unknown(_) => None,
        }
    }
}

impl<T> From<T> for Tag<T> {
    fn from(value: T) -> Self {
        Tag::Known(value)
    }
}

impl<T: fmt::Display> fmt::Display for Tag<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Known(value) => value.fmt(f),
            Tag::Unknown(raw) => f.write_str(raw),
        }
    }
}

// Adds `tag` when absent, removes it when present. Returns whether it is now in the set.
pub fn toggle_tag<T: PartialEq>(set: &mut Vec<T>, tag: T) -> bool {
    if let Some(pos) = set.iter().position(|t| *t == tag) {
        set.remove(pos);
        false
    } else {
        set.push(tag);
        true
    }
}

// --- Search parameters (editable form record) ---

// Dates are kept in their edit representation ("YYYY-MM-DD") until submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchParameters {
    pub destination: String,
    pub origin: String,
    pub start_date: String,
    pub end_date: String,
    pub budget_min: f64,
    pub budget_max: f64,
    pub travelers: u32,
    pub interests: Vec<Interest>,
    pub travel_style: TravelStyle,
}

impl Default for SearchParameters {
    fn default() -> Self {
        Self::with_origin("JFK")
    }
}

// One field-level edit of the search record
#[derive(Debug, Clone, PartialEq)]
pub enum SearchField {
    Destination(String),
    Origin(String),
    StartDate(String),
    EndDate(String),
    BudgetMin(f64),
    BudgetMax(f64),
    Travelers(u32),
    TravelStyle(TravelStyle),
}

impl SearchParameters {
    pub fn with_origin(origin: impl Into<String>) -> Self {
        Self {
            destination: String::new(),
            origin: origin.into(),
            start_date: String::new(),
            end_date: String::new(),
            budget_min: 0.0,
            budget_max: 5000.0,
            travelers: 1,
            interests: Vec::new(),
            travel_style: TravelStyle::default(),
        }
    }

    // Merges a single field into the record, leaving every other field untouched
    pub fn apply(&mut self, field: SearchField) {
        match field {
            SearchField::Destination(v) => self.destination = v,
            SearchField::Origin(v) => self.origin = v,
            SearchField::StartDate(v) => self.start_date = v,
            SearchField::EndDate(v) => self.end_date = v,
            SearchField::BudgetMin(v) => self.budget_min = v,
            SearchField::BudgetMax(v) => self.budget_max = v,
            SearchField::Travelers(n) => self.travelers = n.max(1),
            SearchField::TravelStyle(style) => self.travel_style = style,
        }
    }

    pub fn toggle_interest(&mut self, interest: Interest) -> bool {
        toggle_tag(&mut self.interests, interest)
    }

    pub fn has_interest(&self, interest: Interest) -> bool {
        self.interests.contains(&interest)
    }

    /// Builds the outbound request, normalizing both dates to UTC timestamps.
    pub fn to_request(&self) -> Result<SearchRequest, ValidationError> {
        let start = parse_edit_date("start", &self.start_date)?;
        let end = parse_edit_date("end", &self.end_date)?;
        if start > end {
            return Err(ValidationError::DateOrder {
                start: start.date_naive(),
                end: end.date_naive(),
            });
        }
        if self.budget_min > self.budget_max {
            return Err(ValidationError::BudgetOrder {
                min: self.budget_min,
                max: self.budget_max,
            });
        }
        if self.travelers == 0 {
            return Err(ValidationError::NoTravelers);
        }

        let destination = self.destination.trim();
        Ok(SearchRequest {
            destination: (!destination.is_empty()).then(|| destination.to_string()),
            origin: self.origin.clone(),
            start_date: start,
            end_date: end,
            budget_min: self.budget_min,
            budget_max: self.budget_max,
            travelers: self.travelers,
            interests: self.interests.clone(),
            travel_style: self.travel_style,
        })
    }
}

// A bare date means midnight UTC; full RFC 3339 timestamps are accepted as-is
fn parse_edit_date(field: &'static str, value: &str) -> Result<DateTime<Utc>, ValidationError> {
    let trimmed = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::default()).and_utc());
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ValidationError::InvalidDate {
            field,
            value: value.to_string(),
        })
}

// Serialized exactly like a browser's Date.toISOString(): millisecond precision, "Z" suffix
fn iso_millis<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
}

// Body of POST /search and POST /search/user/{id}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub destination: Option<String>,
    pub origin: String,
    #[serde(serialize_with = "iso_millis")]
    pub start_date: DateTime<Utc>,
    #[serde(serialize_with = "iso_millis")]
    pub end_date: DateTime<Utc>,
    pub budget_min: f64,
    pub budget_max: f64,
    pub travelers: u32,
    pub interests: Vec<Interest>,
    pub travel_style: TravelStyle,
}

// --- Reference data ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub name: String,
    pub country: String,
    pub airport: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Airport {
    pub code: String,
    pub city: String,
    pub name: String,
}

// --- Recommendations ---

// Server timestamps may come with or without an offset; both are read as UTC wall time
pub(crate) mod lenient_time {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(dt.naive_utc());
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f").map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightOption {
    pub id: String,
    pub airline: String,
    pub flight_number: String,
    pub departure_airport: String,
    pub arrival_airport: String,
    #[serde(with = "lenient_time")]
    pub departure_time: NaiveDateTime,
    #[serde(with = "lenient_time")]
    pub arrival_time: NaiveDateTime,
    pub price: f64,
    pub duration_minutes: u32,
    #[serde(default)]
    pub stops: u32,
}

impl FlightOption {
    pub fn stops_label(&self) -> String {
        match self.stops {
            0 => "Direct".to_string(),
            1 => "1 stop".to_string(),
            n => format!("{} stops", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelOption {
    pub id: String,
    pub hotel_name: String,
    pub address: String,
    pub rating: f64,
    pub price_per_night: f64,
    pub total_price: f64,
    #[serde(default)]
    pub amenities: Vec<String>,
    pub room_type: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityOption {
    pub id: String,
    pub activity_name: String,
    pub description: String,
    pub location: String,
    pub price: f64,
    pub duration_hours: f64,
    pub category: String,
    pub rating: f64,
    #[serde(default)]
    pub image_url: Option<String>,
}

// One ranked trip candidate. Rendered as-is, never validated or mutated here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub destination: String,
    #[serde(default)]
    pub flights: Vec<FlightOption>,
    #[serde(default)]
    pub hotels: Vec<HotelOption>,
    #[serde(default)]
    pub activities: Vec<ActivityOption>,
    pub estimated_total: f64,
    // Negative when the trip runs over budget
    pub budget_remaining: f64,
    pub match_score: f64,
}

impl RecommendationResult {
    pub fn is_under_budget(&self) -> bool {
        self.budget_remaining > 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub recommendations: Vec<RecommendationResult>,
    #[serde(default, with = "option_lenient_time")]
    pub generated_at: Option<NaiveDateTime>,
}

mod option_lenient_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => super::lenient_time::serialize(v, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error> {
        #[derive(Deserialize)]
        struct Wrapper(#[serde(with = "super::lenient_time")] NaiveDateTime);
        Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(v)| v))
    }
}

// --- Users & sessions ---

// What POST /users/login returns; mirrored into the session file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSession {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub name: String,
    #[serde(with = "lenient_time")]
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default, skip_serializing)]
    pub id: Option<i64>,
    #[serde(default, skip_serializing)]
    pub user_id: Option<i64>,
    pub preferred_budget_min: Option<f64>,
    pub preferred_budget_max: Option<f64>,
    #[serde(default)]
    pub preferred_activities: Vec<Tag<Interest>>,
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    #[serde(default)]
    pub accessibility_needs: Option<String>,
    pub preferred_travel_style: Option<Tag<TravelStyle>>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            id: None,
            user_id: None,
            preferred_budget_min: Some(0.0),
            preferred_budget_max: Some(5000.0),
            preferred_activities: Vec::new(),
            dietary_restrictions: Vec::new(),
            accessibility_needs: None,
            preferred_travel_style: Some(Tag::Known(TravelStyle::MidRange)),
        }
    }
}

// --- Favorites ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFavorite {
    pub destination_name: String,
    pub country: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Favorite {
    pub id: i64,
    pub user_id: i64,
    pub destination_name: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(with = "lenient_time")]
    pub created_at: NaiveDateTime,
}

// --- Itineraries ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItineraryStatus {
    #[default]
    Draft,
    Confirmed,
    Completed,
    Cancelled,
}

impl ItineraryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ItineraryStatus::Draft => "draft",
            ItineraryStatus::Confirmed => "confirmed",
            ItineraryStatus::Completed => "completed",
            ItineraryStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ItineraryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItinerary {
    pub name: String,
    pub destination: String,
    #[serde(with = "lenient_time")]
    pub start_date: NaiveDateTime,
    #[serde(with = "lenient_time")]
    pub end_date: NaiveDateTime,
    pub total_budget: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightBooking {
    pub itinerary_id: i64,
    pub airline: String,
    pub flight_number: String,
    pub departure_airport: String,
    pub arrival_airport: String,
    #[serde(with = "lenient_time")]
    pub departure_time: NaiveDateTime,
    #[serde(with = "lenient_time")]
    pub arrival_time: NaiveDateTime,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelBooking {
    pub itinerary_id: i64,
    pub hotel_name: String,
    pub address: Option<String>,
    #[serde(with = "lenient_time")]
    pub check_in_date: NaiveDateTime,
    #[serde(with = "lenient_time")]
    pub check_out_date: NaiveDateTime,
    pub room_type: Option<String>,
    pub price_per_night: f64,
    pub total_price: f64,
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityBooking {
    pub itinerary_id: i64,
    pub activity_name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    #[serde(with = "lenient_time")]
    pub scheduled_date: NaiveDateTime,
    pub duration_hours: Option<f64>,
    pub price: f64,
    pub category: Option<String>,
}

// A stored booking: the submitted record plus server-assigned fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booked<T> {
    pub id: i64,
    #[serde(default)]
    pub booking_reference: Option<String>,
    #[serde(default)]
    pub is_booked: bool,
    #[serde(flatten)]
    pub booking: T,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Itinerary {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub destination: String,
    #[serde(with = "lenient_time")]
    pub start_date: NaiveDateTime,
    #[serde(with = "lenient_time")]
    pub end_date: NaiveDateTime,
    pub total_budget: f64,
    pub status: ItineraryStatus,
    #[serde(with = "lenient_time")]
    pub created_at: NaiveDateTime,
    #[serde(default)]
    pub flights: Vec<Booked<FlightBooking>>,
    #[serde(default)]
    pub hotels: Vec<Booked<HotelBooking>>,
    #[serde(default)]
    pub activities: Vec<Booked<ActivityBooking>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub message: String,
    pub new_status: ItineraryStatus,
}
