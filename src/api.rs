// Functions to interact with the remote travel API (search, users, itineraries)

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::Settings;
use crate::error::ApiError;
use crate::models::{
    ActivityBooking, Airport, Booked, Credentials, Destination, Favorite, FlightBooking, HotelBooking,
    Itinerary, ItineraryStatus, NewFavorite, NewItinerary, Preferences, Registration, SearchRequest,
    SearchResponse, StatusUpdate, UserProfile, UserSession,
};

pub type ApiResult<T> = std::result::Result<T, ApiError>;

// Reference data and search. The search form only depends on this.
#[async_trait]
pub trait SearchApi: Send + Sync {
    async fn destinations(&self) -> ApiResult<Vec<Destination>>;
    async fn airports(&self) -> ApiResult<Vec<Airport>>;
    async fn search(&self, request: &SearchRequest) -> ApiResult<SearchResponse>;
    async fn search_personalized(&self, user_id: i64, request: &SearchRequest) -> ApiResult<SearchResponse>;
}

#[async_trait]
pub trait AccountApi: Send + Sync {
    async fn register(&self, registration: &Registration) -> ApiResult<UserProfile>;
    async fn login(&self, credentials: &Credentials) -> ApiResult<UserSession>;
    async fn user(&self, user_id: i64) -> ApiResult<UserProfile>;
    async fn preferences(&self, user_id: i64) -> ApiResult<Preferences>;
    async fn update_preferences(&self, user_id: i64, preferences: &Preferences) -> ApiResult<Preferences>;
    async fn favorites(&self, user_id: i64) -> ApiResult<Vec<Favorite>>;
    async fn add_favorite(&self, user_id: i64, favorite: &NewFavorite) -> ApiResult<Favorite>;
    async fn remove_favorite(&self, user_id: i64, favorite_id: i64) -> ApiResult<()>;
}

#[async_trait]
pub trait ItineraryApi: Send + Sync {
    async fn create_itinerary(&self, user_id: i64, itinerary: &NewItinerary) -> ApiResult<Itinerary>;
    async fn user_itineraries(&self, user_id: i64) -> ApiResult<Vec<Itinerary>>;
    async fn itinerary(&self, itinerary_id: i64) -> ApiResult<Itinerary>;
    async fn update_itinerary_status(&self, itinerary_id: i64, status: ItineraryStatus) -> ApiResult<StatusUpdate>;
    async fn delete_itinerary(&self, itinerary_id: i64) -> ApiResult<()>;
    async fn add_flight(&self, itinerary_id: i64, flight: &FlightBooking) -> ApiResult<Booked<FlightBooking>>;
    async fn add_hotel(&self, itinerary_id: i64, hotel: &HotelBooking) -> ApiResult<Booked<HotelBooking>>;
    async fn add_activity(&self, itinerary_id: i64, activity: &ActivityBooking) -> ApiResult<Booked<ActivityBooking>>;
}

// Reusable HTTP client bound to one API root. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.request_timeout())
            .build()
            .context("Failed to build reqwest client")?;
        Ok(Self::with_client(http, &settings.api_base_url))
    }

    pub fn with_client(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{}", self.base_url, path))
    }

    async fn send(&self, path: &str, builder: RequestBuilder) -> ApiResult<Response> {
        tracing::debug!(path, "Sending API request");
        let response = builder.send().await.map_err(|source| ApiError::Transport {
            path: path.to_string(),
            source,
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // FastAPI-style error bodies carry {"detail": "..."}; anything else is ignored
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("detail").and_then(Value::as_str).map(str::to_string));
        tracing::debug!(path, status = %status, detail = ?detail, "API returned an error status");
        Err(ApiError::Status {
            path: path.to_string(),
            status,
            detail,
        })
    }

    async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> ApiResult<T> {
        response.json::<T>().await.map_err(|source| ApiError::Decode {
            path: path.to_string(),
            source,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let response = self.send(path, self.request(Method::GET, path)).await?;
        Self::decode(path, response).await
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let response = self.send(path, self.request(method, path).json(body)).await?;
        Self::decode(path, response).await
    }

    // For endpoints whose response body carries nothing we need
    async fn send_discarding(&self, method: Method, path: &str) -> ApiResult<()> {
        self.send(path, self.request(method, path)).await?;
        Ok(())
    }
}

#[async_trait]
impl SearchApi for ApiClient {
    async fn destinations(&self) -> ApiResult<Vec<Destination>> {
        self.get_json("/destinations").await
    }

    async fn airports(&self) -> ApiResult<Vec<Airport>> {
        self.get_json("/airports").await
    }

    async fn search(&self, request: &SearchRequest) -> ApiResult<SearchResponse> {
        self.send_json(Method::POST, "/search", request).await
    }

    async fn search_personalized(&self, user_id: i64, request: &SearchRequest) -> ApiResult<SearchResponse> {
        self.send_json(Method::POST, &format!("/search/user/{}", user_id), request).await
    }
}

#[async_trait]
impl AccountApi for ApiClient {
    async fn register(&self, registration: &Registration) -> ApiResult<UserProfile> {
        self.send_json(Method::POST, "/users/register", registration).await
    }

    async fn login(&self, credentials: &Credentials) -> ApiResult<UserSession> {
        self.send_json(Method::POST, "/users/login", credentials).await
    }

    async fn user(&self, user_id: i64) -> ApiResult<UserProfile> {
        self.get_json(&format!("/users/{}", user_id)).await
    }

    async fn preferences(&self, user_id: i64) -> ApiResult<Preferences> {
        self.get_json(&format!("/users/{}/preferences", user_id)).await
    }

    async fn update_preferences(&self, user_id: i64, preferences: &Preferences) -> ApiResult<Preferences> {
        self.send_json(Method::PUT, &format!("/users/{}/preferences", user_id), preferences)
            .await
    }

    async fn favorites(&self, user_id: i64) -> ApiResult<Vec<Favorite>> {
        self.get_json(&format!("/users/{}/favorites", user_id)).await
    }

    async fn add_favorite(&self, user_id: i64, favorite: &NewFavorite) -> ApiResult<Favorite> {
        self.send_json(Method::POST, &format!("/users/{}/favorites", user_id), favorite)
            .await
    }

    async fn remove_favorite(&self, user_id: i64, favorite_id: i64) -> ApiResult<()> {
        self.send_discarding(Method::DELETE, &format!("/users/{}/favorites/{}", user_id, favorite_id))
            .await
    }
}

#[async_trait]
impl ItineraryApi for ApiClient {
    async fn create_itinerary(&self, user_id: i64, itinerary: &NewItinerary) -> ApiResult<Itinerary> {
        self.send_json(Method::POST, &format!("/itineraries?user_id={}", user_id), itinerary)
            .await
    }

    async fn user_itineraries(&self, user_id: i64) -> ApiResult<Vec<Itinerary>> {
        self.get_json(&format!("/itineraries/user/{}", user_id)).await
    }

    async fn itinerary(&self, itinerary_id: i64) -> ApiResult<Itinerary> {
        self.get_json(&format!("/itineraries/{}", itinerary_id)).await
    }

    async fn update_itinerary_status(&self, itinerary_id: i64, status: ItineraryStatus) -> ApiResult<StatusUpdate> {
        let path = format!("/itineraries/{}/status?status={}", itinerary_id, status);
        let response = self.send(&path, self.request(Method::PUT, &path)).await?;
        Self::decode(&path, response).await
    }

    async fn delete_itinerary(&self, itinerary_id: i64) -> ApiResult<()> {
        self.send_discarding(Method::DELETE, &format!("/itineraries/{}", itinerary_id))
            .await
    }

    async fn add_flight(&self, itinerary_id: i64, flight: &FlightBooking) -> ApiResult<Booked<FlightBooking>> {
        self.send_json(Method::POST, &format!("/itineraries/{}/flights", itinerary_id), flight)
            .await
    }

    async fn add_hotel(&self, itinerary_id: i64, hotel: &HotelBooking) -> ApiResult<Booked<HotelBooking>> {
        self.send_json(Method::POST, &format!("/itineraries/{}/hotels", itinerary_id), hotel)
            .await
    }

    async fn add_activity(&self, itinerary_id: i64, activity: &ActivityBooking) -> ApiResult<Booked<ActivityBooking>> {
        self.send_json(Method::POST, &format!("/itineraries/{}/activities", itinerary_id), activity)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::with_client(Client::new(), "http://localhost:8000/api/");
        assert_eq!(client.base_url(), "http://localhost:8000/api");
    }
}
