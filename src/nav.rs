// Navigation shell: routes, menu links and links into the search page

use reqwest::Url;

use crate::models::{Destination, UserSession};

// How many destinations the home page features
pub const POPULAR_DESTINATION_COUNT: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Search,
    Login,
    Itineraries,
    Favorites,
    Profile,
}

impl Route {
    pub const ALL: [Route; 6] = [
        Route::Home,
        Route::Search,
        Route::Login,
        Route::Itineraries,
        Route::Favorites,
        Route::Profile,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Search => "/search",
            Route::Login => "/login",
            Route::Itineraries => "/itineraries",
            Route::Favorites => "/favorites",
            Route::Profile => "/profile",
        }
    }

    pub fn from_path(path: &str) -> Option<Route> {
        Route::ALL.into_iter().find(|r| r.path() == path)
    }

    // Pages that show a login prompt instead of their content when logged out
    pub fn requires_login(self) -> bool {
        matches!(self, Route::Itineraries | Route::Favorites | Route::Profile)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavAction {
    Go(Route),
    Logout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLink {
    pub label: String,
    pub action: NavAction,
}

impl NavLink {
    fn go(label: impl Into<String>, route: Route) -> Self {
        Self {
            label: label.into(),
            action: NavAction::Go(route),
        }
    }
}

pub fn nav_links(session: Option<&UserSession>) -> Vec<NavLink> {
    let mut links = vec![NavLink::go("Home", Route::Home), NavLink::go("Search", Route::Search)];
    match session {
        Some(user) => {
            links.push(NavLink::go("My Trips", Route::Itineraries));
            links.push(NavLink::go("Favorites", Route::Favorites));
            links.push(NavLink::go(user.name.clone(), Route::Profile));
            links.push(NavLink {
                label: "Logout".to_string(),
                action: NavAction::Logout,
            });
        }
        None => links.push(NavLink::go("Login", Route::Login)),
    }
    links
}

/// `/search?destination=<name>` resolved against `origin`, with the name encoded.
pub fn search_location(origin: &Url, destination: &str) -> Url {
    let mut url = origin.clone();
    url.set_path(Route::Search.path());
    url.query_pairs_mut().clear().append_pair("destination", destination);
    url
}

pub fn popular_destinations(destinations: &[Destination]) -> &[Destination] {
    &destinations[..destinations.len().min(POPULAR_DESTINATION_COUNT)]
}
