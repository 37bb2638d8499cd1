use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use reqwest::Url;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use smart_travel_client::account::{FavoritesList, ItineraryList, PageLoad, PreferencesForm};
use smart_travel_client::auth::{AuthMode, AuthOutcome, LoginForm};
use smart_travel_client::config::Settings;
use smart_travel_client::events::Document;
use smart_travel_client::models::{Interest, SearchField, TravelStyle};
use smart_travel_client::nav;
use smart_travel_client::search_form::{FormUpdate, Picker, SearchForm, SubmitOutcome};
use smart_travel_client::session::{self, SessionStore};
use smart_travel_client::{AccountApi, ApiClient, SearchApi};

// Locations given on the command line are resolved against this origin
const APP_ORIGIN: &str = "http://smart-travel.local/";

#[derive(Debug, Parser)]
#[command(name = "smart-travel", about = "Plan trips against the Smart Travel API")]
struct Cli {
    // Explicit config file instead of ./config.toml
    #[arg(long, env = "TRAVEL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Popular destinations, each with a link into the search page
    Home,
    /// Search for trip recommendations
    Search(SearchArgs),
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "TRAVEL_PASSWORD")]
        password: String,
    },
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "TRAVEL_PASSWORD")]
        password: String,
    },
    Logout,
    /// Show the stored session and the menu it unlocks
    Whoami,
    Favorites,
    Trips,
    Preferences(PreferenceArgs),
}

#[derive(Debug, Args)]
struct SearchArgs {
    // Page location, e.g. "/search?destination=Paris"
    #[arg(long, default_value = "/search")]
    location: String,
    // Typed into the destination picker; the first match is picked if there is one
    #[arg(long)]
    destination: Option<String>,
    #[arg(long)]
    origin: Option<String>,
    #[arg(long)]
    start: String,
    #[arg(long)]
    end: String,
    #[arg(long)]
    budget_min: Option<f64>,
    #[arg(long)]
    budget_max: Option<f64>,
    #[arg(long)]
    travelers: Option<u32>,
    #[arg(long)]
    style: Option<TravelStyle>,
    #[arg(long = "interest")]
    interests: Vec<Interest>,
    /// Print flights, hotels and activities for every result
    #[arg(long)]
    details: bool,
}

#[derive(Debug, Args)]
struct PreferenceArgs {
    #[arg(long)]
    budget_max: Option<f64>,
    #[arg(long)]
    style: Option<TravelStyle>,
    // Toggled on or off
    #[arg(long = "toggle")]
    activities: Vec<Interest>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file first. Ignore errors (e.g., file not found)
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| settings.log_filter.clone().into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let sessions = session::init(&settings.session_file).context("Failed to open session storage")?;
    let api = Arc::new(ApiClient::new(&settings)?);
    tracing::debug!(api = api.base_url(), "API client ready");

    match cli.command {
        Command::Home => show_home(api.as_ref()).await,
        Command::Search(args) => run_search(args, &settings, &sessions, api).await,
        Command::Login { email, password } => {
            let mut form = LoginForm::new();
            form.email = email;
            form.password = password;
            authenticate(form, api.as_ref(), &sessions).await
        }
        Command::Register { name, email, password } => {
            let mut form = LoginForm::new();
            form.toggle_mode();
            form.name = name;
            form.email = email;
            form.password = password;
            authenticate(form, api.as_ref(), &sessions).await
        }
        Command::Logout => {
            sessions.logout()?;
            println!("Logged out.");
            Ok(())
        }
        Command::Whoami => show_profile(api.as_ref(), &sessions).await,
        Command::Favorites => show_favorites(api.as_ref(), &sessions).await,
        Command::Trips => show_trips(api.as_ref(), &sessions).await,
        Command::Preferences(args) => edit_preferences(args, api.as_ref(), &sessions).await,
    }
}

async fn show_home(api: &ApiClient) -> Result<()> {
    let destinations = api.destinations().await.context("Could not load destinations")?;
    let origin = Url::parse(APP_ORIGIN)?;
    println!("Popular Destinations");
    for destination in nav::popular_destinations(&destinations) {
        println!(
            "  {}, {} ({})  {}",
            destination.name,
            destination.country,
            destination.airport,
            nav::search_location(&origin, &destination.name)
        );
    }
    Ok(())
}

async fn show_profile(api: &ApiClient, sessions: &SessionStore) -> Result<()> {
    let current = sessions.current();
    match &current {
        Some(user) => {
            println!("{} <{}> (user {})", user.name, user.email, user.user_id);
            // The stored session is enough to continue; the profile only adds the signup date
            match api.user(user.user_id).await {
                Ok(profile) => println!("Member since {}", profile.created_at.date()),
                Err(e) => tracing::warn!(user_id = user.user_id, error = %e, "Failed to load profile"),
            }
        }
        None => println!("Not logged in."),
    }
    let labels: Vec<String> = nav::nav_links(current.as_ref()).into_iter().map(|l| l.label).collect();
    println!("Menu: {}", labels.join(" | "));
    Ok(())
}

async fn run_search(args: SearchArgs, settings: &Settings, sessions: &SessionStore, api: Arc<ApiClient>) -> Result<()> {
    let location = Url::parse(APP_ORIGIN)?
        .join(&args.location)
        .with_context(|| format!("Invalid location '{}'", args.location))?;

    let document = Document::new();
    let mut form = SearchForm::mount(api, &document, &location, sessions.current(), &settings.default_origin);

    // Let the pickers resolve their display text before typing into them
    while form.has_pending_work() {
        form.next_update().await;
    }

    if let Some(destination) = args.destination {
        form.input(Picker::Destination, destination);
        form.choose(Picker::Destination, 0);
    }
    if let Some(origin) = args.origin {
        form.input(Picker::Origin, origin);
        form.choose(Picker::Origin, 0);
    }
    form.update(SearchField::StartDate(args.start));
    form.update(SearchField::EndDate(args.end));
    if let Some(v) = args.budget_min {
        form.update(SearchField::BudgetMin(v));
    }
    if let Some(v) = args.budget_max {
        form.update(SearchField::BudgetMax(v));
    }
    if let Some(n) = args.travelers {
        form.update(SearchField::Travelers(n));
    }
    if let Some(style) = args.style {
        form.update(SearchField::TravelStyle(style));
    }
    for interest in args.interests {
        form.toggle_interest(interest);
    }

    let destination = match form.params().destination.as_str() {
        "" => "anywhere",
        name => name,
    };
    println!("Searching {} -> {}", form.selector(Picker::Origin).query(), destination);

    if let SubmitOutcome::Invalid(e) = form.submit() {
        bail!("{} ({})", form.error().unwrap_or_default(), e);
    }

    loop {
        match form.next_update().await {
            Some(FormUpdate::SearchSucceeded { .. }) => break,
            Some(FormUpdate::SearchFailed) => bail!("{}", form.error().unwrap_or_default()),
            Some(_) => continue,
            None => bail!("search finished without a result"),
        }
    }

    if args.details {
        for index in 0..form.results().len() {
            form.toggle_expansion(index);
        }
    }

    println!("{} Recommendations Found", form.results().len());
    for card in form.results() {
        let rec = &card.recommendation;
        print!("\n{}  {:.0}% match  est. ${:.2}", rec.destination, rec.match_score, rec.estimated_total);
        if rec.is_under_budget() {
            print!("  (${:.2} under budget)", rec.budget_remaining);
        }
        println!();

        if !card.expanded {
            continue;
        }
        for flight in &rec.flights {
            println!(
                "  flight   {} {}  {} -> {}  ${:.2}  {}",
                flight.airline,
                flight.flight_number,
                flight.departure_airport,
                flight.arrival_airport,
                flight.price,
                flight.stops_label()
            );
        }
        for hotel in &rec.hotels {
            println!(
                "  hotel    {} ({:.1}*)  {}  ${:.2} total, ${:.2}/night",
                hotel.hotel_name, hotel.rating, hotel.room_type, hotel.total_price, hotel.price_per_night
            );
        }
        for activity in &rec.activities {
            println!(
                "  activity {} [{}]  {}h  ${:.2}  {:.1}*",
                activity.activity_name, activity.category, activity.duration_hours, activity.price, activity.rating
            );
        }
    }
    Ok(())
}

async fn authenticate(mut form: LoginForm, api: &ApiClient, sessions: &SessionStore) -> Result<()> {
    let registering = form.mode() == AuthMode::Register;
    match form.submit(api, sessions).await {
        AuthOutcome::LoggedIn { session, .. } => {
            println!("Welcome back, {}.", session.name);
            Ok(())
        }
        AuthOutcome::Registered => {
            println!("{}", form.notice().unwrap_or_default());
            Ok(())
        }
        AuthOutcome::Failed => {
            let action = if registering { "Registration" } else { "Login" };
            bail!("{} failed: {}", action, form.error().unwrap_or_default())
        }
    }
}

async fn show_favorites(api: &ApiClient, sessions: &SessionStore) -> Result<()> {
    let user = sessions.current();
    let mut page = FavoritesList::new();
    match page.load(api, user.as_ref()).await {
        PageLoad::NeedsLogin => bail!("Please login to view favorites"),
        PageLoad::Failed => bail!("Could not load favorites"),
        PageLoad::Loaded => {}
    }

    if page.favorites().is_empty() {
        println!("No favorites yet.");
    }
    let origin = Url::parse(APP_ORIGIN)?;
    for favorite in page.favorites() {
        println!(
            "#{} {}{}  plan: {}",
            favorite.id,
            favorite.destination_name,
            favorite.country.as_deref().map(|c| format!(", {}", c)).unwrap_or_default(),
            nav::search_location(&origin, &favorite.destination_name)
        );
    }
    Ok(())
}

async fn show_trips(api: &ApiClient, sessions: &SessionStore) -> Result<()> {
    let user = sessions.current();
    let mut page = ItineraryList::new();
    match page.load(api, user.as_ref()).await {
        PageLoad::NeedsLogin => bail!("Please login to view your trips"),
        PageLoad::Failed => bail!("Could not load trips"),
        PageLoad::Loaded => {}
    }

    if page.itineraries().is_empty() {
        println!("No trips yet.");
    }
    for trip in page.itineraries() {
        println!(
            "#{} {} ({})  {} - {}  budget ${:.2}  [{}]",
            trip.id,
            trip.name,
            trip.destination,
            trip.start_date.date(),
            trip.end_date.date(),
            trip.total_budget,
            trip.status
        );
    }
    Ok(())
}

async fn edit_preferences(args: PreferenceArgs, api: &ApiClient, sessions: &SessionStore) -> Result<()> {
    let Some(user) = sessions.current() else {
        bail!("Please login");
    };
    let mut form = PreferencesForm::new();
    match form.load(api, Some(&user)).await {
        PageLoad::NeedsLogin => bail!("Please login"),
        PageLoad::Failed => bail!("Could not load preferences; not saving over them"),
        PageLoad::Loaded => {}
    }

    let changed = args.budget_max.is_some() || args.style.is_some() || !args.activities.is_empty();
    if let Some(budget_max) = args.budget_max {
        form.set_budget_max(budget_max);
    }
    if let Some(style) = args.style {
        form.set_travel_style(style);
    }
    for activity in args.activities {
        form.toggle_activity(activity);
    }
    if changed && !form.save(api, &user).await {
        bail!("Could not save preferences");
    }

    let prefs = form.preferences();
    println!(
        "Budget: ${:.0} - ${:.0}",
        prefs.preferred_budget_min.unwrap_or(0.0),
        prefs.preferred_budget_max.unwrap_or(5000.0)
    );
    match &prefs.preferred_travel_style {
        Some(style) => println!("Style: {}", style),
        None => println!("Style: {}", TravelStyle::default()),
    }
    let activities: Vec<String> = prefs.preferred_activities.iter().map(ToString::to_string).collect();
    println!("Interests: {}", activities.join(", "));
    if let Some(notice) = form.notice() {
        println!("{}", notice);
    }
    Ok(())
}
