// Login / registration form

use crate::api::AccountApi;
use crate::busy::BusyFlag;
use crate::models::{Credentials, Registration, UserSession};
use crate::nav::Route;
use crate::session::SessionStore;

pub const GENERIC_AUTH_ERROR: &str = "An error occurred";
pub const REGISTERED_NOTICE: &str = "Registration successful! Please login.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    Login,
    Register,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    // Session stored; the shell should navigate to `redirect`
    LoggedIn { session: UserSession, redirect: Route },
    // Back in login mode with a notice
    Registered,
    Failed,
}

#[derive(Debug, Default)]
pub struct LoginForm {
    mode: AuthMode,
    pub name: String,
    pub email: String,
    pub password: String,
    error: Option<String>,
    notice: Option<String>,
    loading: bool,
}

impl LoginForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            AuthMode::Login => AuthMode::Register,
            AuthMode::Register => AuthMode::Login,
        };
        self.error = None;
    }

    // `&mut self` already serializes submits; the flag only drives the spinner
    pub async fn submit(&mut self, api: &dyn AccountApi, sessions: &SessionStore) -> AuthOutcome {
        self.error = None;
        self.notice = None;
        let _busy = BusyFlag::raise(&mut self.loading);

        let failure = match self.mode {
            AuthMode::Register => {
                let registration = Registration {
                    name: self.name.clone(),
                    email: self.email.clone(),
                    password: self.password.clone(),
                };
                match api.register(&registration).await {
                    Ok(profile) => {
                        tracing::info!(user_id = profile.id, "Registered new account");
                        self.mode = AuthMode::Login;
                        self.notice = Some(REGISTERED_NOTICE.to_string());
                        return AuthOutcome::Registered;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Registration failed");
                        e
                    }
                }
            }
            AuthMode::Login => {
                let credentials = Credentials {
                    email: self.email.clone(),
                    password: self.password.clone(),
                };
                match api.login(&credentials).await {
                    Ok(session) => {
                        tracing::info!(user_id = session.user_id, "Logged in");
                        if let Err(e) = sessions.login(session.clone()) {
                            // Still logged in for this process, just not remembered
                            tracing::warn!(error = %e, "Failed to persist session");
                        }
                        return AuthOutcome::LoggedIn {
                            session,
                            redirect: Route::Home,
                        };
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Login failed");
                        e
                    }
                }
            }
        };

        self.error = Some(failure.detail().unwrap_or(GENERIC_AUTH_ERROR).to_string());
        AuthOutcome::Failed
    }
}
