//! Client state kept between runs: theme and the signed-in account.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use conversion_engine::{AtomicFileWriter, AuthSession};
use engine_logging::{engine_error, engine_info, engine_warn};
use serde::{Deserialize, Serialize};

pub const STATE_FILENAME: &str = ".converter_state.ron";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedIn {
    pub session: AuthSession,
    /// RFC 3339.
    pub since: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClientState {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub signed_in: Option<SignedIn>,
}

impl ClientState {
    pub fn login(&mut self, session: AuthSession) {
        engine_info!("Signed in as {}", session.user.email);
        self.signed_in = Some(SignedIn {
            session,
            since: Utc::now().to_rfc3339(),
        });
    }

    /// Returns whether someone was signed in.
    pub fn logout(&mut self) -> bool {
        self.signed_in.take().is_some()
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = match self.theme {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        };
        self.theme
    }
}

/// Missing or unreadable state yields the defaults.
pub fn load_client_state(dir: &Path) -> ClientState {
    let path = dir.join(STATE_FILENAME);
    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return ClientState::default();
        }
        Err(err) => {
            engine_warn!("Failed to read client state from {:?}: {}", path, err);
            return ClientState::default();
        }
    };

    match ron::from_str(&content) {
        Ok(state) => state,
        Err(err) => {
            engine_warn!("Failed to parse client state from {:?}: {}", path, err);
            ClientState::default()
        }
    }
}

pub fn save_client_state(dir: &Path, state: &ClientState) {
    let pretty = ron::ser::PrettyConfig::new();
    let content = match ron::ser::to_string_pretty(state, pretty) {
        Ok(text) => text,
        Err(err) => {
            engine_error!("Failed to serialize client state: {}", err);
            return;
        }
    };

    let writer = AtomicFileWriter::new(PathBuf::from(dir));
    if let Err(err) = writer.write(STATE_FILENAME, &content) {
        engine_error!("Failed to write client state to {:?}: {}", dir, err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conversion_engine::AuthUser;
    use tempfile::TempDir;

    fn session() -> AuthSession {
        AuthSession {
            token: "tok".to_string(),
            user: AuthUser {
                id: 1,
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
            },
        }
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        assert_eq!(load_client_state(dir.path()), ClientState::default());
        assert_eq!(ClientState::default().theme, Theme::Light);
    }

    #[test]
    fn state_survives_a_save_and_load() {
        let dir = TempDir::new().unwrap();
        let mut state = ClientState::default();
        state.login(session());
        assert_eq!(state.toggle_theme(), Theme::Dark);
        save_client_state(dir.path(), &state);

        let loaded = load_client_state(dir.path());
        assert_eq!(loaded, state);
    }

    #[test]
    fn logout_clears_session_once() {
        let mut state = ClientState::default();
        state.login(session());
        assert!(state.logout());
        assert!(!state.logout());
        assert!(state.signed_in.is_none());
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(STATE_FILENAME), "not ron at all {").unwrap();
        assert_eq!(load_client_state(dir.path()), ClientState::default());
    }
}
