pub mod add;
pub mod auth;
pub mod delete;
pub mod init;
pub mod list;
pub mod toggle;
pub mod tui;

use chrono::Utc;
use clap::ValueEnum;
use tracing::{info, warn};

use crate::config::Config;
use crate::controller::TaskController;
use crate::error::{Result, TickError};
use crate::model::UserId;
use crate::notify::{Notifier, TerminalNotifier};
use crate::output::Format;
use crate::remote::{MemoryBackend, RestBackend, TaskBackend};
use crate::session::{AuthContext, Session, User};
use crate::store::Home;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "snake_case")]
pub enum BackendKind {
    /// The hosted service configured by `tick init` or `TICK_URL`
    #[default]
    Rest,
    /// A throwaway in-process table signed in as a local demo user
    Memory,
}

/// User id of the session `--backend memory` runs under when nobody is signed in.
pub const DEMO_USER: &str = "local-demo";

/// Everything a command needs: where state lives, settings, and who is
/// signed in.
pub struct App {
    pub home: Home,
    pub config: Config,
    pub auth: AuthContext,
    pub backend: BackendKind,
    pub format: Format,
}

impl App {
    pub fn load(home: Home, backend: BackendKind, format: Format) -> Result<Self> {
        let config = home.read_config()?.with_env()?;
        let mut session = match home.read_session() {
            Ok(session) => session,
            Err(TickError::Json(err)) => {
                warn!(error = %err, "stored session is unreadable; run `tick login` again");
                None
            }
            Err(err) => return Err(err),
        };

        if session.as_ref().is_some_and(|s| s.is_expired(Utc::now())) {
            warn!("stored session has expired; run `tick login` again");
            session = None;
        }
        if session.is_none() && backend == BackendKind::Memory {
            info!(user = DEMO_USER, "memory backend: using demo session");
            session = Some(demo_session());
        }

        Ok(Self {
            home,
            config,
            auth: AuthContext::new(session),
            backend,
            format,
        })
    }

    pub fn backend(&self) -> Result<Box<dyn TaskBackend>> {
        Ok(match self.backend {
            BackendKind::Rest => Box::new(RestBackend::new(&self.config, self.auth.clone())?),
            BackendKind::Memory => Box::new(MemoryBackend::new()),
        })
    }

    /// Controller for one-shot commands. Errors reach the user through the
    /// command's exit path, so the notifier only prints confirmations.
    pub fn controller(&self) -> Result<TaskController<Box<dyn TaskBackend>, TerminalNotifier>> {
        let notifier = TerminalNotifier {
            quiet: self.format == Format::Json,
            skip_errors: true,
        };
        self.controller_with(notifier)
    }

    pub fn controller_with<N: Notifier>(
        &self,
        notifier: N,
    ) -> Result<TaskController<Box<dyn TaskBackend>, N>> {
        Ok(TaskController::new(self.backend()?, self.auth.clone(), notifier)
            .with_scope(self.config.scope))
    }
}

fn demo_session() -> Session {
    Session {
        access_token: String::new(),
        refresh_token: None,
        expires_at: None,
        user: User {
            id: UserId::new(DEMO_USER),
            email: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn unreadable_session_file_counts_as_signed_out() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("session.json"), "{not json").unwrap();

        let app = App::load(Home::at(dir.path()), BackendKind::Rest, Format::Json).unwrap();
        assert!(!app.auth.is_signed_in());

        let demo = App::load(Home::at(dir.path()), BackendKind::Memory, Format::Json).unwrap();
        assert_eq!(demo.auth.user_id(), Some(UserId::new(DEMO_USER)));
    }
}
