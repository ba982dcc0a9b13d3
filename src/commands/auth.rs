use tracing::warn;

use crate::commands::App;
use crate::error::Result;
use crate::output::{self, Format};
use crate::remote::AuthClient;
use crate::remote::auth::SignUp;

pub fn login(app: &App, email: &str, password: &str) -> Result<()> {
    let client = AuthClient::new(&app.config)?;
    let session = client.sign_in(email, password)?;
    app.home.write_session(&session)?;
    app.auth.set_session(Some(session));
    output::print_session(app.auth.current().as_ref(), app.format)
}

pub fn signup(app: &App, email: &str, password: &str) -> Result<()> {
    let client = AuthClient::new(&app.config)?;
    match client.sign_up(email, password)? {
        SignUp::SignedIn(session) => {
            app.home.write_session(&session)?;
            app.auth.set_session(Some(session));
            output::print_session(app.auth.current().as_ref(), app.format)
        }
        SignUp::ConfirmationRequired(user) => {
            match app.format {
                Format::Json => println!(
                    "{}",
                    serde_json::json!({
                        "signed_in": false,
                        "confirmation_required": true,
                        "user": user,
                    })
                ),
                _ => eprintln!(
                    "Check {} for a confirmation link, then run `tick login`.",
                    user.email.as_deref().unwrap_or("your inbox")
                ),
            }
            Ok(())
        }
    }
}

/// Revoke the session server-side when possible; the local copy is removed
/// either way.
pub fn sign_out(app: &App) -> Result<()> {
    let stored = app.home.read_session().unwrap_or_else(|err| {
        warn!(error = %err, "discarding unreadable session file");
        None
    });
    if let Some(session) = stored {
        match AuthClient::new(&app.config).and_then(|client| client.sign_out(&session)) {
            Ok(()) => {}
            Err(err) => warn!(error = %err, "server-side sign-out failed; clearing local session"),
        }
    }
    app.home.clear_session()?;
    app.auth.set_session(None);
    Ok(())
}

pub fn logout(app: &App) -> Result<()> {
    sign_out(app)?;
    output::print_session(None, app.format)
}

pub fn whoami(app: &App) -> Result<()> {
    output::print_session(app.auth.current().as_ref(), app.format)
}
