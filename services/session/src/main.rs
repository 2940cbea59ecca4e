use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use session::{ApiConfig, AuthStatus, RequestOutcome, SessionManager};

#[derive(Parser)]
#[command(
    name = "storefront-session",
    about = "Manage a storefront account session from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Verify the stored session, refreshing it if needed, and print it
    Status,

    /// Print the profile of the authenticated user
    Whoami,

    /// Log in and persist the issued token pair
    Login {
        /// Account email
        email: String,

        /// Account password
        #[arg(long, env = "STOREFRONT_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the stored session
    Logout,

    /// Obtain a new token pair with the stored refresh token
    Refresh,

    /// Register a new account
    SignUp {
        username: String,
        email: String,

        #[arg(long, env = "STOREFRONT_PASSWORD", hide_env_values = true)]
        password: String,

        /// Password confirmation (defaults to --password)
        #[arg(long)]
        re_password: Option<String>,
    },

    /// Activate an account with the uid and token from the activation email
    Activate { uid: String, token: String },

    /// Request a password reset email
    ResetPassword { email: String },

    /// Set a new password with the uid and token from the reset email
    ResetPasswordConfirm {
        uid: String,
        token: String,

        #[arg(long, env = "STOREFRONT_NEW_PASSWORD", hide_env_values = true)]
        new_password: String,

        /// Password confirmation (defaults to --new-password)
        #[arg(long)]
        re_new_password: Option<String>,
    },

    /// Request a reset of the account email (the login name)
    ResetEmail { email: String },

    /// Set a new account email with the uid and token from the reset message
    ResetEmailConfirm {
        uid: String,
        token: String,
        new_email: String,

        /// Email confirmation (defaults to the new email)
        #[arg(long)]
        re_new_email: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = ApiConfig::from_env().context("Failed to load configuration")?;
    info!("Using storefront API at {}", config.api_url);

    let manager = SessionManager::from_config(config).context("Failed to open session")?;

    match cli.command {
        Command::Status => {
            manager.check_authenticated().await;
            print_session(&manager);
        }
        Command::Whoami => {
            if manager.check_authenticated().await != AuthStatus::Authenticated {
                anyhow::bail!("Not logged in");
            }
            let user = manager.user().context("Profile unavailable")?;
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        Command::Login { email, password } => {
            if manager.login(&email, &password).await != AuthStatus::Authenticated {
                anyhow::bail!("Login failed");
            }
            print_session(&manager);
        }
        Command::Logout => {
            manager.logout().await;
            println!("Logged out");
        }
        Command::Refresh => {
            manager.refresh_tokens().await;
            print_session(&manager);
        }
        Command::SignUp {
            username,
            email,
            re_password,
            password,
        } => {
            let re_password = re_password.unwrap_or_else(|| password.clone());
            let outcome = manager
                .sign_up(&username, &email, &password, &re_password)
                .await;
            report("Sign-up", outcome)?;
        }
        Command::Activate { uid, token } => {
            report("Activation", manager.activate(&uid, &token).await)?;
        }
        Command::ResetPassword { email } => {
            report("Password reset", manager.password_reset(&email).await)?;
        }
        Command::ResetPasswordConfirm {
            uid,
            token,
            re_new_password,
            new_password,
        } => {
            let re_new_password = re_new_password.unwrap_or_else(|| new_password.clone());
            let outcome = manager
                .password_reset_confirm(&uid, &token, &new_password, &re_new_password)
                .await;
            report("Password reset confirmation", outcome)?;
        }
        Command::ResetEmail { email } => {
            report("Email reset", manager.email_reset(&email).await)?;
        }
        Command::ResetEmailConfirm {
            uid,
            token,
            re_new_email,
            new_email,
        } => {
            let re_new_email = re_new_email.unwrap_or_else(|| new_email.clone());
            let outcome = manager
                .email_reset_confirm(&uid, &token, &new_email, &re_new_email)
                .await;
            report("Email reset confirmation", outcome)?;
        }
    }

    Ok(())
}

fn print_session(manager: &SessionManager) {
    let session = manager.snapshot();

    let status = match session.status.as_bool() {
        None => "unknown",
        Some(true) => "authenticated",
        Some(false) => "not authenticated",
    };
    println!("status: {}", status);

    if let Some(user) = &session.user {
        println!("user: {}", user.display_name());
    }
    if let Some(expires_at) = manager.access_expires_at() {
        println!("access expires: {}", expires_at.to_rfc3339());
    }
}

fn report(action: &str, outcome: RequestOutcome) -> Result<()> {
    if !outcome.is_success() {
        anyhow::bail!("{} request failed", action);
    }
    println!("{} request sent", action);
    Ok(())
}
