use clap::{Parser, Subcommand};
use tick::commands::{App, BackendKind};
use tick::filter::Filter;
use tick::model::ScopePolicy;
use tick::output::Format;
use tick::store::Home;
use tick::task_id::TaskId;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "tick",
    version,
    about = "Shared task list backed by a hosted database"
)]
struct Cli {
    /// Output format
    #[arg(long, global = true, value_enum, default_value = "json")]
    format: Format,
    /// Shorthand for --format pretty
    #[arg(long, global = true, hide = true)]
    pretty: bool,
    /// Where tasks live
    #[arg(long, global = true, value_enum, default_value = "rest")]
    backend: BackendKind,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save the service URL and anon key to the config file
    Init {
        /// Service base URL, e.g. https://xyz.supabase.co
        #[arg(long)]
        url: String,
        /// Public anon key
        #[arg(long)]
        anon_key: String,
        /// Table holding the tasks
        #[arg(long)]
        table: Option<String>,
        /// Fetch only my tasks, or every row the service returns
        #[arg(long, value_enum)]
        scope: Option<ScopePolicy>,
    },
    /// Create an account and sign in if the service allows it
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long, env = "TICK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "TICK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List tasks
    List {
        /// Which tasks to show
        #[arg(long, value_enum, default_value = "all")]
        filter: Filter,
    },
    /// Add a task
    Add {
        /// Task title
        title: String,
        /// User id to assign (defaults to you)
        #[arg(long)]
        assign_to: Option<String>,
        /// Due date: YYYY-MM-DD (local midnight) or RFC 3339
        #[arg(long)]
        due: Option<String>,
    },
    /// Flip a task between done and not done
    Toggle {
        /// Task ID
        id: String,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: String,
    },
    /// Interactive terminal view
    Tui,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("TICK_LOG")
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli, format: Format) -> tick::error::Result<()> {
    let home = Home::resolve();

    // Commands dispatched before loading a session
    if let Commands::Init {
        url,
        anon_key,
        table,
        scope,
    } = &cli.command
    {
        return tick::commands::init::run(
            &home,
            url.clone(),
            anon_key.clone(),
            table.clone(),
            *scope,
            format,
        );
    }

    let app = App::load(home, cli.backend, format)?;

    match cli.command {
        Commands::Init { .. } => unreachable!(),
        Commands::Signup { email, password } => {
            tick::commands::auth::signup(&app, &email, &password)
        }
        Commands::Login { email, password } => tick::commands::auth::login(&app, &email, &password),
        Commands::Logout => tick::commands::auth::logout(&app),
        Commands::Whoami => tick::commands::auth::whoami(&app),
        Commands::List { filter } => tick::commands::list::run(&app, filter),
        Commands::Add {
            title,
            assign_to,
            due,
        } => tick::commands::add::run(&app, title, assign_to, due),
        Commands::Toggle { id } => tick::commands::toggle::run(&app, TaskId::parse_arg(&id)?),
        Commands::Delete { id } => tick::commands::delete::run(&app, TaskId::parse_arg(&id)?),
        Commands::Tui => tick::commands::tui::run(&app),
    }
}

fn main() {
    let cli = Cli::parse();
    let format = if cli.pretty {
        Format::Pretty
    } else {
        cli.format
    };
    init_tracing();
    if let Err(e) = run(cli, format) {
        match format {
            Format::Json => {
                eprintln!(
                    "{}",
                    serde_json::json!({
                        "error": e.code(),
                        "message": e.to_string()
                    })
                );
            }
            _ => eprintln!("error: {e}"),
        }
        std::process::exit(1);
    }
}
