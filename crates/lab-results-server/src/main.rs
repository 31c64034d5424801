//! Lab results portal server.

use anyhow::Context;
use clap::Parser;
use lab_results_core::{Database, LabProfile, LabService};
use lab_results_server::config::{Cli, Command, ServeArgs, StorageArgs, UserCommand};
use lab_results_server::{build_router, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn open_service(storage: &StorageArgs, profile: LabProfile) -> anyhow::Result<LabService> {
    if let Some(parent) = storage.database.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    let db = Database::open(&storage.database)
        .with_context(|| format!("opening database {}", storage.database.display()))?;
    let service = LabService::open(&storage.service_config(profile), db)?;
    Ok(service)
}

async fn serve(storage: &StorageArgs, args: ServeArgs) -> anyhow::Result<()> {
    let service = open_service(storage, args.profile())?;
    let app = build_router(AppState::new(service, args.max_upload));

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("binding {}", args.bind))?;
    tracing::info!(addr = %args.bind, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

fn manage_users(storage: &StorageArgs, command: UserCommand) -> anyhow::Result<()> {
    let service = open_service(storage, LabProfile::default())?;
    match command {
        UserCommand::Add {
            username,
            password,
            admin,
        } => match service.create_user(&username, &password, admin) {
            Ok(user) => println!("Usuario {} creado", user.username),
            Err(e) if e.is_duplicate() => {
                service.set_password(&username, &password, admin)?;
                println!("Usuario {} actualizado", username);
            }
            Err(e) => return Err(e.into()),
        },
        UserCommand::List => {
            for user in service.list_users()? {
                let role = if user.is_admin { "admin" } else { "staff" };
                println!("{}\t{}", user.username, role);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => serve(&cli.storage, args).await,
        Command::User(command) => manage_users(&cli.storage, command),
    }
}
