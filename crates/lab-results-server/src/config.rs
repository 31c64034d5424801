//! Command-line and environment configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use lab_results_core::{LabProfile, ServiceConfig};

#[derive(Parser, Debug)]
#[command(name = "lab-results-server", version, about = "Clinical lab results portal")]
pub struct Cli {
    #[command(flatten)]
    pub storage: StorageArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP server
    Serve(ServeArgs),
    /// Manage staff accounts
    #[command(subcommand)]
    User(UserCommand),
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Create an account, or reset its password if it exists
    Add {
        username: String,
        #[arg(long, env = "LAB_USER_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        admin: bool,
    },
    /// List accounts
    List,
}

/// Where data lives. Shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct StorageArgs {
    /// SQLite database file
    #[arg(long, env = "LAB_DATABASE", default_value = "data/lab.sqlite3", global = true)]
    pub database: PathBuf,

    /// Directory for result PDFs
    #[arg(long, env = "LAB_UPLOAD_DIR", default_value = "data/uploads/resultados", global = true)]
    pub upload_dir: PathBuf,

    /// Directory for backup copies of result PDFs
    #[arg(long, env = "LAB_BACKUP_DIR", default_value = "data/uploads/respaldo", global = true)]
    pub backup_dir: PathBuf,

    /// Disable backup copies
    #[arg(long, env = "LAB_NO_BACKUP", global = true)]
    pub no_backup: bool,

    /// Directory for catalog images
    #[arg(long, env = "LAB_IMAGE_DIR", default_value = "data/uploads/pruebas", global = true)]
    pub image_dir: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "LAB_BIND", default_value = "0.0.0.0:5000")]
    pub bind: SocketAddr,

    /// Largest accepted request body, in bytes
    #[arg(long, env = "LAB_MAX_UPLOAD", default_value_t = 16 * 1024 * 1024)]
    pub max_upload: usize,

    /// Public portal address printed on credentials
    #[arg(long, env = "LAB_PORTAL_URL", default_value = "http://localhost:5000")]
    pub portal_url: String,

    /// Laboratory name printed on credentials
    #[arg(long, env = "LAB_NAME", default_value = "Laboratorio Clínico Pérez")]
    pub lab_name: String,

    /// Location line printed on credentials
    #[arg(long, env = "LAB_LOCATION", default_value = "Potosí, Bolivia")]
    pub location: String,
}

impl StorageArgs {
    pub fn service_config(&self, profile: LabProfile) -> ServiceConfig {
        ServiceConfig {
            results_dir: self.upload_dir.clone(),
            backup_dir: (!self.no_backup).then(|| self.backup_dir.clone()),
            images_dir: self.image_dir.clone(),
            profile,
        }
    }
}

impl ServeArgs {
    pub fn profile(&self) -> LabProfile {
        LabProfile {
            lab_name: self.lab_name.clone(),
            location: self.location.clone(),
            portal_url: self.portal_url.clone(),
        }
    }
}
