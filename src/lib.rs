pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod object_store;
pub mod prediction;
pub mod report;

use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::api::ApiContext;
use crate::config::{AppConfig, ConfigError};
use crate::db::{DatabaseError, SqliteStore, UserStore};
use crate::models::UserSeed;
use crate::object_store::{FsObjectStore, UrlSigner};
use crate::prediction::{HttpClassifier, PredictionError};
use crate::report::{OpenAiCompatibleClient, ReportError, ReportGenerator};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Invalid user seed file {path}: {reason}")]
    Seed { path: String, reason: String },

    #[error("Classifier client: {0}")]
    Prediction(#[from] PredictionError),

    #[error("Report client: {0}")]
    Report(#[from] ReportError),

    #[error(transparent)]
    Server(#[from] api::ServerError),
}

pub fn run() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    if let Err(e) = start() {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

fn start() -> Result<(), StartupError> {
    let config = AppConfig::from_env()?;
    std::fs::create_dir_all(&config.data_dir)?;
    tracing::info!(data_dir = %config.data_dir.display(), "Using data directory");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async {
        let ctx = build_context(&config)?;
        api::serve(config.bind, ctx, config.static_dir.clone()).await?;
        Ok::<(), StartupError>(())
    })
}

/// Construct every adapter from configuration.
pub fn build_context(config: &AppConfig) -> Result<ApiContext, StartupError> {
    let store = Arc::new(SqliteStore::new(db::open_database(&config.database_path())?));
    if let Some(seed) = &config.users_seed {
        let count = seed_users(store.as_ref(), seed)?;
        tracing::info!(count, "User accounts provisioned");
    }

    std::fs::create_dir_all(config.objects_dir())?;
    let objects = FsObjectStore::new(config.objects_dir());

    let signer = match &config.url_secret {
        Some(secret) => UrlSigner::new(secret.as_bytes().to_vec(), &config.public_url),
        None => {
            tracing::warn!(
                "LUNG_LENS_URL_SECRET not set; image URLs will stop working after a restart"
            );
            UrlSigner::ephemeral(&config.public_url)
        }
    };

    if config.classifier.base_url.is_none() {
        tracing::warn!("HF_SPACE_URL not set; predictions will fail");
    }
    if config.llm.api_key.is_none() {
        tracing::warn!("NEBIUS_API_KEY not set; report generation will fail");
    }

    let classifier = HttpClassifier::new(&config.classifier)?;
    let chat = OpenAiCompatibleClient::new(config.llm.clone())?;

    Ok(ApiContext {
        patients: store.clone(),
        users: store,
        objects: Arc::new(objects),
        signer: Arc::new(signer),
        classifier: Arc::new(classifier),
        reports: Arc::new(ReportGenerator::new(Arc::new(chat), config.report_fallback)),
    })
}

/// Load `[{userId, displayName, role, password}]` and upsert each account.
pub fn seed_users(store: &dyn UserStore, path: &Path) -> Result<usize, StartupError> {
    let raw = std::fs::read_to_string(path)?;
    let seeds: Vec<UserSeed> = serde_json::from_str(&raw).map_err(|e| StartupError::Seed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let count = seeds.len();
    for seed in seeds {
        let user = seed.into_user();
        store.put_user(&user)?;
        tracing::debug!(user_id = %user.user_id, role = %user.role, "User provisioned");
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;

    #[test]
    fn seed_file_provisions_hashed_accounts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(
            &path,
            r#"[{"userId":"reg-1","role":"registrar","password":"pw"},
                {"userId":"dr-1","displayName":"Dr. One","role":"Doctor","password":"pw2"}]"#,
        )
        .unwrap();

        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(seed_users(&store, &path).unwrap(), 2);

        let registrar = store.get_user("reg-1").unwrap().unwrap();
        assert_eq!(registrar.display_name, "reg-1");
        assert_eq!(registrar.role, UserRole::Registrar);
        assert!(registrar.credential.verify("pw"));

        let doctor = store.get_user("dr-1").unwrap().unwrap();
        assert_eq!(doctor.role, UserRole::Doctor);
        assert!(!doctor.credential.verify("pw"));
    }

    #[test]
    fn malformed_seed_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, r#"[{"userId":"x","role":"janitor","password":"pw"}]"#).unwrap();

        let store = SqliteStore::in_memory().unwrap();
        assert!(matches!(
            seed_users(&store, &path),
            Err(StartupError::Seed { .. })
        ));
    }

    #[test]
    fn context_builds_from_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::from_lookup(|name| match name {
            "LUNG_LENS_DATA_DIR" => Some(dir.path().display().to_string()),
            _ => None,
        })
        .unwrap();

        let ctx = build_context(&config).unwrap();
        assert!(config.database_path().exists());
        assert!(config.objects_dir().is_dir());
        assert!(ctx.patients.get_patient("none").unwrap().is_none());
    }
}
