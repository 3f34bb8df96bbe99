use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use common::storage::BlobStore;
use common::storage::filesystem::FilesystemBlobStore;
use tracing::{Level, info};

use clinic_server::config::{AppConfig, StorageBackend, StorageConfig};
use clinic_server::services::images::ImageManager;
use clinic_server::services::patients::PatientService;
use clinic_server::state::AppState;
use clinic_server::store::{DatabasePatientStore, MemoryPatientStore, PatientStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;

    let level = Level::from_str(&config.log.level).unwrap_or(Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();

    let records: Arc<dyn PatientStore> = if config.database.is_memory() {
        info!("Using in-memory patient store; records are lost on restart");
        Arc::new(MemoryPatientStore::new())
    } else {
        let db = clinic_server::database::init_db(&config.database)
            .await
            .context("Failed to connect to database")?;
        info!("Connected to database");
        Arc::new(DatabasePatientStore::new(db))
    };

    let blobs = init_blob_store(&config.storage).await?;
    info!(bucket = blobs.bucket(), "Blob store ready");

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid server.host")?,
        config.server.port,
    );

    let state = AppState {
        config: Arc::new(config),
        patients: PatientService::new(records, ImageManager::new(blobs)),
    };
    let app = clinic_server::build_router(state);

    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn init_blob_store(config: &StorageConfig) -> anyhow::Result<Arc<dyn BlobStore>> {
    match config.backend {
        StorageBackend::Filesystem => {
            let store = FilesystemBlobStore::new(
                config.data_dir.clone(),
                &config.bucket,
                &config.public_base_url,
                config.max_image_size,
            )
            .await
            .context("Failed to initialize filesystem blob store")?;
            Ok(Arc::new(store))
        }
        #[cfg(feature = "object-storage")]
        StorageBackend::S3 => {
            let s3 = config
                .s3
                .as_ref()
                .context("storage.backend = \"s3\" requires a [storage.s3] section")?;
            let store = common::storage::s3::S3BlobStore::new(
                s3,
                &config.bucket,
                &config.public_base_url,
                config.max_image_size,
            )
            .context("Failed to initialize S3 blob store")?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "object-storage"))]
        StorageBackend::S3 => {
            anyhow::bail!("storage.backend = \"s3\" requires the `object-storage` feature")
        }
    }
}
