use clap::Parser;
use pgelastic::config::PostgresConfig;
use pgelastic::store::PostgresBackend;
use pgelastic::DocumentStore;
use pgelastic_migrate::{ElasticsearchSource, Migrator};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "pgelastic-migrate")]
#[command(about = "Copy indices, mappings and documents from Elasticsearch into PostgreSQL")]
#[command(version)]
struct Cli {
    /// Host and port of the destination PostgreSQL instance
    #[arg(long, default_value = "localhost:5432")]
    postgresql_host: String,

    /// User on the destination PostgreSQL instance
    #[arg(long, default_value = "postgres")]
    postgresql_user: String,

    /// Password of that user
    #[arg(long, env = "PGPASSWORD", default_value = "", hide_env_values = true)]
    postgresql_password: String,

    /// Destination database
    #[arg(long, default_value = "postgres")]
    postgresql_database: String,

    /// Host and port (or URL) of the source Elasticsearch instance
    #[arg(long, default_value = "localhost:9200")]
    elasticsearch_host: String,

    /// Documents fetched per scroll page
    #[arg(long, default_value_t = 500)]
    batch_size: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let postgres = PostgresConfig {
        address: cli.postgresql_host,
        user: cli.postgresql_user,
        password: cli.postgresql_password,
        database: cli.postgresql_database,
        ..PostgresConfig::default()
    };
    let backend = PostgresBackend::connect(&postgres).await?;
    let store = Arc::new(DocumentStore::new(Arc::new(backend)));
    store.initialize().await?;

    let source = ElasticsearchSource::new(&cli.elasticsearch_host, cli.batch_size)?;
    let summary = Migrator::new(source, store).run().await?;

    println!("\nMigration complete!");
    println!("  Indices:   {}", summary.indices);
    println!("  Types:     {}", summary.types);
    println!("  Documents: {}", summary.documents);
    println!("  Failed:    {}", summary.failed);

    Ok(())
}
