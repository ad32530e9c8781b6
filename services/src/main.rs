use std::net::{IpAddr, SocketAddr};
use tracing::info;
use zkt_admin_services::{
    config::Config,
    database::{self, PgStorage},
    routes, telemetry,
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

const BUILD_DATE: &str = env!("BUILD_DATE");
const BUILD_COMMIT: &str = env!("BUILD_COMMIT");
const BUILD_BRANCH: &str = env!("BUILD_BRANCH");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; real deployments set the environment
    dotenvy::dotenv().ok();

    let config: Config = Config::init()?;

    telemetry::init_tracing(&config)?;

    print_build_info();

    info!(
        environment = %config.environment(),
        server_addr = %config.server_addr(),
        port = %config.port(),
        "Configuration loaded"
    );

    let pool = database::create_pool(&config).await?;
    database::init_schema(&pool).await?;

    let route = routes(PgStorage::new(pool), config.clone()).await;

    let addr = SocketAddr::from((config.server_addr().parse::<IpAddr>()?, config.port()));

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, route).await?;

    Ok(())
}

fn print_build_info() {
    info!("===========================================");
    info!("  ZKT Admin Services");
    info!("===========================================");
    info!("Build Date:   {}", BUILD_DATE);
    info!("Build Commit: {}", BUILD_COMMIT);
    info!("Build Branch: {}", BUILD_BRANCH);
    info!("===========================================");
}
