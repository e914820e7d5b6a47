use electra_infra::ElectraConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    electra_observability::init();

    let config = ElectraConfig::from_env()?;
    let bind_addr = config.bind_addr;

    let app = electra_api::app::build_app(config).await?;

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
