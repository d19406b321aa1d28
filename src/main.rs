use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "deepdex=info,poise=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build Tokio runtime");

    if let Err(e) = runtime.block_on(deepdex::bot::run()) {
        tracing::error!("Error starting bot: {}", e);
        std::process::exit(1);
    }
}
