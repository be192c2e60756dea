use anypoint_provider::{init_logging, serve, AnypointProvider, ProviderError};
use tracing::error;

#[tokio::main]
async fn main() -> Result<(), ProviderError> {
    init_logging();

    let provider = AnypointProvider::new();
    for problem in provider.check_schema() {
        error!(summary = %problem.summary, detail = ?problem.detail, "Invalid provider schema");
    }

    serve(provider).await
}
