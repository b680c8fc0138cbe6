#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    wanderai_gateway::cli::run().await
}
