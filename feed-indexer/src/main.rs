mod core;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    core::start_indexer().await
}
