mod flash;
mod host;
mod ir;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    host::run().await
}
