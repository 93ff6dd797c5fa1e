#[tokio::main]
async fn main() {
    grimoire::start_server().await;
}
