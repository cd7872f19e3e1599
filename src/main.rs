#[tokio::main]
async fn main() {
    insights::start_server().await;
}
