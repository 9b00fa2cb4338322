#[tokio::main]
async fn main() {
    tutoring_scheduler::run().await;
}
