#[tokio::main]
async fn main() {
    if let Err(e) = renalcare_lib::run().await {
        tracing::error!("{e}");
        eprintln!("renalcare: {e}");
        std::process::exit(1);
    }
}
