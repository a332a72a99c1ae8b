#[tokio::main]
async fn main() {
    if let Err(e) = securetoken_cli::run().await {
        eprintln!("Error: {e}");
        for suggestion in e.suggestions() {
            eprintln!("  hint: {suggestion}");
        }
        std::process::exit(1);
    }
}
