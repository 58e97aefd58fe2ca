use std::env;
use std::sync::Arc;

use affordable_county::api::{dataset_path_from_env, run_cli, run_http_server};
use affordable_county::core::ReferenceDataset;

#[tokio::main]
async fn main() {
    pretty_env_logger::init();

    let raw_args: Vec<String> = env::args().collect();
    if raw_args.get(1).map(|s| s.as_str()) == Some("serve") {
        let port = raw_args
            .get(2)
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(8080);
        let dataset_path = dataset_path_from_env();
        let dataset = match ReferenceDataset::from_path(&dataset_path) {
            Ok(dataset) => Arc::new(dataset),
            Err(e) => {
                eprintln!("Dataset error: {e}");
                std::process::exit(1);
            }
        };
        if let Err(e) = run_http_server(dataset, port).await {
            eprintln!("Server error: {e}");
            std::process::exit(1);
        }
        return;
    }

    if let Err(e) = run_cli() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
