//! # Titan Scan Console Entry Point
//!
//! Reads barcode text and control commands from stdin and drives a scan
//! session with them. The setup lives in lib.rs for testability.

#[tokio::main]
async fn main() {
    if let Err(e) = scan_console_lib::run().await {
        eprintln!("scan-console: {}", e);
        std::process::exit(1);
    }
}
