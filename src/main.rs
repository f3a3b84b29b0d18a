/// Entry point for the NFS collector.
///
/// Log verbosity is controlled through `RUST_LOG`; the configuration file is
/// named by `NFS_COLLECTOR_CONFIG`.
///
/// # Examples
///
/// ```bash
/// RUST_LOG=info NFS_COLLECTOR_CONFIG=/etc/nfs-collector.json cargo run
/// ```
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    nfs_collector::run().await
}
