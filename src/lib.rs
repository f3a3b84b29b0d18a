use std::sync::Arc;

/// NFS Collector: periodically reads NFS client statistics from
/// `/proc/self/mountstats` and the RPC counters under `/proc/net/rpc`, filters
/// them per mount point and serves the latest values over HTTP.
pub mod api;
pub mod collector;
pub mod config;
pub mod error;
pub mod fsutil;
pub mod metrics;
pub mod mountstats;
pub mod rpc;
pub mod store;

/// Reads the host name from `/etc/hostname`, falling back to the kernel.
fn read_hostname() -> std::io::Result<String> {
    let hostname = std::fs::read_to_string("/etc/hostname")
        .or_else(|_| std::fs::read_to_string("/proc/sys/kernel/hostname"))?;
    Ok(hostname.trim().to_owned())
}

/// Runs the NFS collector.
///
/// Loads the configuration, probes the report sources, starts the API server
/// and then collects once per interval.
///
/// # Returns
///
/// Only returns on error.
///
/// # Errors
///
/// Possible errors include:
/// - An unreadable or invalid configuration file (see [`config::Config::from_env`]).
/// - A host name that cannot be determined.
/// - An API address that cannot be bound.
/// - A system clock set before the UNIX epoch.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::Config::from_env()?;
    let hostname = read_hostname()?;
    log::debug!("Hostname: {}", &hostname);

    let collector = Arc::new(collector::NfsCollector::new(&config, hostname));
    let store = Arc::new(store::SnapshotStore::default());

    let listener = tokio::net::TcpListener::bind(config.listen_addr.as_str())
        .await
        .map_err(|err| format!("failed to bind API to `{}`: {err}", config.listen_addr))?;
    {
        let api = api::APIServer::new(Arc::clone(&store));
        tokio::spawn(async move {
            if let Err(err) = api.serve(listener).await {
                log::error!("API server failed: {err}");
            }
        });
    }

    let (tx, mut rx) = tokio::sync::mpsc::channel::<Vec<metrics::MetricGroup>>(10);
    {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            while let Some(groups) = rx.recv().await {
                store.publish(groups);
            }
        });
    }

    let mut interval = tokio::time::interval(config.interval());
    loop {
        interval.tick().await;
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)?
            .as_secs();
        log::trace!("Collecting@{timestamp}");

        let collector = Arc::clone(&collector);
        let out = tokio::task::spawn_blocking(move || {
            let mut out = Vec::new();
            let before = std::time::Instant::now();
            collector.collect(timestamp, &mut out);
            log::trace!("collect() took {} microseconds", before.elapsed().as_micros());
            out
        })
        .await?;

        tx.send(out).await?;
    }
}
