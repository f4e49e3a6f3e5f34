//! Shared broker connection setup.

use std::sync::Arc;
use std::time::Duration;

use rskafka::client::partition::{Compression, PartitionClient, UnknownTopicHandling};
use rskafka::client::{Client, ClientBuilder, Credentials, SaslConfig};
use stream_core::{Error, Result, StreamErrorCode};

use crate::config::RedpandaConfig;

/// Creates a TLS configuration for Redpanda Cloud.
fn create_tls_config() -> Arc<rustls::ClientConfig> {
    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Arc::new(config)
}

/// Connects to the cluster, with TLS and SCRAM when credentials are set.
pub async fn connect(config: &RedpandaConfig, code: StreamErrorCode) -> Result<Client> {
    let mut builder = ClientBuilder::new(config.brokers.clone());

    if let Some((username, password)) = config.credentials() {
        builder = builder
            .tls_config(create_tls_config())
            .sasl_config(SaslConfig::ScramSha256(Credentials::new(
                username.to_string(),
                password.to_string(),
            )));
    }

    let timeout = Duration::from_millis(config.request_timeout_ms);
    match tokio::time::timeout(timeout, builder.build()).await {
        Ok(Ok(client)) => Ok(client),
        Ok(Err(e)) => Err(Error::stream(
            code,
            format!("failed to connect to {}: {e}", config.broker_string()),
        )),
        Err(_) => Err(Error::stream(
            code,
            format!("timed out connecting to {}", config.broker_string()),
        )),
    }
}

/// Connects and opens the configured topic partition.
pub async fn partition_client(
    config: &RedpandaConfig,
    code: StreamErrorCode,
) -> Result<Arc<PartitionClient>> {
    let client = connect(config, code).await?;

    let partition = client
        .partition_client(config.topic.clone(), config.partition, UnknownTopicHandling::Error)
        .await
        .map_err(|e| {
            Error::stream(
                code,
                format!("failed to open {}/{}: {e}", config.topic, config.partition),
            )
        })?;

    Ok(Arc::new(partition))
}

/// Maps a configured compression name; unknown names disable compression.
pub fn compression(name: &str) -> Compression {
    match name {
        "gzip" => Compression::Gzip,
        "snappy" => Compression::Snappy,
        "lz4" => Compression::Lz4,
        "zstd" => Compression::Zstd,
        _ => Compression::NoCompression,
    }
}
