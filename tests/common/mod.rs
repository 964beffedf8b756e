//! Shared utilities for integration testing against simulated devices.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;

use sp_bridge::device::sim::{SimBus, SimDevice};
use sp_bridge::device::{DeviceHandle, DevicePair};
use sp_bridge::BridgeServer;

/// Generous deadline for simulated runs; sim devices are done immediately.
pub const COMPLETION_TIMEOUT: Duration = Duration::from_millis(500);

/// Couple two simulated devices into a pair.
pub fn pair_from(player: SimDevice, sampler: SimDevice, timeout: Duration) -> DevicePair {
    let input = DeviceHandle::new("player0", Box::new(player)).unwrap();
    let output = DeviceHandle::new("sampler0", Box::new(sampler)).unwrap();
    DevicePair::new(input, output, timeout).unwrap()
}

/// A loopback pair: whatever the player streams out, the sampler captures.
/// Both devices share the given geometry.
pub fn loopback_pair(
    sample_width: u32,
    sample_bits: u32,
    time_bits: u32,
) -> (DevicePair, SimBus) {
    let bus = SimBus::new();
    let player = SimDevice::player(sample_width, sample_bits, time_bits, bus.clone());
    let sampler = SimDevice::sampler(sample_width, sample_bits, time_bits, bus.clone());
    (pair_from(player, sampler, COMPLETION_TIMEOUT), bus)
}

/// Start a bridge over the pair on an ephemeral port.
#[allow(dead_code)]
pub async fn start_bridge(pair: DevicePair) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        BridgeServer::new(pair)
            .run(listener, std::future::pending())
            .await
            .unwrap();
    });
    addr
}

/// Assemble a run request body: header plus raw payload.
#[allow(dead_code)]
pub fn run_body(time_length: u32, sample_bits: u32, payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(8 + payload.len());
    body.extend_from_slice(&time_length.to_be_bytes());
    body.extend_from_slice(&sample_bits.to_be_bytes());
    body.extend_from_slice(payload);
    body
}

/// POST a body to /run in one piece.
#[allow(dead_code)]
pub async fn post_run(addr: SocketAddr, body: Vec<u8>) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{addr}/run"))
        .body(body)
        .send()
        .await
        .unwrap()
}

/// POST a body to /run as separate chunks (chunked transfer encoding).
#[allow(dead_code)]
pub async fn post_run_chunked(addr: SocketAddr, chunks: Vec<Vec<u8>>) -> reqwest::Response {
    let stream = futures_util::stream::iter(
        chunks
            .into_iter()
            .map(|chunk| Ok::<_, std::io::Error>(chunk)),
    );
    reqwest::Client::new()
        .post(format!("http://{addr}/run"))
        .body(reqwest::Body::wrap_stream(stream))
        .send()
        .await
        .unwrap()
}
