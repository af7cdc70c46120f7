//! Network task
//!
//! Owns the WiFi control handle and every socket. Serves publish jobs and
//! time queries one at a time, reporting results back to the agent loop.

use cyw43::{Control, JoinOptions};
use cyw43_pio::PioSpi;
use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_net::dns::DnsQueryType;
use embassy_net::tcp::TcpSocket;
use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::{IpAddress, Ipv4Address, Stack};
use embassy_rp::gpio::Output;
use embassy_rp::peripherals::{DMA_CH0, PIO0};
use embassy_time::{with_timeout, Duration, Timer};
use embedded_io_async::{Read, Write};

use airwatch_core::config::{AgentConfig, BrokerConfig, WifiConfig};
use airwatch_core::traits::{ClockSyncError, PublishError};
use airwatch_protocol::mqtt::{MqttError, DISCONNECT, MAX_PACKET_SIZE};
use airwatch_protocol::{sntp, ConnAck, Connect, Publish, NTP_PACKET_SIZE, NTP_PORT};

use crate::channels::{PublishJob, PUBLISH_CHANNEL, PUBLISH_FEEDBACK, SYNC_REQUEST, TIME_SYNC};

/// SPI link to the CYW43439 on the Pico W
pub type WifiSpi = PioSpi<'static, PIO0, 0, DMA_CH0>;

/// Pause between failed WiFi joins
const WIFI_RETRY_DELAY: Duration = Duration::from_secs(5);

/// TCP inactivity timeout for a broker session
const SOCKET_TIMEOUT: Duration = Duration::from_secs(10);

/// Wait for an SNTP answer this long
const NTP_TIMEOUT: Duration = Duration::from_secs(5);

/// CYW43 driver task
#[embassy_executor::task]
pub async fn cyw43_task(runner: cyw43::Runner<'static, Output<'static>, WifiSpi>) -> ! {
    runner.run().await
}

/// Network stack task
#[embassy_executor::task]
pub async fn net_task(mut runner: embassy_net::Runner<'static, cyw43::NetDriver<'static>>) -> ! {
    runner.run().await
}

/// Network task - joins WiFi, then serves publish jobs and time queries
#[embassy_executor::task]
pub async fn network_task(
    mut control: Control<'static>,
    stack: Stack<'static>,
    config: &'static AgentConfig,
) {
    info!("Network task started");

    connect_wifi(&mut control, stack, &config.wifi).await;

    loop {
        match select(PUBLISH_CHANNEL.receive(), SYNC_REQUEST.wait()).await {
            Either::First(job) => {
                if !stack.is_link_up() {
                    connect_wifi(&mut control, stack, &config.wifi).await;
                }
                let result = publish(stack, &config.broker, &job).await;
                if let Err(e) = result {
                    warn!("Publish to {} failed: {}", job.topic.as_str(), e);
                }
                PUBLISH_FEEDBACK.send(result).await;
            }
            Either::Second(()) => {
                if !stack.is_link_up() {
                    connect_wifi(&mut control, stack, &config.wifi).await;
                }
                let result = query_time(stack, config.clock.ntp_server.as_str()).await;
                if let Ok(secs) = result {
                    debug!("SNTP answered {}", secs);
                }
                TIME_SYNC.signal(result);
            }
        }
    }
}

/// Join the configured network, retrying until it works, then wait for DHCP
async fn connect_wifi(control: &mut Control<'static>, stack: Stack<'static>, wifi: &WifiConfig) {
    loop {
        info!("Joining WiFi network {}", wifi.ssid.as_str());
        match control
            .join(wifi.ssid.as_str(), JoinOptions::new(wifi.password.as_bytes()))
            .await
        {
            Ok(()) => break,
            Err(e) => {
                warn!("WiFi join failed with status {}", e.status);
                Timer::after(WIFI_RETRY_DELAY).await;
            }
        }
    }

    stack.wait_config_up().await;
    if let Some(v4) = stack.config_v4() {
        info!("WiFi up, address {}", v4.address);
    }
}

/// Numeric addresses skip DNS
async fn resolve(stack: Stack<'static>, host: &str) -> Option<IpAddress> {
    if let Ok(ip) = host.parse::<Ipv4Address>() {
        return Some(IpAddress::Ipv4(ip));
    }

    match stack.dns_query(host, DnsQueryType::A).await {
        Ok(addresses) => addresses.first().copied(),
        Err(e) => {
            warn!("DNS lookup for {} failed: {:?}", host, e);
            None
        }
    }
}

/// One clean MQTT session: CONNECT, CONNACK, PUBLISH, DISCONNECT
async fn publish(
    stack: Stack<'static>,
    broker: &BrokerConfig,
    job: &PublishJob,
) -> Result<(), PublishError> {
    let address = resolve(stack, broker.host.as_str())
        .await
        .ok_or(PublishError::Connect)?;

    let mut rx_buffer = [0u8; 256];
    let mut tx_buffer = [0u8; MAX_PACKET_SIZE];
    let mut socket = TcpSocket::new(stack, &mut rx_buffer, &mut tx_buffer);
    socket.set_timeout(Some(SOCKET_TIMEOUT));

    if let Err(e) = socket.connect((address, broker.port)).await {
        warn!("Broker connect failed: {:?}", e);
        return Err(PublishError::Connect);
    }

    let result = mqtt_session(&mut socket, broker, job).await;
    socket.close();
    let _ = socket.flush().await;
    result
}

async fn mqtt_session(
    socket: &mut TcpSocket<'_>,
    broker: &BrokerConfig,
    job: &PublishJob,
) -> Result<(), PublishError> {
    let mut packet = [0u8; MAX_PACKET_SIZE];

    let connect = Connect::new(
        broker.client_id.as_str(),
        broker.effective_username(),
        broker.password.as_str(),
    );
    let len = connect
        .encode(&mut packet)
        .map_err(|e| encode_error(e, PublishError::Connect))?;
    socket
        .write_all(&packet[..len])
        .await
        .map_err(|_| PublishError::Connect)?;

    let mut ack = [0u8; ConnAck::LEN];
    socket
        .read_exact(&mut ack)
        .await
        .map_err(|_| PublishError::Connect)?;
    let ack = ConnAck::decode(&ack).map_err(|_| PublishError::Connect)?;
    if !ack.is_accepted() {
        warn!("Broker refused session: {}", ack.return_code);
        return Err(PublishError::Rejected);
    }

    let message = Publish {
        topic: job.topic.as_str(),
        payload: job.payload.as_bytes(),
        retain: job.retain,
    };
    let len = message
        .encode(&mut packet)
        .map_err(|e| encode_error(e, PublishError::Publish))?;
    socket
        .write_all(&packet[..len])
        .await
        .map_err(|_| PublishError::Publish)?;

    socket
        .write_all(&DISCONNECT)
        .await
        .map_err(|_| PublishError::Publish)?;
    socket.flush().await.map_err(|_| PublishError::Publish)
}

fn encode_error(e: MqttError, otherwise: PublishError) -> PublishError {
    match e {
        MqttError::BufferTooSmall | MqttError::RemainingLengthTooLarge => {
            PublishError::PayloadTooLarge
        }
        _ => otherwise,
    }
}

/// Single SNTP round trip
async fn query_time(stack: Stack<'static>, server: &str) -> Result<u64, ClockSyncError> {
    let address = resolve(stack, server)
        .await
        .ok_or(ClockSyncError::Unreachable)?;

    let mut rx_meta = [PacketMetadata::EMPTY; 1];
    let mut rx_buffer = [0u8; 128];
    let mut tx_meta = [PacketMetadata::EMPTY; 1];
    let mut tx_buffer = [0u8; 128];
    let mut socket = UdpSocket::new(
        stack,
        &mut rx_meta,
        &mut rx_buffer,
        &mut tx_meta,
        &mut tx_buffer,
    );
    socket.bind(0).map_err(|_| ClockSyncError::Unreachable)?;

    socket
        .send_to(&sntp::request(), (address, NTP_PORT))
        .await
        .map_err(|_| ClockSyncError::Unreachable)?;

    let mut packet = [0u8; NTP_PACKET_SIZE];
    let (len, _) = with_timeout(NTP_TIMEOUT, socket.recv_from(&mut packet))
        .await
        .map_err(|_| ClockSyncError::Timeout)?
        .map_err(|_| ClockSyncError::MalformedResponse)?;

    match sntp::parse_response(&packet[..len]) {
        Ok(time) => Ok(time.unix_secs),
        Err(e) => {
            warn!("Bad SNTP response from {}: {}", server, e);
            Err(ClockSyncError::MalformedResponse)
        }
    }
}
