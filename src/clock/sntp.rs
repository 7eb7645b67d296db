//! Minimal SNTP (RFC 4330) client

use super::TimeSync;
use crate::error::{PricelightError, Result};
use crate::logging::{StructuredLogger, get_logger};
use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

/// Seconds between the NTP era (1900) and the Unix epoch
pub const NTP_UNIX_OFFSET: i64 = 2_208_988_800;

const PACKET_LEN: usize = 48;
/// LI = 0, VN = 4, Mode = 3 (client)
const CLIENT_HEADER: u8 = 0b00_100_011;
const MODE_SERVER: u8 = 4;

/// Decode a 64-bit NTP timestamp
pub fn ntp_to_utc(bytes: &[u8; 8]) -> Option<DateTime<Utc>> {
    let secs = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as i64;
    let frac = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as u64;
    if secs == 0 && frac == 0 {
        return None;
    }
    let nanos = ((frac * 1_000_000_000) >> 32) as u32;
    DateTime::from_timestamp(secs - NTP_UNIX_OFFSET, nanos)
}

/// Encode an instant as a 64-bit NTP timestamp
pub fn utc_to_ntp(instant: DateTime<Utc>) -> [u8; 8] {
    let secs = (instant.timestamp() + NTP_UNIX_OFFSET) as u32;
    let frac = (((instant.timestamp_subsec_nanos() as u64) << 32) / 1_000_000_000) as u32;
    let mut out = [0u8; 8];
    out[..4].copy_from_slice(&secs.to_be_bytes());
    out[4..].copy_from_slice(&frac.to_be_bytes());
    out
}

fn timestamp_at(packet: &[u8; PACKET_LEN], offset: usize) -> Option<DateTime<Utc>> {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&packet[offset..offset + 8]);
    ntp_to_utc(&raw)
}

/// Clock offset from a server reply.
///
/// `sent` and `received` are local instants around the exchange; the
/// result is what must be added to the local clock.
pub fn offset_from_reply(
    reply: &[u8; PACKET_LEN],
    sent: DateTime<Utc>,
    received: DateTime<Utc>,
) -> Result<TimeDelta> {
    if reply[0] & 0x07 != MODE_SERVER {
        return Err(PricelightError::clock_unavailable(format!(
            "Unexpected SNTP mode {}",
            reply[0] & 0x07
        )));
    }
    if reply[1] == 0 {
        return Err(PricelightError::clock_unavailable(
            "SNTP kiss-o'-death (stratum 0)",
        ));
    }
    let server_rx = timestamp_at(reply, 32)
        .ok_or_else(|| PricelightError::clock_unavailable("SNTP reply without receive time"))?;
    let server_tx = timestamp_at(reply, 40)
        .ok_or_else(|| PricelightError::clock_unavailable("SNTP reply without transmit time"))?;

    Ok(((server_rx - sent) + (server_tx - received)) / 2)
}

/// SNTP over UDP
pub struct SntpClient {
    server: String,
    timeout: Duration,
    logger: StructuredLogger,
}

impl SntpClient {
    pub fn new(server: impl Into<String>, timeout: Duration) -> Self {
        Self {
            server: server.into(),
            timeout,
            logger: get_logger("sntp"),
        }
    }

    async fn exchange(&self) -> Result<TimeDelta> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(self.server.as_str()).await?;

        let mut request = [0u8; PACKET_LEN];
        request[0] = CLIENT_HEADER;
        let sent = Utc::now();
        request[40..48].copy_from_slice(&utc_to_ntp(sent));
        socket.send(&request).await?;

        let mut reply = [0u8; PACKET_LEN];
        let len = socket.recv(&mut reply).await?;
        let received = Utc::now();
        if len < PACKET_LEN {
            return Err(PricelightError::clock_unavailable(format!(
                "Short SNTP reply ({} bytes)",
                len
            )));
        }
        offset_from_reply(&reply, sent, received)
    }
}

#[async_trait::async_trait]
impl TimeSync for SntpClient {
    async fn synchronize(&self) -> Result<TimeDelta> {
        let offset = timeout(self.timeout, self.exchange())
            .await
            .map_err(|_| {
                PricelightError::clock_unavailable(format!(
                    "SNTP exchange with {} timed out after {:?}",
                    self.server, self.timeout
                ))
            })?
            .map_err(|e| match e {
                PricelightError::ClockUnavailable { .. } => e,
                other => PricelightError::clock_unavailable(other.to_string()),
            })?;
        self.logger.debug(&format!(
            "Offset from {}: {} ms",
            self.server,
            offset.num_milliseconds()
        ));
        Ok(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reply(rx: DateTime<Utc>, tx: DateTime<Utc>) -> [u8; PACKET_LEN] {
        let mut packet = [0u8; PACKET_LEN];
        packet[0] = 0b00_100_100;
        packet[1] = 2;
        packet[32..40].copy_from_slice(&utc_to_ntp(rx));
        packet[40..48].copy_from_slice(&utc_to_ntp(tx));
        packet
    }

    #[test]
    fn ntp_timestamps_survive_encoding() {
        let instant = Utc.with_ymd_and_hms(2023, 3, 9, 12, 0, 0).unwrap();
        let decoded = ntp_to_utc(&utc_to_ntp(instant)).unwrap();
        assert_eq!(decoded, instant);
    }

    #[test]
    fn offset_is_mean_of_both_legs() {
        let sent = Utc.with_ymd_and_hms(2023, 3, 9, 12, 0, 0).unwrap();
        let received = sent + TimeDelta::milliseconds(100);
        // Server runs 10 s ahead and answers instantly at the midpoint
        let server = sent + TimeDelta::milliseconds(50) + TimeDelta::seconds(10);
        let offset = offset_from_reply(&reply(server, server), sent, received).unwrap();
        let micros = offset.num_microseconds().unwrap();
        assert!((micros - 10_000_000).abs() < 10, "offset {}us", micros);
    }

    #[test]
    fn kiss_of_death_is_rejected() {
        let now = Utc::now();
        let mut packet = reply(now, now);
        packet[1] = 0;
        assert!(offset_from_reply(&packet, now, now).is_err());
    }

    #[test]
    fn client_mode_reply_is_rejected() {
        let now = Utc::now();
        let mut packet = reply(now, now);
        packet[0] = CLIENT_HEADER;
        assert!(matches!(
            offset_from_reply(&packet, now, now),
            Err(PricelightError::ClockUnavailable { .. })
        ));
    }
}
