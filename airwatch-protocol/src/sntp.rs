//! SNTP client packets (RFC 4330)
//!
//! Packet layout (48 bytes, big endian):
//! - byte 0: LI (2 bits), VN (3 bits), Mode (3 bits)
//! - byte 1: stratum
//! - bytes 40..48: transmit timestamp, seconds and fraction since 1900

use core::fmt;

/// UDP port of NTP servers
pub const NTP_PORT: u16 = 123;

/// Size of an SNTP packet without extensions
pub const NTP_PACKET_SIZE: usize = 48;

/// Seconds from 1900-01-01 (NTP era 0) to 1970-01-01
pub const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

/// LI = 0, VN = 4, Mode = 3 (client)
const CLIENT_REQUEST_HEADER: u8 = 0x23;

const MODE_SERVER: u8 = 4;
const MODE_BROADCAST: u8 = 5;
const LEAP_ALARM: u8 = 3;

const TRANSMIT_TIMESTAMP: usize = 40;

/// Errors from parsing a server response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SntpError {
    /// Fewer than 48 bytes
    TooShort,
    /// Mode is not server or broadcast
    WrongMode(u8),
    /// Stratum 0: the server refused with a kiss code
    KissOfDeath,
    /// Leap indicator says the server clock is not synchronized
    Unsynchronized,
    /// Transmit timestamp is zero
    ZeroTimestamp,
    /// Transmit timestamp falls before 1970
    BeforeUnixEpoch,
}

impl fmt::Display for SntpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SntpError::TooShort => write!(f, "response too short"),
            SntpError::WrongMode(m) => write!(f, "unexpected mode {}", m),
            SntpError::KissOfDeath => write!(f, "kiss-o'-death"),
            SntpError::Unsynchronized => write!(f, "server unsynchronized"),
            SntpError::ZeroTimestamp => write!(f, "zero transmit timestamp"),
            SntpError::BeforeUnixEpoch => write!(f, "timestamp before 1970"),
        }
    }
}

/// Time reported by a server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SntpTime {
    /// Seconds since the Unix epoch
    pub unix_secs: u64,
    /// Fractional second in units of 2^-32 s
    pub fraction: u32,
    pub stratum: u8,
}

impl SntpTime {
    /// Fractional second in milliseconds
    pub fn subsec_millis(&self) -> u32 {
        ((u64::from(self.fraction) * 1000) >> 32) as u32
    }
}

/// Build a client request
pub fn request() -> [u8; NTP_PACKET_SIZE] {
    let mut packet = [0u8; NTP_PACKET_SIZE];
    packet[0] = CLIENT_REQUEST_HEADER;
    packet
}

/// Parse a server response
pub fn parse_response(bytes: &[u8]) -> Result<SntpTime, SntpError> {
    if bytes.len() < NTP_PACKET_SIZE {
        return Err(SntpError::TooShort);
    }

    let leap = bytes[0] >> 6;
    let mode = bytes[0] & 0x07;
    let stratum = bytes[1];

    if mode != MODE_SERVER && mode != MODE_BROADCAST {
        return Err(SntpError::WrongMode(mode));
    }
    if stratum == 0 {
        return Err(SntpError::KissOfDeath);
    }
    if leap == LEAP_ALARM {
        return Err(SntpError::Unsynchronized);
    }

    let ts = &bytes[TRANSMIT_TIMESTAMP..TRANSMIT_TIMESTAMP + 8];
    let secs = u32::from_be_bytes([ts[0], ts[1], ts[2], ts[3]]);
    let fraction = u32::from_be_bytes([ts[4], ts[5], ts[6], ts[7]]);
    if secs == 0 && fraction == 0 {
        return Err(SntpError::ZeroTimestamp);
    }

    Ok(SntpTime {
        unix_secs: ntp_to_unix(secs).ok_or(SntpError::BeforeUnixEpoch)?,
        fraction,
        stratum,
    })
}

/// Convert NTP seconds to Unix seconds
///
/// With the MSB clear the timestamp belongs to era 1 (from 2036-02-07).
/// Era-0 seconds below [`NTP_UNIX_OFFSET`] predate 1970 and yield `None`.
fn ntp_to_unix(secs: u32) -> Option<u64> {
    let secs = u64::from(secs);
    if secs & 0x8000_0000 != 0 {
        secs.checked_sub(NTP_UNIX_OFFSET)
    } else {
        Some(secs + (1u64 << 32) - NTP_UNIX_OFFSET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn response(header: u8, stratum: u8, secs: u32, fraction: u32) -> [u8; NTP_PACKET_SIZE] {
        let mut packet = [0u8; NTP_PACKET_SIZE];
        packet[0] = header;
        packet[1] = stratum;
        packet[40..44].copy_from_slice(&secs.to_be_bytes());
        packet[44..48].copy_from_slice(&fraction.to_be_bytes());
        packet
    }

    #[test]
    fn test_request() {
        let packet = request();
        assert_eq!(packet[0], 0x23);
        assert!(packet[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_parse_server_response() {
        // 2023-11-14 22:13:20 UTC
        let ntp_secs = (1_700_000_000u64 + NTP_UNIX_OFFSET) as u32;
        let packet = response(0x24, 2, ntp_secs, 0x8000_0000);

        let time = parse_response(&packet).unwrap();
        assert_eq!(time.unix_secs, 1_700_000_000);
        assert_eq!(time.stratum, 2);
        assert_eq!(time.subsec_millis(), 500);
    }

    #[test]
    fn test_era_rollover() {
        // 2036-02-07 06:28:16 UTC is NTP second 0 of era 1
        let packet = response(0x24, 1, 1, 0);
        assert_eq!(parse_response(&packet).unwrap().unix_secs, 2_085_978_497);
    }

    #[test]
    fn test_rejects_bad_responses() {
        let secs = 0xE900_0000;
        assert_eq!(parse_response(&[0u8; 47]), Err(SntpError::TooShort));
        assert_eq!(
            parse_response(&response(0x23, 2, secs, 0)),
            Err(SntpError::WrongMode(3))
        );
        assert_eq!(
            parse_response(&response(0x24, 0, secs, 0)),
            Err(SntpError::KissOfDeath)
        );
        assert_eq!(
            parse_response(&response(0xE4, 2, secs, 0)),
            Err(SntpError::Unsynchronized)
        );
        assert_eq!(
            parse_response(&response(0x24, 2, 0, 0)),
            Err(SntpError::ZeroTimestamp)
        );
    }

    #[test]
    fn test_rejects_timestamp_before_unix_epoch() {
        let packet = response(0x24, 2, 0x8000_0000, 0);
        assert_eq!(parse_response(&packet), Err(SntpError::BeforeUnixEpoch));

        let last_before = (NTP_UNIX_OFFSET - 1) as u32;
        assert_eq!(
            parse_response(&response(0x24, 2, last_before, 0)),
            Err(SntpError::BeforeUnixEpoch)
        );
        assert_eq!(
            parse_response(&response(0x24, 2, NTP_UNIX_OFFSET as u32, 0))
                .unwrap()
                .unix_secs,
            0
        );
    }

    #[test]
    fn test_broadcast_mode_accepted() {
        let packet = response(0x25, 3, 0xE900_0000, 0);
        assert!(parse_response(&packet).is_ok());
    }

    proptest! {
        #[test]
        fn prop_parse_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            let _ = parse_response(&bytes);
        }
    }
}
