//! MQTT 3.1.1 control packets
//!
//! Only what a publish-only QoS 0 client needs:
//!
//! ```text
//! client                     broker
//!   ── CONNECT (clean) ──────▶
//!   ◀───────────── CONNACK ──
//!   ── PUBLISH (QoS 0) ──────▶
//!   ── DISCONNECT ───────────▶
//! ```
//!
//! Every packet starts with a fixed header: one byte of packet type and
//! flags, then the remaining length as a 1-4 byte base-128 varint.

use core::fmt;

use heapless::Vec;

/// Default plaintext broker port
pub const MQTT_PORT: u16 = 1883;

/// Largest packet this codec builds
pub const MAX_PACKET_SIZE: usize = 512;

/// Largest value the remaining-length varint can carry
pub const MAX_REMAINING_LENGTH: usize = 268_435_455;

const PROTOCOL_NAME: &[u8] = b"MQTT";
const PROTOCOL_LEVEL: u8 = 4;

/// Packet type nibbles (already shifted into the high half)
pub mod packet_type {
    pub const CONNECT: u8 = 0x10;
    pub const CONNACK: u8 = 0x20;
    pub const PUBLISH: u8 = 0x30;
    pub const DISCONNECT: u8 = 0xE0;
}

mod connect_flags {
    pub const USERNAME: u8 = 0x80;
    pub const PASSWORD: u8 = 0x40;
    pub const CLEAN_SESSION: u8 = 0x02;
}

/// Errors from encoding or decoding packets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MqttError {
    /// Output buffer cannot hold the packet
    BufferTooSmall,
    /// A length-prefixed field exceeds 65535 bytes
    StringTooLong,
    /// Remaining length above [`MAX_REMAINING_LENGTH`]
    RemainingLengthTooLarge,
    /// Not enough bytes to decode the packet
    Incomplete,
    /// Packet type differs from the one expected
    UnexpectedPacket(u8),
    /// Structure violates the protocol
    Malformed,
}

impl fmt::Display for MqttError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MqttError::BufferTooSmall => write!(f, "buffer too small"),
            MqttError::StringTooLong => write!(f, "string too long"),
            MqttError::RemainingLengthTooLarge => write!(f, "remaining length too large"),
            MqttError::Incomplete => write!(f, "incomplete packet"),
            MqttError::UnexpectedPacket(b) => write!(f, "unexpected packet 0x{:02x}", b),
            MqttError::Malformed => write!(f, "malformed packet"),
        }
    }
}

/// Encode a remaining length, returning the bytes used
pub fn encode_remaining_length(mut len: usize, buf: &mut [u8]) -> Result<usize, MqttError> {
    if len > MAX_REMAINING_LENGTH {
        return Err(MqttError::RemainingLengthTooLarge);
    }

    let mut i = 0;
    loop {
        let mut byte = (len % 128) as u8;
        len /= 128;
        if len > 0 {
            byte |= 0x80;
        }
        *buf.get_mut(i).ok_or(MqttError::BufferTooSmall)? = byte;
        i += 1;
        if len == 0 {
            return Ok(i);
        }
    }
}

/// Decode a remaining length, returning `(value, bytes used)`
pub fn decode_remaining_length(bytes: &[u8]) -> Result<(usize, usize), MqttError> {
    let mut value = 0usize;
    let mut multiplier = 1usize;

    for (i, &byte) in bytes.iter().enumerate() {
        if i == 4 {
            return Err(MqttError::Malformed);
        }
        value += (byte & 0x7F) as usize * multiplier;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
        multiplier *= 128;
    }

    if bytes.len() >= 4 {
        Err(MqttError::Malformed)
    } else {
        Err(MqttError::Incomplete)
    }
}

/// Bounded cursor over an output buffer
struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn bytes(&mut self, data: &[u8]) -> Result<(), MqttError> {
        let end = self.pos + data.len();
        self.buf
            .get_mut(self.pos..end)
            .ok_or(MqttError::BufferTooSmall)?
            .copy_from_slice(data);
        self.pos = end;
        Ok(())
    }

    fn u8(&mut self, value: u8) -> Result<(), MqttError> {
        self.bytes(&[value])
    }

    fn u16(&mut self, value: u16) -> Result<(), MqttError> {
        self.bytes(&value.to_be_bytes())
    }

    /// Two-byte length prefix followed by the data
    fn prefixed(&mut self, data: &[u8]) -> Result<(), MqttError> {
        let len = u16::try_from(data.len()).map_err(|_| MqttError::StringTooLong)?;
        self.u16(len)?;
        self.bytes(data)
    }

    fn fixed_header(&mut self, first: u8, remaining: usize) -> Result<(), MqttError> {
        self.u8(first)?;
        let used = encode_remaining_length(remaining, &mut self.buf[self.pos..])?;
        self.pos += used;
        Ok(())
    }

    fn finish(self) -> usize {
        self.pos
    }
}

fn prefixed_len(data: &[u8]) -> usize {
    2 + data.len()
}

fn to_vec(
    encode: impl FnOnce(&mut [u8]) -> Result<usize, MqttError>,
) -> Result<Vec<u8, MAX_PACKET_SIZE>, MqttError> {
    let mut buffer = [0u8; MAX_PACKET_SIZE];
    let len = encode(&mut buffer)?;
    Vec::from_slice(&buffer[..len]).map_err(|_| MqttError::BufferTooSmall)
}

/// CONNECT packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connect<'a> {
    pub client_id: &'a str,
    pub username: Option<&'a str>,
    pub password: Option<&'a [u8]>,
    /// Keep-alive in seconds, 0 disables
    pub keep_alive_s: u16,
    pub clean_session: bool,
}

impl<'a> Connect<'a> {
    /// Clean-session connect with credentials
    pub fn new(client_id: &'a str, username: &'a str, password: &'a str) -> Self {
        Self {
            client_id,
            username: Some(username),
            password: Some(password.as_bytes()),
            keep_alive_s: 60,
            clean_session: true,
        }
    }

    fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.username.is_some() {
            flags |= connect_flags::USERNAME;
        }
        if self.password.is_some() {
            flags |= connect_flags::PASSWORD;
        }
        if self.clean_session {
            flags |= connect_flags::CLEAN_SESSION;
        }
        flags
    }

    /// Encode into `buffer`, returning the bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, MqttError> {
        // A password without a username is forbidden in 3.1.1
        if self.password.is_some() && self.username.is_none() {
            return Err(MqttError::Malformed);
        }

        let remaining = prefixed_len(PROTOCOL_NAME)
            + 1 // level
            + 1 // flags
            + 2 // keep alive
            + prefixed_len(self.client_id.as_bytes())
            + self.username.map_or(0, |u| prefixed_len(u.as_bytes()))
            + self.password.map_or(0, prefixed_len);

        let mut w = Writer::new(buffer);
        w.fixed_header(packet_type::CONNECT, remaining)?;
        w.prefixed(PROTOCOL_NAME)?;
        w.u8(PROTOCOL_LEVEL)?;
        w.u8(self.flags())?;
        w.u16(self.keep_alive_s)?;
        w.prefixed(self.client_id.as_bytes())?;
        if let Some(username) = self.username {
            w.prefixed(username.as_bytes())?;
        }
        if let Some(password) = self.password {
            w.prefixed(password)?;
        }
        Ok(w.finish())
    }

    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_PACKET_SIZE>, MqttError> {
        to_vec(|buf| self.encode(buf))
    }
}

/// CONNACK return code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectReturnCode {
    Accepted,
    UnacceptableProtocolVersion,
    IdentifierRejected,
    ServerUnavailable,
    BadCredentials,
    NotAuthorized,
}

impl ConnectReturnCode {
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Accepted),
            1 => Some(Self::UnacceptableProtocolVersion),
            2 => Some(Self::IdentifierRejected),
            3 => Some(Self::ServerUnavailable),
            4 => Some(Self::BadCredentials),
            5 => Some(Self::NotAuthorized),
            _ => None,
        }
    }
}

/// CONNACK packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnAck {
    pub session_present: bool,
    pub return_code: ConnectReturnCode,
}

impl ConnAck {
    /// Size of a CONNACK on the wire
    pub const LEN: usize = 4;

    pub fn decode(bytes: &[u8]) -> Result<Self, MqttError> {
        let first = *bytes.first().ok_or(MqttError::Incomplete)?;
        if first != packet_type::CONNACK {
            return Err(MqttError::UnexpectedPacket(first));
        }

        let (remaining, used) = decode_remaining_length(&bytes[1..])?;
        if remaining != 2 {
            return Err(MqttError::Malformed);
        }
        let body = bytes
            .get(1 + used..1 + used + 2)
            .ok_or(MqttError::Incomplete)?;

        if body[0] & 0xFE != 0 {
            return Err(MqttError::Malformed);
        }
        let return_code = ConnectReturnCode::from_u8(body[1]).ok_or(MqttError::Malformed)?;

        Ok(Self {
            session_present: body[0] & 0x01 != 0,
            return_code,
        })
    }

    pub fn is_accepted(&self) -> bool {
        self.return_code == ConnectReturnCode::Accepted
    }
}

/// PUBLISH packet at QoS 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Publish<'a> {
    pub topic: &'a str,
    pub payload: &'a [u8],
    pub retain: bool,
}

impl<'a> Publish<'a> {
    pub fn new(topic: &'a str, payload: &'a [u8]) -> Self {
        Self {
            topic,
            payload,
            retain: false,
        }
    }

    /// Encode into `buffer`, returning the bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, MqttError> {
        if self.topic.is_empty() || self.topic.contains(&['+', '#'][..]) {
            return Err(MqttError::Malformed);
        }

        // QoS 0 carries no packet identifier
        let remaining = prefixed_len(self.topic.as_bytes()) + self.payload.len();

        let mut w = Writer::new(buffer);
        w.fixed_header(packet_type::PUBLISH | self.retain as u8, remaining)?;
        w.prefixed(self.topic.as_bytes())?;
        w.bytes(self.payload)?;
        Ok(w.finish())
    }

    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_PACKET_SIZE>, MqttError> {
        to_vec(|buf| self.encode(buf))
    }
}

/// DISCONNECT packet
pub const DISCONNECT: [u8; 2] = [packet_type::DISCONNECT, 0x00];
