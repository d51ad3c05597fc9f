//! ICMP echo wire format.
//!
//! Builds and parses just enough of ICMP to carry echo requests and
//! recognize the matching replies. The payload carries an 8-byte random
//! token so replies can be attributed to a specific [`Pinger`] even on a
//! raw socket that sees every ICMP message on the host.
//!
//! [`Pinger`]: super::Pinger

/// ICMPv4 echo request type.
pub const ECHO_REQUEST_V4: u8 = 8;
/// ICMPv4 echo reply type.
pub const ECHO_REPLY_V4: u8 = 0;
/// ICMPv6 echo request type.
pub const ECHO_REQUEST_V6: u8 = 128;
/// ICMPv6 echo reply type.
pub const ECHO_REPLY_V6: u8 = 129;

/// Total length of an encoded echo message: 8-byte ICMP header plus the
/// 8-byte token payload.
pub const ECHO_LEN: usize = 16;

/// Decoded fields of an echo reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoReply {
    pub ident: u16,
    pub seq: u16,
    pub token: [u8; 8],
}

/// Build an ICMP echo request.
///
/// For IPv6 the checksum is left zero; the kernel computes it (it covers
/// a pseudo-header this code has no access to).
pub fn build_echo_request(ident: u16, seq: u16, token: &[u8; 8], ipv6: bool) -> Vec<u8> {
    let mut packet = Vec::with_capacity(ECHO_LEN);

    let msg_type = if ipv6 { ECHO_REQUEST_V6 } else { ECHO_REQUEST_V4 };
    packet.push(msg_type);
    // Code
    packet.push(0);
    // Checksum placeholder
    packet.extend_from_slice(&[0, 0]);
    packet.extend_from_slice(&ident.to_be_bytes());
    packet.extend_from_slice(&seq.to_be_bytes());
    packet.extend_from_slice(token);

    if !ipv6 {
        let sum = checksum(&packet);
        packet[2..4].copy_from_slice(&sum.to_be_bytes());
    }

    packet
}

/// Parse an echo reply starting at the ICMP header.
///
/// Returns `None` for anything that is not an echo reply of the expected
/// family or is too short to carry our token.
pub fn parse_echo_reply(data: &[u8], ipv6: bool) -> Option<EchoReply> {
    if data.len() < ECHO_LEN {
        return None;
    }

    let expected = if ipv6 { ECHO_REPLY_V6 } else { ECHO_REPLY_V4 };
    if data[0] != expected || data[1] != 0 {
        return None;
    }

    let ident = u16::from_be_bytes([data[4], data[5]]);
    let seq = u16::from_be_bytes([data[6], data[7]]);
    let mut token = [0u8; 8];
    token.copy_from_slice(&data[8..16]);

    Some(EchoReply { ident, seq, token })
}

/// Strip the IPv4 header from a raw-socket datagram, yielding the ICMP
/// message. Raw IPv4 sockets deliver the full IP packet; DGRAM sockets
/// and all IPv6 sockets deliver the ICMP message directly.
pub fn strip_ipv4_header(data: &[u8]) -> Option<&[u8]> {
    if data.is_empty() || data[0] >> 4 != 4 {
        return None;
    }
    let ihl = ((data[0] & 0x0f) as usize) * 4;
    if ihl < 20 || data.len() <= ihl {
        return None;
    }
    Some(&data[ihl..])
}

/// RFC 1071 internet checksum.
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;

    for chunk in data.chunks(2) {
        let word = if chunk.len() == 2 {
            u16::from_be_bytes([chunk[0], chunk[1]])
        } else {
            u16::from_be_bytes([chunk[0], 0])
        };
        sum = sum.wrapping_add(u32::from(word));
    }

    while sum >> 16 != 0 {
        sum = (sum >> 16) + (sum & 0xffff);
    }

    !(sum as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_echo_request_v4() {
        let token = [1, 2, 3, 4, 5, 6, 7, 8];
        let packet = build_echo_request(0x1234, 7, &token, false);

        assert_eq!(packet.len(), ECHO_LEN);
        assert_eq!(packet[0], ECHO_REQUEST_V4);
        assert_eq!(packet[1], 0);
        assert_eq!(&packet[4..6], &[0x12, 0x34]);
        assert_eq!(&packet[6..8], &[0x00, 0x07]);
        assert_eq!(&packet[8..16], &token);

        // Checksumming a message including its own checksum yields zero.
        assert_eq!(checksum(&packet), 0);
    }

    #[test]
    fn test_build_echo_request_v6_leaves_checksum_to_kernel() {
        let packet = build_echo_request(1, 1, &[0u8; 8], true);
        assert_eq!(packet[0], ECHO_REQUEST_V6);
        assert_eq!(&packet[2..4], &[0, 0]);
    }

    #[test]
    fn test_checksum_known_vector() {
        // Example from RFC 1071 §3: 0x0001 0xf203 0xf4f5 0xf6f7
        let data = [0x00, 0x01, 0xf2, 0x03, 0xf4, 0xf5, 0xf6, 0xf7];
        assert_eq!(checksum(&data), !0xddf2);
    }

    #[test]
    fn test_parse_rejects_non_reply() {
        let token = [0u8; 8];
        let request = build_echo_request(1, 1, &token, false);
        assert_eq!(parse_echo_reply(&request, false), None);

        let mut reply = request;
        reply[0] = ECHO_REPLY_V4;
        let parsed = parse_echo_reply(&reply, false).unwrap();
        assert_eq!(parsed.ident, 1);
        assert_eq!(parsed.seq, 1);

        // Family mismatch
        assert_eq!(parse_echo_reply(&reply, true), None);
    }

    #[test]
    fn test_parse_rejects_short_message() {
        assert_eq!(parse_echo_reply(&[ECHO_REPLY_V4, 0, 0, 0], false), None);
    }

    #[test]
    fn test_strip_ipv4_header() {
        // Minimal header (IHL = 5) followed by a one-byte ICMP stub
        let mut packet = vec![0u8; 21];
        packet[0] = 0x45;
        packet[20] = ECHO_REPLY_V4;
        let icmp = strip_ipv4_header(&packet).unwrap();
        assert_eq!(icmp, &[ECHO_REPLY_V4]);

        // IHL = 6 (one option word)
        let mut with_options = vec![0u8; 25];
        with_options[0] = 0x46;
        with_options[24] = ECHO_REPLY_V4;
        assert_eq!(strip_ipv4_header(&with_options).unwrap(), &[ECHO_REPLY_V4]);

        // Not IPv4
        assert_eq!(strip_ipv4_header(&[0x60, 0, 0]), None);
        assert_eq!(strip_ipv4_header(&[]), None);
    }
}
