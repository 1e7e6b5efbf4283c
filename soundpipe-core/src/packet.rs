//! Encoded packet representation and wire framing.

/// An encoded audio packet produced by a codec backend.
#[derive(Debug, Clone)]
pub struct Packet {
    /// Packet payload.
    pub data: Vec<u8>,
    /// Granule position: total frames encoded up to and including this packet.
    pub granule_position: u64,
    /// Is this a header packet?
    pub is_header: bool,
    /// Packet duration in frames (zero for headers).
    pub duration: u32,
}

impl Packet {
    /// Create a header packet.
    pub fn header(data: Vec<u8>) -> Self {
        Self {
            data,
            granule_position: 0,
            is_header: true,
            duration: 0,
        }
    }

    /// Create an audio packet.
    pub fn audio(data: Vec<u8>, granule_position: u64, duration: u32) -> Self {
        Self {
            data,
            granule_position,
            is_header: false,
            duration,
        }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Serialize for the decoder byte stream: u32-LE payload length prefix
    /// followed by the payload.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.data.len());
        out.extend_from_slice(&(self.data.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.data);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_kinds() {
        let h = Packet::header(vec![1, 2, 3]);
        assert!(h.is_header);
        assert_eq!(h.duration, 0);

        let a = Packet::audio(vec![0; 8], 1024, 256);
        assert!(!a.is_header);
        assert_eq!(a.granule_position, 1024);
        assert_eq!(a.len(), 8);
    }

    #[test]
    fn test_wire_framing() {
        let p = Packet::audio(vec![0xAA, 0xBB], 2, 2);
        let wire = p.to_wire();
        assert_eq!(wire.len(), 6);
        assert_eq!(&wire[..4], &2u32.to_le_bytes());
        assert_eq!(&wire[4..], &[0xAA, 0xBB]);
    }
}
