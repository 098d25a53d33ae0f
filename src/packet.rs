//! The unit of data carried across ports.
//!
//! Crossbar does not define a wire format; a [`Packet`] is an opaque byte
//! payload plus length accessors, enough for elements to hand data to one
//! another. Cloning is cheap: the body is reference-counted.

use bytes::Bytes;

/// A packet traveling through the element graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packet {
    data: Bytes,
}

impl Packet {
    /// Create a packet from a byte payload.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Create a packet from a static byte slice without copying.
    pub fn from_static(data: &'static [u8]) -> Self {
        Self {
            data: Bytes::from_static(data),
        }
    }

    /// The packet body.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Length of the packet body in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the packet body is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Consume the packet, returning its body.
    pub fn into_data(self) -> Bytes {
        self.data
    }
}

impl From<Bytes> for Packet {
    fn from(data: Bytes) -> Self {
        Self { data }
    }
}

impl From<Vec<u8>> for Packet {
    fn from(data: Vec<u8>) -> Self {
        Self { data: data.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_roundtrip() {
        let p = Packet::new(vec![1u8, 2, 3]);
        assert_eq!(p.len(), 3);
        assert!(!p.is_empty());
        assert_eq!(p.data(), &[1, 2, 3]);
    }

    #[test]
    fn test_packet_clone_is_shallow() {
        let p = Packet::from_static(b"abc");
        let q = p.clone();
        assert_eq!(p, q);
    }
}
