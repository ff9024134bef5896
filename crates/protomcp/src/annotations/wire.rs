//! Tag walker over raw protobuf wire bytes.
//!
//! Every read returns `None` on malformed input and leaves the caller to stop.
//! Nothing here allocates or panics; a reader only ever shrinks its slice.

use prost::encoding::{decode_key, decode_varint, WireType};

/// A cursor over the remaining bytes of one message.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
}

/// One decoded field value, borrowed from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Value<'a> {
    Varint(u64),
    Fixed32(u32),
    Fixed64(u64),
    Bytes(&'a [u8]),
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Read one (field number, wire type) tag.
    pub(crate) fn read_tag(&mut self) -> Option<(u32, WireType)> {
        decode_key(&mut self.buf).ok()
    }

    /// Read the value that follows a tag of the given wire type.
    ///
    /// Groups are not supported and end the walk.
    pub(crate) fn read_value(&mut self, wire_type: WireType) -> Option<Value<'a>> {
        match wire_type {
            WireType::Varint => decode_varint(&mut self.buf).ok().map(Value::Varint),
            WireType::ThirtyTwoBit => {
                let bytes = self.take(4)?;
                let mut raw = [0u8; 4];
                raw.copy_from_slice(bytes);
                Some(Value::Fixed32(u32::from_le_bytes(raw)))
            }
            WireType::SixtyFourBit => {
                let bytes = self.take(8)?;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(bytes);
                Some(Value::Fixed64(u64::from_le_bytes(raw)))
            }
            WireType::LengthDelimited => {
                let len = decode_varint(&mut self.buf).ok()?;
                let len = usize::try_from(len).ok()?;
                self.take(len).map(Value::Bytes)
            }
            WireType::StartGroup | WireType::EndGroup => None,
        }
    }

    /// Read a bare varint with no preceding tag (packed repeated elements).
    pub(crate) fn read_varint(&mut self) -> Option<u64> {
        decode_varint(&mut self.buf).ok()
    }

    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        if len > self.buf.len() {
            return None;
        }
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Some(head)
    }
}
