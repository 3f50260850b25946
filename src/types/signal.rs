use serde::{Deserialize, Serialize};

use crate::codec;
use crate::types::bus::MessageKey;
use crate::types::errors::GraphError;

/// Definition of a signal within a CAN message.
///
/// Describes position/bit-length, byte order, value type, scaling
/// (factor/offset), valid range, unit of measure and receiver nodes, plus
/// the last decoded raw/physical value pair.
#[derive(Default, Clone, PartialEq, Debug)]
pub struct CanSignal {
    /// Parent message key. `None` until the signal is attached to a message.
    pub message: Option<MessageKey>,
    /// Signal name.
    pub name: String,
    /// Bit start in the payload (DBC numbering, bit 0 = LSB of the first byte).
    pub start_bit: u16,
    /// Bit length (1..=64).
    pub bit_length: u16,
    /// Byte order.
    pub byte_order: ByteOrder,
    /// Value interpretation.
    pub value_type: ValueType,
    /// Scaling factor.
    pub factor: f32,
    /// Scaling offset.
    pub offset: f32,
    /// Minimum physical value.
    pub min: f32,
    /// Maximum physical value.
    pub max: f32,
    /// Unit of measure.
    pub unit: String,
    /// Receiver nodes, verbatim from the DBC (comma-separated when several).
    pub receiver: String,
    /// Multiplexer tag (`"M"` or `"m<N>"`). Metadata only, never evaluated.
    pub multiplexer: Option<String>,
    /// Associated comment (DBC `CM_ SG_` section).
    pub comment: String,
    /// Last decoded/assigned raw bit pattern.
    pub raw_value: u64,
    /// Last decoded/assigned physical value.
    pub physical_value: f64,
}

impl CanSignal {
    /// Decodes this signal from `payload` (the parent message's bytes).
    ///
    /// Returns `Ok(true)` when the raw value changed. `Signed` fields are
    /// sign-extended from bit `bit_length - 1`; IEEE fields reinterpret the
    /// extracted bits and bypass factor/offset.
    pub fn decode(&mut self, payload: &[u8]) -> Result<bool, GraphError> {
        if self.message.is_none() {
            return Err(GraphError::NotAttached {
                name: self.name.clone(),
            });
        }

        let mut raw = codec::extract(payload, self.start_bit, self.bit_length, self.byte_order)?;
        if self.value_type == ValueType::Signed && self.bit_length < 64 {
            let sign_bit = 1u64 << (self.bit_length - 1);
            if raw & sign_bit != 0 {
                raw |= !codec::field_mask(self.bit_length);
            }
        }

        Ok(self.apply_raw(raw))
    }

    /// Encodes the current raw value into a zero-filled buffer of
    /// `byte_length` bytes (the parent message's length).
    pub fn encode(&self, byte_length: usize) -> Result<Vec<u8>, GraphError> {
        if self.message.is_none() {
            return Err(GraphError::NotAttached {
                name: self.name.clone(),
            });
        }
        let mut buf: Vec<u8> = vec![0u8; byte_length];
        codec::pack_into(
            &mut buf,
            self.raw_value,
            self.start_bit,
            self.bit_length,
            self.byte_order,
        )?;
        Ok(buf)
    }

    /// Stores `raw` and recomputes the physical value. Returns whether the
    /// raw value changed.
    pub(crate) fn apply_raw(&mut self, raw: u64) -> bool {
        let changed = raw != self.raw_value;
        self.raw_value = raw;
        self.physical_value = self.physical_from_raw(raw);
        changed
    }

    /// Physical value corresponding to `raw` under this signal's value type.
    pub fn physical_from_raw(&self, raw: u64) -> f64 {
        match self.value_type {
            ValueType::Unsigned => raw as f64 * self.factor as f64 + self.offset as f64,
            ValueType::Signed => (raw as i64) as f64 * self.factor as f64 + self.offset as f64,
            ValueType::IeeeFloat => f32::from_bits(raw as u32) as f64,
            ValueType::IeeeDouble => f64::from_bits(raw),
        }
    }

    /// Raw bit pattern corresponding to `physical`.
    ///
    /// Integer types round `(physical - offset) / factor`; negative results
    /// wrap two's-complement and are masked to the field width on encode.
    /// IEEE types store the IEEE bit pattern directly.
    pub fn raw_from_physical(&self, physical: f64) -> u64 {
        match self.value_type {
            ValueType::IeeeFloat => (physical as f32).to_bits() as u64,
            ValueType::IeeeDouble => physical.to_bits(),
            ValueType::Unsigned | ValueType::Signed => {
                let scaled = (physical - self.offset as f64) / self.factor as f64;
                scaled.round() as i64 as u64
            }
        }
    }
}

/// DBC byte order: `@0` Motorola (big-endian), `@1` Intel (little-endian).
#[derive(Default, Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum ByteOrder {
    #[default]
    Motorola, // 0
    Intel, // 1
}

/// Signal value interpretation. Integer signedness comes from the SG_ line
/// (`+`/`-`); IEEE encodings are assigned afterwards by `SIG_VALTYPE_`.
#[derive(Default, Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum ValueType {
    #[default]
    Unsigned, // +
    Signed,     // -
    IeeeFloat,  // SIG_VALTYPE_ = 1
    IeeeDouble, // SIG_VALTYPE_ = 2
}
