use core::fmt;

use crate::time::REFERENCE_EPOCH;

/// A 64-bit identifier packing a timestamp, a machine ID and a sequence.
///
/// - 48 bits timestamp (ms since [`REFERENCE_EPOCH`], 2000-01-01 UTC)
/// - 4 bits machine ID
/// - 12 bits sequence
///
/// ```text
///  Bit Index:  63              16 15             12 11             0
///              +-----------------+-----------------+---------------+
///  Field:      | timestamp (48)  | machine ID (4)  | sequence (12) |
///              +-----------------+-----------------+---------------+
///              |<------ MSB ---------- 64 bits ---------- LSB ---->|
/// ```
///
/// Only the low 41 bits of the timestamp are needed for the ~69 years
/// following the epoch; the field is as wide as the space above bit 16.
///
/// IDs compare by their raw integer value, so ordering follows the timestamp
/// first and the sequence last.
///
/// # Example
///
/// ```
/// use keyflake::KeyflakeId;
///
/// let id = KeyflakeId::from_components(1000, 5, 2);
/// assert_eq!(id.timestamp(), 1000);
/// assert_eq!(id.machine_id(), 5);
/// assert_eq!(id.sequence(), 2);
/// assert_eq!(id.to_raw(), (1000 << 16) | (5 << 12) | 2);
/// ```
///
/// [`REFERENCE_EPOCH`]: crate::REFERENCE_EPOCH
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyflakeId {
    id: u64,
}

impl KeyflakeId {
    /// Bitmask for extracting the 48-bit timestamp field. Occupies bits 16
    /// through 63.
    pub const TIMESTAMP_MASK: u64 = (1 << 48) - 1;

    /// Bitmask for extracting the 4-bit machine ID field. Occupies bits 12
    /// through 15.
    pub const MACHINE_ID_MASK: u64 = (1 << 4) - 1;

    /// Bitmask for extracting the 12-bit sequence field. Occupies bits 0
    /// through 11.
    pub const SEQUENCE_MASK: u64 = (1 << 12) - 1;

    /// Number of bits to shift the timestamp to its correct position (bit 16).
    pub const TIMESTAMP_SHIFT: u64 = 16;

    /// Number of bits to shift the machine ID to its correct position (bit 12).
    pub const MACHINE_ID_SHIFT: u64 = 12;

    /// Number of bits to shift the sequence field (bit 0).
    pub const SEQUENCE_SHIFT: u64 = 0;

    /// Packs the three components, masking each to its field width.
    ///
    /// Prefer [`Self::from_components`], which also debug-asserts that no
    /// component is truncated.
    pub const fn from_masked(timestamp: u64, machine_id: u64, sequence: u64) -> Self {
        let timestamp = (timestamp & Self::TIMESTAMP_MASK) << Self::TIMESTAMP_SHIFT;
        let machine_id = (machine_id & Self::MACHINE_ID_MASK) << Self::MACHINE_ID_SHIFT;
        let sequence = (sequence & Self::SEQUENCE_MASK) << Self::SEQUENCE_SHIFT;
        Self {
            id: timestamp | machine_id | sequence,
        }
    }

    /// Constructs an ID from its components.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if any component exceeds its field.
    pub fn from_components(timestamp: u64, machine_id: u64, sequence: u64) -> Self {
        debug_assert!(timestamp <= Self::TIMESTAMP_MASK, "timestamp overflow");
        debug_assert!(machine_id <= Self::MACHINE_ID_MASK, "machine_id overflow");
        debug_assert!(sequence <= Self::SEQUENCE_MASK, "sequence overflow");
        Self::from_masked(timestamp, machine_id, sequence)
    }

    /// Extracts the timestamp (ms since the reference epoch) from the packed
    /// ID.
    pub const fn timestamp(&self) -> u64 {
        (self.id >> Self::TIMESTAMP_SHIFT) & Self::TIMESTAMP_MASK
    }

    /// Extracts the machine ID from the packed ID.
    pub const fn machine_id(&self) -> u64 {
        (self.id >> Self::MACHINE_ID_SHIFT) & Self::MACHINE_ID_MASK
    }

    /// Extracts the sequence number from the packed ID.
    pub const fn sequence(&self) -> u64 {
        (self.id >> Self::SEQUENCE_SHIFT) & Self::SEQUENCE_MASK
    }

    /// Returns the maximum possible value for the timestamp field.
    pub const fn max_timestamp() -> u64 {
        Self::TIMESTAMP_MASK
    }

    /// Returns the maximum possible value for the machine ID field.
    pub const fn max_machine_id() -> u64 {
        Self::MACHINE_ID_MASK
    }

    /// Returns the maximum possible value for the sequence field.
    pub const fn max_sequence() -> u64 {
        Self::SEQUENCE_MASK
    }

    /// Returns the raw packed value.
    pub const fn to_raw(&self) -> u64 {
        self.id
    }

    /// Wraps a raw packed value without validation. Every `u64` decodes to
    /// some combination of components.
    pub const fn from_raw(raw: u64) -> Self {
        Self { id: raw }
    }

    /// Returns the issue time in milliseconds since the Unix epoch, assuming
    /// the ID was produced by a clock anchored at [`REFERENCE_EPOCH`].
    ///
    /// [`REFERENCE_EPOCH`]: crate::REFERENCE_EPOCH
    pub const fn unix_millis(&self) -> u64 {
        self.timestamp() + REFERENCE_EPOCH.as_millis() as u64
    }

    /// Returns the ID as a zero-padded 20-digit string.
    pub fn to_padded_string(&self) -> String {
        format!("{:020}", self.id)
    }

    fn fields(&self) -> [FieldLayout; 3] {
        [
            FieldLayout {
                name: "timestamp",
                bits: 48,
                value: self.timestamp(),
            },
            FieldLayout {
                name: "machine_id",
                bits: 4,
                value: self.machine_id(),
            },
            FieldLayout {
                name: "sequence",
                bits: 12,
                value: self.sequence(),
            },
        ]
    }
}

impl From<KeyflakeId> for u64 {
    fn from(id: KeyflakeId) -> Self {
        id.to_raw()
    }
}

impl From<u64> for KeyflakeId {
    fn from(raw: u64) -> Self {
        Self::from_raw(raw)
    }
}

impl fmt::Display for KeyflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl fmt::Debug for KeyflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_bit_layout(f, self)
    }
}

struct FieldLayout {
    name: &'static str,
    bits: u8,
    value: u64,
}

fn center(s: &str, width: usize) -> String {
    let pad = width.saturating_sub(s.len());
    let left = pad / 2;
    format!("{}{}{}", " ".repeat(left), s, " ".repeat(pad - left))
}

fn write_border(f: &mut fmt::Formatter<'_>, columns: &[usize]) -> fmt::Result {
    write!(f, "        +")?;
    for &w in columns {
        write!(f, "{}+", "-".repeat(w))?;
    }
    writeln!(f)
}

fn write_row(f: &mut fmt::Formatter<'_>, cells: &[String], columns: &[usize]) -> fmt::Result {
    write!(f, "        |")?;
    for (cell, &w) in cells.iter().zip(columns) {
        write!(f, "{}|", center(cell, w))?;
    }
    writeln!(f)
}

fn write_bit_layout(f: &mut fmt::Formatter<'_>, id: &KeyflakeId) -> fmt::Result {
    let fields = id.fields();
    let labels: Vec<String> = fields
        .iter()
        .map(|field| format!("{} ({})", field.name, field.bits))
        .collect();
    let decimals: Vec<String> = fields.iter().map(|field| field.value.to_string()).collect();
    let hexes: Vec<String> = fields
        .iter()
        .map(|field| format!("0x{:x}", field.value))
        .collect();

    // +2 for padding
    let columns: Vec<usize> = (0..fields.len())
        .map(|i| labels[i].len().max(decimals[i].len()).max(hexes[i].len()) + 2)
        .collect();

    writeln!(f, "KeyflakeId {{")?;
    writeln!(f, "    raw id     : 0x{:016x} ({})", id.id, id.id)?;
    writeln!(f, "    padded     : {}", id.to_padded_string())?;
    writeln!(f, "    layout     :")?;
    write_border(f, &columns)?;
    write_row(f, &labels, &columns)?;
    write_border(f, &columns)?;
    write_row(f, &decimals, &columns)?;
    write_row(f, &hexes, &columns)?;
    write_border(f, &columns)?;
    write!(f, "}}")
}
