//! Variable Directory Parsing
//!
//! The writer publishes `numVars` variable headers starting at
//! `varHeaderOffset`. Each one follows the C structure of the simulator SDK:
//! ```c
//! typedef struct irsdk_varHeader
//! {
//!     int type;                           // irsdk_VarType enum value
//!     int offset;                         // offset in bytes from row start
//!     int count;                          // number of elements (1 for scalar)
//!     bool countAsTime;
//!     char pad[3];                        // 16-byte alignment
//!     char name[IRSDK_MAX_STRING];        // 32 bytes
//!     char desc[IRSDK_MAX_DESC];          // 64 bytes
//!     char unit[IRSDK_MAX_STRING];        // 32 bytes
//! } irsdk_varHeader;
//! ```
//!
//! Headers are decoded field by field from a bounds-checked byte slice, so a
//! truncated or garbled array produces errors and skipped entries rather than
//! out-of-range reads.
//!
//! # Directory lifetime
//!
//! Offsets are only stable for one simulator session. A [`SnapshotDirectory`]
//! remembers the connection generation it was loaded from and
//! [`SnapshotDirectory::is_current`] reports whether a reconnect happened since.

use tracing::{debug, info, warn};

use super::header::Header;
use crate::connection::{Platform, SharedView, TelemetryConnection};
use crate::{Result, TelemetryError, VariableDescriptor, VariableType};

/// Size constants matching the simulator SDK
const IRSDK_MAX_STRING: usize = 32;
const IRSDK_MAX_DESC: usize = 64;

/// Size of one encoded variable header
pub const VAR_HEADER_SIZE: usize = 144;

mod field {
    pub const TYPE: usize = 0;
    pub const OFFSET: usize = 4;
    pub const COUNT: usize = 8;
    pub const COUNT_AS_TIME: usize = 12;
    pub const NAME: usize = 16;
    pub const DESC: usize = 48;
    pub const UNIT: usize = 112;
}

fn le_i32(bytes: &[u8], at: usize) -> i32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[at..at + 4]);
    i32::from_le_bytes(word)
}

/// Convert C string bytes to a Rust `String`
fn c_string_to_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Decode one 144-byte variable header.
///
/// Returns `Ok(None)` for entries that are well-formed but unusable (empty
/// name, unknown scalar kind, zero count).
pub fn parse_descriptor(raw: &[u8], index: usize) -> Result<Option<VariableDescriptor>> {
    if raw.len() < VAR_HEADER_SIZE {
        return Err(TelemetryError::memory_access_error(raw.len()));
    }

    let wire_kind = le_i32(raw, field::TYPE);
    let offset = le_i32(raw, field::OFFSET);
    let count = le_i32(raw, field::COUNT);
    let name = c_string_to_string(&raw[field::NAME..field::NAME + IRSDK_MAX_STRING]);

    if name.is_empty() {
        debug!(index, "Skipping variable header with empty name");
        return Ok(None);
    }

    if offset < 0 || count < 0 {
        return Err(TelemetryError::parse_error(
            "Variable header validation",
            format!("'{}' has offset {} and count {}", name, offset, count),
        ));
    }

    let Some(kind) = VariableType::from_wire(wire_kind) else {
        warn!(index, %name, wire_kind, "Unknown variable type, skipping");
        return Ok(None);
    };

    if count == 0 {
        debug!(index, %name, "Skipping variable with zero elements");
        return Ok(None);
    }

    Ok(Some(VariableDescriptor {
        name,
        kind,
        offset: offset as usize,
        count: count as usize,
        count_as_time: raw[field::COUNT_AS_TIME] != 0,
        description: c_string_to_string(&raw[field::DESC..field::DESC + IRSDK_MAX_DESC]),
        unit: c_string_to_string(&raw[field::UNIT..field::UNIT + IRSDK_MAX_STRING]),
    }))
}

/// Encode a descriptor in its shared memory layout.
///
/// Strings longer than their field are cut so a terminating NUL always fits.
pub fn encode_descriptor(var: &VariableDescriptor) -> [u8; VAR_HEADER_SIZE] {
    let mut out = [0u8; VAR_HEADER_SIZE];
    out[field::TYPE..field::TYPE + 4].copy_from_slice(&var.kind.wire_value().to_le_bytes());
    out[field::OFFSET..field::OFFSET + 4].copy_from_slice(&(var.offset as i32).to_le_bytes());
    out[field::COUNT..field::COUNT + 4].copy_from_slice(&(var.count as i32).to_le_bytes());
    out[field::COUNT_AS_TIME] = u8::from(var.count_as_time);

    let mut put = |at: usize, cap: usize, text: &str| {
        let len = text.len().min(cap - 1);
        out[at..at + len].copy_from_slice(&text.as_bytes()[..len]);
    };
    put(field::NAME, IRSDK_MAX_STRING, &var.name);
    put(field::DESC, IRSDK_MAX_DESC, &var.description);
    put(field::UNIT, IRSDK_MAX_STRING, &var.unit);
    out
}

/// Variable directory of one connection.
#[derive(Debug, Clone, Default)]
pub struct SnapshotDirectory {
    descriptors: Vec<VariableDescriptor>,
    row_len: usize,
    tick_rate: i32,
    generation: u64,
}

impl SnapshotDirectory {
    /// Read the variable array of a connected session.
    ///
    /// Must be re-run after every `connect()` that maps a new view.
    pub fn load<P: Platform>(conn: &TelemetryConnection<P>) -> Result<Self> {
        let view = conn
            .view()
            .ok_or_else(|| TelemetryError::connection_failed("Shared memory is not mapped"))?;
        let header = Header::read(view)?;
        header.validate()?;
        Self::from_view(view, &header, conn.generation())
    }

    /// Parse the directory described by `header` out of `view`.
    pub fn from_view<V: SharedView + ?Sized>(view: &V, header: &Header, generation: u64) -> Result<Self> {
        let num_vars = usize::try_from(header.num_vars).unwrap_or(0);
        let start = usize::try_from(header.var_header_offset)
            .map_err(|_| TelemetryError::memory_access_error(0))?;
        let total = num_vars
            .checked_mul(VAR_HEADER_SIZE)
            .ok_or_else(|| TelemetryError::memory_access_error(start))?;
        let raw = view
            .bytes(start, total)
            .ok_or_else(|| TelemetryError::memory_access_error(start.saturating_add(total)))?;

        let row_len = header.row_len();
        let mut descriptors = Vec::with_capacity(num_vars);
        let mut skipped = 0usize;

        for (index, chunk) in raw.chunks_exact(VAR_HEADER_SIZE).enumerate() {
            match parse_descriptor(chunk, index) {
                Ok(Some(var)) => {
                    if var.check_fits(row_len).is_err() {
                        warn!(name = %var.name, offset = var.offset, row_len, "Variable exceeds row, skipping");
                        skipped += 1;
                        continue;
                    }
                    if descriptors.iter().any(|d: &VariableDescriptor| d.name == var.name) {
                        warn!(name = %var.name, "Duplicate variable name found");
                    }
                    descriptors.push(var);
                }
                Ok(None) => skipped += 1,
                Err(e) => {
                    warn!(error = %e, index, "Failed to parse variable header, skipping");
                    skipped += 1;
                }
            }
        }

        info!(
            variables = descriptors.len(),
            skipped,
            row_len,
            generation,
            "Loaded variable directory"
        );

        Ok(Self { descriptors, row_len, tick_rate: header.tick_rate, generation })
    }

    /// Exact-match lookup by variable name.
    pub fn find_by_name(&self, name: &str) -> Option<&VariableDescriptor> {
        self.index_of(name).map(|index| &self.descriptors[index])
    }

    /// Like [`find_by_name`](Self::find_by_name) but reports a miss as an error.
    pub fn require(&self, name: &str) -> Result<&VariableDescriptor> {
        self.find_by_name(name)
            .ok_or_else(|| TelemetryError::FieldNotFound { field: name.to_string() })
    }

    /// Position of `name` in the directory.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        if name.is_empty() {
            return None;
        }
        self.descriptors.iter().position(|var| var.name == name)
    }

    pub fn get(&self, index: usize) -> Option<&VariableDescriptor> {
        self.descriptors.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VariableDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Row length the directory was laid out against.
    pub fn row_len(&self) -> usize {
        self.row_len
    }

    /// Writer ticks per second.
    pub fn tick_rate(&self) -> i32 {
        self.tick_rate
    }

    /// Connection generation this directory was read from.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether offsets are still valid for `conn`.
    pub fn is_current<P: Platform>(&self, conn: &TelemetryConnection<P>) -> bool {
        conn.view().is_some() && conn.generation() == self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn descriptor(name: &str, kind: VariableType, offset: usize, count: usize) -> VariableDescriptor {
        VariableDescriptor {
            name: name.to_string(),
            kind,
            offset,
            count,
            count_as_time: false,
            description: format!("{} description", name),
            unit: "m/s".to_string(),
        }
    }

    #[test]
    fn c_string_conversion_works() {
        assert_eq!(c_string_to_string(b"RPM\0\0\0\0"), "RPM");
        assert_eq!(c_string_to_string(b"Speed"), "Speed");
        assert_eq!(c_string_to_string(b"\0\0\0\0"), "");
    }

    #[test]
    fn descriptor_fields_decode_from_layout() {
        let mut var = descriptor("CarIdxLapDistPct", VariableType::Float32, 128, 64);
        var.count_as_time = true;
        let raw = encode_descriptor(&var);

        assert_eq!(le_i32(&raw, 0), 4);
        assert_eq!(le_i32(&raw, 4), 128);
        assert_eq!(le_i32(&raw, 8), 64);
        assert_eq!(raw[12], 1);
        assert_eq!(&raw[16..32], b"CarIdxLapDistPct");

        assert_eq!(parse_descriptor(&raw, 0).unwrap(), Some(var));
    }

    #[test]
    fn unusable_entries_are_skipped() {
        let mut raw = encode_descriptor(&descriptor("Speed", VariableType::Float32, 0, 1));
        raw[0..4].copy_from_slice(&99i32.to_le_bytes());
        assert_eq!(parse_descriptor(&raw, 0).unwrap(), None);

        let raw = encode_descriptor(&descriptor("", VariableType::Float32, 0, 1));
        assert_eq!(parse_descriptor(&raw, 0).unwrap(), None);

        let raw = encode_descriptor(&descriptor("Speed", VariableType::Float32, 0, 0));
        assert_eq!(parse_descriptor(&raw, 0).unwrap(), None);
    }

    #[test]
    fn negative_offset_is_parse_error() {
        let mut raw = encode_descriptor(&descriptor("Speed", VariableType::Float32, 0, 1));
        raw[4..8].copy_from_slice(&(-8i32).to_le_bytes());
        assert!(matches!(parse_descriptor(&raw, 0), Err(TelemetryError::Parse { .. })));
    }

    #[test]
    fn insufficient_memory_returns_error() {
        assert!(parse_descriptor(&[0u8; 100], 0).is_err());
    }

    #[test]
    fn long_names_keep_terminator() {
        let name = "X".repeat(40);
        let raw = encode_descriptor(&descriptor(&name, VariableType::Int32, 0, 1));
        let parsed = parse_descriptor(&raw, 0).unwrap().unwrap();
        assert_eq!(parsed.name.len(), IRSDK_MAX_STRING - 1);
    }

    proptest! {
        #[test]
        fn arbitrary_headers_never_panic(raw in prop::collection::vec(any::<u8>(), VAR_HEADER_SIZE)) {
            let _ = parse_descriptor(&raw, 0);
        }

        #[test]
        fn valid_headers_decode(
            name in "[a-zA-Z][a-zA-Z0-9_]{0,30}",
            kind in 0..6i32,
            offset in 0..100_000usize,
            count in 1..64usize,
        ) {
            let kind = VariableType::from_wire(kind).unwrap();
            let var = descriptor(&name, kind, offset, count);
            let parsed = parse_descriptor(&encode_descriptor(&var), 0).unwrap().unwrap();
            prop_assert_eq!(parsed.name, name);
            prop_assert_eq!(parsed.kind, kind);
            prop_assert_eq!(parsed.offset, offset);
            prop_assert_eq!(parsed.count, count);
        }
    }
}
