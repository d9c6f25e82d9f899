use std::io::{self, Write};

use keyflake::KeyflakeId;
use serde::Serialize;

use crate::config::OutputFormat;

/// Decoded view of an ID, as printed by `--format json` and `inspect --json`.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct IdRecord {
    pub id: KeyflakeId,
    pub timestamp: u64,
    pub unix_millis: u64,
    pub machine_id: u64,
    pub sequence: u64,
}

impl From<KeyflakeId> for IdRecord {
    fn from(id: KeyflakeId) -> Self {
        Self {
            id,
            timestamp: id.timestamp(),
            unix_millis: id.unix_millis(),
            machine_id: id.machine_id(),
            sequence: id.sequence(),
        }
    }
}

/// Writes one line per ID in the requested format.
pub fn write_ids<W: Write>(out: &mut W, ids: &[KeyflakeId], format: OutputFormat) -> io::Result<()> {
    for &id in ids {
        match format {
            OutputFormat::Decimal => writeln!(out, "{id}")?,
            OutputFormat::Padded => writeln!(out, "{}", id.to_padded_string())?,
            OutputFormat::Json => write_json_line(out, &IdRecord::from(id))?,
        }
    }
    out.flush()
}

pub fn write_json_line<W: Write>(out: &mut W, record: &IdRecord) -> io::Result<()> {
    serde_json::to_writer(&mut *out, record)?;
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(ids: &[KeyflakeId], format: OutputFormat) -> String {
        let mut buf = Vec::new();
        write_ids(&mut buf, ids, format).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn decimal_and_padded() {
        let ids = [KeyflakeId::from_raw(65_536), KeyflakeId::from_raw(65_537)];
        assert_eq!(render(&ids, OutputFormat::Decimal), "65536\n65537\n");
        assert_eq!(
            render(&ids[..1], OutputFormat::Padded),
            "00000000000000065536\n"
        );
    }

    #[test]
    fn json_lines_carry_decoded_fields() {
        let id = KeyflakeId::from_components(3, 5, 7);
        let line = render(&[id], OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();

        assert_eq!(value["id"], id.to_raw());
        assert_eq!(value["timestamp"], 3);
        assert_eq!(value["unix_millis"], 946_684_800_003_u64);
        assert_eq!(value["machine_id"], 5);
        assert_eq!(value["sequence"], 7);
    }
}
