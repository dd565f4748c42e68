use crate::prelude::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// One named quality condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFlag {
    pub mask: u64,
    pub label: String,
}

/// Bit to label table used to decode `quality_flags` words.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusTable {
    pub flags: Vec<StatusFlag>,
}

impl Default for StatusTable {
    fn default() -> Self {
        let flags = [
            (2, "SP on land"),
            (4, "SP near land"),
            (8, "DDM max out of range"),
            (16, "Failed data"),
            (32, "Instrument temperature error"),
            (64, "Low signal (<3x noise std)"),
            (128, "Spike anomaly"),
            (256, "LEO telemetry error"),
            (512, "LEO telemetry error"),
            (1024, "Affected DDM"),
        ]
        .into_iter()
        .map(|(mask, label)| StatusFlag {
            mask,
            label: label.to_string(),
        })
        .collect();
        Self { flags }
    }
}

/// Decoded status labels, unique and in ascending bit order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusSet(Vec<String>);

impl StatusSet {
    pub fn contains(&self, label: &str) -> bool {
        self.0.iter().any(|l| l == label)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Caption text for a rendered DDM.
    pub fn display_text(&self) -> String {
        if self.0.is_empty() {
            "No flags".to_string()
        } else {
            self.0.join(" | ")
        }
    }

    fn insert(&mut self, label: &str) {
        if !self.contains(label) {
            self.0.push(label.to_string());
        }
    }
}

/// Maps a status bitmask onto the active conditions of a [`StatusTable`].
#[derive(Debug, Clone, Default)]
pub struct StatusDecoder {
    table: StatusTable,
}

impl StatusDecoder {
    pub fn new(mut table: StatusTable) -> Self {
        table.flags.sort_by_key(|flag| flag.mask);
        Self { table }
    }

    pub fn table(&self) -> &StatusTable {
        &self.table
    }

    /// Bits without a table entry are ignored.
    pub fn decode(&self, word: i64) -> CoreResult<StatusSet> {
        if word < 0 {
            return Err(CoreError::InvalidArgument(format!(
                "status word must be non-negative, got {}",
                word
            )));
        }
        let word = word as u64;
        let mut active = StatusSet::default();
        for flag in &self.table.flags {
            if flag.mask != 0 && word & flag.mask == flag.mask {
                active.insert(&flag.label);
            }
        }
        Ok(active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_word_has_no_conditions() {
        let decoder = StatusDecoder::default();
        let set = decoder.decode(0).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.display_text(), "No flags");
    }

    #[test]
    fn land_and_low_signal_bits_decode() {
        let decoder = StatusDecoder::default();
        let set = decoder.decode(2 | 64).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains("SP on land"));
        assert!(set.contains("Low signal (<3x noise std)"));
        assert_eq!(set.display_text(), "SP on land | Low signal (<3x noise std)");
    }

    #[test]
    fn each_table_bit_decodes_on_its_own() {
        let decoder = StatusDecoder::default();
        for flag in &StatusTable::default().flags {
            let set = decoder.decode(flag.mask as i64).unwrap();
            assert_eq!(set.iter().collect::<Vec<_>>(), vec![flag.label.as_str()]);
        }
    }

    #[test]
    fn unknown_bits_are_ignored() {
        let decoder = StatusDecoder::default();
        assert!(decoder.decode(1).unwrap().is_empty());
        assert!(decoder.decode(2048 | 1 << 40).unwrap().is_empty());
        let set = decoder.decode(1 | 16 | 4096).unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["Failed data"]);
    }

    #[test]
    fn shared_labels_appear_once() {
        let decoder = StatusDecoder::default();
        let set = decoder.decode(256 | 512).unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["LEO telemetry error"]);
    }

    #[test]
    fn masked_word_decodes_to_subset() {
        let decoder = StatusDecoder::default();
        let x = 2 | 8 | 128 | 1024;
        let full = decoder.decode(x).unwrap();
        for y in [0, 2, 8 | 1024, 0x7ff] {
            let sub = decoder.decode(x & y).unwrap();
            assert!(sub.iter().all(|label| full.contains(label)));
        }
    }

    #[test]
    fn negative_word_is_rejected() {
        let decoder = StatusDecoder::default();
        assert!(matches!(
            decoder.decode(-1),
            Err(CoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn custom_table_is_sorted_by_bit() {
        let decoder = StatusDecoder::new(StatusTable {
            flags: vec![
                StatusFlag {
                    mask: 8,
                    label: "b".into(),
                },
                StatusFlag {
                    mask: 1,
                    label: "a".into(),
                },
            ],
        });
        let set = decoder.decode(9).unwrap();
        assert_eq!(set.display_text(), "a | b");
    }
}
