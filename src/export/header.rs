use crate::model::{MAX_STATE, MIN_STATE, ModelSnapshot};

/// Size of the fixed artifact header in bytes.
pub const HEADER_LEN: usize = 28;

const FIELD_COUNT: usize = HEADER_LEN / 4;

/// Fixed header of an export artifact: seven little-endian `i32` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactHeader {
    pub threshold: i32,
    pub n_literals: i32,
    pub n_clauses: i32,
    pub n_classes: i32,
    pub max_state: i32,
    pub min_state: i32,
    pub boost_flag: i32,
}

impl ArtifactHeader {
    /// Header for `snapshot`. State bounds are the format constants, never model values.
    pub fn for_snapshot(snapshot: &ModelSnapshot) -> Self {
        let params = snapshot.params();
        Self {
            threshold: params.threshold,
            n_literals: params.n_literals,
            n_clauses: params.n_clauses,
            n_classes: params.n_classes,
            max_state: i32::from(MAX_STATE),
            min_state: i32::from(MIN_STATE),
            boost_flag: i32::from(params.boost_true_positive),
        }
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let fields = self.fields();
        let mut out = [0u8; HEADER_LEN];
        for (chunk, value) in out.chunks_exact_mut(4).zip(fields) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        out
    }

    pub fn decode(bytes: &[u8; HEADER_LEN]) -> Self {
        let mut fields = [0i32; FIELD_COUNT];
        for (value, chunk) in fields.iter_mut().zip(bytes.chunks_exact(4)) {
            *value = i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        let [
            threshold,
            n_literals,
            n_clauses,
            n_classes,
            max_state,
            min_state,
            boost_flag,
        ] = fields;
        Self {
            threshold,
            n_literals,
            n_clauses,
            n_classes,
            max_state,
            min_state,
            boost_flag,
        }
    }

    /// Byte length of the weight payload described by this header, if the dimensions are
    /// non-negative.
    pub fn weight_payload_len(&self) -> Option<u64> {
        let n_clauses = u64::try_from(self.n_clauses).ok()?;
        let n_classes = u64::try_from(self.n_classes).ok()?;
        n_clauses.checked_mul(n_classes)?.checked_mul(2)
    }

    /// Byte length of the clause payload described by this header.
    pub fn clause_payload_len(&self) -> Option<u64> {
        let n_clauses = u64::try_from(self.n_clauses).ok()?;
        let n_literals = u64::try_from(self.n_literals).ok()?;
        n_clauses.checked_mul(n_literals)?.checked_mul(2)
    }

    /// Total artifact length (header plus both payloads).
    pub fn artifact_len(&self) -> Option<u64> {
        (HEADER_LEN as u64)
            .checked_add(self.weight_payload_len()?)?
            .checked_add(self.clause_payload_len()?)
    }

    fn fields(&self) -> [i32; FIELD_COUNT] {
        [
            self.threshold,
            self.n_literals,
            self.n_clauses,
            self.n_classes,
            self.max_state,
            self.min_state,
            self.boost_flag,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelParams;
    use ndarray::array;

    fn snapshot(threshold: i32, boost: bool) -> ModelSnapshot {
        ModelSnapshot::new(
            ModelParams {
                threshold,
                n_literals: 2,
                n_clauses: 1,
                n_classes: 1,
                boost_true_positive: boost,
            },
            array![[5]],
            array![[3, -4, 1, -2]],
        )
        .unwrap()
    }

    #[test]
    fn threshold_is_little_endian() {
        let bytes = ArtifactHeader::for_snapshot(&snapshot(1000, false)).encode();
        assert_eq!(&bytes[0..4], &[0xE8, 0x03, 0x00, 0x00]);
    }

    #[test]
    fn state_bounds_are_constant() {
        for (threshold, boost) in [(1, false), (-5, true), (i32::MAX, true)] {
            let bytes = ArtifactHeader::for_snapshot(&snapshot(threshold, boost)).encode();
            assert_eq!(i32::from_le_bytes(bytes[16..20].try_into().unwrap()), 127);
            assert_eq!(i32::from_le_bytes(bytes[20..24].try_into().unwrap()), -127);
        }
    }

    #[test]
    fn field_order_matches_layout() {
        let bytes = ArtifactHeader::for_snapshot(&snapshot(7, true)).encode();
        let words: Vec<i32> = bytes
            .chunks_exact(4)
            .map(|chunk| i32::from_le_bytes(chunk.try_into().unwrap()))
            .collect();
        assert_eq!(words, vec![7, 2, 1, 1, 127, -127, 1]);
    }

    #[test]
    fn decode_reads_back_fields() {
        let header = ArtifactHeader::for_snapshot(&snapshot(-42, true));
        assert_eq!(ArtifactHeader::decode(&header.encode()), header);
    }

    #[test]
    fn payload_lengths_follow_dimensions() {
        let header = ArtifactHeader {
            threshold: 1000,
            n_literals: 784,
            n_clauses: 1000,
            n_classes: 10,
            max_state: 127,
            min_state: -127,
            boost_flag: 1,
        };
        assert_eq!(header.weight_payload_len(), Some(20_000));
        assert_eq!(header.clause_payload_len(), Some(1_568_000));
        assert_eq!(header.artifact_len(), Some(28 + 20_000 + 1_568_000));
        let negative = ArtifactHeader {
            n_clauses: -1,
            ..header
        };
        assert_eq!(negative.artifact_len(), None);
    }
}
