use dcnode_encoding::{self as enc, Deserialize as _, Serialize as _};

/// Largest value of a `uint48` counter
pub const COUNTER_MAX: u64 = (1 << 48) - 1;

/// Maximum number of CAN interfaces a node reports
pub const MAX_IFACES: usize = 3;

/// `uavcan.protocol.GetTransportStats` request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GetTransportStatsRequest;

impl enc::DataType for GetTransportStatsRequest {
    const ID: u16 = 4;
    const SIGNATURE: u64 = 0xbe6f_76a7_ec31_2b04;
}
impl enc::Request for GetTransportStatsRequest {}
impl enc::Serialize for GetTransportStatsRequest {
    fn size_bits(&self) -> usize {
        0
    }
    fn serialize(&self, _cursor: &mut enc::WriteCursor<'_>) {}
}
impl enc::Deserialize for GetTransportStatsRequest {
    fn deserialize(_cursor: &mut enc::ReadCursor<'_>) -> Result<Self, enc::DeserializeError> {
        Ok(GetTransportStatsRequest)
    }
}

/// `uavcan.protocol.CANIfaceStats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CanIfaceStats {
    pub frames_tx: u64,
    pub frames_rx: u64,
    pub errors: u64,
}

impl CanIfaceStats {
    const SIZE_BITS: usize = 3 * 48;
}

impl enc::Serialize for CanIfaceStats {
    fn size_bits(&self) -> usize {
        Self::SIZE_BITS
    }
    fn serialize(&self, cursor: &mut enc::WriteCursor<'_>) {
        write_counter(cursor, self.frames_tx);
        write_counter(cursor, self.frames_rx);
        write_counter(cursor, self.errors);
    }
}
impl enc::Deserialize for CanIfaceStats {
    fn deserialize(cursor: &mut enc::ReadCursor<'_>) -> Result<Self, enc::DeserializeError> {
        Ok(CanIfaceStats {
            frames_tx: cursor.read_u48(),
            frames_rx: cursor.read_u48(),
            errors: cursor.read_u48(),
        })
    }
}

/// `uavcan.protocol.GetTransportStats` response
///
/// Fixed size 72 bytes. Counters wider than 48 bits saturate on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransportStats {
    pub transfers_tx: u64,
    pub transfers_rx: u64,
    pub transfer_errors: u64,
    pub can_iface_stats: [CanIfaceStats; MAX_IFACES],
}

impl enc::DataType for TransportStats {
    const ID: u16 = 4;
    const SIGNATURE: u64 = 0xbe6f_76a7_ec31_2b04;
}
impl enc::Response for TransportStats {}
impl enc::BufferType for TransportStats {
    type Buffer = enc::StaticBuffer<{ TransportStats::SIZE }>;
}
impl TransportStats {
    pub const SIZE: usize = 72;
}
impl enc::Serialize for TransportStats {
    fn size_bits(&self) -> usize {
        Self::SIZE * 8
    }
    fn serialize(&self, cursor: &mut enc::WriteCursor<'_>) {
        write_counter(cursor, self.transfers_tx);
        write_counter(cursor, self.transfers_rx);
        write_counter(cursor, self.transfer_errors);
        // CANIfaceStats[<=3] is the tail array: no length prefix
        for iface in &self.can_iface_stats {
            iface.serialize(cursor);
        }
    }
}
impl enc::Deserialize for TransportStats {
    fn deserialize(cursor: &mut enc::ReadCursor<'_>) -> Result<Self, enc::DeserializeError> {
        let transfers_tx = cursor.read_u48();
        let transfers_rx = cursor.read_u48();
        let transfer_errors = cursor.read_u48();
        let mut can_iface_stats = [CanIfaceStats::default(); MAX_IFACES];
        // Tail array length follows from the payload size
        for iface in &mut can_iface_stats {
            if cursor.remaining_bits() < CanIfaceStats::SIZE_BITS {
                break;
            }
            *iface = CanIfaceStats::deserialize(cursor)?;
        }
        Ok(TransportStats {
            transfers_tx,
            transfers_rx,
            transfer_errors,
            can_iface_stats,
        })
    }
}

fn write_counter(cursor: &mut enc::WriteCursor<'_>, value: u64) {
    cursor.write_u48(value.min(COUNTER_MAX));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let stats = TransportStats {
            transfers_tx: 1,
            transfers_rx: 2,
            transfer_errors: 3,
            can_iface_stats: [
                CanIfaceStats {
                    frames_tx: 4,
                    frames_rx: 5,
                    errors: 6,
                },
                CanIfaceStats::default(),
                CanIfaceStats {
                    frames_tx: 0,
                    frames_rx: 0,
                    errors: 7,
                },
            ],
        };
        let mut buffer = [0u8; TransportStats::SIZE];
        assert_eq!(enc::serialize_into(&stats, &mut buffer), Ok(TransportStats::SIZE));
        assert_eq!(buffer[..6], [1, 0, 0, 0, 0, 0]);
        assert_eq!(buffer[18..24], [4, 0, 0, 0, 0, 0]);
        assert_eq!(buffer[66..72], [7, 0, 0, 0, 0, 0]);

        let decoded: TransportStats = enc::deserialize_from(&buffer).unwrap();
        assert_eq!(decoded, stats);
    }

    #[test]
    fn test_counters_saturate() {
        let stats = TransportStats {
            transfers_tx: u64::MAX,
            ..Default::default()
        };
        let mut buffer = [0u8; TransportStats::SIZE];
        enc::serialize_into(&stats, &mut buffer).unwrap();
        assert_eq!(buffer[..6], [0xff; 6]);
        assert_eq!(buffer[6], 0);

        let decoded: TransportStats = enc::deserialize_from(&buffer).unwrap();
        assert_eq!(decoded.transfers_tx, COUNTER_MAX);
    }

    #[test]
    fn test_short_iface_array() {
        // one interface reported
        let mut buffer = [0u8; 36];
        buffer[0] = 9;
        buffer[18] = 4;
        let decoded: TransportStats = enc::deserialize_from(&buffer).unwrap();
        assert_eq!(decoded.transfers_tx, 9);
        assert_eq!(decoded.can_iface_stats[0].frames_tx, 4);
        assert_eq!(decoded.can_iface_stats[1..], [CanIfaceStats::default(); 2]);
    }
}
