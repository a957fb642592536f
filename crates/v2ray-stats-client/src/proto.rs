//! Protobuf messages of the StatsService, written out by hand so the crate
//! builds without protoc. Field tags follow `app/stats/command/command.proto`.

use prost::Message;
use serde::{Deserialize, Serialize};

/// A counter as it travels on the wire. The name is kept as raw bytes so one
/// name that is not valid UTF-8 cannot fail the decoding of the whole
/// response.
#[derive(Clone, PartialEq, Message)]
pub struct WireStat {
    #[prost(bytes = "vec", tag = "1")]
    pub name: Vec<u8>,
    #[prost(int64, tag = "2")]
    pub value: i64,
}

/// A counter with its name decoded. Invalid UTF-8 is replaced with U+FFFD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    pub name: String,
    pub value: i64,
}

impl From<WireStat> for Stat {
    fn from(stat: WireStat) -> Self {
        let name = match String::from_utf8(stat.name) {
            Ok(name) => name,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        };
        Self {
            name,
            value: stat.value,
        }
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct QueryStatsRequest {
    /// Substring filter applied by the server; empty matches everything
    #[prost(string, tag = "1")]
    pub pattern: String,
    #[prost(bool, tag = "2")]
    pub reset: bool,
}

#[derive(Clone, PartialEq, Message)]
pub struct QueryStatsResponse {
    #[prost(message, repeated, tag = "1")]
    pub stat: Vec<WireStat>,
}

#[derive(Clone, PartialEq, Message)]
pub struct SysStatsRequest {}

/// Go runtime counters of the proxy process.
#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
pub struct SysStatsResponse {
    #[prost(uint32, tag = "1")]
    pub num_goroutine: u32,
    #[prost(uint32, tag = "2")]
    pub num_gc: u32,
    #[prost(uint64, tag = "3")]
    pub alloc: u64,
    #[prost(uint64, tag = "4")]
    pub total_alloc: u64,
    #[prost(uint64, tag = "5")]
    pub sys: u64,
    #[prost(uint64, tag = "6")]
    pub mallocs: u64,
    #[prost(uint64, tag = "7")]
    pub frees: u64,
    #[prost(uint64, tag = "8")]
    pub live_objects: u64,
    #[prost(uint64, tag = "9")]
    pub pause_total_ns: u64,
    /// Seconds since the proxy started
    #[prost(uint32, tag = "10")]
    pub uptime: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_request_wire_format() {
        let request = QueryStatsRequest {
            pattern: "user".to_string(),
            reset: true,
        };
        // field 1, length-delimited "user"; field 2, varint 1
        assert_eq!(
            request.encode_to_vec(),
            vec![0x0a, 0x04, b'u', b's', b'e', b'r', 0x10, 0x01]
        );
    }

    #[test]
    fn test_default_request_encodes_empty() {
        assert!(QueryStatsRequest::default().encode_to_vec().is_empty());
        assert!(SysStatsRequest::default().encode_to_vec().is_empty());
    }

    #[test]
    fn test_decode_query_response() {
        let response = QueryStatsResponse {
            stat: vec![
                WireStat {
                    name: b"inbound>>>mixed-in>>>traffic>>>uplink".to_vec(),
                    value: 1024,
                },
                WireStat {
                    name: b"user>>>bob>>>traffic>>>uplink".to_vec(),
                    value: -3,
                },
            ],
        };
        let bytes = response.encode_to_vec();
        let decoded = QueryStatsResponse::decode(bytes.as_slice()).unwrap();
        let stats: Vec<Stat> = decoded.stat.into_iter().map(Stat::from).collect();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].name, "inbound>>>mixed-in>>>traffic>>>uplink");
        assert_eq!(stats[0].value, 1024);
        assert_eq!(stats[1].value, -3);
    }

    #[test]
    fn test_invalid_utf8_name_does_not_fail_response() {
        // two field-1 stats; the first name starts with the invalid byte 0xff
        let bytes = [
            0x0a, 0x07, 0x0a, 0x03, 0xff, b'a', b'b', 0x10, 0x07, // bad name
            0x0a, 0x06, 0x0a, 0x02, b'o', b'k', 0x10, 0x05, // good name
        ];
        let decoded = QueryStatsResponse::decode(bytes.as_slice()).unwrap();
        let stats: Vec<Stat> = decoded.stat.into_iter().map(Stat::from).collect();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].name, "\u{FFFD}ab");
        assert_eq!(stats[0].value, 7);
        assert_eq!(stats[1].name, "ok");
        assert_eq!(stats[1].value, 5);
    }

    #[test]
    fn test_sys_stats_tags() {
        // field 10 (uptime) as varint: key = (10 << 3) | 0 = 0x50
        let decoded = SysStatsResponse::decode([0x50u8, 0x2a].as_slice()).unwrap();
        assert_eq!(decoded.uptime, 42);
        assert_eq!(decoded.num_goroutine, 0);
    }
}
