use serde::{Deserialize, Serialize};

/// Network-stack timing for one request.
///
/// `request_time` is the issue time in seconds. Every other field is a
/// millisecond offset from it, `-1` meaning the phase did not happen.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ProtocolTiming {
    pub request_time: f64,
    pub proxy_start: f64,
    pub proxy_end: f64,
    pub dns_start: f64,
    pub dns_end: f64,
    pub connect_start: f64,
    pub connect_end: f64,
    pub ssl_start: f64,
    pub ssl_end: f64,
    pub send_start: f64,
    pub send_end: f64,
    pub receive_headers_end: f64,
}

impl Default for ProtocolTiming {
    fn default() -> Self {
        Self {
            request_time: 0.0,
            proxy_start: -1.0,
            proxy_end: -1.0,
            dns_start: -1.0,
            dns_end: -1.0,
            connect_start: -1.0,
            connect_end: -1.0,
            ssl_start: -1.0,
            ssl_end: -1.0,
            send_start: -1.0,
            send_end: -1.0,
            receive_headers_end: -1.0,
        }
    }
}

#[test]
fn test_missing_fields_default_to_not_happened() {
    let timing: ProtocolTiming =
        serde_json::from_str(r#"{"requestTime": 12.5, "sendStart": 3, "sendEnd": 4}"#).unwrap();
    assert_eq!(12.5, timing.request_time);
    assert_eq!(3.0, timing.send_start);
    assert_eq!(-1.0, timing.dns_start);
    assert_eq!(-1.0, timing.receive_headers_end);
}
