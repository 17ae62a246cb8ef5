use harkit_format::{HarTimings, ProtocolTiming};

/// Derive HAR phase durations from protocol timing offsets.
///
/// Event order is request start, [proxy], [dns], [connect [ssl]], send,
/// receive headers end. `blocked` is the time before the first network
/// activity. `total_duration` is the full request duration in milliseconds,
/// `-1` when unknown, which leaves `receive` at `0`.
pub fn build_timings(timing: Option<&ProtocolTiming>, total_duration: f64) -> HarTimings {
    let Some(timing) = timing else {
        return HarTimings::unknown();
    };

    let blocked = first_non_negative(&[timing.dns_start, timing.connect_start, timing.send_start])
        .unwrap_or(-1.0);

    let dns = if timing.dns_start >= 0.0 {
        first_non_negative(&[timing.connect_start, timing.send_start])
            .map(|next| next - timing.dns_start)
            .unwrap_or(-1.0)
    } else {
        -1.0
    };

    let connect = if timing.connect_start >= 0.0 {
        timing.send_start - timing.connect_start
    } else {
        -1.0
    };

    let ssl = if timing.ssl_start >= 0.0 && timing.ssl_end >= 0.0 {
        timing.ssl_end - timing.ssl_start
    } else {
        -1.0
    };

    HarTimings {
        blocked: Some(blocked),
        dns: Some(dns),
        connect: Some(connect),
        send: timing.send_end - timing.send_start,
        wait: timing.receive_headers_end - timing.send_end,
        receive: if total_duration == -1.0 {
            0.0
        } else {
            total_duration - timing.receive_headers_end
        },
        ssl: Some(ssl),
        comment: None,
        blocked_queueing: None,
        blocked_proxy: None,
    }
}

fn first_non_negative(values: &[f64]) -> Option<f64> {
    values.iter().copied().find(|value| *value >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use harkit_format::reconstruct_timing;

    #[test]
    fn test_dns_connect_send() {
        let timing = ProtocolTiming {
            dns_start: 5.0,
            connect_start: 10.0,
            send_start: 10.0,
            send_end: 12.0,
            receive_headers_end: 50.0,
            ..Default::default()
        };
        let timings = build_timings(Some(&timing), 100.0);

        assert_eq!(Some(5.0), timings.blocked);
        assert_eq!(Some(5.0), timings.dns);
        assert_eq!(Some(0.0), timings.connect);
        assert_eq!(2.0, timings.send);
        assert_eq!(38.0, timings.wait);
        assert_eq!(50.0, timings.receive);
        assert_eq!(Some(-1.0), timings.ssl);
    }

    #[test]
    fn test_unknown_timing() {
        assert_eq!(HarTimings::unknown(), build_timings(None, 300.0));
    }

    #[test]
    fn test_reused_connection_has_no_dns_or_connect() {
        let timing = ProtocolTiming {
            send_start: 3.0,
            send_end: 4.0,
            receive_headers_end: 20.0,
            ..Default::default()
        };
        let timings = build_timings(Some(&timing), 25.0);

        assert_eq!(Some(3.0), timings.blocked);
        assert_eq!(Some(-1.0), timings.dns);
        assert_eq!(Some(-1.0), timings.connect);
        assert_eq!(5.0, timings.receive);
    }

    #[test]
    fn test_unknown_duration_has_no_receive_phase() {
        let timing = ProtocolTiming {
            send_start: 3.0,
            send_end: 4.0,
            receive_headers_end: 200.0,
            ..Default::default()
        };
        let timings = build_timings(Some(&timing), -1.0);

        assert_eq!(0.0, timings.receive);
        assert_eq!(196.0, timings.wait);
    }

    #[test]
    fn test_no_phase_started() {
        let timing = ProtocolTiming::default();
        assert_eq!(Some(-1.0), build_timings(Some(&timing), 0.0).blocked);
    }

    #[test]
    fn test_reconstruction_inverts_derivation() {
        let timing = ProtocolTiming {
            request_time: 1000.0,
            dns_start: 2.0,
            dns_end: 5.0,
            connect_start: 5.0,
            connect_end: 25.0,
            ssl_start: 17.0,
            ssl_end: 25.0,
            send_start: 25.0,
            send_end: 26.0,
            receive_headers_end: 36.0,
            ..Default::default()
        };
        let timings = build_timings(Some(&timing), 41.0);
        assert_eq!(Some(8.0), timings.ssl);
        assert_eq!(Some(20.0), timings.connect);

        let (rebuilt, end) = reconstruct_timing(1000.0, 41.0, &timings);
        assert_eq!(timing, rebuilt);
        assert!((end - 1000.041).abs() < 1e-9);
    }
}
