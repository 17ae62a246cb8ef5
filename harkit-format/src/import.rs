//! Rebuild a request timeline from a decoded log.

use crate::models::*;
use crate::ProtocolTiming;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ImportedPage {
    pub id: String,
    pub title: String,
}

/// One entry of the log placed back on a timeline.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportedRequest {
    pub method: String,
    pub url: String,
    pub status: f64,
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<ImportedPage>,
    /// Seconds since the epoch.
    pub issue_time: f64,
    pub end_time: f64,
    pub resource_size: f64,
    pub transfer_size: f64,
    pub timing: ProtocolTiming,
}

/// Entries ordered by `startedDateTime`, pages resolved through `pageref`.
#[instrument(skip_all, fields(har.entries = log.entries.len()))]
pub fn requests_from_log(log: &HarLog) -> Vec<ImportedRequest> {
    let pages: HashMap<&str, &HarPage> = log
        .pages
        .iter()
        .map(|page| (page.id.as_str(), page))
        .collect();

    let mut entries: Vec<&HarEntry> = log.entries.iter().collect();
    entries.sort_by_key(|entry| entry.started_date_time);

    let requests: Vec<_> = entries
        .into_iter()
        .map(|entry| {
            let page = entry
                .pageref
                .as_deref()
                .and_then(|pageref| pages.get(pageref))
                .map(|page| ImportedPage {
                    id: page.id.clone(),
                    title: page.title.clone(),
                });
            import_entry(entry, page)
        })
        .collect();

    debug!("Imported {} requests", requests.len());
    requests
}

fn import_entry(entry: &HarEntry, page: Option<ImportedPage>) -> ImportedRequest {
    let issue_time = entry.started_date_time.timestamp_millis() as f64 / 1000.0;
    let (timing, end_time) = reconstruct_timing(issue_time, entry.time, &entry.timings);
    let response = &entry.response;

    let transfer_size = response.transfer_size.unwrap_or_else(|| {
        (response.headers_size.max(0.0) + response.body_size.max(0.0)).max(0.0)
    });

    ImportedRequest {
        method: entry.request.method.clone(),
        url: entry.request.url.clone(),
        status: response.status,
        mime_type: response.content.mime_type.clone(),
        page,
        issue_time,
        end_time,
        resource_size: response.content.size,
        transfer_size,
        timing,
    }
}

/// Inverse of the builder's phase derivation: lays HAR phase durations back
/// out as offsets. SSL is counted inside connect on both sides.
///
/// Returns the timing and the end time in seconds.
pub fn reconstruct_timing(
    issue_time: f64,
    total_duration: f64,
    timings: &HarTimings,
) -> (ProtocolTiming, f64) {
    let mut cursor = timings.blocked.filter(|blocked| *blocked >= 0.0).unwrap_or(0.0);
    let proxy = timings.blocked_proxy.filter(|proxy| *proxy > 0.0);
    let queueing = timings.blocked_queueing.filter(|queued| *queued > 0.0);
    let ssl = timings.ssl.filter(|ssl| *ssl >= 0.0);
    let connect = timings.connect.map(|connect| {
        if connect > 0.0 {
            connect - ssl.unwrap_or(0.0)
        } else {
            connect
        }
    });

    let mut timing = ProtocolTiming {
        request_time: issue_time + queueing.unwrap_or(0.0) / 1000.0,
        ..Default::default()
    };

    if let Some(proxy) = proxy {
        timing.proxy_start = cursor - proxy;
        timing.proxy_end = cursor;
    }

    timing.dns_start = start_of(timings.dns, cursor);
    timing.dns_end = accumulate(timings.dns, &mut cursor);

    timing.connect_start = start_of(connect, cursor);
    let connect_end = accumulate(connect, &mut cursor);
    timing.connect_end = if connect_end >= 0.0 {
        connect_end + ssl.unwrap_or(0.0)
    } else {
        -1.0
    };

    timing.ssl_start = start_of(ssl, cursor);
    timing.ssl_end = accumulate(ssl, &mut cursor);

    timing.send_start = start_of(Some(timings.send), cursor);
    timing.send_end = accumulate(Some(timings.send), &mut cursor);
    timing.receive_headers_end = accumulate(Some(timings.wait), &mut cursor);
    accumulate(Some(timings.receive), &mut cursor);

    let end_time = issue_time + total_duration.max(cursor) / 1000.0;
    (timing, end_time)
}

fn accumulate(phase: Option<f64>, cursor: &mut f64) -> f64 {
    match phase {
        Some(duration) if duration >= 0.0 => {
            *cursor += duration;
            *cursor
        }
        _ => -1.0,
    }
}

fn start_of(phase: Option<f64>, cursor: f64) -> f64 {
    match phase {
        Some(duration) if duration >= 0.0 => cursor,
        _ => -1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode;
    use serde_json::json;

    fn timings(
        blocked: f64,
        dns: f64,
        connect: f64,
        ssl: f64,
        send: f64,
        wait: f64,
        receive: f64,
    ) -> HarTimings {
        HarTimings {
            blocked: Some(blocked),
            dns: Some(dns),
            connect: Some(connect),
            send,
            wait,
            receive,
            ssl: Some(ssl),
            comment: None,
            blocked_queueing: None,
            blocked_proxy: None,
        }
    }

    #[test]
    fn test_reconstruct_with_ssl_inside_connect() {
        let (timing, end) =
            reconstruct_timing(100.0, 41.0, &timings(2.0, 3.0, 20.0, 8.0, 1.0, 10.0, 5.0));

        assert_eq!(100.0, timing.request_time);
        assert_eq!((2.0, 5.0), (timing.dns_start, timing.dns_end));
        assert_eq!((5.0, 25.0), (timing.connect_start, timing.connect_end));
        assert_eq!((17.0, 25.0), (timing.ssl_start, timing.ssl_end));
        assert_eq!((25.0, 26.0), (timing.send_start, timing.send_end));
        assert_eq!(36.0, timing.receive_headers_end);
        assert_eq!(-1.0, timing.proxy_start);
        assert!((end - 100.041).abs() < 1e-9);
    }

    #[test]
    fn test_reconstruct_skips_missing_phases() {
        let (timing, end) =
            reconstruct_timing(10.0, 500.0, &timings(-1.0, -1.0, -1.0, -1.0, 4.0, 6.0, 10.0));

        assert_eq!(-1.0, timing.dns_start);
        assert_eq!(-1.0, timing.dns_end);
        assert_eq!(-1.0, timing.connect_start);
        assert_eq!(-1.0, timing.connect_end);
        assert_eq!(-1.0, timing.ssl_start);
        assert_eq!((0.0, 4.0), (timing.send_start, timing.send_end));
        assert_eq!(10.0, timing.receive_headers_end);
        assert!((end - 10.5).abs() < 1e-9);
    }

    #[test]
    fn test_reconstruct_queueing_and_proxy() {
        let mut har = timings(30.0, -1.0, -1.0, -1.0, 1.0, 1.0, 1.0);
        har.blocked_queueing = Some(250.0);
        har.blocked_proxy = Some(12.0);

        let (timing, _) = reconstruct_timing(1.0, 0.0, &har);
        assert!((timing.request_time - 1.25).abs() < 1e-9);
        assert_eq!((18.0, 30.0), (timing.proxy_start, timing.proxy_end));
        assert_eq!(30.0, timing.send_start);
    }

    #[test]
    fn test_requests_are_sorted_and_paged() {
        let entry = |started: &str, url: &str, pageref: Option<&str>| {
            json!({
                "pageref": pageref,
                "startedDateTime": started,
                "time": 10,
                "request": { "method": "GET", "url": url, "headersSize": -1, "bodySize": 0 },
                "response": {
                    "status": 200, "headersSize": 100, "bodySize": 400,
                    "content": { "size": 900, "mimeType": "text/css" }
                },
                "timings": { "send": 1, "wait": 5, "receive": 4 }
            })
        };
        let raw = json!({
            "log": {
                "version": "1.2",
                "creator": { "name": "test", "version": "0" },
                "pages": [{
                    "startedDateTime": "2020-01-01T00:00:00Z",
                    "id": "page_7",
                    "title": "Home",
                    "pageTimings": {}
                }],
                "entries": [
                    entry("2020-01-01T00:00:02Z", "https://b.test/", Some("page_7")),
                    entry("2020-01-01T00:00:01Z", "https://a.test/", None),
                    entry("2020-01-01T00:00:03Z", "https://c.test/", Some("page_missing")),
                ]
            }
        });
        let doc = decode(&raw).unwrap();
        let requests = requests_from_log(&doc.log);

        let urls: Vec<_> = requests.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(vec!["https://a.test/", "https://b.test/", "https://c.test/"], urls);
        assert!(requests[0].page.is_none());
        assert_eq!(
            Some(ImportedPage {
                id: "page_7".to_string(),
                title: "Home".to_string()
            }),
            requests[1].page
        );
        assert!(requests[2].page.is_none());
        assert_eq!(500.0, requests[1].transfer_size);
        assert_eq!(1_577_836_802.0, requests[1].issue_time);
    }
}
