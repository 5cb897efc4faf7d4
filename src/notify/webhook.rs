//! Incoming-webhook sink.
//!
//! POSTs the payload as JSON to a fixed URL.  Only `200 OK` counts as
//! delivered; any other status, or a transport error, is a failure.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;

use super::{DeliveryOutcome, NotificationPayload, NotificationSink};

pub struct WebhookSink {
    client: Client,
    url: String,
}

impl WebhookSink {
    /// `timeout` bounds each delivery attempt.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("building webhook HTTP client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl NotificationSink for WebhookSink {
    fn deliver(&self, payload: &NotificationPayload) -> DeliveryOutcome {
        match self.client.post(&self.url).json(payload).send() {
            Ok(response) if response.status() == StatusCode::OK => DeliveryOutcome::Delivered,
            Ok(response) => DeliveryOutcome::Failed(format!("HTTP {}", response.status())),
            Err(e) => DeliveryOutcome::Failed(e.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::format_notification;
    use crate::source::make_item;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// Accept one request, answer with `status`, and hand back the body.
    fn one_shot_server(status: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/hook", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);

            let mut content_length = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap();
                    }
                }
            }
            let mut body = vec![0; content_length];
            reader.read_exact(&mut body).unwrap();

            let mut stream = reader.into_inner();
            write!(
                stream,
                "HTTP/1.1 {status}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            )
            .unwrap();
            String::from_utf8(body).unwrap()
        });

        (url, handle)
    }

    fn payload() -> NotificationPayload {
        let item = make_item("abc123", "productivity", "need accountability for finals", "");
        format_notification(&item, &["need accountability".to_string()], "productivity")
    }

    #[test]
    fn ok_response_is_delivered_and_body_is_json_payload() {
        let (url, server) = one_shot_server("200 OK");
        let sink = WebhookSink::new(url, Duration::from_secs(5)).unwrap();

        assert_eq!(sink.deliver(&payload()), DeliveryOutcome::Delivered);

        let body: serde_json::Value = serde_json::from_str(&server.join().unwrap()).unwrap();
        assert_eq!(body, serde_json::to_value(payload()).unwrap());
    }

    #[test]
    fn server_error_is_failure() {
        let (url, server) = one_shot_server("500 Internal Server Error");
        let sink = WebhookSink::new(url, Duration::from_secs(5)).unwrap();

        let outcome = sink.deliver(&payload());
        server.join().unwrap();
        assert_eq!(outcome, DeliveryOutcome::Failed("HTTP 500 Internal Server Error".into()));
    }

    #[test]
    fn non_200_success_status_is_still_failure() {
        let (url, server) = one_shot_server("204 No Content");
        let sink = WebhookSink::new(url, Duration::from_secs(5)).unwrap();

        let outcome = sink.deliver(&payload());
        server.join().unwrap();
        assert!(matches!(outcome, DeliveryOutcome::Failed(_)));
    }

    #[test]
    fn connection_refused_is_failure() {
        let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
        let sink = WebhookSink::new(format!("http://{addr}/hook"), Duration::from_secs(5)).unwrap();

        assert!(matches!(sink.deliver(&payload()), DeliveryOutcome::Failed(_)));
    }
}
