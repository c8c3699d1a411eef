//! HTTP mocking for the SNS subscription handshake.

use std::time::Duration;

use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer as WiremockServer, ResponseTemplate,
};

/// Path the mock SNS endpoint serves confirmations on.
pub const CONFIRM_PATH: &str = "/confirm";

/// Mock SNS endpoint answering subscription confirmation GETs.
pub struct MockSnsEndpoint {
    server: WiremockServer,
}

impl MockSnsEndpoint {
    /// Starts a mock endpoint on a random port.
    pub async fn start() -> Self {
        Self { server: WiremockServer::start().await }
    }

    /// Base URL of the mock server.
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Confirmation URL carrying `token`, as SNS would send it.
    pub fn subscribe_url(&self, token: &str) -> String {
        format!(
            "{}{CONFIRM_PATH}?Action=ConfirmSubscription&TopicArn=arn:aws:sns:us-east-1:123456789012:ses-events&Token={token}",
            self.server.uri()
        )
    }

    /// Answers confirmations with `status`.
    pub async fn respond_with_status(&self, status: u16) {
        Mock::given(method("GET"))
            .and(path(CONFIRM_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_string(confirmation_body()))
            .mount(&self.server)
            .await;
    }

    /// Answers confirmations for `token` only, with 200.
    pub async fn expect_token(&self, token: &str) {
        Mock::given(method("GET"))
            .and(path(CONFIRM_PATH))
            .and(query_param("Token", token))
            .respond_with(ResponseTemplate::new(200).set_body_string(confirmation_body()))
            .mount(&self.server)
            .await;
    }

    /// Answers confirmations after `delay`.
    pub async fn respond_after(&self, delay: Duration) {
        Mock::given(method("GET"))
            .and(path(CONFIRM_PATH))
            .respond_with(ResponseTemplate::new(200).set_delay(delay))
            .mount(&self.server)
            .await;
    }

    /// Number of confirmation requests received.
    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.iter().filter(|r| r.url.path() == CONFIRM_PATH).count())
            .unwrap_or_default()
    }

    /// Asserts that exactly `expected` confirmation requests were received.
    pub async fn assert_request_count(&self, expected: usize) {
        let received = self.request_count().await;
        assert_eq!(received, expected, "Expected {expected} confirmations, received {received}");
    }
}

fn confirmation_body() -> &'static str {
    "<ConfirmSubscriptionResponse xmlns=\"http://sns.amazonaws.com/doc/2010-03-31/\">\
     <ConfirmSubscriptionResult><SubscriptionArn>arn:aws:sns:us-east-1:123456789012:ses-events:2bcfbf39</SubscriptionArn>\
     </ConfirmSubscriptionResult></ConfirmSubscriptionResponse>"
}

/// Unroutable URL for simulating transport failures.
pub fn unreachable_url() -> String {
    format!("http://127.0.0.1:9{CONFIRM_PATH}?Token=unreachable")
}
