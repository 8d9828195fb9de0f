//! GraphQL analytics client

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::config::MetricsConfig;
use crate::error::{truncate, Error, Result};
use crate::models::{TrafficObservation, TrafficQuery};

use super::TrafficSource;

/// Counts requests through the zone analytics GraphQL API
pub struct GraphQlTrafficSource {
    client: Client,
    endpoint: String,
    max_groups: u32,
}

impl GraphQlTrafficSource {
    /// Create a client with the bearer token from `config`
    pub fn new(config: &MetricsConfig) -> Result<Self> {
        if config.api_token.is_empty() {
            return Err(Error::config("metrics.api_token is not set"));
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_token.expose()))
            .map_err(|_| Error::config("metrics.api_token contains invalid header characters"))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            max_groups: config.max_groups,
        })
    }
}

#[async_trait]
impl TrafficSource for GraphQlTrafficSource {
    async fn count_requests(&self, query: &TrafficQuery) -> Result<TrafficObservation> {
        let payload = GraphQlRequest::new(query, self.max_groups);

        debug!(
            zone = %query.zone_tag,
            host = %query.target_host,
            start = %payload.variables.filter.datetime_geq,
            end = %payload.variables.filter.datetime_lt,
            "Querying traffic"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!(status = status.as_u16(), "Metrics API request failed");
            return Err(Error::Status {
                endpoint: "metrics API".to_string(),
                status: status.as_u16(),
                body: truncate(&body),
            });
        }

        parse_response(&body)
    }
}

fn build_query(max_groups: u32) -> String {
    format!(
        r#"query ZoneTraffic($zoneTag: string, $filter: ZoneHttpRequestsAdaptiveGroupsFilter_InputObject) {{
  viewer {{
    zones(filter: {{ zoneTag: $zoneTag }}) {{
      httpRequestsAdaptiveGroups(filter: $filter, limit: {max_groups}) {{
        count
      }}
    }}
  }}
}}"#
    )
}

/// Extract the request count, rejecting anything that is not a well-formed answer.
pub(crate) fn parse_response(body: &str) -> Result<TrafficObservation> {
    let response: GraphQlResponse = serde_json::from_str(body)
        .map_err(|e| Error::malformed(format!("response is not the expected JSON: {e}")))?;

    if let Some(errors) = response.errors.filter(|errors| !errors.is_empty()) {
        let messages = errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        let messages = truncate(&messages);
        error!(errors = %messages, "Metrics API returned errors");
        return Err(Error::Api(messages));
    }

    let zones = response
        .data
        .and_then(|data| data.viewer)
        .and_then(|viewer| viewer.zones)
        .ok_or_else(|| Error::malformed("missing data.viewer.zones"))?;

    let zone = zones
        .into_iter()
        .next()
        .ok_or_else(|| Error::malformed("zone not present in response"))?;

    let groups = zone
        .http_requests_adaptive_groups
        .ok_or_else(|| Error::malformed("missing httpRequestsAdaptiveGroups"))?;

    if groups.len() > 1 {
        warn!(groups = groups.len(), "Expected a single aggregate group");
    }

    let request_count = groups.first().map_or(0, |group| group.count);
    Ok(TrafficObservation::new(request_count))
}

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: String,
    variables: Variables<'a>,
}

impl<'a> GraphQlRequest<'a> {
    fn new(query: &'a TrafficQuery, max_groups: u32) -> Self {
        Self {
            query: build_query(max_groups),
            variables: Variables {
                zone_tag: &query.zone_tag,
                filter: GroupFilter {
                    datetime_geq: query.window.start_iso(),
                    datetime_lt: query.window.end_iso(),
                    client_request_http_host: &query.target_host,
                },
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Variables<'a> {
    zone_tag: &'a str,
    filter: GroupFilter<'a>,
}

#[derive(Debug, Serialize)]
struct GroupFilter<'a> {
    datetime_geq: String,
    datetime_lt: String,
    #[serde(rename = "clientRequestHTTPHost")]
    client_request_http_host: &'a str,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<ResponseData>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct ResponseData {
    viewer: Option<Viewer>,
}

#[derive(Debug, Deserialize)]
struct Viewer {
    zones: Option<Vec<Zone>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Zone {
    http_requests_adaptive_groups: Option<Vec<Group>>,
}

#[derive(Debug, Deserialize)]
struct Group {
    count: u64,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimeWindow;
    use chrono::{DateTime, Utc};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    fn query() -> TrafficQuery {
        let now = DateTime::parse_from_rfc3339("2024-01-01T00:15:00Z")
            .unwrap()
            .with_timezone(&Utc);
        TrafficQuery {
            zone_tag: "zone-1".into(),
            target_host: "f1.example.com".into(),
            window: TimeWindow::ending_at(now, std::time::Duration::from_secs(900)).unwrap(),
        }
    }

    #[test]
    fn request_body_carries_window_and_host() {
        let query = query();
        let body = serde_json::to_value(GraphQlRequest::new(&query, 10_000)).unwrap();

        assert_eq!(
            body["variables"],
            json!({
                "zoneTag": "zone-1",
                "filter": {
                    "datetime_geq": "2024-01-01T00:00:00.000Z",
                    "datetime_lt": "2024-01-01T00:15:00.000Z",
                    "clientRequestHTTPHost": "f1.example.com"
                }
            })
        );
        let text = body["query"].as_str().unwrap();
        assert!(text.contains("httpRequestsAdaptiveGroups(filter: $filter, limit: 10000)"));
        assert!(text.contains("zones(filter: { zoneTag: $zoneTag })"));
    }

    #[test]
    fn empty_groups_count_as_zero() {
        let body = json!({
            "data": { "viewer": { "zones": [ { "httpRequestsAdaptiveGroups": [] } ] } },
            "errors": null
        });
        let observation = parse_response(&body.to_string()).unwrap();
        assert_eq!(observation.request_count, 0);
        assert!(observation.is_silent());
    }

    #[test]
    fn first_group_count_is_used() {
        let body = json!({
            "data": { "viewer": { "zones": [ { "httpRequestsAdaptiveGroups": [ { "count": 42 } ] } ] } }
        });
        let observation = parse_response(&body.to_string()).unwrap();
        assert_eq!(observation.request_count, 42);
    }

    #[test]
    fn api_errors_are_reported_even_with_data() {
        let body = json!({
            "data": { "viewer": { "zones": [] } },
            "errors": [ { "message": "zone not authorized" }, { "message": "rate limited" } ]
        });
        let err = parse_response(&body.to_string()).unwrap_err();
        assert!(matches!(err, Error::Api(ref m) if m == "zone not authorized; rate limited"));
    }

    #[test]
    fn long_error_lists_are_capped() {
        let errors: Vec<_> = (0..200)
            .map(|i| json!({ "message": format!("field {i} could not be resolved") }))
            .collect();
        let body = json!({ "data": null, "errors": errors });

        let messages = match parse_response(&body.to_string()) {
            Err(Error::Api(messages)) => messages,
            other => panic!("expected an API error, got {other:?}"),
        };
        assert_eq!(messages.chars().count(), crate::error::MAX_ERROR_BODY);
        assert!(messages.starts_with("field 0 could not be resolved; field 1"));
    }

    #[rstest]
    #[case::not_json("<html>bad gateway</html>")]
    #[case::null_data(r#"{"data": null, "errors": null}"#)]
    #[case::no_viewer(r#"{"data": {}}"#)]
    #[case::no_zones(r#"{"data": {"viewer": {}}}"#)]
    #[case::empty_zones(r#"{"data": {"viewer": {"zones": []}}}"#)]
    #[case::no_groups(r#"{"data": {"viewer": {"zones": [{}]}}}"#)]
    #[case::group_without_count(r#"{"data": {"viewer": {"zones": [{"httpRequestsAdaptiveGroups": [{}]}]}}}"#)]
    #[case::negative_count(r#"{"data": {"viewer": {"zones": [{"httpRequestsAdaptiveGroups": [{"count": -1}]}]}}}"#)]
    fn malformed_responses_never_read_as_zero(#[case] body: &str) {
        let err = parse_response(body).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)), "got {err:?}");
    }

    #[test]
    fn empty_error_list_is_not_an_error() {
        let body = json!({
            "data": { "viewer": { "zones": [ { "httpRequestsAdaptiveGroups": [ { "count": 3 } ] } ] } },
            "errors": []
        });
        assert_eq!(parse_response(&body.to_string()).unwrap().request_count, 3);
    }

    #[test]
    fn new_requires_token() {
        let config = MetricsConfig::default();
        assert!(matches!(
            GraphQlTrafficSource::new(&config),
            Err(Error::Config(_))
        ));
    }
}
