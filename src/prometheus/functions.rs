//! The impls and functions
//!
use std::time::Instant;
use log::*;
use anyhow::{Context, Result};
use url::Url;
use crate::remote::RemoteFetch;
use crate::series::MetricSeries;
use crate::prometheus::{PrometheusClient, QueryOutcome, QueryRangeResponse, RangeQuery};

impl QueryOutcome {
    /// The name as used in the embedded json.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryOutcome::Data => "data",
            QueryOutcome::Empty => "empty",
            QueryOutcome::Failed => "failed",
        }
    }
}

impl PrometheusClient {
    /// Create a client for the prometheus server at `base_url`, for example `http://yb-bench-prometheus:9090`.
    pub fn new(
        fetcher: Box<dyn RemoteFetch>,
        base_url: &str,
    ) -> Result<Self>
    {
        let query_range_endpoint = Url::parse(&format!("{}/api/v1/query_range", base_url.trim_end_matches('/')))
            .with_context(|| format!("Invalid prometheus url: {}", base_url))?;
        Ok(PrometheusClient { fetcher, query_range_endpoint })
    }
    /// The full range query URL, with the query encoded.
    pub fn query_range_url(
        &self,
        query: &str,
        start: f64,
        end: f64,
        step: u64,
    ) -> String
    {
        let mut url = self.query_range_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair("start", &start.to_string())
            .append_pair("end", &end.to_string())
            .append_pair("step", &step.to_string());
        url.to_string()
    }
    /// Execute a range query, and return the series.
    /// Any failure results in an empty list, and is logged.
    pub fn query_range(
        &self,
        query: &str,
        start: f64,
        end: f64,
        step: u64,
    ) -> Vec<MetricSeries>
    {
        self.query_range_outcome(query, start, end, step).series
    }
    /// Execute a range query, and return the series together with the [QueryOutcome].
    pub fn query_range_outcome(
        &self,
        query: &str,
        start: f64,
        end: f64,
        step: u64,
    ) -> RangeQuery
    {
        let timer = Instant::now();
        let url = self.query_range_url(query, start, end, step);
        let range_query = match self.fetcher.fetch(&url) {
            Ok(body) => PrometheusClient::parse_query_range(&body, query),
            Err(e) => {
                warn!("query failed: {}: {}", query, e);
                RangeQuery { outcome: QueryOutcome::Failed, series: Vec::new() }
            },
        };
        debug!("query_range {:?}, {} series: {:?}", range_query.outcome, range_query.series.len(), timer.elapsed());
        range_query
    }
    pub(crate) fn parse_query_range(
        http_data: &str,
        query: &str,
    ) -> RangeQuery
    {
        if http_data.trim().is_empty() {
            warn!("query returned an empty response: {}", query);
            return RangeQuery { outcome: QueryOutcome::Failed, series: Vec::new() };
        }
        let response: QueryRangeResponse = match serde_json::from_str(http_data) {
            Ok(response) => response,
            Err(e) => {
                warn!("JSON decode error: {}: {}", query, e);
                return RangeQuery { outcome: QueryOutcome::Failed, series: Vec::new() };
            },
        };
        if response.status != "success" {
            warn!("Query failed: {} ({}): {}",
                response.error.as_deref().unwrap_or("unknown error"),
                response.error_type.as_deref().unwrap_or("unknown type"),
                query,
            );
            return RangeQuery { outcome: QueryOutcome::Failed, series: Vec::new() };
        }
        if response.data.result_type != "matrix" {
            debug!("unexpected resultType {} for: {}", response.data.result_type, query);
        }

        let series: Vec<MetricSeries> = response.data.result
            .into_iter()
            .map(|result| {
                let samples = result.values
                    .iter()
                    .filter_map(|(timestamp, value)| match value.parse::<f64>() {
                        // NaN and Inf samples cannot be represented in the embedded json.
                        Ok(value) if value.is_finite() => Some((*timestamp, value)),
                        _ => {
                            debug!("skipping sample {} at {} for: {}", value, timestamp, query);
                            None
                        },
                    })
                    .collect();
                let name = result.metric.get("__name__").cloned().unwrap_or_else(|| query.to_string());
                MetricSeries::new(&name, result.metric, samples)
            })
            .collect();

        let outcome = if series.is_empty() { QueryOutcome::Empty } else { QueryOutcome::Data };
        RangeQuery { outcome, series }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, rc::Rc};
    use crate::remote::FetchError;

    /// Returns a canned answer, and records the requested URLs.
    struct FakeFetch {
        answer: Option<String>,
        urls: Rc<RefCell<Vec<String>>>,
    }

    impl RemoteFetch for FakeFetch {
        fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.urls.borrow_mut().push(url.to_string());
            self.answer.clone().ok_or_else(|| FetchError::Http("connection refused".to_string()))
        }
    }

    fn client(answer: Option<&str>) -> (PrometheusClient, Rc<RefCell<Vec<String>>>) {
        let urls = Rc::new(RefCell::new(Vec::new()));
        let fetcher = FakeFetch { answer: answer.map(|a| a.to_string()), urls: urls.clone() };
        (PrometheusClient::new(Box::new(fetcher), "http://yb-bench-prometheus:9090/").unwrap(), urls)
    }

    #[test]
    fn unit_parse_query_range_matrix() {
        let json = r#"
{
  "status": "success",
  "data": {
    "resultType": "matrix",
    "result": [
      {
        "metric": { "pod": "yb-tserver-0" },
        "values": [ [ 1705823400, "12.5" ], [ 1705823430, "13.25" ] ]
      },
      {
        "metric": { "__name__": "up", "pod": "yb-master-0" },
        "values": [ [ 1705823400.5, "1" ] ]
      }
    ]
  }
}"#;
        let result = PrometheusClient::parse_query_range(json, "sum(rate(x[30s])) by (pod)");
        assert_eq!(result.outcome, QueryOutcome::Data);
        assert_eq!(result.series.len(), 2);
        assert_eq!(result.series[0].name(), "sum(rate(x[30s])) by (pod)");
        assert_eq!(result.series[0].label("pod"), Some("yb-tserver-0"));
        assert_eq!(result.series[0].timestamps(), &[1705823400.0, 1705823430.0]);
        assert_eq!(result.series[0].values(), &[12.5, 13.25]);
        assert_eq!(result.series[1].name(), "up");
        assert_eq!(result.series[1].labels().len(), 2);
    }

    #[test]
    fn unit_parse_query_range_skips_non_finite_samples() {
        let json = r#"{"status":"success","data":{"resultType":"matrix","result":[
            {"metric":{"pod":"yb-tserver-1"},"values":[[1,"NaN"],[2,"4"],[3,"+Inf"],[4,"bogus"]]}
        ]}}"#;
        let result = PrometheusClient::parse_query_range(json, "q");
        assert_eq!(result.series[0].timestamps(), &[2.0]);
        assert_eq!(result.series[0].values(), &[4.0]);
    }

    #[test]
    fn unit_parse_query_range_error_status() {
        let json = r#"{"status":"error","errorType":"bad_data","error":"parse error at char 5"}"#;
        let result = PrometheusClient::parse_query_range(json, "sum(");
        assert_eq!(result.outcome, QueryOutcome::Failed);
        assert!(result.series.is_empty());
    }

    #[test]
    fn unit_parse_query_range_empty_result() {
        let json = r#"{"status":"success","data":{"resultType":"matrix","result":[]}}"#;
        let result = PrometheusClient::parse_query_range(json, "absent_metric");
        assert_eq!(result.outcome, QueryOutcome::Empty);
        assert!(result.series.is_empty());
    }

    #[test]
    fn unit_parse_query_range_malformed_json() {
        let result = PrometheusClient::parse_query_range("<html>502 Bad Gateway</html>", "up");
        assert_eq!(result.outcome, QueryOutcome::Failed);
        let result = PrometheusClient::parse_query_range("", "up");
        assert_eq!(result.outcome, QueryOutcome::Failed);
    }

    #[test]
    fn unit_query_range_url_is_encoded() {
        let (client, _) = client(None);
        let url = client.query_range_url(r#"sum(rate(x{pod=~"yb-tserver.*"}[30s]))"#, 1705823400.0, 1705823700.5, 30);
        assert!(url.starts_with("http://yb-bench-prometheus:9090/api/v1/query_range?query="));
        assert!(!url.contains('{'));
        assert!(!url.contains('"'));
        assert!(url.contains("%7Bpod%3D%7E%22yb-tserver.*%22%7D"));
        assert!(url.ends_with("&start=1705823400&end=1705823700.5&step=30"));
    }

    #[test]
    fn unit_query_range_fetch_failure_is_empty() {
        let (client, urls) = client(None);
        let result = client.query_range_outcome("up", 1.0, 2.0, 30);
        assert_eq!(result.outcome, QueryOutcome::Failed);
        assert!(client.query_range("up", 1.0, 2.0, 30).is_empty());
        assert_eq!(urls.borrow().len(), 2);
    }

    #[test]
    fn unit_query_range_through_fetcher() {
        let (client, urls) = client(Some(r#"{"status":"success","data":{"resultType":"matrix","result":[{"metric":{"pod":"yb-tserver-0"},"values":[[1,"2"]]}]}}"#));
        let series = client.query_range("up", 1.0, 2.0, 15);
        assert_eq!(series.len(), 1);
        assert!(urls.borrow()[0].ends_with("step=15"));
    }
}
