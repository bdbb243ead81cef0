//! Two-column time-series traces written by the TCP congestion experiments.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extension of trace files
pub const TRACE_EXTENSION: &str = "data";

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("failed to read trace file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Ordered (time, value) samples of one trace file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    pub points: Vec<(f64, f64)>,
    /// Lines that were not a pair of numbers
    pub skipped: usize,
}

/// Parse `<time> <value>` lines. Anything else is skipped.
pub fn parse_series<R: BufRead>(reader: R) -> io::Result<TimeSeries> {
    let mut series = TimeSeries::default();

    for line in reader.lines() {
        let line = line?;
        match parse_pair(&line) {
            Some(point) => series.points.push(point),
            None => series.skipped += 1,
        }
    }

    Ok(series)
}

fn parse_pair(line: &str) -> Option<(f64, f64)> {
    let mut tokens = line.split_whitespace();
    let time = tokens.next()?.parse().ok()?;
    let value = tokens.next()?.parse().ok()?;
    if tokens.next().is_some() {
        return None;
    }
    Some((time, value))
}

/// Read a whole trace file
pub fn load_series<P: AsRef<Path>>(path: P) -> Result<TimeSeries, TraceError> {
    let path = path.as_ref();
    let read_err = |source| TraceError::Read {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(read_err)?;
    parse_series(BufReader::new(file)).map_err(read_err)
}

/// Identity of a trace, taken from its `<Algorithm>-...-flow<N>-<metric>.data` name.
///
/// Any `.data` name with a `-` after a non-empty algorithm is a trace. The
/// metric may be empty when the name carries nothing after the algorithm.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TraceId {
    pub algorithm: String,
    pub flow: Option<u32>,
    pub metric: String,
}

impl TraceId {
    pub fn from_file_name(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(TRACE_EXTENSION)?.strip_suffix('.')?;
        let tokens: Vec<&str> = stem.split('-').collect();

        let algorithm = tokens[0];
        if algorithm.is_empty() || tokens.len() < 2 {
            return None;
        }

        let flow_pos = tokens.iter().skip(1).position(|t| flow_number(t).is_some()).map(|p| p + 1);
        let (flow, metric) = match flow_pos {
            Some(pos) => (flow_number(tokens[pos]), tokens[pos + 1..].join("-")),
            None => (None, String::new()),
        };
        // names without a metric token fall back to the last non-empty token
        let metric = match metric.trim_matches('-') {
            "" => tokens[1..]
                .iter()
                .rev()
                .find(|t| !t.is_empty())
                .map(|t| t.to_string())
                .unwrap_or_default(),
            m => m.to_string(),
        };

        Some(Self {
            algorithm: algorithm.to_string(),
            flow,
            metric: metric.to_lowercase(),
        })
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.flow {
            Some(n) => write!(f, "{}/flow{}/{}", self.algorithm, n, self.metric),
            None => write!(f, "{}/{}", self.algorithm, self.metric),
        }
    }
}

fn flow_number(token: &str) -> Option<u32> {
    let digits = token.strip_prefix("flow")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_numeric_pairs_in_order() {
        let input = "\
# time cwnd
0.0 536

1.5 1072
garbage line here
2.0 abc
3.25\t2144
4.0
5.0 4288 extra
6.5 8576
";
        let series = parse_series(input.as_bytes()).unwrap();
        assert_eq!(
            series.points,
            vec![(0.0, 536.0), (1.5, 1072.0), (3.25, 2144.0), (6.5, 8576.0)]
        );
        assert_eq!(series.skipped, 6);
    }

    #[test]
    fn keeps_file_order_without_sorting() {
        let series = parse_series("3 1\n1 2\n2 3\n".as_bytes()).unwrap();
        assert_eq!(series.points, vec![(3.0, 1.0), (1.0, 2.0), (2.0, 3.0)]);
    }

    #[test]
    fn empty_input_gives_empty_series() {
        let series = parse_series("".as_bytes()).unwrap();
        assert!(series.points.is_empty());
        assert_eq!(series.skipped, 0);
    }

    #[test]
    fn identity_from_flow_file_name() {
        let id = TraceId::from_file_name("TcpVegas-flow0-cwnd.data").unwrap();
        assert_eq!(id.algorithm, "TcpVegas");
        assert_eq!(id.flow, Some(0));
        assert_eq!(id.metric, "cwnd");
        assert_eq!(id.to_string(), "TcpVegas/flow0/cwnd");
    }

    #[test]
    fn identity_keeps_hyphenated_metric() {
        let id = TraceId::from_file_name("TcpVegasTweaked-run2-flow1-next-tx.data").unwrap();
        assert_eq!(id.algorithm, "TcpVegasTweaked");
        assert_eq!(id.flow, Some(1));
        assert_eq!(id.metric, "next-tx");
    }

    #[test]
    fn identity_without_flow_uses_last_token() {
        let id = TraceId::from_file_name("TcpBbr-RTT.data").unwrap();
        assert_eq!(id.flow, None);
        assert_eq!(id.metric, "rtt");
    }

    #[test]
    fn rejects_non_trace_names() {
        assert_eq!(TraceId::from_file_name("TcpVegas-flow0-cwnd.csv"), None);
        assert_eq!(TraceId::from_file_name("cwnd.data"), None);
        assert_eq!(TraceId::from_file_name("-flow0-cwnd.data"), None);
    }

    #[test]
    fn identity_without_metric_token_is_kept() {
        let id = TraceId::from_file_name("TcpVegas-flow0.data").unwrap();
        assert_eq!(id.algorithm, "TcpVegas");
        assert_eq!(id.flow, Some(0));
        assert_eq!(id.metric, "flow0");

        let id = TraceId::from_file_name("TcpVegas-cwnd-.data").unwrap();
        assert_eq!(id.flow, None);
        assert_eq!(id.metric, "cwnd");

        let id = TraceId::from_file_name("TcpVegas-.data").unwrap();
        assert_eq!(id.algorithm, "TcpVegas");
        assert_eq!(id.metric, "");
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_series("/nonexistent/nsplot/TcpVegas-flow0-cwnd.data").unwrap_err();
        assert!(err.to_string().contains("TcpVegas-flow0-cwnd.data"));
    }
}
