//! Metric tables produced by the routing experiments, and how their rows are
//! split into parameter sweeps.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading or slicing a metric table
#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read metric table {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("sweep layout needs more rows than can be addressed")]
    LayoutOverflow,
    #[error("expected {expected} rows in metric table, found {found}")]
    RowCount { expected: usize, found: usize },
    #[error("sweep group '{variable}' expected {expected} rows, found {found}")]
    GroupSize {
        variable: SweepVariable,
        expected: usize,
        found: usize,
    },
}

/// One simulation run as written by the experiment driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricRow {
    pub num_of_nodes: f64,
    pub packets_per_sec: f64,
    pub node_speed: f64,
    pub throughput: f64,
    pub end_to_end_delay: f64,
    pub packet_delivery_ratio: f64,
    pub packet_drop_ratio: f64,
    /// Name of the swept variable this run belongs to, when the table carries it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sweep_group: Option<String>,
}

/// Experiment parameter varied across a group of rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SweepVariable {
    NumOfNodes,
    PacketsPerSec,
    NodeSpeed,
}

impl SweepVariable {
    pub const ALL: [SweepVariable; 3] = [
        SweepVariable::NumOfNodes,
        SweepVariable::PacketsPerSec,
        SweepVariable::NodeSpeed,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            SweepVariable::NumOfNodes => "NumOfNodes",
            SweepVariable::PacketsPerSec => "PacketsPerSec",
            SweepVariable::NodeSpeed => "NodeSpeed",
        }
    }

    pub fn value(&self, row: &MetricRow) -> f64 {
        match self {
            SweepVariable::NumOfNodes => row.num_of_nodes,
            SweepVariable::PacketsPerSec => row.packets_per_sec,
            SweepVariable::NodeSpeed => row.node_speed,
        }
    }
}

impl fmt::Display for SweepVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Measured performance quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Metric {
    Throughput,
    EndToEndDelay,
    PacketDeliveryRatio,
    PacketDropRatio,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Throughput,
        Metric::EndToEndDelay,
        Metric::PacketDeliveryRatio,
        Metric::PacketDropRatio,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            Metric::Throughput => "Throughput",
            Metric::EndToEndDelay => "EndToEndDelay",
            Metric::PacketDeliveryRatio => "PacketDeliveryRatio",
            Metric::PacketDropRatio => "PacketDropRatio",
        }
    }

    pub fn value(&self, row: &MetricRow) -> f64 {
        match self {
            Metric::Throughput => row.throughput,
            Metric::EndToEndDelay => row.end_to_end_delay,
            Metric::PacketDeliveryRatio => row.packet_delivery_ratio,
            Metric::PacketDropRatio => row.packet_drop_ratio,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Load every row of a headered metric table
pub fn load_table<P: AsRef<Path>>(path: P) -> Result<Vec<MetricRow>, TableError> {
    let path = path.as_ref();
    let read_err = |source| TableError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(read_err)?;

    rdr.deserialize()
        .collect::<Result<Vec<MetricRow>, _>>()
        .map_err(read_err)
}

/// Rows selected for one swept variable
#[derive(Debug, Clone, PartialEq)]
pub struct SweepGroup {
    pub variable: SweepVariable,
    pub rows: Vec<MetricRow>,
}

impl SweepGroup {
    pub fn x_values(&self) -> Vec<f64> {
        self.rows.iter().map(|r| self.variable.value(r)).collect()
    }

    /// (variable, metric) pairs in row order
    pub fn points(&self, metric: Metric) -> Vec<(f64, f64)> {
        self.rows
            .iter()
            .map(|r| (self.variable.value(r), metric.value(r)))
            .collect()
    }
}

/// Ordered list of swept variables and the number of runs each one spans
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepLayout {
    pub groups: Vec<(SweepVariable, usize)>,
}

impl Default for SweepLayout {
    fn default() -> Self {
        Self::uniform(4)
    }
}

impl SweepLayout {
    /// Every variable, in table order, with the same number of runs
    pub fn uniform(group_size: usize) -> Self {
        Self {
            groups: SweepVariable::ALL.iter().map(|v| (*v, group_size)).collect(),
        }
    }

    /// Rows a positional table must hold, `None` on overflow
    pub fn total_rows(&self) -> Option<usize> {
        self.groups
            .iter()
            .try_fold(0usize, |total, &(_, n)| total.checked_add(n))
    }

    /// Split a table into sweep groups.
    ///
    /// Tables with a `SweepGroup` column are grouped by that column. Otherwise
    /// rows are taken positionally in layout order. Either way each group must
    /// hold exactly the expected number of rows.
    pub fn slice(&self, rows: &[MetricRow]) -> Result<Vec<SweepGroup>, TableError> {
        if rows.iter().any(|r| r.sweep_group.is_some()) {
            self.slice_by_column(rows)
        } else {
            self.slice_by_position(rows)
        }
    }

    fn slice_by_position(&self, rows: &[MetricRow]) -> Result<Vec<SweepGroup>, TableError> {
        let expected = self.total_rows().ok_or(TableError::LayoutOverflow)?;
        if rows.len() != expected {
            return Err(TableError::RowCount {
                expected,
                found: rows.len(),
            });
        }

        let mut offset = 0;
        let mut groups = Vec::with_capacity(self.groups.len());
        for &(variable, size) in &self.groups {
            groups.push(SweepGroup {
                variable,
                rows: rows[offset..offset + size].to_vec(),
            });
            offset += size;
        }
        Ok(groups)
    }

    fn slice_by_column(&self, rows: &[MetricRow]) -> Result<Vec<SweepGroup>, TableError> {
        self.groups
            .iter()
            .map(|&(variable, size)| {
                let selected: Vec<MetricRow> = rows
                    .iter()
                    .filter(|r| r.sweep_group.as_deref().map(str::trim) == Some(variable.column()))
                    .cloned()
                    .collect();
                if selected.len() != size {
                    return Err(TableError::GroupSize {
                        variable,
                        expected: size,
                        found: selected.len(),
                    });
                }
                Ok(SweepGroup {
                    variable,
                    rows: selected,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn row(nodes: f64, pps: f64, speed: f64, throughput: f64) -> MetricRow {
        MetricRow {
            num_of_nodes: nodes,
            packets_per_sec: pps,
            node_speed: speed,
            throughput,
            end_to_end_delay: 0.01,
            packet_delivery_ratio: 90.0,
            packet_drop_ratio: 10.0,
            sweep_group: None,
        }
    }

    fn twelve_rows() -> Vec<MetricRow> {
        (0..12)
            .map(|i| row(10.0 * (i + 1) as f64, 100.0 + i as f64, 5.0 * i as f64, i as f64))
            .collect()
    }

    #[test]
    fn positional_slices_follow_fixed_offsets() {
        let rows = twelve_rows();
        let groups = SweepLayout::default().slice(&rows).unwrap();

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].variable, SweepVariable::NumOfNodes);
        assert_eq!(groups[0].rows, rows[0..4].to_vec());
        assert_eq!(groups[1].variable, SweepVariable::PacketsPerSec);
        assert_eq!(groups[1].rows, rows[4..8].to_vec());
        assert_eq!(groups[2].variable, SweepVariable::NodeSpeed);
        assert_eq!(groups[2].rows, rows[8..12].to_vec());
    }

    #[test]
    fn positional_slicing_ignores_column_values() {
        // same values everywhere: grouping still comes from position alone
        let rows: Vec<MetricRow> = (0..12).map(|i| row(50.0, 50.0, 50.0, i as f64)).collect();
        let groups = SweepLayout::default().slice(&rows).unwrap();

        let throughputs: Vec<Vec<f64>> = groups
            .iter()
            .map(|g| g.points(Metric::Throughput).into_iter().map(|(_, y)| y).collect())
            .collect();
        assert_eq!(
            throughputs,
            vec![
                vec![0.0, 1.0, 2.0, 3.0],
                vec![4.0, 5.0, 6.0, 7.0],
                vec![8.0, 9.0, 10.0, 11.0],
            ]
        );
    }

    #[test]
    fn node_count_group_yields_node_counts_as_x() {
        let mut rows = twelve_rows();
        for (i, t) in [1.5, 2.5, 3.5, 4.5].iter().enumerate() {
            rows[i].num_of_nodes = 10.0 * (i + 1) as f64;
            rows[i].throughput = *t;
        }
        let groups = SweepLayout::default().slice(&rows).unwrap();

        assert_eq!(groups[0].x_values(), vec![10.0, 20.0, 30.0, 40.0]);
        assert_eq!(
            groups[0].points(Metric::Throughput),
            vec![(10.0, 1.5), (20.0, 2.5), (30.0, 3.5), (40.0, 4.5)]
        );
    }

    #[test]
    fn short_table_fails_loudly() {
        let rows = &twelve_rows()[..10];
        match SweepLayout::default().slice(rows) {
            Err(TableError::RowCount { expected, found }) => {
                assert_eq!(expected, 12);
                assert_eq!(found, 10);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn oversized_layout_is_an_error() {
        let layout = SweepLayout::uniform(usize::MAX);
        assert_eq!(layout.total_rows(), None);
        assert!(matches!(layout.slice(&twelve_rows()), Err(TableError::LayoutOverflow)));
        assert_eq!(SweepLayout::default().total_rows(), Some(12));
    }

    #[test]
    fn sweep_group_column_selects_rows_in_any_order() {
        let mut rows = twelve_rows();
        let labels = [
            "NodeSpeed", "NumOfNodes", "PacketsPerSec", "NumOfNodes", "NodeSpeed", "NumOfNodes",
            "PacketsPerSec", "NodeSpeed", "NumOfNodes", "PacketsPerSec", "NodeSpeed", "PacketsPerSec",
        ];
        for (r, label) in rows.iter_mut().zip(labels) {
            r.sweep_group = Some(label.to_string());
        }

        let groups = SweepLayout::default().slice(&rows).unwrap();
        let nodes: Vec<f64> = groups[0].rows.iter().map(|r| r.throughput).collect();
        assert_eq!(nodes, vec![1.0, 3.0, 5.0, 8.0]);
        let speeds: Vec<f64> = groups[2].rows.iter().map(|r| r.throughput).collect();
        assert_eq!(speeds, vec![0.0, 4.0, 7.0, 10.0]);
    }

    #[test]
    fn sweep_group_column_checks_cardinality() {
        let mut rows = twelve_rows();
        for r in rows.iter_mut() {
            r.sweep_group = Some("NumOfNodes".to_string());
        }
        assert!(matches!(
            SweepLayout::default().slice(&rows),
            Err(TableError::GroupSize {
                variable: SweepVariable::NumOfNodes,
                expected: 4,
                found: 12
            })
        ));
    }

    #[test]
    fn loads_simulator_output() {
        let dir = std::env::temp_dir().join(format!("nsplot-table-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("manet-routing.output.csv");
        fs::write(
            &path,
            "NumOfNodes,PacketsPerSec,NodeSpeed,Throughput,EndToEndDelay,PacketDeliveryRatio,PacketDropRatio\n\
             20,100,5,45.2,0.031,97.5,2.5\n\
             40,100,5,-nan,0.044,-nan,-nan\n",
        )
        .unwrap();

        let rows = load_table(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].num_of_nodes, 20.0);
        assert_eq!(rows[0].packet_drop_ratio, 2.5);
        assert_eq!(rows[0].sweep_group, None);
        assert!(rows[1].throughput.is_nan());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_table_is_an_error() {
        let err = load_table("/nonexistent/nsplot/table.csv").unwrap_err();
        assert!(err.to_string().contains("table.csv"));
    }
}
