//! Row-oriented view of daily plant KPIs.
//!
//! `getKpiStationDay` returns `data` as a list of points, each with a
//! `collectTime` (epoch millis) and a `dataItemMap` of metric name to value.
//! `KpiTable` flattens that into one row per timestamp with every metric
//! coerced to `f64`.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::client::FusionSolarClient;
use crate::clock::Clock;
use crate::error::{ApiError, Result};
use crate::http::Transport;

#[derive(Debug, Clone, PartialEq)]
pub struct KpiRow {
    pub collect_time: DateTime<Utc>,
    /// Metric name to value. `None` where the server reported `null`.
    pub values: BTreeMap<String, Option<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KpiTable {
    pub rows: Vec<KpiRow>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Point {
    collect_time: i64,
    #[serde(default)]
    data_item_map: Map<String, Value>,
}

impl KpiTable {
    /// Build a table from a full response envelope.
    pub fn from_payload(payload: &Value) -> Result<Self> {
        let points = match payload.get("data") {
            None | Some(Value::Null) => return Ok(Self::default()),
            Some(Value::Array(points)) => points,
            Some(other) => {
                return Err(ApiError::InvalidPayload(format!("`data` is not a list: {other}")))
            }
        };

        let mut rows = Vec::with_capacity(points.len());
        for point in points {
            let point: Point = serde_json::from_value(point.clone())
                .map_err(|e| ApiError::InvalidPayload(e.to_string()))?;
            let collect_time = Utc
                .timestamp_millis_opt(point.collect_time)
                .single()
                .ok_or_else(|| {
                    ApiError::InvalidPayload(format!("collectTime out of range: {}", point.collect_time))
                })?;

            let mut values = BTreeMap::new();
            for (name, value) in point.data_item_map {
                let number = coerce(&value).ok_or_else(|| {
                    ApiError::InvalidPayload(format!("{name} is not numeric: {value}"))
                })?;
                values.insert(name, number);
            }
            rows.push(KpiRow { collect_time, values });
        }
        Ok(Self { rows })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Every metric name seen in any row, sorted.
    pub fn columns(&self) -> Vec<&str> {
        let names: BTreeSet<&str> = self
            .rows
            .iter()
            .flat_map(|row| row.values.keys().map(String::as_str))
            .collect();
        names.into_iter().collect()
    }

    /// One entry per row; `None` where the row lacks the metric or it was null.
    pub fn column(&self, name: &str) -> Vec<Option<f64>> {
        self.rows
            .iter()
            .map(|row| row.values.get(name).copied().flatten())
            .collect()
    }

    pub fn row_at(&self, collect_time: DateTime<Utc>) -> Option<&KpiRow> {
        self.rows.iter().find(|row| row.collect_time == collect_time)
    }
}

/// `Some(None)` for null, `Some(Some(x))` for numbers and numeric strings.
fn coerce(value: &Value) -> Option<Option<f64>> {
    match value {
        Value::Null => Some(None),
        Value::Number(n) => n.as_f64().map(Some),
        Value::String(s) => s.trim().parse::<f64>().ok().map(Some),
        Value::Bool(b) => Some(Some(if *b { 1.0 } else { 0.0 })),
        _ => None,
    }
}

impl<T: Transport, C: Clock> FusionSolarClient<T, C> {
    /// Daily KPIs of a plant for the month containing `date`, as a table.
    pub fn get_kpi_day_table(&self, station_code: &str, date: DateTime<Utc>) -> Result<KpiTable> {
        let payload = self.get_station_kpi_day(station_code, date)?;
        KpiTable::from_payload(&payload)
    }
}
