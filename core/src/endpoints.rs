//! Named FusionSolar operations.
//!
//! Each method only shapes its arguments into `Params` and calls
//! `FusionSolarClient::execute`. Recommended call quotas per day, as
//! published by the vendor, are noted where they are tight.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::client::{FusionSolarClient, Params};
use crate::clock::Clock;
use crate::error::Result;
use crate::http::Transport;

/// Command for `devOnOff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlType {
    PowerOn = 1,
    PowerOff = 2,
}

impl ControlType {
    pub fn code(self) -> i64 {
        self as i64
    }
}

/// Whole seconds since the Unix epoch, times 1000. Sub-second precision is dropped.
pub fn epoch_millis(time: DateTime<Utc>) -> i64 {
    time.timestamp() * 1000
}

fn station(station_code: &str) -> Params {
    let mut params = Params::new();
    params.insert("stationCodes".to_string(), json!(station_code));
    params
}

fn station_at(station_code: &str, date: DateTime<Utc>) -> Params {
    let mut params = station(station_code);
    params.insert("collectTime".to_string(), json!(epoch_millis(date)));
    params
}

fn device(dev_id: &str, dev_type_id: i64) -> Params {
    let mut params = Params::new();
    params.insert("devIds".to_string(), json!(dev_id));
    params.insert("devTypeId".to_string(), json!(dev_type_id));
    params
}

fn device_at(dev_id: &str, dev_type_id: i64, date: DateTime<Utc>) -> Params {
    let mut params = device(dev_id, dev_type_id);
    params.insert("collectTime".to_string(), json!(epoch_millis(date)));
    params
}

impl<T: Transport, C: Clock> FusionSolarClient<T, C> {
    /// Authorized plants. 24 calls/day.
    pub fn get_station_list(&self) -> Result<Value> {
        self.execute("getStationList", Params::new())
    }

    /// Real-time plant data, refreshed every 5 minutes. 288 calls/day.
    pub fn get_station_kpi_real(&self, station_code: &str) -> Result<Value> {
        self.execute("getStationRealKpi", station(station_code))
    }

    /// Hourly plant data for the day containing `date`. 24 calls/day.
    pub fn get_station_kpi_hour(&self, station_code: &str, date: DateTime<Utc>) -> Result<Value> {
        self.execute("getKpiStationHour", station_at(station_code, date))
    }

    /// Daily plant data for the month containing `date`. 1 call/day.
    pub fn get_station_kpi_day(&self, station_code: &str, date: DateTime<Utc>) -> Result<Value> {
        self.execute("getKpiStationDay", station_at(station_code, date))
    }

    pub fn get_station_kpi_month(&self, station_code: &str, date: DateTime<Utc>) -> Result<Value> {
        self.execute("getKpiStationMonth", station_at(station_code, date))
    }

    /// 1 call/day.
    pub fn get_station_kpi_year(&self, station_code: &str, date: DateTime<Utc>) -> Result<Value> {
        self.execute("getKpiStationYear", station_at(station_code, date))
    }

    /// Devices of a plant. Needed before any device-level query. 1 call/day.
    pub fn get_dev_list(&self, station_code: &str) -> Result<Value> {
        self.execute("getDevList", station(station_code))
    }

    pub fn get_dev_kpi_real(&self, dev_id: &str, dev_type_id: i64) -> Result<Value> {
        self.execute("getDevRealKpi", device(dev_id, dev_type_id))
    }

    pub fn get_dev_kpi_fivemin(
        &self,
        dev_id: &str,
        dev_type_id: i64,
        date: DateTime<Utc>,
    ) -> Result<Value> {
        self.execute("getDevFiveMinutes", device_at(dev_id, dev_type_id, date))
    }

    pub fn get_dev_kpi_hour(&self, dev_id: &str, dev_type_id: i64, date: DateTime<Utc>) -> Result<Value> {
        self.execute("getDevKpiHour", device_at(dev_id, dev_type_id, date))
    }

    /// 24 calls/day.
    pub fn get_dev_kpi_day(&self, dev_id: &str, dev_type_id: i64, date: DateTime<Utc>) -> Result<Value> {
        self.execute("getDevKpiDay", device_at(dev_id, dev_type_id, date))
    }

    pub fn get_dev_kpi_month(&self, dev_id: &str, dev_type_id: i64, date: DateTime<Utc>) -> Result<Value> {
        self.execute("getDevKpiMonth", device_at(dev_id, dev_type_id, date))
    }

    pub fn get_dev_kpi_year(&self, dev_id: &str, dev_type_id: i64, date: DateTime<Utc>) -> Result<Value> {
        self.execute("getDevKpiYear", device_at(dev_id, dev_type_id, date))
    }

    /// Power a device on or off.
    pub fn dev_on_off(&self, dev_id: &str, dev_type_id: i64, control: ControlType) -> Result<Value> {
        let mut params = device(dev_id, dev_type_id);
        params.insert("controlType".to_string(), json!(control.code()));
        self.execute("devOnOff", params)
    }

    pub fn dev_upgrade(&self, dev_id: &str, dev_type_id: i64) -> Result<Value> {
        self.execute("devUpgrade", device(dev_id, dev_type_id))
    }

    pub fn get_dev_upgrade_info(&self, dev_id: &str, dev_type_id: i64) -> Result<Value> {
        self.execute("getDevUpgradeInfo", device(dev_id, dev_type_id))
    }
}
