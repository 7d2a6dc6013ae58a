//! Deterministic sample data for examples, `feast init` and tests.

pub mod driver_data {
    use chrono::{DateTime, Duration, Utc};
    use std::io;

    pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
    pub const HEADER: [&str; 6] = ["datetime", "driver_id", "conv_rate", "acc_rate", "avg_daily_trips", "created"];

    /// One hourly statistics row of one driver.
    #[derive(Debug, Clone, PartialEq)]
    pub struct DriverStats {
        pub datetime: DateTime<Utc>,
        pub driver_id: i64,
        pub conv_rate: f32,
        pub acc_rate: f32,
        pub avg_daily_trips: i64,
        pub created: DateTime<Utc>,
    }

    /// A value in `[0, 1)` with three decimals, fixed for a given driver, hour and salt.
    fn unit(driver_id: i64, hour: i64, salt: u8) -> f32 {
        let bucket = u16::try_from(fxhash::hash64(&(driver_id, hour, salt)) % 1000).unwrap_or_default();
        f32::from(bucket) / 1000.0
    }

    /// Hourly rows for every driver in `[start, end)`, hours outer, drivers inner. `created`
    /// is `end` for every row.
    #[must_use]
    pub fn create_driver_hourly_stats(
        driver_ids: &[i64],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<DriverStats> {
        let mut rows = Vec::new();
        let mut datetime = start;
        while datetime < end {
            let hour = datetime.timestamp() / 3600;
            for &driver_id in driver_ids {
                rows.push(DriverStats {
                    datetime,
                    driver_id,
                    conv_rate: unit(driver_id, hour, 0),
                    acc_rate: unit(driver_id, hour, 1),
                    avg_daily_trips: (fxhash::hash64(&(driver_id, hour, 2_u8)) % 1000).cast_signed(),
                    created: end,
                });
            }
            datetime += Duration::hours(1);
        }
        rows
    }

    pub fn write_csv(rows: &[DriverStats], writer: impl io::Write) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(HEADER)?;
        for row in rows {
            writer.write_record([
                row.datetime.format(DATETIME_FORMAT).to_string(),
                row.driver_id.to_string(),
                row.conv_rate.to_string(),
                row.acc_rate.to_string(),
                row.avg_daily_trips.to_string(),
                row.created.format(DATETIME_FORMAT).to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn rows_are_hourly_and_deterministic() {
            let start = DateTime::from_timestamp(1_618_214_400, 0).unwrap();
            let end = start + Duration::hours(3);

            let rows = create_driver_hourly_stats(&[1001, 1002], start, end);
            assert_eq!(rows.len(), 6);
            assert_eq!(rows[0].datetime, start);
            assert_eq!(rows[5].datetime, start + Duration::hours(2));
            assert!(rows.iter().all(|r| (0.0..1.0).contains(&r.conv_rate) && r.created == end));
            assert_eq!(rows, create_driver_hourly_stats(&[1001, 1002], start, end));
        }

        #[test]
        fn csv_has_expected_header() {
            let start = DateTime::from_timestamp(1_618_214_400, 0).unwrap();
            let rows = create_driver_hourly_stats(&[1001], start, start + Duration::hours(1));
            let mut out = Vec::new();
            write_csv(&rows, &mut out).unwrap();

            let text = String::from_utf8(out).unwrap();
            let mut lines = text.lines();
            assert_eq!(lines.next(), Some("datetime,driver_id,conv_rate,acc_rate,avg_daily_trips,created"));
            assert!(lines.next().unwrap().starts_with("2021-04-12 08:00:00,1001,"));
        }
    }
}
