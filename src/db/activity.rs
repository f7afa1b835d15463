//! Daily activity aggregates

use chrono::NaiveDate;
use rusqlite::{params, Connection, Result};

use crate::domain::DailyActivityRecord;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn upsert_activity(conn: &Connection, record: &DailyActivityRecord) -> Result<()> {
    conn.execute(
        r#"
    INSERT INTO daily_activity (date, minutes_studied, items_reviewed, items_learned, accuracy_percentage)
    VALUES (?1, ?2, ?3, ?4, ?5)
    ON CONFLICT(date) DO UPDATE SET
      minutes_studied = excluded.minutes_studied,
      items_reviewed = excluded.items_reviewed,
      items_learned = excluded.items_learned,
      accuracy_percentage = excluded.accuracy_percentage
    "#,
        params![
            record.date.format(DATE_FORMAT).to_string(),
            record.minutes_studied,
            record.items_reviewed,
            record.items_learned,
            record.accuracy_percentage,
        ],
    )?;
    Ok(())
}

/// Records with `start <= date <= end`, ascending by date
pub fn get_activity_range(conn: &Connection, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailyActivityRecord>> {
    let mut stmt = conn.prepare(
        r#"
    SELECT date, minutes_studied, items_reviewed, items_learned, accuracy_percentage
    FROM daily_activity
    WHERE date >= ?1 AND date <= ?2
    ORDER BY date ASC
    "#,
    )?;

    let records = stmt
        .query_map(
            params![
                start.format(DATE_FORMAT).to_string(),
                end.format(DATE_FORMAT).to_string()
            ],
            row_to_record,
        )?
        .collect::<Result<Vec<_>>>()?;

    Ok(records)
}

fn row_to_record(row: &rusqlite::Row) -> Result<DailyActivityRecord> {
    let raw: String = row.get(0)?;
    let date = NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(DailyActivityRecord {
        date,
        minutes_studied: row.get(1)?,
        items_reviewed: row.get(2)?,
        items_learned: row.get(3)?,
        accuracy_percentage: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::run_migrations;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn record(d: u32, reviewed: i64) -> DailyActivityRecord {
        DailyActivityRecord {
            date: date(d),
            minutes_studied: 10,
            items_reviewed: reviewed,
            items_learned: 0,
            accuracy_percentage: 90.0,
        }
    }

    #[test]
    fn test_range_is_inclusive_and_sorted() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        for d in [9, 1, 3, 7, 8] {
            upsert_activity(&conn, &record(d, d as i64)).unwrap();
        }

        let records = get_activity_range(&conn, date(3), date(8)).unwrap();
        let days: Vec<_> = records.iter().map(|r| r.date).collect();
        assert_eq!(days, vec![date(3), date(7), date(8)]);
    }

    #[test]
    fn test_upsert_replaces_same_day() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        upsert_activity(&conn, &record(2, 5)).unwrap();
        upsert_activity(&conn, &record(2, 12)).unwrap();

        let records = get_activity_range(&conn, date(1), date(31)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].items_reviewed, 12);
    }
}
