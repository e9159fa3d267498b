//! Profit aggregation over the sale ledger and CSV rendering.

use crate::SaleRecord;
use chrono::{DateTime, Datelike, Days, NaiveDate, SecondsFormat, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::io;

/// Column order of the sales export.
pub const CSV_HEADER: [&str; 9] = [
    "Date",
    "Brand",
    "Type",
    "Party",
    "Size",
    "Qty",
    "BuyingPrice",
    "SellingPrice",
    "Profit",
];

/// Time window for reports, anchored at local midnight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportRange {
    Today,
    /// Since the most recent Sunday.
    Week,
    Month,
    #[default]
    All,
}

impl From<&str> for ReportRange {
    /// Unknown selectors fall back to `All`.
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "today" => Self::Today,
            "week" => Self::Week,
            "month" => Self::Month,
            _ => Self::All,
        }
    }
}

impl From<Option<&str>> for ReportRange {
    fn from(value: Option<&str>) -> Self {
        value.map(Self::from).unwrap_or_default()
    }
}

impl ReportRange {
    /// Inclusive lower bound for records in this range, in `now`'s zone.
    pub fn since<Tz: TimeZone>(self, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let today = now.date_naive();
        let start = match self {
            Self::All => return None,
            Self::Today => today,
            Self::Week => {
                today.checked_sub_days(Days::new(today.weekday().num_days_from_sunday().into()))?
            }
            Self::Month => today.with_day(1)?,
        };
        midnight(&now.timezone(), start)
    }
}

fn midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Option<DateTime<Tz>> {
    let start = date.and_hms_opt(0, 0, 0)?;
    // Zones that skip midnight on DST change start the day at 01:00.
    tz.from_local_datetime(&start).earliest().or_else(|| {
        tz.from_local_datetime(&(start + chrono::Duration::hours(1)))
            .earliest()
    })
}

/// Sum of `profit`, or `None` if it leaves the `Decimal` range.
pub fn total_profit(sales: &[SaleRecord]) -> Option<Decimal> {
    sales
        .iter()
        .try_fold(Decimal::ZERO, |total, sale| total.checked_add(sale.profit))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitSummary {
    pub range: ReportRange,
    pub total_profit: Decimal,
    pub sale_count: usize,
    pub units_sold: i64,
}

impl ProfitSummary {
    pub fn from_sales(range: ReportRange, sales: &[SaleRecord]) -> Option<Self> {
        Some(Self {
            range,
            total_profit: total_profit(sales)?,
            sale_count: sales.len(),
            units_sold: sales.iter().map(|sale| i64::from(sale.qty)).sum(),
        })
    }
}

/// Renders sales in the given order under [`CSV_HEADER`], quoting as needed.
pub fn sales_csv(sales: &[SaleRecord]) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for sale in sales {
        writer.write_record([
            sale.created_at
                .with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            sale.brand.clone(),
            sale.r#type.clone(),
            sale.party.clone(),
            sale.size.normalize().to_string(),
            sale.qty.to_string(),
            sale.buying_price_at_sale.to_string(),
            sale.selling_price_at_sale.to_string(),
            sale.profit.to_string(),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    String::from_utf8(bytes)
        .map_err(|err| csv::Error::from(io::Error::new(io::ErrorKind::InvalidData, err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset};

    fn at(offset_hours: i32, y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(offset_hours * 3600)
            .unwrap()
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
    }

    fn sale(id: i32, brand: &str, party: &str, profit: i64) -> SaleRecord {
        SaleRecord {
            id,
            item_id: 1,
            brand: brand.to_string(),
            r#type: "Sneaker".to_string(),
            party: party.to_string(),
            size: Decimal::new(850, 2),
            qty: 2,
            selling_price_at_sale: Decimal::from(150),
            buying_price_at_sale: Decimal::from(100),
            profit: Decimal::from(profit),
            customer: None,
            created_at: at(0, 2024, 3, 13, 10, 30),
        }
    }

    #[test]
    fn test_range_parsing_falls_back_to_all() {
        assert_eq!(ReportRange::from("today"), ReportRange::Today);
        assert_eq!(ReportRange::from(" WEEK "), ReportRange::Week);
        assert_eq!(ReportRange::from("month"), ReportRange::Month);
        assert_eq!(ReportRange::from("yesterday"), ReportRange::All);
        assert_eq!(ReportRange::from(None), ReportRange::All);
    }

    #[test]
    fn test_range_bounds() {
        // Wednesday afternoon, UTC+5.
        let now = at(5, 2024, 3, 13, 15, 45);

        assert_eq!(ReportRange::Today.since(&now), Some(at(5, 2024, 3, 13, 0, 0)));
        assert_eq!(ReportRange::Week.since(&now), Some(at(5, 2024, 3, 10, 0, 0)));
        assert_eq!(ReportRange::Month.since(&now), Some(at(5, 2024, 3, 1, 0, 0)));
        assert_eq!(ReportRange::All.since(&now), None);
    }

    #[test]
    fn test_week_starting_on_sunday_is_today() {
        let sunday = at(0, 2024, 3, 10, 9, 0);
        assert_eq!(
            ReportRange::Week.since(&sunday),
            ReportRange::Today.since(&sunday)
        );
    }

    #[test]
    fn test_week_crosses_month_boundary() {
        let tuesday = at(0, 2024, 10, 1, 12, 0);
        assert_eq!(ReportRange::Week.since(&tuesday), Some(at(0, 2024, 9, 29, 0, 0)));
    }

    #[test]
    fn test_today_includes_midnight_and_excludes_the_millisecond_before() {
        let now = at(-4, 2024, 6, 2, 18, 0);
        let bound = ReportRange::Today.since(&now).unwrap();

        let exactly_midnight = at(-4, 2024, 6, 2, 0, 0);
        let just_before = exactly_midnight - Duration::milliseconds(1);

        assert!(exactly_midnight >= bound);
        assert!(just_before < bound);
    }

    #[test]
    fn test_summary_totals() {
        let sales = vec![sale(1, "Nike", "A", 150), sale(2, "Puma", "B", -20)];
        let summary = ProfitSummary::from_sales(ReportRange::All, &sales).unwrap();

        assert_eq!(summary.total_profit, Decimal::from(130));
        assert_eq!(summary.sale_count, 2);
        assert_eq!(summary.units_sold, 4);
        assert_eq!(total_profit(&[]), Some(Decimal::ZERO));
    }

    #[test]
    fn test_total_out_of_range_is_none() {
        let mut big = sale(1, "Nike", "A", 0);
        big.profit = Decimal::MAX;
        let sales = vec![big.clone(), SaleRecord { id: 2, ..big }];

        assert_eq!(total_profit(&sales[..1]), Some(Decimal::MAX));
        assert_eq!(total_profit(&sales), None);
        assert!(ProfitSummary::from_sales(ReportRange::All, &sales).is_none());
    }

    #[test]
    fn test_csv_layout() {
        let csv = sales_csv(&[sale(1, "Nike", "Ahmed Traders", 100)]).unwrap();
        let mut lines = csv.lines();

        assert_eq!(
            lines.next(),
            Some("Date,Brand,Type,Party,Size,Qty,BuyingPrice,SellingPrice,Profit")
        );
        assert_eq!(
            lines.next(),
            Some("2024-03-13T10:30:00.000Z,Nike,Sneaker,Ahmed Traders,8.5,2,100,150,100")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_csv_escaped_fields_parse_back_unchanged() {
        let awkward = SaleRecord {
            r#type: "Kid's \"Zoom\", Sport".to_string(),
            ..sale(1, "Nike, Inc.", "The \"Best\" Shoes\nLahore", 10)
        };
        let csv = sales_csv(&[awkward.clone()]).unwrap();

        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), CSV_HEADER.to_vec());

        let rows: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].iter().collect::<Vec<_>>(),
            vec![
                "2024-03-13T10:30:00.000Z",
                awkward.brand.as_str(),
                awkward.r#type.as_str(),
                awkward.party.as_str(),
                "8.5",
                "2",
                "100",
                "150",
                "10",
            ]
        );
    }

    #[test]
    fn test_csv_with_no_sales_is_header_only() {
        let csv = sales_csv(&[]).unwrap();
        assert_eq!(csv, "Date,Brand,Type,Party,Size,Qty,BuyingPrice,SellingPrice,Profit\n");
    }
}
