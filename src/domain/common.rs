use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies entities that expose a stable unique identifier.
pub trait Identifiable {
    fn id(&self) -> Uuid;
}

/// Linear lookup over a collection of identifiable entities.
pub fn find_by_id<T: Identifiable>(items: &[T], id: Uuid) -> Option<&T> {
    items.iter().find(|item| item.id() == id)
}

pub fn find_by_id_mut<T: Identifiable>(items: &mut [T], id: Uuid) -> Option<&mut T> {
    items.iter_mut().find(|item| item.id() == id)
}

/// Supplies a presentation-ready label for UI or logs.
pub trait Displayable {
    fn display_label(&self) -> String;
}

/// Inclusive date range used to scope entries and declarations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Builds a range, returning `None` when `end` precedes `start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn year(year: i32) -> Option<Self> {
        Self::new(
            NaiveDate::from_ymd_opt(year, 1, 1)?,
            NaiveDate::from_ymd_opt(year, 12, 31)?,
        )
    }

    /// Calendar quarter `1..=4` of `year`.
    pub fn quarter(year: i32, quarter: u8) -> Option<Self> {
        if !(1..=4).contains(&quarter) {
            return None;
        }
        let first_month = u32::from(quarter - 1) * 3 + 1;
        let start = NaiveDate::from_ymd_opt(year, first_month, 1)?;
        let end = if quarter == 4 {
            NaiveDate::from_ymd_opt(year, 12, 31)?
        } else {
            NaiveDate::from_ymd_opt(year, first_month + 3, 1)?.pred_opt()?
        };
        Self::new(start, end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Narrows the range by optional lower/upper bounds.
    pub fn clamp(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self {
            start: from.map_or(self.start, |from| from.max(self.start)),
            end: to.map_or(self.end, |to| to.min(self.end)),
        }
    }
}

// Re-export common dependencies so consumers can rely on this module as a façade.
pub use chrono;
pub use serde;
pub use uuid;

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn quarter_bounds_cover_calendar_year() {
        let q1 = DateRange::quarter(2024, 1).unwrap();
        assert_eq!((q1.start, q1.end), (date(2024, 1, 1), date(2024, 3, 31)));
        let q3 = DateRange::quarter(2024, 3).unwrap();
        assert_eq!((q3.start, q3.end), (date(2024, 7, 1), date(2024, 9, 30)));
        let q4 = DateRange::quarter(2024, 4).unwrap();
        assert_eq!((q4.start, q4.end), (date(2024, 10, 1), date(2024, 12, 31)));
        assert!(DateRange::quarter(2024, 5).is_none());
        assert!(DateRange::quarter(2024, 0).is_none());
    }

    #[test]
    fn clamp_keeps_range_inside_bounds() {
        let year = DateRange::year(2024).unwrap();
        let narrowed = year.clamp(Some(date(2023, 6, 1)), Some(date(2024, 2, 10)));
        assert_eq!(narrowed.start, date(2024, 1, 1));
        assert_eq!(narrowed.end, date(2024, 2, 10));
    }
}
