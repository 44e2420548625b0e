//! Core data structures: daily sales series and the calendar table.

mod calendar;
mod series;

pub use calendar::{Calendar, CalendarRange, CalendarRow, CoveragePolicy, CALENDAR_REGRESSORS};
pub use series::{SalesPoint, SalesSeries};
