use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::{DateRange, Identifiable};

/// A fiscal year (ejercicio fiscal) scoping entries and declarations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FiscalPeriod {
    pub id: Uuid,
    pub year: i32,
    pub state: PeriodState,
    /// Highest entry number ever assigned in this period.
    #[serde(default)]
    pub last_entry_number: u32,
}

impl FiscalPeriod {
    pub fn new(year: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            year,
            state: PeriodState::Open,
            last_entry_number: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == PeriodState::Open
    }

    pub fn range(&self) -> Option<DateRange> {
        DateRange::year(self.year)
    }
}

impl Identifiable for FiscalPeriod {
    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PeriodState {
    Open,
    Closed,
}
