mod cli;
mod report;

use chrono::{NaiveDateTime, Timelike};

use crate::classify::Classifier;
use crate::config::Settings;
use crate::db::Database;
use crate::ledger::LedgerService;

pub(crate) use cli::{as_cli, print_usage};

/// What every command works against.
pub(crate) struct Shop<'a> {
    pub(crate) db: &'a mut Database,
    pub(crate) settings: &'a Settings,
    pub(crate) classifier: &'a Classifier,
}

impl<'a> Shop<'a> {
    pub(crate) fn new(db: &'a mut Database, settings: &'a Settings, classifier: &'a Classifier) -> Self {
        Self {
            db,
            settings,
            classifier,
        }
    }

    pub(crate) fn ledger(&mut self) -> LedgerService<'_> {
        LedgerService::new(self.db, self.settings, self.classifier)
    }
}

/// Shop-local wall clock, to the second.
pub(crate) fn now() -> NaiveDateTime {
    let now = chrono::Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}
