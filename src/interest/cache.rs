use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::payments::AmortizationSchedule;
use crate::types::{LoanId, Timestamp};

/// what a cached schedule was computed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScheduleKey {
    pub loan_id: LoanId,
    pub from: Timestamp,
    pub to: Timestamp,
    /// version of the rate chain head
    pub chain_version: u64,
    /// version of the loan, bumped by every committed transaction
    pub loan_version: u64,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<ScheduleKey, AmortizationSchedule>,
    order: VecDeque<ScheduleKey>,
}

/// bounded schedule cache, oldest insert evicted first
#[derive(Debug)]
pub struct ScheduleCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

impl ScheduleCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    pub fn get(&self, key: &ScheduleKey) -> Option<AmortizationSchedule> {
        self.inner.lock().entries.get(key).cloned()
    }

    pub fn insert(&self, key: ScheduleKey, schedule: AmortizationSchedule) {
        if self.capacity == 0 {
            return;
        }

        let mut inner = self.inner.lock();
        if inner.entries.insert(key, schedule).is_none() {
            inner.order.push_back(key);
        }
        while inner.entries.len() > self.capacity {
            match inner.order.pop_front() {
                Some(oldest) => {
                    inner.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    /// drop every schedule of a loan; called when its rate chain head moves
    pub fn invalidate_loan(&self, loan_id: LoanId) {
        let mut inner = self.inner.lock();
        inner.entries.retain(|key, _| key.loan_id != loan_id);
        inner.order.retain(|key| key.loan_id != loan_id);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
