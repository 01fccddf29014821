use crate::{calendar::YearInfo, plan::Plan};

/// One date-level BY* filter. A stage whose selector is absent passes every
/// day through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Stage {
    Month,
    WeekNo,
    Weekday,
    Easter,
    MonthDay,
    YearDay,
}

/// Stages in the order they narrow a period's days.
pub(crate) const PIPELINE: [Stage; 6] = [
    Stage::Month,
    Stage::WeekNo,
    Stage::Weekday,
    Stage::Easter,
    Stage::MonthDay,
    Stage::YearDay,
];

impl Stage {
    fn is_active(self, plan: &Plan, info: &YearInfo) -> bool {
        match self {
            Stage::Month => !plan.by_month.is_empty(),
            Stage::WeekNo => info.week_no_mask.is_some(),
            Stage::Weekday => !plan.by_weekday.is_empty() || info.nth_weekday_mask.is_some(),
            Stage::Easter => info.easter_mask.is_some(),
            Stage::MonthDay => !(plan.by_month_day.is_empty() && plan.by_neg_month_day.is_empty()),
            Stage::YearDay => !plan.by_year_day.is_empty(),
        }
    }

    fn keeps(self, plan: &Plan, info: &YearInfo, day: usize) -> bool {
        let marked = |mask: &Option<Vec<bool>>| {
            mask.as_ref()
                .and_then(|mask| mask.get(day).copied())
                .unwrap_or(false)
        };

        match self {
            Stage::Month => plan.by_month.contains(&info.month(day)),
            Stage::WeekNo => marked(&info.week_no_mask),
            // Plain and ordinal weekdays widen each other.
            Stage::Weekday => {
                plan.by_weekday.contains(&info.weekday(day as isize))
                    || marked(&info.nth_weekday_mask)
            }
            Stage::Easter => marked(&info.easter_mask),
            Stage::MonthDay => {
                plan.by_month_day.contains(&info.month_day(day))
                    || plan.by_neg_month_day.contains(&info.neg_month_day(day))
            }
            Stage::YearDay => {
                let (len, next_len) = (info.year_len as i32, info.next_year_len as i32);
                let day = day as i32;
                if day < len {
                    plan.by_year_day.contains(&(day + 1)) || plan.by_year_day.contains(&(day - len))
                } else {
                    plan.by_year_day.contains(&(day + 1 - len))
                        || plan.by_year_day.contains(&(day - len - next_len))
                }
            }
        }
    }

    pub(crate) fn apply(self, plan: &Plan, info: &YearInfo, mut days: Vec<usize>) -> Vec<usize> {
        if self.is_active(plan, info) {
            days.retain(|&day| self.keeps(plan, info, day));
        }
        days
    }
}

/// Runs a period's candidate days through every stage.
pub(crate) fn apply(plan: &Plan, info: &YearInfo, days: Vec<usize>) -> Vec<usize> {
    PIPELINE
        .iter()
        .fold(days, |days, stage| stage.apply(plan, info, days))
}
