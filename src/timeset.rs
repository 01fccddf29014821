use crate::{plan::Plan, Frequency};
use chrono::NaiveTime;

/// Intra-day times each surviving day of a period expands to.
///
/// For frequencies coarser than hourly this is the full hour × minute ×
/// second product. Finer frequencies pin their own unit and everything
/// above it to the cursor; only the finer selectors still multiply.
pub(crate) fn build(plan: &Plan, hour: u32, minute: u32, second: u32) -> Vec<NaiveTime> {
    let pinned = [hour];
    let hours: &[u32] = match plan.freq {
        Frequency::Hourly | Frequency::Minutely | Frequency::Secondly => &pinned,
        _ => &plan.by_hour,
    };
    let pinned_minute = [minute];
    let minutes: &[u32] = match plan.freq {
        Frequency::Minutely | Frequency::Secondly => &pinned_minute,
        _ => &plan.by_minute,
    };
    let pinned_second = [second];
    let seconds: &[u32] = match plan.freq {
        Frequency::Secondly => &pinned_second,
        _ => &plan.by_second,
    };

    // Sorted inputs in nested order give a sorted product.
    hours
        .iter()
        .flat_map(|&h| {
            minutes.iter().flat_map(move |&m| {
                seconds
                    .iter()
                    .filter_map(move |&s| NaiveTime::from_hms_opt(h, m, s))
            })
        })
        .collect()
}

/// Whether the cursor's own time passes the selectors at or above the
/// rule's granularity. A failing cursor contributes no times at all.
pub(crate) fn cursor_selected(plan: &Plan, hour: u32, minute: u32, second: u32) -> bool {
    let passes = |given: &[u32], unit: Frequency, value: u32| {
        plan.freq < unit || given.is_empty() || given.contains(&value)
    };

    passes(&plan.by_hour, Frequency::Hourly, hour)
        && passes(&plan.by_minute, Frequency::Minutely, minute)
        && passes(&plan.by_second, Frequency::Secondly, second)
}

/// Most times one period of a sub-daily rule can hold, `None` for day-level
/// frequencies.
pub(crate) fn period_len(plan: &Plan) -> Option<usize> {
    let len = |given: &[u32]| given.len().max(1);
    match plan.freq {
        Frequency::Hourly => Some(len(&plan.by_minute) * len(&plan.by_second)),
        Frequency::Minutely => Some(len(&plan.by_second)),
        Frequency::Secondly => Some(1),
        _ => None,
    }
}
