use crate::models::ChecklistItem;

/// The one place a relationship's progress percentage is derived.
///
/// Hidden items are excluded from both numerator and denominator; an empty
/// visible set yields zero.
pub fn progress(items: &[ChecklistItem]) -> u8 {
    let mut total = 0u32;
    let mut completed = 0u32;
    for item in items.iter().filter(|i| i.visible()) {
        total += 1;
        if item.completed {
            completed += 1;
        }
    }
    if total == 0 {
        return 0;
    }
    ((f64::from(completed) / f64::from(total)) * 100.0).round() as u8
}
