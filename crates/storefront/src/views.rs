//! Small presentation helpers shared by route handlers.

use chrono::{DateTime, Utc};
use kitabwale_core::OrderStatus;
use kitabwale_core::checkout::CheckoutStep;

/// "3 days ago" style age of a listing or order.
#[must_use]
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds().max(0);
    let (count, unit) = match seconds {
        0..60 => return "just now".to_string(),
        60..3_600 => (seconds / 60, "minute"),
        3_600..86_400 => (seconds / 3_600, "hour"),
        86_400..2_592_000 => (seconds / 86_400, "day"),
        2_592_000..31_536_000 => (seconds / 2_592_000, "month"),
        _ => (seconds / 31_536_000, "year"),
    };
    let plural = if count == 1 { "" } else { "s" };
    format!("{count} {unit}{plural} ago")
}

/// Age of an optional timestamp, empty when unknown.
#[must_use]
pub fn listed_ago(then: Option<DateTime<Utc>>) -> String {
    then.map(|then| relative_time(then, Utc::now()))
        .unwrap_or_default()
}

/// One stage on the order-status tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusStage {
    pub label: &'static str,
    pub reached: bool,
    pub current: bool,
}

/// Tracker stages for an order. Cancelled orders show only that stage.
#[must_use]
pub fn status_stages(status: OrderStatus) -> Vec<StatusStage> {
    if status == OrderStatus::Cancelled {
        return vec![StatusStage {
            label: OrderStatus::Cancelled.label(),
            reached: true,
            current: true,
        }];
    }
    [
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ]
    .into_iter()
    .map(|stage| StatusStage {
        label: stage.label(),
        reached: stage.progress_index() <= status.progress_index(),
        current: stage == status,
    })
    .collect()
}

/// One step on the checkout progress bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepView {
    pub number: u8,
    pub label: &'static str,
    pub done: bool,
    pub active: bool,
}

#[must_use]
pub fn checkout_steps(current: CheckoutStep) -> Vec<StepView> {
    CheckoutStep::ALL
        .into_iter()
        .map(|step| StepView {
            number: step.number(),
            label: step.display_name(),
            done: step.number() < current.number(),
            active: step == current,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    #[test]
    fn test_relative_time_units() {
        let now = now();
        assert_eq!(relative_time(now - Duration::seconds(10), now), "just now");
        assert_eq!(relative_time(now - Duration::minutes(1), now), "1 minute ago");
        assert_eq!(relative_time(now - Duration::hours(5), now), "5 hours ago");
        assert_eq!(relative_time(now - Duration::days(3), now), "3 days ago");
        assert_eq!(relative_time(now - Duration::days(65), now), "2 months ago");
        assert_eq!(relative_time(now - Duration::days(800), now), "2 years ago");
    }

    #[test]
    fn test_future_timestamps_are_just_now() {
        let now = now();
        assert_eq!(relative_time(now + Duration::hours(1), now), "just now");
    }

    #[test]
    fn test_status_stages() {
        let stages = status_stages(OrderStatus::Shipped);
        assert_eq!(stages.len(), 3);
        assert!(stages.iter().take(2).all(|s| s.reached));
        assert!(stages.iter().any(|s| s.current && s.label == "Shipped"));
        assert_eq!(status_stages(OrderStatus::Cancelled).len(), 1);
    }

    #[test]
    fn test_checkout_steps() {
        let steps = checkout_steps(CheckoutStep::Address);
        assert!(steps.iter().any(|s| s.done && s.label == "Cart"));
        assert!(steps.iter().any(|s| s.active && s.label == "Address"));
    }
}
