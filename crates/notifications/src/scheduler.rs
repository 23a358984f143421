use chrono::{DateTime, Utc};

use tradedesk_approvals::Escalation;
use tradedesk_contracts::{ContractLifecycleState, Party};
use tradedesk_core::ContractId;
use tradedesk_lifecycle::TradeTypeConfig;

use crate::notification::{
    AutomatedNotification, Channel, NotificationStatus, NotificationType, RecipientType,
};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Whole days until `due_date`, rounded up. Negative once overdue.
pub fn days_until_due(due_date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (due_date - now).num_milliseconds();
    let days = millis.div_euclid(MILLIS_PER_DAY);
    if millis.rem_euclid(MILLIS_PER_DAY) > 0 {
        days + 1
    } else {
        days
    }
}

/// What the current state calls for, if anything.
struct ReminderPlan<'a> {
    notification_type: NotificationType,
    recipient: &'a Party,
    recipient_type: RecipientType,
    channels: &'static [Channel],
    thresholds: &'a [i64],
}

fn plan_for<'a>(
    config: &'a TradeTypeConfig,
    state: ContractLifecycleState,
    buyer: &'a Party,
    seller: &'a Party,
) -> Option<ReminderPlan<'a>> {
    use ContractLifecycleState::*;

    match state {
        AwaitingPayment => Some(ReminderPlan {
            notification_type: NotificationType::PaymentDue,
            recipient: buyer,
            recipient_type: RecipientType::Buyer,
            channels: &[Channel::Chat, Channel::Email, Channel::Dashboard],
            thresholds: &config.payment_due_days,
        }),
        AwaitingDelivery | QualityPassed => Some(ReminderPlan {
            notification_type: NotificationType::DeliveryPending,
            recipient: seller,
            recipient_type: RecipientType::Seller,
            channels: &[Channel::Chat, Channel::Dashboard],
            thresholds: &config.delivery_reminder_days,
        }),
        AwaitingQualityPassing if config.requires_quality_passing => Some(ReminderPlan {
            notification_type: NotificationType::QualityCheckRequired,
            recipient: buyer,
            recipient_type: RecipientType::BothParties,
            channels: &[Channel::Chat, Channel::Dashboard],
            thresholds: &config.quality_check_days,
        }),
        _ => None,
    }
}

fn reminder_message(
    notification_type: NotificationType,
    contract_id: &ContractId,
    days: i64,
) -> String {
    let when = match days {
        d if d < 0 => format!("overdue by {} day(s)", -d),
        0 => "due today".to_string(),
        d => format!("due in {d} day(s)"),
    };
    match notification_type {
        NotificationType::PaymentDue => format!("Payment for contract {contract_id} is {when}"),
        NotificationType::DeliveryPending => {
            format!("Delivery for contract {contract_id} is {when}")
        }
        NotificationType::QualityCheckRequired => {
            format!("Quality check for contract {contract_id} is {when}")
        }
        NotificationType::EscalationRaised => format!("Contract {contract_id} needs attention"),
    }
}

/// Reminders due for a contract in `current_state` with the given due date.
///
/// Each configured threshold is checked on its own: every threshold with
/// `days_until_due <= threshold` yields one notification, so several can be
/// produced in one call. All of them start `Scheduled`.
pub fn generate_automated_reminders(
    contract_id: &ContractId,
    config: &TradeTypeConfig,
    current_state: ContractLifecycleState,
    due_date: DateTime<Utc>,
    buyer: &Party,
    seller: &Party,
    now: DateTime<Utc>,
) -> Vec<AutomatedNotification> {
    let Some(plan) = plan_for(config, current_state, buyer, seller) else {
        return Vec::new();
    };
    let days = days_until_due(due_date, now);
    let message = reminder_message(plan.notification_type, contract_id, days);

    plan.thresholds
        .iter()
        .filter(|&&threshold| days <= threshold)
        .map(|&threshold| {
            AutomatedNotification::scheduled(
                contract_id.clone(),
                plan.notification_type,
                plan.recipient.id.clone(),
                plan.recipient_type,
                plan.channels.to_vec(),
                message.clone(),
                now,
            )
            .with_threshold(threshold)
        })
        .collect()
}

/// Drop reminders whose `(contract, type, threshold)` is already in `history`
/// as scheduled or sent. Failed and cancelled ones may be retried.
pub fn suppress_already_scheduled(
    new: Vec<AutomatedNotification>,
    history: &[AutomatedNotification],
) -> Vec<AutomatedNotification> {
    let seen = |n: &AutomatedNotification| {
        history.iter().any(|h| {
            matches!(h.status, NotificationStatus::Scheduled | NotificationStatus::Sent)
                && h.contract_id == n.contract_id
                && h.notification_type == n.notification_type
                && h.threshold_days == n.threshold_days
        })
    };

    new.into_iter()
        .filter(|n| {
            let duplicate = n.threshold_days.is_some() && seen(n);
            if duplicate {
                tracing::debug!(
                    contract_id = %n.contract_id,
                    notification_type = ?n.notification_type,
                    threshold_days = ?n.threshold_days,
                    "reminder already scheduled, suppressing"
                );
            }
            !duplicate
        })
        .collect()
}

/// Dashboard and email notice for a newly raised escalation.
pub fn escalation_notice(escalation: &Escalation, now: DateTime<Utc>) -> AutomatedNotification {
    AutomatedNotification::scheduled(
        escalation.contract_id.clone(),
        NotificationType::EscalationRaised,
        escalation.escalated_to.as_str(),
        RecipientType::Admin,
        vec![Channel::Dashboard, Channel::Email],
        format!(
            "Escalation on contract {} ({:?}): {}",
            escalation.contract_id, escalation.severity, escalation.description
        ),
        now,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;
    use tradedesk_approvals::{EscalationSeverity, EscalationType};
    use tradedesk_core::Role;
    use ContractLifecycleState::*;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn parties() -> (Party, Party) {
        (Party::new("B-1", "Shree Spinners"), Party::new("S-1", "Rajkot Ginning"))
    }

    fn remind(
        config: &TradeTypeConfig,
        state: ContractLifecycleState,
        due_in: Duration,
    ) -> Vec<AutomatedNotification> {
        let (buyer, seller) = parties();
        let now = test_time();
        generate_automated_reminders(
            &ContractId::new("TC-7"),
            config,
            state,
            now + due_in,
            &buyer,
            &seller,
            now,
        )
    }

    #[test]
    fn days_round_up() {
        let now = test_time();
        assert_eq!(days_until_due(now, now), 0);
        assert_eq!(days_until_due(now + Duration::hours(1), now), 1);
        assert_eq!(days_until_due(now + Duration::days(2), now), 2);
        assert_eq!(days_until_due(now - Duration::hours(1), now), 0);
        assert_eq!(days_until_due(now - Duration::hours(25), now), -1);
    }

    #[test]
    fn due_today_meets_every_cci_payment_threshold() {
        let reminders = remind(&TradeTypeConfig::cci_trade(), AwaitingPayment, Duration::zero());

        assert_eq!(reminders.len(), 3);
        let thresholds: Vec<_> = reminders.iter().filter_map(|n| n.threshold_days).collect();
        assert_eq!(thresholds, vec![3, 1, 0]);
        for n in &reminders {
            assert_eq!(n.notification_type, NotificationType::PaymentDue);
            assert_eq!(n.recipient, "B-1");
            assert_eq!(n.recipient_type, RecipientType::Buyer);
            assert_eq!(n.channels, vec![Channel::Chat, Channel::Email, Channel::Dashboard]);
            assert_eq!(n.status, NotificationStatus::Scheduled);
        }
    }

    #[test]
    fn only_thresholds_already_reached_fire() {
        let normal = TradeTypeConfig::normal_trade();
        let reminders = remind(&normal, AwaitingPayment, Duration::days(5));
        let thresholds: Vec<_> = reminders.iter().filter_map(|n| n.threshold_days).collect();
        assert_eq!(thresholds, vec![7]);

        assert!(remind(&normal, AwaitingPayment, Duration::days(30)).is_empty());
    }

    #[test]
    fn delivery_reminders_go_to_seller() {
        let reminders = remind(&TradeTypeConfig::cci_trade(), QualityPassed, Duration::days(2));
        assert_eq!(reminders.len(), 2);
        assert!(reminders.iter().all(|n| n.recipient == "S-1"
            && n.recipient_type == RecipientType::Seller
            && n.notification_type == NotificationType::DeliveryPending
            && n.channels == vec![Channel::Chat, Channel::Dashboard]));
    }

    #[test]
    fn quality_reminders_only_when_trade_requires_it() {
        let cci = remind(&TradeTypeConfig::cci_trade(), AwaitingQualityPassing, Duration::days(1));
        assert_eq!(cci.len(), 2);
        assert!(cci.iter().all(|n| n.recipient_type == RecipientType::BothParties
            && n.recipient == "B-1"));

        let normal = TradeTypeConfig::normal_trade();
        assert!(remind(&normal, AwaitingQualityPassing, Duration::days(1)).is_empty());
    }

    #[test]
    fn other_states_schedule_nothing() {
        for state in [Draft, Active, Delivered, Paid, Completed, Disputed] {
            assert!(remind(&TradeTypeConfig::cci_trade(), state, Duration::zero()).is_empty());
        }
    }

    #[test]
    fn suppression_keeps_failed_and_new_thresholds() {
        let config = TradeTypeConfig::cci_trade();
        let first = remind(&config, AwaitingPayment, Duration::days(1));
        assert_eq!(first.len(), 2);

        let mut history = first.clone();
        history[1] = history[1].mark_failed().unwrap();

        let again = remind(&config, AwaitingPayment, Duration::zero());
        let kept = suppress_already_scheduled(again, &history);
        let thresholds: Vec<_> = kept.iter().filter_map(|n| n.threshold_days).collect();
        assert_eq!(thresholds, vec![1, 0]);
    }

    #[test]
    fn escalation_notice_targets_admin_channels() {
        let escalation = Escalation::manual(
            ContractId::new("TC-7"),
            EscalationType::Exception,
            EscalationSeverity::High,
            "Bank guarantee expired",
            Role::ADMIN,
            test_time(),
        );
        let notice = escalation_notice(&escalation, test_time());
        assert_eq!(notice.notification_type, NotificationType::EscalationRaised);
        assert_eq!(notice.recipient, "Admin");
        assert_eq!(notice.recipient_type, RecipientType::Admin);
        assert_eq!(notice.channels, vec![Channel::Dashboard, Channel::Email]);
        assert!(notice.threshold_days.is_none());
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, ..ProptestConfig::default() })]

        /// Property: the number of reminders equals the number of thresholds
        /// at or above the days remaining.
        #[test]
        fn reminder_count_matches_reached_thresholds(hours in -240i64..480) {
            let config = TradeTypeConfig::normal_trade();
            let now = test_time();
            let due = now + Duration::hours(hours);
            let days = days_until_due(due, now);
            let (buyer, seller) = parties();

            let reminders = generate_automated_reminders(
                &ContractId::new("TC-P"), &config, AwaitingPayment, due, &buyer, &seller, now,
            );
            let expected = config.payment_due_days.iter().filter(|&&t| days <= t).count();
            prop_assert_eq!(reminders.len(), expected);
        }
    }
}
