//! Role-specific alert message text.
//!
//! Owner and collaborator wording differ only in the possessive used for
//! the garden; the information carried is identical.

use verdant_entity::alert::Alert;
use verdant_entity::garden::RecipientRole;
use verdant_entity::notification::NotificationCategory;

/// Composes notification text for alert events.
#[derive(Debug, Clone, Copy)]
pub struct AlertMessageFormatter {
    /// Reminder lead time, quoted in reminder text.
    lead_minutes: u32,
}

impl AlertMessageFormatter {
    /// Create a formatter quoting `lead_minutes` in reminders.
    pub fn new(lead_minutes: u32) -> Self {
        Self { lead_minutes }
    }

    /// Text for every category except the personalised completion batch.
    pub fn compose(
        &self,
        category: NotificationCategory,
        role: RecipientRole,
        alert: &Alert,
    ) -> String {
        let garden = garden_ref(role, &alert.garden_name);
        let time = alert.scheduled_time.format("%H:%M");
        let date = alert.scheduled_date.format("%Y-%m-%d");

        match category {
            NotificationCategory::Creation => format!(
                "New irrigation alert for {garden} on {date} at {time}: {}.",
                alert.description
            ),
            NotificationCategory::Reminder => format!(
                "Irrigation for {garden} starts in {} minutes ({time}): {}.",
                self.lead_minutes, alert.description
            ),
            NotificationCategory::Overdue => {
                format!("It is time to water {garden}: {}.", alert.description)
            }
            NotificationCategory::Completed => self.completed(role, alert),
            NotificationCategory::Cancelled => format!(
                "The irrigation alert for {garden} on {date} at {time} was cancelled."
            ),
        }
    }

    /// Generic completion text, for recipients online at completion.
    pub fn completed(&self, role: RecipientRole, alert: &Alert) -> String {
        format!(
            "Irrigation of {} is complete: {}.",
            garden_ref(role, &alert.garden_name),
            alert.description
        )
    }

    /// Completion text for an offline recipient, naming who was online.
    pub fn completed_while_away(
        &self,
        role: RecipientRole,
        alert: &Alert,
        online: &[&str],
    ) -> String {
        format!(
            "{} handled the irrigation of {} while you were away: {}.",
            join_names(online),
            garden_ref(role, &alert.garden_name),
            alert.description
        )
    }

    /// Text sent to everyone when nobody was online at completion.
    pub fn lapsed(&self, role: RecipientRole, alert: &Alert) -> String {
        format!(
            "The irrigation alert for {} lapsed with nobody online: {}.",
            garden_ref(role, &alert.garden_name),
            alert.description
        )
    }
}

fn garden_ref(role: RecipientRole, garden_name: &str) -> String {
    match role {
        RecipientRole::Owner => format!("your garden '{garden_name}'"),
        RecipientRole::Collaborator => format!("the garden '{garden_name}'"),
    }
}

/// "a", "a and b", "a, b and c".
fn join_names(names: &[&str]) -> String {
    match names {
        [] => String::new(),
        [only] => (*only).to_string(),
        [rest @ .., last] => format!("{} and {last}", rest.join(", ")),
    }
}
