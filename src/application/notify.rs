//! Outbound mail and the view-milestone notification.

use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::entities::{PostRecord, UserRecord};
use crate::domain::milestone::CounterChange;

pub const SENT_TOTAL: &str = "skystore_notifications_sent_total";
pub const FAILED_TOTAL: &str = "skystore_notifications_failed_total";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMail {
    pub subject: String,
    pub body: String,
    pub from: String,
    pub to: Vec<String>,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail transport failed: {0}")]
    Transport(String),
    #[error("mail relay rejected message with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

/// Sender and operator addresses used for system mail.
#[derive(Debug, Clone)]
pub struct MailIdentity {
    pub from: String,
    pub admin: String,
}

/// Send `mail` and swallow failures after logging them.
///
/// Returns whether the mail was accepted by the transport.
pub async fn deliver_best_effort(
    mailer: &dyn Mailer,
    kind: &'static str,
    mail: OutgoingMail,
) -> bool {
    let recipients = mail.to.join(",");
    match mailer.send(mail).await {
        Ok(()) => {
            counter!(SENT_TOTAL, "kind" => kind).increment(1);
            info!(
                target = "skystore::notify",
                kind,
                recipients = %recipients,
                "notification sent"
            );
            true
        }
        Err(err) => {
            counter!(FAILED_TOTAL, "kind" => kind).increment(1);
            warn!(
                target = "skystore::notify",
                kind,
                recipients = %recipients,
                error = %err,
                "notification failed"
            );
            false
        }
    }
}

/// Emits one mail to the operator when a post's view counter crosses the milestone.
#[derive(Clone)]
pub struct MilestoneNotifier {
    mailer: Arc<dyn Mailer>,
    identity: MailIdentity,
    threshold: i64,
}

impl MilestoneNotifier {
    pub fn new(mailer: Arc<dyn Mailer>, identity: MailIdentity, threshold: i64) -> Self {
        Self {
            mailer,
            identity,
            threshold,
        }
    }

    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    /// Call after the counter write has committed.
    ///
    /// Returns whether a notification was attempted.
    pub async fn on_views_changed(&self, post: &PostRecord, change: CounterChange) -> bool {
        if !change.crossed(self.threshold) {
            return false;
        }

        let mail = OutgoingMail {
            subject: format!("Your post reached {} views!", self.threshold),
            body: format!(
                "Your post \"{}\" now has {} views.\n\n\
                 Congratulations! Keep writing, your audience is growing.",
                post.title, change.current
            ),
            from: self.identity.from.clone(),
            to: vec![self.identity.admin.clone()],
        };
        deliver_best_effort(self.mailer.as_ref(), "view_milestone", mail).await;
        true
    }
}

pub fn welcome_mail(user: &UserRecord, from: &str) -> OutgoingMail {
    OutgoingMail {
        subject: "Welcome to SkyStore!".to_string(),
        body: format!(
            "Hello, {}!\n\nThank you for registering at SkyStore. We are glad to see you.",
            user.email
        ),
        from: from.to_string(),
        to: vec![user.email.clone()],
    }
}
