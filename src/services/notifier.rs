//! Fire-and-forget buyer notifications.
//!
//! Confirmation emails are pushed onto an unbounded channel and delivered by a
//! single spawned worker, so neither the checkout response nor the webhook's
//! 200 acknowledgment ever waits on (or fails because of) the mailer.

use crate::errors::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub enum Notification {
  PurchaseConfirmed {
    recipient_email: String,
    recipient_name: String,
    order_id: Uuid,
    total: Decimal,
  },
}

#[async_trait]
pub trait Mailer: Send + Sync {
  async fn send(&self, to: &str, from: &str, subject: &str, body: &str) -> Result<()>;
}

/// Mailer that only traces the message. Stands in for a real SMTP/API sender.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
  async fn send(&self, to: &str, _from: &str, subject: &str, _body: &str) -> Result<()> {
    info!("Sending email: To='{}', Subject='{}'", to, subject);
    Ok(())
  }
}

#[derive(Clone)]
pub struct Notifier {
  tx: mpsc::UnboundedSender<Notification>,
}

impl Notifier {
  /// Spawns the delivery worker and returns the enqueue handle.
  pub fn spawn(mailer: Arc<dyn Mailer>, sender_address: String) -> Self {
    let (tx, mut rx) = mpsc::unbounded_channel::<Notification>();
    tokio::spawn(async move {
      while let Some(job) = rx.recv().await {
        if let Err(e) = deliver(mailer.as_ref(), &sender_address, &job).await {
          // Best-effort: a failed notification never propagates anywhere.
          warn!(error = %e, "Failed to deliver notification.");
        }
      }
      info!("Notification worker shutting down.");
    });
    Self { tx }
  }

  pub fn enqueue(&self, notification: Notification) {
    if self.tx.send(notification).is_err() {
      warn!("Notification worker is gone; dropping notification.");
    }
  }
}

async fn deliver(mailer: &dyn Mailer, sender_address: &str, job: &Notification) -> Result<()> {
  match job {
    Notification::PurchaseConfirmed {
      recipient_email,
      recipient_name,
      order_id,
      total,
    } => {
      let (subject, body) = render_purchase_confirmation(recipient_name, *order_id, *total);
      mailer.send(recipient_email, sender_address, &subject, &body).await
    }
  }
}

fn render_purchase_confirmation(recipient_name: &str, order_id: Uuid, total: Decimal) -> (String, String) {
  let subject = format!("Thank you for your AromaZen purchase! (Order #{})", order_id.simple());
  let body = format!(
    "Hello {},\n\n\
     Your payment has been confirmed!\n\n\
     Order details:\n\
     - ID: #{}\n\
     - Total: ${}\n\n\
     We are preparing your shipment and will let you know when it is on its way.",
    recipient_name,
    order_id.simple(),
    total
  );
  (subject, body)
}

#[cfg(test)]
mod tests {
  use super::*;
  use rust_decimal_macros::dec;
  use std::sync::Mutex;

  #[derive(Default)]
  struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>, // (to, subject)
  }

  #[async_trait]
  impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, _from: &str, subject: &str, _body: &str) -> Result<()> {
      self.sent.lock().unwrap().push((to.to_string(), subject.to_string()));
      Ok(())
    }
  }

  struct FailingMailer;

  #[async_trait]
  impl Mailer for FailingMailer {
    async fn send(&self, _to: &str, _from: &str, _subject: &str, _body: &str) -> Result<()> {
      Err(crate::errors::AppError::Internal("smtp down".to_string()))
    }
  }

  #[tokio::test]
  async fn enqueued_notification_reaches_the_mailer() {
    let mailer = Arc::new(RecordingMailer::default());
    let notifier = Notifier::spawn(mailer.clone(), "noreply@aromazen.example".to_string());
    let order_id = Uuid::new_v4();
    notifier.enqueue(Notification::PurchaseConfirmed {
      recipient_email: "buyer@example.com".to_string(),
      recipient_name: "Ana".to_string(),
      order_id,
      total: dec!(20.00),
    });

    // Give the worker a chance to drain the channel.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let sent = mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "buyer@example.com");
    assert!(sent[0].1.contains(&order_id.simple().to_string()));
  }

  #[tokio::test]
  async fn mailer_failure_is_absorbed() {
    let notifier = Notifier::spawn(Arc::new(FailingMailer), "noreply@aromazen.example".to_string());
    notifier.enqueue(Notification::PurchaseConfirmed {
      recipient_email: "buyer@example.com".to_string(),
      recipient_name: "Ana".to_string(),
      order_id: Uuid::new_v4(),
      total: dec!(20.00),
    });
    // Nothing to assert beyond "does not panic / does not block".
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
  }

  #[test]
  fn confirmation_body_mentions_order_and_total() {
    let order_id = Uuid::new_v4();
    let (subject, body) = render_purchase_confirmation("Ana", order_id, dec!(31.50));
    assert!(subject.contains("AromaZen"));
    assert!(body.contains("Ana"));
    assert!(body.contains("$31.50"));
  }
}
