//! Notification sinks invoked by the lending service.
//!
//! Sinks are fire-and-forget: the service logs any error they return and
//! carries on. None of them talks to a real mail or SMS gateway.

use std::fmt;

use parking_lot::Mutex;
use tracing::info;

use crate::error::NotifyError;

/// Something that can deliver a message to a contact
pub trait Notifier: Send + Sync {
    /// Deliver `message` to `contact`
    ///
    /// # Errors
    ///
    /// Returns a `NotifyError` if the message could not be delivered
    fn notify(&self, contact: &str, message: &str) -> Result<(), NotifyError>;
}

/// Discards every message
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _contact: &str, _message: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Email-style sink; rejects contacts without an `@`
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailNotifier;

impl Notifier for EmailNotifier {
    fn notify(&self, contact: &str, message: &str) -> Result<(), NotifyError> {
        if !contact.contains('@') {
            return Err(NotifyError::InvalidContact {
                channel: "email",
                contact: contact.to_string(),
            });
        }
        info!(channel = "email", %contact, %message, "Sending notification");
        Ok(())
    }
}

/// SMS-style sink
#[derive(Debug, Clone, Copy, Default)]
pub struct SmsNotifier;

impl Notifier for SmsNotifier {
    fn notify(&self, contact: &str, message: &str) -> Result<(), NotifyError> {
        if contact.trim().is_empty() {
            return Err(NotifyError::InvalidContact {
                channel: "sms",
                contact: contact.to_string(),
            });
        }
        info!(channel = "sms", %contact, %message, "Sending notification");
        Ok(())
    }
}

/// Fans a message out to several sinks.
///
/// Every child is tried even if an earlier one fails; the first failure is
/// reported.
#[derive(Default)]
pub struct CompositeNotifier {
    /// Child sinks in delivery order
    sinks: Vec<Box<dyn Notifier>>,
}

impl CompositeNotifier {
    /// Create a composite with no children
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a child sink
    #[must_use]
    pub fn with(mut self, sink: Box<dyn Notifier>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Number of child sinks
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Whether there are no child sinks
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl fmt::Debug for CompositeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeNotifier").field("sinks_count", &self.sinks.len()).finish()
    }
}

impl Notifier for CompositeNotifier {
    fn notify(&self, contact: &str, message: &str) -> Result<(), NotifyError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.notify(contact, message) {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Keeps every delivered message in memory
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    /// Delivered `(contact, message)` pairs
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything delivered so far
    #[must_use]
    pub fn messages(&self) -> Vec<(String, String)> {
        self.sent.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, contact: &str, message: &str) -> Result<(), NotifyError> {
        self.sent.lock().push((contact.to_string(), message.to_string()));
        Ok(())
    }
}

impl<N: Notifier + ?Sized> Notifier for std::sync::Arc<N> {
    fn notify(&self, contact: &str, message: &str) -> Result<(), NotifyError> {
        (**self).notify(contact, message)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    /// Sink that always fails
    struct Broken;

    impl Notifier for Broken {
        fn notify(&self, _contact: &str, _message: &str) -> Result<(), NotifyError> {
            Err(NotifyError::Delivery { channel: "broken", reason: "offline".to_string() })
        }
    }

    #[test]
    fn email_requires_an_address() {
        assert_eq!(EmailNotifier.notify("john@example.com", "hi"), Ok(()));
        assert!(matches!(
            EmailNotifier.notify("555-0100", "hi"),
            Err(NotifyError::InvalidContact { channel: "email", .. })
        ));
    }

    #[test]
    fn sms_rejects_blank_contact() {
        assert_eq!(SmsNotifier.notify("555-0100", "hi"), Ok(()));
        assert!(SmsNotifier.notify("  ", "hi").is_err());
    }

    #[test]
    fn composite_delivers_to_all_children_despite_failure() {
        let recorder = Arc::new(RecordingNotifier::new());
        let composite = CompositeNotifier::new()
            .with(Box::new(Broken))
            .with(Box::new(Arc::clone(&recorder)))
            .with(Box::new(NoopNotifier));
        assert_eq!(composite.len(), 3);

        let result = composite.notify("m1@x", "borrowed");

        assert!(matches!(result, Err(NotifyError::Delivery { channel: "broken", .. })));
        assert_eq!(recorder.messages(), vec![("m1@x".to_string(), "borrowed".to_string())]);
    }

    #[test]
    fn empty_composite_succeeds() {
        let composite = CompositeNotifier::new();
        assert!(composite.is_empty());
        assert_eq!(composite.notify("anyone", "msg"), Ok(()));
    }
}
