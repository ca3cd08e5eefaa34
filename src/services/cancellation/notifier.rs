use log::info;

use crate::services::cancellation::interface::{NotificationSink, WorkflowEvent};

/// Writes workflow events to the application log. Stands in for the real
/// notification transport, which is owned by a separate system.
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify(&self, event: &WorkflowEvent) {
        info!(
            "{}: request={} booking={} status={}",
            event.name,
            event.request_id,
            event.booking_id,
            event.status.as_str()
        );
    }
}
