//! Run-progress reporting.

use tokio::sync::mpsc;

/// Sends human-readable progress and error lines from the pipeline worker
/// to whatever surface is watching the run.
///
/// Sending never blocks the worker. If the receiver has gone away, reports
/// are silently dropped; the run itself must not care whether anyone is
/// listening.
#[derive(Clone, Debug)]
pub(crate) struct Reporter {
    sender: mpsc::UnboundedSender<String>,
}

impl Reporter {
    /// Create a reporter and the receiving end of its channel.
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Reporter { sender }, receiver)
    }

    /// Report one line of progress or error text.
    pub(crate) fn report<S: Into<String>>(&self, message: S) {
        // Fire and forget.
        let _ = self.sender.send(message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_messages_in_order() {
        let (reporter, mut receiver) = Reporter::new();
        reporter.report("one");
        reporter.report("two");
        drop(reporter);
        assert_eq!(receiver.recv().await.as_deref(), Some("one"));
        assert_eq!(receiver.recv().await.as_deref(), Some("two"));
        assert_eq!(receiver.recv().await, None);
    }

    #[test]
    fn report_does_not_fail_without_receiver() {
        let (reporter, receiver) = Reporter::new();
        drop(receiver);
        reporter.report("nobody is listening");
    }
}
