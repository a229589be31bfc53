use tokio::sync::watch;

/// Owned by `main`; flipping it asks every loop to stop after its current step.
pub struct ShutdownTrigger {
    sender: watch::Sender<bool>,
}

#[derive(Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (sender, receiver) = watch::channel(false);
    (ShutdownTrigger { sender }, ShutdownSignal { receiver })
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            receiver: self.sender.subscribe(),
        }
    }
}

impl ShutdownSignal {
    /// Resolves once shutdown was requested, or when the trigger is gone.
    pub async fn wait(&mut self) {
        // an Err means the sender was dropped, which also ends the program
        let _ = self.receiver.wait_for(|stopped| *stopped).await;
    }
}
