// SPDX-License-Identifier: GPL-3.0-only

//! Change notifications for pool observers

use tokio::sync::mpsc;
use tracing::warn;

use crate::presentable::Presentable;

/// Everything the pool reports, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum PoolEvent {
    DeviceAdded(String),
    DeviceRemoved(String),
    DeviceChanged(String),
    DeviceJobChanged(String),
    PresentableAdded(Presentable),
    PresentableRemoved(Presentable),
    PresentableChanged(Presentable),
    PresentableJobChanged(Presentable),
}

/// Typed callbacks for pool changes. Every method defaults to a no-op.
///
/// Listeners run after the pool has finished applying the event that caused
/// the notification, so queries against the pool see the final state.
pub trait PoolListener: Send {
    fn device_added(&mut self, _id: &str) {}
    fn device_removed(&mut self, _id: &str) {}
    fn device_changed(&mut self, _id: &str) {}
    fn device_job_changed(&mut self, _id: &str) {}
    fn presentable_added(&mut self, _presentable: &Presentable) {}
    fn presentable_removed(&mut self, _presentable: &Presentable) {}
    fn presentable_changed(&mut self, _presentable: &Presentable) {}
    fn presentable_job_changed(&mut self, _presentable: &Presentable) {}
}

/// Handle returned by [`Pool::add_listener`](crate::Pool::add_listener).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

pub(crate) fn dispatch(listener: &mut dyn PoolListener, event: &PoolEvent) {
    match event {
        PoolEvent::DeviceAdded(id) => listener.device_added(id),
        PoolEvent::DeviceRemoved(id) => listener.device_removed(id),
        PoolEvent::DeviceChanged(id) => listener.device_changed(id),
        PoolEvent::DeviceJobChanged(id) => listener.device_job_changed(id),
        PoolEvent::PresentableAdded(p) => listener.presentable_added(p),
        PoolEvent::PresentableRemoved(p) => listener.presentable_removed(p),
        PoolEvent::PresentableChanged(p) => listener.presentable_changed(p),
        PoolEvent::PresentableJobChanged(p) => listener.presentable_job_changed(p),
    }
}

/// Forwards every notification into a tokio channel.
pub struct ChannelListener {
    sender: mpsc::UnboundedSender<PoolEvent>,
}

impl ChannelListener {
    fn forward(&self, event: PoolEvent) {
        if let Err(e) = self.sender.send(event) {
            warn!("Pool event receiver dropped: {e}");
        }
    }
}

/// A listener and the receiving end of its channel.
pub fn channel() -> (ChannelListener, mpsc::UnboundedReceiver<PoolEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (ChannelListener { sender }, receiver)
}

impl PoolListener for ChannelListener {
    fn device_added(&mut self, id: &str) {
        self.forward(PoolEvent::DeviceAdded(id.to_string()));
    }

    fn device_removed(&mut self, id: &str) {
        self.forward(PoolEvent::DeviceRemoved(id.to_string()));
    }

    fn device_changed(&mut self, id: &str) {
        self.forward(PoolEvent::DeviceChanged(id.to_string()));
    }

    fn device_job_changed(&mut self, id: &str) {
        self.forward(PoolEvent::DeviceJobChanged(id.to_string()));
    }

    fn presentable_added(&mut self, presentable: &Presentable) {
        self.forward(PoolEvent::PresentableAdded(presentable.clone()));
    }

    fn presentable_removed(&mut self, presentable: &Presentable) {
        self.forward(PoolEvent::PresentableRemoved(presentable.clone()));
    }

    fn presentable_changed(&mut self, presentable: &Presentable) {
        self.forward(PoolEvent::PresentableChanged(presentable.clone()));
    }

    fn presentable_job_changed(&mut self, presentable: &Presentable) {
        self.forward(PoolEvent::PresentableJobChanged(presentable.clone()));
    }
}
