//! Text-only message ports between the controller and the presenter.
//!
//! Neither side can reach the other's state: everything crossing the boundary
//! is encoded to JSON on send and decoded on receive.

use crate::error::{EstimatorError, Result};
use crate::protocol::{PluginIntent, PluginMessage};
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;

pub struct Port<Out, In> {
    tx: Sender<String>,
    rx: Receiver<String>,
    side: &'static str,
    _marker: PhantomData<fn(Out) -> In>,
}

/// The controller posts messages and receives intents.
pub type ControllerPort = Port<PluginMessage, PluginIntent>;
/// The presenter posts intents and receives messages.
pub type PresenterPort = Port<PluginIntent, PluginMessage>;

pub fn pair() -> (ControllerPort, PresenterPort) {
    let (to_ui, from_controller) = unbounded();
    let (to_controller, from_ui) = unbounded();
    (
        Port {
            tx: to_ui,
            rx: from_ui,
            side: "controller",
            _marker: PhantomData,
        },
        Port {
            tx: to_controller,
            rx: from_controller,
            side: "presenter",
            _marker: PhantomData,
        },
    )
}

impl<Out: Serialize, In: DeserializeOwned> Port<Out, In> {
    pub fn post(&self, message: &Out) -> Result<()> {
        let raw = serde_json::to_string(message)?;
        self.tx
            .send(raw)
            .map_err(|_| EstimatorError::ChannelClosed(self.side))
    }

    /// Sends pre-encoded text, as a foreign peer would.
    pub fn post_raw(&self, raw: impl Into<String>) -> Result<()> {
        self.tx
            .send(raw.into())
            .map_err(|_| EstimatorError::ChannelClosed(self.side))
    }

    /// Everything received so far, in arrival order. Payloads that do not
    /// decode are logged and dropped.
    pub fn drain(&self) -> Result<Vec<In>> {
        let mut out = vec![];
        loop {
            match self.rx.try_recv() {
                Ok(raw) => match serde_json::from_str::<In>(&raw) {
                    Ok(message) => out.push(message),
                    Err(err) => {
                        tracing::warn!(side = self.side, %err, "dropping undecodable message")
                    }
                },
                Err(TryRecvError::Empty) => return Ok(out),
                Err(TryRecvError::Disconnected) => {
                    if out.is_empty() {
                        return Err(EstimatorError::ChannelClosed(self.side));
                    }
                    return Ok(out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::NodeId;

    #[test]
    fn messages_arrive_in_order() {
        let (controller, presenter) = pair();
        presenter.post(&PluginIntent::CancelEstimate).unwrap();
        presenter
            .post(&PluginIntent::OpenEstimate {
                id: NodeId::from("1:1"),
            })
            .unwrap();

        let got = controller.drain().unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0], PluginIntent::CancelEstimate);
        assert!(controller.drain().unwrap().is_empty());
    }

    #[test]
    fn malformed_payloads_are_dropped() {
        let (controller, presenter) = pair();
        presenter.post_raw("{\"type\":\"nope\"}").unwrap();
        presenter.post_raw("not json").unwrap();
        presenter.post(&PluginIntent::ExportEstimates).unwrap();

        assert_eq!(
            controller.drain().unwrap(),
            vec![PluginIntent::ExportEstimates]
        );
    }

    #[test]
    fn closed_peer_is_an_error() {
        let (controller, presenter) = pair();
        drop(presenter);
        assert!(matches!(
            controller.drain(),
            Err(EstimatorError::ChannelClosed("controller"))
        ));
        assert!(controller.post(&PluginMessage::error("x")).is_err());
    }
}
