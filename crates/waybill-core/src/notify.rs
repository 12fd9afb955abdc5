//! Notifications - letters and messages for the host UI, and log dedup.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::shipment::{goods_summary, Good, Letter, LetterKind, Message, MessageKind, Shipment, ShipmentId};

/// A user-facing notice referencing the goods involved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Notice {
    Letter {
        shipment: ShipmentId,
        letter: Letter,
        goods: Vec<Good>,
    },
    Message {
        shipment: ShipmentId,
        message: Message,
        goods: Vec<Good>,
    },
}

impl Notice {
    pub fn shipment(&self) -> ShipmentId {
        match self {
            Notice::Letter { shipment, .. } | Notice::Message { shipment, .. } => *shipment,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Notice::Letter { letter, .. } => &letter.text,
            Notice::Message { message, .. } => &message.text,
        }
    }
}

/// Why a shipment was held back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeferReason {
    LandingBlocked,
    DangerTooHigh,
}

/// Outbox drained by the host.
#[derive(Debug, Clone, Default)]
pub struct Notices {
    pending: Vec<Notice>,
}

impl Notices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, notice: Notice) {
        self.pending.push(notice);
    }

    pub fn drain(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.pending)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.pending.iter()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Arrival letter (custom or default), custom message, and a held-up
    /// notice for shipments that were deferred.
    pub fn announce_arrival(&mut self, shipment: &Shipment, goods: &[Good]) {
        let custom = shipment.notification.as_ref();
        let letter = custom
            .and_then(|n| n.letter.clone())
            .unwrap_or_else(|| {
                Letter::new(
                    LetterKind::Positive,
                    "Delivery arrived",
                    format!("A delivery has arrived: {}.", goods_summary(goods)),
                )
            });
        self.push(Notice::Letter {
            shipment: shipment.id,
            letter,
            goods: goods.to_vec(),
        });

        if let Some(message) = custom.and_then(|n| n.message.clone()) {
            self.push(Notice::Message {
                shipment: shipment.id,
                message,
                goods: goods.to_vec(),
            });
        }

        if shipment.delayed {
            self.push(Notice::Message {
                shipment: shipment.id,
                message: Message::new(MessageKind::Positive, "The held-up delivery is arriving."),
                goods: goods.to_vec(),
            });
        }
    }

    pub fn announce_deferral(&mut self, shipment: &Shipment, reason: DeferReason) {
        let summary = goods_summary(&shipment.goods);
        let text = match reason {
            DeferReason::LandingBlocked => {
                format!("Shuttle landing is blocked; the delivery of {summary} is delayed.")
            }
            DeferReason::DangerTooHigh => {
                format!("It is too dangerous for a caravan; the delivery of {summary} is delayed.")
            }
        };
        self.push(Notice::Message {
            shipment: shipment.id,
            message: Message::new(MessageKind::RejectInput, text),
            goods: shipment.goods.clone(),
        });
    }

    pub fn announce_leaving(&mut self, shipment: ShipmentId) {
        self.push(Notice::Message {
            shipment,
            message: Message::new(MessageKind::Neutral, "The delivery party is leaving the map."),
            goods: Vec::new(),
        });
    }
}

/// Logs each distinct error message once.
#[derive(Debug, Clone, Default)]
pub struct ErrorOnce {
    seen: HashSet<u64>,
}

impl ErrorOnce {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log at error level unless this exact message was logged before.
    /// Returns whether it was logged.
    pub fn error(&mut self, message: &str) -> bool {
        let mut hasher = DefaultHasher::new();
        message.hash(&mut hasher);
        if !self.seen.insert(hasher.finish()) {
            return false;
        }
        log::error!("{}", message);
        true
    }
}
