//! Shipments - pending transfers of goods to the home base

use serde::{Deserialize, Serialize};

/// Unique identity of a shipment. Kept across deferrals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShipmentId(pub u64);

impl std::fmt::Display for ShipmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "shipment #{}", self.0)
    }
}

/// A world tile hosting a settlement or the home base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(pub u32);

/// A stack of one kind of item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Good {
    /// Item definition, e.g. "steel".
    pub def: String,
    pub label: String,
    pub count: u32,
}

impl Good {
    pub fn new(def: impl Into<String>, label: impl Into<String>, count: u32) -> Self {
        Self {
            def: def.into(),
            label: label.into(),
            count,
        }
    }

    /// Take up to `count` units off this stack.
    ///
    /// Returns `None` when nothing can be taken. Taking the whole stack leaves
    /// this one at zero.
    pub fn split_off(&mut self, count: u32) -> Option<Good> {
        let taken = count.min(self.count);
        if taken == 0 {
            return None;
        }
        self.count -= taken;
        Some(Good {
            def: self.def.clone(),
            label: self.label.clone(),
            count: taken,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl std::fmt::Display for Good {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} x{}", self.label, self.count)
    }
}

/// One-line summary of goods for notices and logs.
pub fn goods_summary(goods: &[Good]) -> String {
    if goods.is_empty() {
        return "nothing".to_string();
    }
    goods
        .iter()
        .map(|g| g.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LetterKind {
    Positive,
    Neutral,
    Negative,
}

/// A letter shown in the host's letter stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Letter {
    pub kind: LetterKind,
    pub label: String,
    pub text: String,
}

impl Letter {
    pub fn new(kind: LetterKind, label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    Positive,
    Neutral,
    RejectInput,
}

/// A transient one-line message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub kind: MessageKind,
    pub text: String,
}

impl Message {
    pub fn new(kind: MessageKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Custom notification supplied by the producer of a shipment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub letter: Option<Letter>,
    pub message: Option<Message>,
}

/// A pending delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: ShipmentId,
    /// Tile of the sending settlement. Unknown sources are stamped with the
    /// home tile on deferral.
    pub source: Option<TileId>,
    pub goods: Vec<Good>,
    pub trigger_tick: u64,
    /// Set on the first deferral; suppresses repeat deferral notices.
    pub delayed: bool,
    pub notification: Option<Notification>,
    pub description: String,
}

impl Shipment {
    pub fn new(id: ShipmentId, source: Option<TileId>, goods: Vec<Good>, trigger_tick: u64) -> Self {
        Self {
            id,
            source,
            goods,
            trigger_tick,
            delayed: false,
            notification: None,
            description: String::new(),
        }
    }

    pub fn with_notification(mut self, notification: Notification) -> Self {
        self.notification = Some(notification);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}
