//! Stage workflow engine.
//!
//! Every transaction moves through the same seven stages. Each stage is a
//! one-way `pending -> completed` switch, and a transaction is complete once
//! all seven are completed, in whatever order that happened. The canonical
//! order is used for display and for picking the "next" stage only.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use thiserror::Error;

pub const STAGE_COUNT: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    B100Dispatched,
    B100Supplied,
    ReceivingCopyReceived,
    RcUploadedToBuyer,
    RcUploadedToBank,
    AmountReceivedFromBank,
    BankReceivedFromBuyer,
}

impl Stage {
    /// Canonical stage order. Record creation, name parsing, the SQL
    /// completion predicate and serialization all read this list.
    pub const ALL: [Stage; STAGE_COUNT] = [
        Stage::B100Dispatched,
        Stage::B100Supplied,
        Stage::ReceivingCopyReceived,
        Stage::RcUploadedToBuyer,
        Stage::RcUploadedToBank,
        Stage::AmountReceivedFromBank,
        Stage::BankReceivedFromBuyer,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Wire name, as used in stage records and `stageKey` payloads.
    pub const fn as_str(self) -> &'static str {
        match self {
            Stage::B100Dispatched => "b100Dispatched",
            Stage::B100Supplied => "b100Supplied",
            Stage::ReceivingCopyReceived => "receivingCopyReceived",
            Stage::RcUploadedToBuyer => "rcUploadedToBuyer",
            Stage::RcUploadedToBank => "rcUploadedToBank",
            Stage::AmountReceivedFromBank => "amountReceivedFromBank",
            Stage::BankReceivedFromBuyer => "bankReceivedFromBuyer",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Stage::B100Dispatched => "B100 dispatched",
            Stage::B100Supplied => "B100 supplied",
            Stage::ReceivingCopyReceived => "Receiving copy received",
            Stage::RcUploadedToBuyer => "RC uploaded to buyer",
            Stage::RcUploadedToBank => "RC uploaded to bank",
            Stage::AmountReceivedFromBank => "Amount received from bank",
            Stage::BankReceivedFromBuyer => "Bank received from buyer",
        }
    }

    /// Column holding this stage's completion timestamp in `transactions`.
    pub const fn column(self) -> &'static str {
        match self {
            Stage::B100Dispatched => "b100_dispatched_at",
            Stage::B100Supplied => "b100_supplied_at",
            Stage::ReceivingCopyReceived => "receiving_copy_received_at",
            Stage::RcUploadedToBuyer => "rc_uploaded_to_buyer_at",
            Stage::RcUploadedToBank => "rc_uploaded_to_bank_at",
            Stage::AmountReceivedFromBank => "amount_received_from_bank_at",
            Stage::BankReceivedFromBuyer => "bank_received_from_buyer_at",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = StageError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == name)
            .ok_or_else(|| StageError::InvalidStage(name.to_string()))
    }
}

impl Serialize for Stage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StageError {
    #[error("unknown stage '{0}'")]
    InvalidStage(String),

    #[error("stage '{0}' is already completed")]
    AlreadyCompleted(Stage),
}

/// Completion state of a single stage.
///
/// Only the timestamp is stored, so `completed` and `completedAt` cannot
/// disagree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageStatus {
    completed_at: Option<DateTime<Utc>>,
}

impl StageStatus {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}

impl Serialize for StageStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("StageStatus", 2)?;
        state.serialize_field("completed", &self.is_completed())?;
        state.serialize_field("completedAt", &self.completed_at)?;
        state.end()
    }
}

/// Per-transaction stage record, one slot per entry of [`Stage::ALL`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageRecord {
    stages: [StageStatus; STAGE_COUNT],
}

impl StageRecord {
    /// A fresh record with every stage pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a record from stored timestamps, in canonical order.
    pub fn from_timestamps(timestamps: [Option<DateTime<Utc>>; STAGE_COUNT]) -> Self {
        Self {
            stages: timestamps.map(|completed_at| StageStatus { completed_at }),
        }
    }

    pub fn timestamps(&self) -> [Option<DateTime<Utc>>; STAGE_COUNT] {
        self.stages.map(|status| status.completed_at)
    }

    pub fn status(&self, stage: Stage) -> StageStatus {
        self.stages[stage.index()]
    }

    pub fn is_stage_completed(&self, stage: Stage) -> bool {
        self.status(stage).is_completed()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Stage, StageStatus)> + '_ {
        Stage::ALL.into_iter().map(move |stage| (stage, self.status(stage)))
    }

    /// Returns a copy with `stage` completed at `now`. Re-marking a
    /// completed stage is rejected so its original timestamp survives.
    pub fn mark_complete(&self, stage: Stage, now: DateTime<Utc>) -> Result<Self, StageError> {
        if self.is_stage_completed(stage) {
            return Err(StageError::AlreadyCompleted(stage));
        }

        let mut next = self.clone();
        next.stages[stage.index()] = StageStatus {
            completed_at: Some(now),
        };
        Ok(next)
    }

    pub fn is_complete(&self) -> bool {
        self.stages.iter().all(StageStatus::is_completed)
    }

    /// First pending stage in canonical order. Stages may still be completed
    /// in any order; this is a hint for clients, not a gate.
    pub fn next_incomplete(&self) -> Option<Stage> {
        self.iter()
            .find(|(_, status)| !status.is_completed())
            .map(|(stage, _)| stage)
    }

    pub fn completed_count(&self) -> usize {
        self.stages.iter().filter(|status| status.is_completed()).count()
    }
}

impl Serialize for StageRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(STAGE_COUNT))?;
        for (stage, status) in self.iter() {
            map.serialize_entry(stage.as_str(), &status)?;
        }
        map.end()
    }
}

/// Marks the stage named `stage_name`. Unknown names fail before anything
/// else is looked at.
pub fn mark_stage_complete(
    record: &StageRecord,
    stage_name: &str,
    now: DateTime<Utc>,
) -> Result<StageRecord, StageError> {
    let stage: Stage = stage_name.parse()?;
    record.mark_complete(stage, now)
}
