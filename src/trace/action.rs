//! Classification of packed blktrace action codes.
//!
//! An action code packs three things into 32 bits:
//!
//! - bits 16..32: category flags ([`CategorySet`]), any combination may be set
//! - bit 7: cgroup accounting flag
//! - bits 0..7: subtype, looked up in [`NotifySubtype`] when the NOTIFY
//!   category is present and in [`Action`] otherwise

use bitflags::bitflags;
use serde::Serialize;
use std::fmt;

use crate::error::ClassificationError;

pub const CATEGORY_MASK: u32 = 0xffff_0000;
pub const CGROUP_FLAG: u32 = 0x0000_0080;
pub const SUBTYPE_MASK: u32 = 0x0000_007f;

bitflags! {
    /// I/O phase and kind flags from the upper half of an action code.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
    #[serde(transparent)]
    pub struct CategorySet: u32 {
        const READ = 1 << 16;
        const WRITE = 1 << 17;
        const FLUSH = 1 << 18;
        const SYNC = 1 << 19;
        /// Queueing and merging.
        const QUEUE = 1 << 20;
        const REQUEUE = 1 << 21;
        const ISSUE = 1 << 22;
        const COMPLETE = 1 << 23;
        const FS = 1 << 24;
        const PC = 1 << 25;
        /// Session metadata rather than an I/O event.
        const NOTIFY = 1 << 26;
        const AHEAD = 1 << 27;
        const META = 1 << 28;
        const DISCARD = 1 << 29;
        /// Binary driver data.
        const DRV_DATA = 1 << 30;
        const FUA = 1 << 31;
    }
}

impl fmt::Display for CategorySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("-");
        }
        let mut first = true;
        for (name, _) in self.iter_names() {
            if !first {
                f.write_str("|")?;
            }
            f.write_str(name)?;
            first = false;
        }
        Ok(())
    }
}

/// Subtype vocabulary of ordinary (non-notify) records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Queue = 1,
    Backmerge = 2,
    Frontmerge = 3,
    Getrq = 4,
    Sleeprq = 5,
    Requeue = 6,
    Issue = 7,
    Complete = 8,
    Plug = 9,
    UnplugIo = 10,
    UnplugTimer = 11,
    Insert = 12,
    Split = 13,
    Bounce = 14,
    Remap = 15,
    Abort = 16,
    DrvData = 17,
}

impl Action {
    pub const ALL: [Action; 17] = [
        Action::Queue,
        Action::Backmerge,
        Action::Frontmerge,
        Action::Getrq,
        Action::Sleeprq,
        Action::Requeue,
        Action::Issue,
        Action::Complete,
        Action::Plug,
        Action::UnplugIo,
        Action::UnplugTimer,
        Action::Insert,
        Action::Split,
        Action::Bounce,
        Action::Remap,
        Action::Abort,
        Action::DrvData,
    ];

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|a| *a as u32 == code)
    }

    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            Action::Queue => "QUEUE",
            Action::Backmerge => "BACKMERGE",
            Action::Frontmerge => "FRONTMERGE",
            Action::Getrq => "GETRQ",
            Action::Sleeprq => "SLEEPRQ",
            Action::Requeue => "REQUEUE",
            Action::Issue => "ISSUE",
            Action::Complete => "COMPLETE",
            Action::Plug => "PLUG",
            Action::UnplugIo => "UNPLUG_IO",
            Action::UnplugTimer => "UNPLUG_TIMER",
            Action::Insert => "INSERT",
            Action::Split => "SPLIT",
            Action::Bounce => "BOUNCE",
            Action::Remap => "REMAP",
            Action::Abort => "ABORT",
            Action::DrvData => "DRV_DATA",
        }
    }
}

/// Subtype vocabulary of notify records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotifySubtype {
    /// Establishes a pid to process name mapping.
    Process = 0,
    /// Carries the wall-clock time at trace start.
    Timestamp = 1,
    /// Free-text message.
    Message = 2,
}

impl NotifySubtype {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(NotifySubtype::Process),
            1 => Some(NotifySubtype::Timestamp),
            2 => Some(NotifySubtype::Message),
            _ => None,
        }
    }

    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            NotifySubtype::Process => "PROCESS",
            NotifySubtype::Timestamp => "TIMESTAMP",
            NotifySubtype::Message => "MESSAGE",
        }
    }
}

/// Subtype of a record, keyed by whether the NOTIFY category is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Subtype {
    Ordinary(Action),
    Notify(NotifySubtype),
}

impl Subtype {
    pub fn code(self) -> u32 {
        match self {
            Subtype::Ordinary(a) => a.code(),
            Subtype::Notify(n) => n.code(),
        }
    }
}

impl fmt::Display for Subtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subtype::Ordinary(a) => f.write_str(a.name()),
            Subtype::Notify(n) => write!(f, "NOTIFY:{}", n.name()),
        }
    }
}

/// Result of classifying an action code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Classification {
    pub category: CategorySet,
    pub subtype: Subtype,
    pub cgroup: bool,
}

impl Classification {
    pub fn is_notify(&self) -> bool {
        self.category.contains(CategorySet::NOTIFY)
    }

    /// The notify subtype, if this is a notify record.
    pub fn notify(&self) -> Option<NotifySubtype> {
        match self.subtype {
            Subtype::Notify(n) => Some(n),
            Subtype::Ordinary(_) => None,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "category={} subtype={}", self.category, self.subtype)?;
        if self.cgroup {
            f.write_str(" cgroup")?;
        }
        Ok(())
    }
}

/// Splits an action code into category flags, subtype and cgroup flag.
pub fn classify(action: u32) -> Result<Classification, ClassificationError> {
    let category = CategorySet::from_bits_retain(action & CATEGORY_MASK);
    let cgroup = action & CGROUP_FLAG != 0;
    let code = action & SUBTYPE_MASK;

    let subtype = if category.contains(CategorySet::NOTIFY) {
        NotifySubtype::from_code(code)
            .map(Subtype::Notify)
            .ok_or(ClassificationError::UnknownNotify {
                code: action,
                subtype: code,
            })?
    } else {
        Action::from_code(code)
            .map(Subtype::Ordinary)
            .ok_or(ClassificationError::UnknownAction {
                code: action,
                subtype: code,
            })?
    };

    Ok(Classification {
        category,
        subtype,
        cgroup,
    })
}

/// Packs category flags, subtype and cgroup flag into an action code.
pub fn compose(category: CategorySet, subtype: Subtype, cgroup: bool) -> u32 {
    let mut action = category.bits() | subtype.code();
    if cgroup {
        action |= CGROUP_FLAG;
    }
    action
}
