//! Typed operation replies and their decoding from the engine's generic
//! result slot.
//!
//! Completion errors travel *inside* these replies: a non-ok `code` arrives
//! alongside nil/zeroed payload fields and the caller inspects it. Only a
//! payload whose shape does not match the operation is an `Err` — that is
//! an adapter invariant violation, not a service error.

use crate::engine::CallReply;
use crate::engine::Payload;
use crate::errors::Error;
use crate::record::AclList;
use crate::record::Stat;
use crate::Code;
use crate::Result;

pub(crate) trait DecodeReply: Sized {
    fn decode(
        reply: CallReply,
        op: &'static str,
    ) -> Result<Self>;
}

/// Status-only reply (`delete`, `set_acl`, `add_auth`).
#[derive(Debug, Clone, PartialEq)]
pub struct AckReply {
    pub code: Code,
}

/// Created/synced node name (`create`, `sync`).
#[derive(Debug, Clone, PartialEq)]
pub struct NameReply {
    pub name: Option<String>,
    pub code: Code,
}

/// Node value plus metadata (`get`, `wget`).
#[derive(Debug, Clone, PartialEq)]
pub struct DataReply {
    pub value: Option<Vec<u8>>,
    pub stat: Stat,
    pub code: Code,
}

/// Existence flag plus metadata (`exists`, `wexists`).
#[derive(Debug, Clone, PartialEq)]
pub struct ExistsReply {
    pub exists: bool,
    pub stat: Stat,
    pub code: Code,
}

/// Metadata only (`set`).
#[derive(Debug, Clone, PartialEq)]
pub struct StatReply {
    pub stat: Stat,
    pub code: Code,
}

/// Child name list (`get_children`, `wget_children`).
#[derive(Debug, Clone, PartialEq)]
pub struct ChildrenReply {
    pub children: Option<Vec<String>>,
    pub code: Code,
}

/// Child name list plus metadata (`get_children2`, `wget_children2`).
#[derive(Debug, Clone, PartialEq)]
pub struct ChildrenStatReply {
    pub children: Option<Vec<String>>,
    pub stat: Stat,
    pub code: Code,
}

/// Permission list plus metadata (`get_acl`).
#[derive(Debug, Clone, PartialEq)]
pub struct AclReply {
    pub acl: Option<AclList>,
    pub stat: Stat,
    pub code: Code,
}

impl DecodeReply for AckReply {
    fn decode(
        reply: CallReply,
        op: &'static str,
    ) -> Result<Self> {
        match reply.payload {
            Payload::None => Ok(Self { code: reply.code }),
            _ => Err(Error::UnexpectedReply { op }),
        }
    }
}

impl DecodeReply for NameReply {
    fn decode(
        reply: CallReply,
        op: &'static str,
    ) -> Result<Self> {
        match reply.payload {
            Payload::Name { name } => Ok(Self {
                name,
                code: reply.code,
            }),
            _ => Err(Error::UnexpectedReply { op }),
        }
    }
}

impl DecodeReply for DataReply {
    fn decode(
        reply: CallReply,
        op: &'static str,
    ) -> Result<Self> {
        match reply.payload {
            Payload::Data { value, stat } => Ok(Self {
                value,
                stat,
                code: reply.code,
            }),
            _ => Err(Error::UnexpectedReply { op }),
        }
    }
}

impl DecodeReply for ExistsReply {
    fn decode(
        reply: CallReply,
        op: &'static str,
    ) -> Result<Self> {
        match reply.payload {
            Payload::Exists { exists, stat } => Ok(Self {
                exists,
                stat,
                code: reply.code,
            }),
            _ => Err(Error::UnexpectedReply { op }),
        }
    }
}

impl DecodeReply for StatReply {
    fn decode(
        reply: CallReply,
        op: &'static str,
    ) -> Result<Self> {
        match reply.payload {
            Payload::Stat { stat } => Ok(Self {
                stat,
                code: reply.code,
            }),
            _ => Err(Error::UnexpectedReply { op }),
        }
    }
}

impl DecodeReply for ChildrenReply {
    fn decode(
        reply: CallReply,
        op: &'static str,
    ) -> Result<Self> {
        match reply.payload {
            Payload::Children { children } => Ok(Self {
                children,
                code: reply.code,
            }),
            _ => Err(Error::UnexpectedReply { op }),
        }
    }
}

impl DecodeReply for ChildrenStatReply {
    fn decode(
        reply: CallReply,
        op: &'static str,
    ) -> Result<Self> {
        match reply.payload {
            Payload::ChildrenStat { children, stat } => Ok(Self {
                children,
                stat,
                code: reply.code,
            }),
            _ => Err(Error::UnexpectedReply { op }),
        }
    }
}

impl DecodeReply for AclReply {
    fn decode(
        reply: CallReply,
        op: &'static str,
    ) -> Result<Self> {
        match reply.payload {
            Payload::AclStat { acl, stat } => Ok(Self {
                acl,
                stat,
                code: reply.code,
            }),
            _ => Err(Error::UnexpectedReply { op }),
        }
    }
}
