//! Value records exchanged with the coordination service.
//!
//! Plain data carriers with value semantics: node metadata ([`Stat`]),
//! access-control entries ([`Acl`]) and the resumable session identity
//! ([`SessionId`]). All of them serialize with serde so embedders can marshal
//! them into their own containers.


use serde::Deserialize;
use serde::Serialize;

use crate::constants::perm;

/// Maximum length of a session secret, fixed by the wire protocol.
pub const SESSION_PASSWD_LEN: usize = 16;

/// Node metadata as reported by the service.
///
/// A defaulted (all-zero) `Stat` accompanies error completions so callers
/// always receive the full reply shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    pub czxid: i64,
    pub mzxid: i64,
    pub ctime: i64,
    pub mtime: i64,
    pub version: i32,
    pub cversion: i32,
    pub aversion: i32,
    pub ephemeral_owner: i64,
    pub data_length: i32,
    pub num_children: i32,
    pub pzxid: i64,
}

/// One access-control entry: permission bits plus a scheme-qualified
/// identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acl {
    pub perms: u32,
    pub scheme: String,
    pub id: String,
}

impl Acl {
    pub fn new(
        perms: u32,
        scheme: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            perms,
            scheme: scheme.into(),
            id: id.into(),
        }
    }
}

/// Ordered permission list. Compared entry by entry with structural
/// equality (the derived `PartialEq` on [`Acl`]).
pub type AclList = Vec<Acl>;

/// The world-readable, world-writable default permission list.
pub fn open_acl_unsafe() -> AclList {
    vec![Acl::new(perm::ALL, "world", "anyone")]
}

/// A read-only-for-everyone permission list.
pub fn read_acl_unsafe() -> AclList {
    vec![Acl::new(perm::READ, "world", "anyone")]
}

/// Session identity handed out by the service and replayed on reconnect so
/// an existing session can be resumed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionId {
    pub client_id: i64,
    pub passwd: Vec<u8>,
}

impl SessionId {
    pub fn new(
        client_id: i64,
        passwd: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            client_id,
            passwd: passwd.into(),
        }
    }

    /// The secret must fit the protocol's fixed-size password field.
    pub fn is_valid(&self) -> bool {
        self.passwd.len() <= SESSION_PASSWD_LEN
    }
}
