//! In-memory engine simulation for driver, session and adapter tests.
//!
//! [`SimHandle`] owns a small node tree plus the session bookkeeping; the
//! [`SimEngine`]/[`SimTransport`]/[`SimConnector`] trio wraps it behind the
//! engine trait seams. Submitted requests queue until the next processing
//! step, mirroring the asynchronous completion discipline of a real engine,
//! and the transport signals readiness whenever work is queued.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::constants::Code;
use crate::constants::EventType;
use crate::constants::SessionState;
use crate::engine::CallReply;
use crate::engine::Completion;
use crate::engine::EngineConnector;
use crate::engine::EngineOp;
use crate::engine::Interest;
use crate::engine::InterestSet;
use crate::engine::Payload;
use crate::engine::ReadySet;
use crate::engine::SessionEngine;
use crate::engine::Transport;
use crate::engine::Watch;
use crate::engine::WatchSignal;
use crate::record::AclList;
use crate::record::SessionId;
use crate::record::Stat;
use crate::session::SessionSettings;

/// Which mutation class a registered sim watch observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatchKind {
    /// Node create/delete/change (exists, get).
    Data,
    /// Child list change on the node (get_children variants).
    Child,
}

struct SimWatch {
    path: String,
    kind: WatchKind,
    target: Watch,
}

#[derive(Clone, Default)]
struct SimNode {
    value: Option<Vec<u8>>,
    acl: AclList,
    version: i32,
    ephemeral: bool,
}

impl SimNode {
    fn stat(&self) -> Stat {
        Stat {
            version: self.version,
            data_length: self.value.as_ref().map_or(0, |v| v.len() as i32),
            ephemeral_owner: if self.ephemeral { 1 } else { 0 },
            ..Stat::default()
        }
    }
}

struct SimState {
    nodes: HashMap<String, SimNode>,
    watches: Vec<SimWatch>,
    pending: Vec<(EngineOp, Completion)>,
    injected: Vec<WatchSignal>,

    state: SessionState,
    /// The first processing step after a connect completes the handshake.
    handshake_pending: bool,
    session_watch: bool,
    transport_dead: bool,

    sequence: u64,
    connect_count: usize,
    process_count: usize,
    auth_count: usize,

    fail_next_submit: Option<Code>,
    fail_interest: Option<Code>,
}

impl SimState {
    fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            watches: Vec::new(),
            pending: Vec::new(),
            injected: Vec::new(),
            state: SessionState::NotConnected,
            handshake_pending: false,
            session_watch: false,
            transport_dead: false,
            sequence: 0,
            connect_count: 0,
            process_count: 0,
            auth_count: 0,
            fail_next_submit: None,
            fail_interest: None,
        }
    }
}

/// Shared control surface over one simulated service, handed to tests.
pub struct SimHandle {
    state: Mutex<SimState>,
    /// Woken whenever queued work appears, so the transport wait returns.
    work: Notify,
}

impl SimHandle {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SimState::new()),
            work: Notify::new(),
        })
    }

    pub fn connector(self: &Arc<Self>) -> Arc<SimConnector> {
        Arc::new(SimConnector {
            handle: self.clone(),
        })
    }

    /// Seed a node directly, bypassing the request path.
    pub fn add_node(
        &self,
        path: &str,
        value: Option<&[u8]>,
    ) {
        let mut state = self.state.lock();
        state.nodes.insert(
            path.to_string(),
            SimNode {
                value: value.map(|v| v.to_vec()),
                ..SimNode::default()
            },
        );
    }

    pub fn has_node(
        &self,
        path: &str,
    ) -> bool {
        self.state.lock().nodes.contains_key(path)
    }

    /// Drop the transport; the next interest query reports no descriptor.
    pub fn kill_transport(&self) {
        self.state.lock().transport_dead = true;
        self.work.notify_waiters();
    }

    /// Fail exactly one upcoming submission with `code`.
    pub fn fail_next_submit(
        &self,
        code: Code,
    ) {
        self.state.lock().fail_next_submit = Some(code);
    }

    /// Fail every upcoming interest query with `code`.
    pub fn fail_interest(
        &self,
        code: Code,
    ) {
        self.state.lock().fail_interest = Some(code);
        self.work.notify_waiters();
    }

    /// Queue a raw watch signal for the next processing step.
    pub fn inject_signal(
        &self,
        signal: WatchSignal,
    ) {
        self.state.lock().injected.push(signal);
        self.work.notify_waiters();
    }

    pub fn connect_count(&self) -> usize {
        self.state.lock().connect_count
    }

    pub fn process_count(&self) -> usize {
        self.state.lock().process_count
    }

    pub fn auth_count(&self) -> usize {
        self.state.lock().auth_count
    }

    pub fn session_watch_enabled(&self) -> bool {
        self.state.lock().session_watch
    }

    fn has_work(&self) -> bool {
        let state = self.state.lock();
        state.handshake_pending
            || !state.pending.is_empty()
            || !state.injected.is_empty()
            || state.transport_dead
            || state.fail_interest.is_some()
    }
}

pub struct SimConnector {
    handle: Arc<SimHandle>,
}

impl EngineConnector for SimConnector {
    fn connect(
        &self,
        _settings: &SessionSettings,
    ) -> Result<Box<dyn SessionEngine>, Code> {
        let mut state = self.handle.state.lock();
        state.connect_count += 1;
        state.transport_dead = false;
        state.handshake_pending = true;
        state.state = SessionState::Connecting;
        drop(state);
        self.handle.work.notify_waiters();
        Ok(Box::new(SimEngine {
            handle: self.handle.clone(),
            transport: Arc::new(SimTransport {
                handle: self.handle.clone(),
            }),
        }))
    }
}

pub struct SimTransport {
    handle: Arc<SimHandle>,
}

#[async_trait]
impl Transport for SimTransport {
    async fn ready(
        &self,
        _wanted: ReadySet,
        timeout: Duration,
    ) -> ReadySet {
        // Arm the notification before checking so a notify between the
        // check and the wait is not lost.
        loop {
            let notified = self.handle.work.notified();
            if self.handle.has_work() {
                return ReadySet {
                    readable: true,
                    writable: false,
                };
            }
            tokio::select! {
                _ = notified => {}
                _ = tokio::time::sleep(timeout) => return ReadySet::default(),
            }
        }
    }
}

pub struct SimEngine {
    handle: Arc<SimHandle>,
    transport: Arc<dyn Transport>,
}

impl SimEngine {
    fn ok(payload: Payload) -> CallReply {
        CallReply {
            code: Code::Ok,
            payload,
        }
    }

    fn err(
        code: Code,
        payload: Payload,
    ) -> CallReply {
        CallReply { code, payload }
    }

    /// Fire the sim watches matching `path`/`kind`, collecting signals.
    fn fire_watches(
        state: &mut SimState,
        path: &str,
        kind: WatchKind,
        event_type: EventType,
        signals: &mut Vec<WatchSignal>,
    ) {
        let mut kept = Vec::with_capacity(state.watches.len());
        for watch in state.watches.drain(..) {
            if watch.path == path && watch.kind == kind {
                let token = match watch.target {
                    Watch::Local(token) => Some(token),
                    _ => None,
                };
                signals.push(WatchSignal {
                    token,
                    event_type,
                    state: SessionState::Connected,
                    path: path.to_string(),
                });
            } else {
                kept.push(watch);
            }
        }
        state.watches = kept;
    }

    fn register_watch(
        state: &mut SimState,
        path: &str,
        kind: WatchKind,
        target: Watch,
    ) {
        if target != Watch::None {
            state.watches.push(SimWatch {
                path: path.to_string(),
                kind,
                target,
            });
        }
    }

    fn parent_of(path: &str) -> Option<String> {
        let idx = path.rfind('/')?;
        if idx == 0 {
            Some("/".to_string())
        } else {
            Some(path[..idx].to_string())
        }
    }

    fn children_of(
        state: &SimState,
        path: &str,
    ) -> Vec<String> {
        let prefix = if path == "/" {
            "/".to_string()
        } else {
            format!("{path}/")
        };
        let mut children: Vec<String> = state
            .nodes
            .keys()
            .filter_map(|p| {
                let rest = p.strip_prefix(&prefix)?;
                if rest.is_empty() || rest.contains('/') {
                    None
                } else {
                    Some(rest.to_string())
                }
            })
            .collect();
        children.sort();
        children
    }

    fn execute(
        state: &mut SimState,
        op: EngineOp,
        signals: &mut Vec<WatchSignal>,
    ) -> CallReply {
        match op {
            EngineOp::Create {
                path,
                value,
                acl,
                flags,
            } => {
                let sequential = flags & crate::constants::create_flag::SEQUENCE != 0;
                let name = if sequential {
                    state.sequence += 1;
                    format!("{path}{:010}", state.sequence)
                } else {
                    path
                };
                if state.nodes.contains_key(&name) {
                    return Self::err(Code::NodeExists, Payload::Name { name: None });
                }
                state.nodes.insert(
                    name.clone(),
                    SimNode {
                        value,
                        acl,
                        version: 0,
                        ephemeral: flags & crate::constants::create_flag::EPHEMERAL != 0,
                    },
                );
                Self::fire_watches(state, &name, WatchKind::Data, EventType::Created, signals);
                if let Some(parent) = Self::parent_of(&name) {
                    Self::fire_watches(state, &parent, WatchKind::Child, EventType::Child, signals);
                }
                Self::ok(Payload::Name { name: Some(name) })
            }

            EngineOp::Delete { path, version } => {
                let Some(node) = state.nodes.get(&path) else {
                    return Self::err(Code::NoNode, Payload::None);
                };
                if version >= 0 && node.version != version {
                    return Self::err(Code::BadVersion, Payload::None);
                }
                state.nodes.remove(&path);
                Self::fire_watches(state, &path, WatchKind::Data, EventType::Deleted, signals);
                if let Some(parent) = Self::parent_of(&path) {
                    Self::fire_watches(state, &parent, WatchKind::Child, EventType::Child, signals);
                }
                Self::ok(Payload::None)
            }

            EngineOp::Exists { path, watch } => {
                // An exists watch is valid on a missing node too.
                Self::register_watch(state, &path, WatchKind::Data, watch);
                match state.nodes.get(&path) {
                    Some(node) => Self::ok(Payload::Exists {
                        exists: true,
                        stat: node.stat(),
                    }),
                    None => Self::err(
                        Code::NoNode,
                        Payload::Exists {
                            exists: false,
                            stat: Stat::default(),
                        },
                    ),
                }
            }

            EngineOp::Get { path, watch } => match state.nodes.get(&path) {
                Some(node) => {
                    let reply = Self::ok(Payload::Data {
                        value: node.value.clone(),
                        stat: node.stat(),
                    });
                    Self::register_watch(state, &path, WatchKind::Data, watch);
                    reply
                }
                None => Self::err(
                    Code::NoNode,
                    Payload::Data {
                        value: None,
                        stat: Stat::default(),
                    },
                ),
            },

            EngineOp::Set {
                path,
                value,
                version,
            } => {
                let Some(node) = state.nodes.get_mut(&path) else {
                    return Self::err(
                        Code::NoNode,
                        Payload::Stat {
                            stat: Stat::default(),
                        },
                    );
                };
                if version >= 0 && node.version != version {
                    return Self::err(
                        Code::BadVersion,
                        Payload::Stat {
                            stat: Stat::default(),
                        },
                    );
                }
                node.value = Some(value);
                node.version += 1;
                let stat = node.stat();
                Self::fire_watches(state, &path, WatchKind::Data, EventType::Changed, signals);
                Self::ok(Payload::Stat { stat })
            }

            EngineOp::GetChildren { path, watch } => {
                if !state.nodes.contains_key(&path) {
                    return Self::err(Code::NoNode, Payload::Children { children: None });
                }
                Self::register_watch(state, &path, WatchKind::Child, watch);
                Self::ok(Payload::Children {
                    children: Some(Self::children_of(state, &path)),
                })
            }

            EngineOp::GetChildren2 { path, watch } => {
                let Some(node) = state.nodes.get(&path) else {
                    return Self::err(
                        Code::NoNode,
                        Payload::ChildrenStat {
                            children: None,
                            stat: Stat::default(),
                        },
                    );
                };
                let stat = node.stat();
                Self::register_watch(state, &path, WatchKind::Child, watch);
                Self::ok(Payload::ChildrenStat {
                    children: Some(Self::children_of(state, &path)),
                    stat,
                })
            }

            EngineOp::Sync { path } => Self::ok(Payload::Name { name: Some(path) }),

            EngineOp::GetAcl { path } => match state.nodes.get(&path) {
                Some(node) => Self::ok(Payload::AclStat {
                    acl: Some(node.acl.clone()),
                    stat: node.stat(),
                }),
                None => Self::err(
                    Code::NoNode,
                    Payload::AclStat {
                        acl: None,
                        stat: Stat::default(),
                    },
                ),
            },

            EngineOp::SetAcl { path, version, acl } => {
                let Some(node) = state.nodes.get_mut(&path) else {
                    return Self::err(Code::NoNode, Payload::None);
                };
                if version >= 0 && node.version != version {
                    return Self::err(Code::BadVersion, Payload::None);
                }
                node.acl = acl;
                Self::ok(Payload::None)
            }

            EngineOp::AddAuth { .. } => {
                state.auth_count += 1;
                Self::ok(Payload::None)
            }
        }
    }
}

impl SessionEngine for SimEngine {
    fn interest(&mut self) -> Result<Interest, Code> {
        let state = self.handle.state.lock();
        if let Some(code) = state.fail_interest {
            return Err(code);
        }
        if state.transport_dead {
            return Ok(Interest {
                transport: None,
                wants: InterestSet::default(),
                timeout: Duration::from_millis(50),
            });
        }
        Ok(Interest {
            transport: Some(self.transport.clone()),
            wants: InterestSet {
                read: true,
                write: !state.pending.is_empty(),
            },
            timeout: Duration::from_millis(500),
        })
    }

    fn process(
        &mut self,
        _events: InterestSet,
    ) -> Vec<WatchSignal> {
        let mut state = self.handle.state.lock();
        state.process_count += 1;

        let mut signals = Vec::new();
        if state.handshake_pending {
            state.handshake_pending = false;
            state.state = SessionState::Connected;
            if state.session_watch {
                signals.push(WatchSignal {
                    token: None,
                    event_type: EventType::Session,
                    state: SessionState::Connected,
                    path: String::new(),
                });
            }
        }

        signals.append(&mut state.injected);

        let pending = std::mem::take(&mut state.pending);
        for (op, completion) in pending {
            let reply = Self::execute(&mut state, op, &mut signals);
            let _ = completion.send(reply);
        }

        signals
    }

    fn state(&self) -> SessionState {
        self.handle.state.lock().state
    }

    fn session_id(&self) -> SessionId {
        SessionId {
            client_id: 7,
            passwd: vec![0; 16],
        }
    }

    fn submit(
        &mut self,
        op: EngineOp,
        completion: Completion,
    ) -> Code {
        let mut state = self.handle.state.lock();
        if let Some(code) = state.fail_next_submit.take() {
            return code;
        }
        state.pending.push((op, completion));
        drop(state);
        self.handle.work.notify_waiters();
        Code::Ok
    }

    fn watch_session_events(
        &mut self,
        enabled: bool,
    ) {
        self.handle.state.lock().session_watch = enabled;
    }

    fn close(&mut self) -> Code {
        let mut state = self.handle.state.lock();
        state.state = SessionState::Closed;
        // Dropping the queued completions wakes their callers closed.
        state.pending.clear();
        Code::Ok
    }
}

/// Default settings pointing at the simulated service.
pub fn sim_settings() -> SessionSettings {
    SessionSettings::new("sim:2181", Duration::from_millis(5000))
        .with_reconnect_backoff(Duration::from_millis(20))
        .with_deterministic_conn_order(true)
}
