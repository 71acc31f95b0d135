//! 连接枢纽。
//!
//! 进程内唯一的在线连接注册表。注册表只被枢纽自己的协调循环
//! 读写，外部一律通过事件通道提交 Register / Unregister /
//! Broadcast，循环按到达顺序逐个处理，注册表因此不需要锁。
//!
//! 投递策略：对每个匹配的接收者做非阻塞入队。队列满说明消费端
//! 已经停滞，这一条消息对该接收者丢弃，并强制断开该连接。
//! 协调循环绝不能在任何一个接收者上等待，否则整个进程的消息
//! 投递都会停下来。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use domain::{RoomId, UserId};
use tokio::sync::{mpsc, Notify};
use uuid::Uuid;

use crate::protocol::ServerFrame;

/// 每连接出站队列容量，固定上限即唯一的背压信号。
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// 连接唯一标识。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 注册表里的一条连接：出站队列的生产端加上强制断开信号。
/// socket 本身始终归连接 actor 所有，枢纽只持有引用句柄。
#[derive(Clone)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    pub room_id: RoomId,
    pub user_id: UserId,
    outbound: mpsc::Sender<ServerFrame>,
    shutdown: Arc<Notify>,
}

impl ConnectionHandle {
    /// 建立句柄和它的出站队列；接收端交给连接的写循环。
    pub fn new(
        id: ConnectionId,
        room_id: RoomId,
        user_id: UserId,
    ) -> (Self, mpsc::Receiver<ServerFrame>) {
        let (outbound, receiver) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        (
            Self {
                id,
                room_id,
                user_id,
                outbound,
                shutdown: Arc::new(Notify::new()),
            },
            receiver,
        )
    }

    /// 非阻塞入队。队列满或接收端已消失时返回 Err。
    pub fn try_enqueue(
        &self,
        frame: ServerFrame,
    ) -> Result<(), mpsc::error::TrySendError<ServerFrame>> {
        self.outbound.try_send(frame)
    }

    /// 写循环等待的断开信号。
    pub fn shutdown_signal(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    fn force_close(&self) {
        self.shutdown.notify_one();
    }
}

/// 提交给协调循环的事件。
pub enum HubEvent {
    Register(ConnectionHandle),
    Unregister(ConnectionId),
    Broadcast { room_id: RoomId, frame: ServerFrame },
}

/// 协调循环本体。除了自己的 run 循环，没有任何代码接触注册表。
pub struct Hub {
    registry: HashMap<ConnectionId, ConnectionHandle>,
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

impl Hub {
    pub fn new() -> Self {
        Self {
            registry: HashMap::new(),
        }
    }

    /// 启动协调循环任务，返回事件提交句柄。整个进程只跑一个。
    pub fn spawn() -> HubHandle {
        let (events, receiver) = mpsc::unbounded_channel();
        tokio::spawn(Hub::new().run(receiver));
        HubHandle { events }
    }

    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<HubEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_event(event);
        }
        tracing::info!("hub coordination loop stopped");
    }

    fn handle_event(&mut self, event: HubEvent) {
        match event {
            HubEvent::Register(handle) => {
                tracing::debug!(
                    connection_id = %handle.id,
                    user_id = %handle.user_id,
                    room_id = %handle.room_id,
                    "connection registered"
                );
                self.registry.insert(handle.id, handle);
            }
            HubEvent::Unregister(id) => {
                // 注销即关闭出站队列，写循环随之终止；重复注销是空操作
                if let Some(handle) = self.registry.remove(&id) {
                    handle.force_close();
                    tracing::debug!(connection_id = %id, "connection unregistered");
                }
            }
            HubEvent::Broadcast { room_id, frame } => self.broadcast(room_id, frame),
        }
    }

    fn broadcast(&mut self, room_id: RoomId, frame: ServerFrame) {
        let mut stalled = Vec::new();

        for handle in self.registry.values() {
            if handle.room_id != room_id {
                continue;
            }
            match handle.try_enqueue(frame.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(
                        connection_id = %handle.id,
                        user_id = %handle.user_id,
                        "outbound queue full, dropping frame and disconnecting slow consumer"
                    );
                    stalled.push(handle.id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    stalled.push(handle.id);
                }
            }
        }

        for id in stalled {
            if let Some(handle) = self.registry.remove(&id) {
                handle.force_close();
            }
        }
    }

    #[cfg(test)]
    fn is_registered(&self, id: ConnectionId) -> bool {
        self.registry.contains_key(&id)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.registry.len()
    }
}

/// 事件提交句柄，可随意克隆；所有方法都不等待枢纽。
#[derive(Clone)]
pub struct HubHandle {
    events: mpsc::UnboundedSender<HubEvent>,
}

impl HubHandle {
    pub fn register(&self, handle: ConnectionHandle) {
        self.submit(HubEvent::Register(handle));
    }

    pub fn unregister(&self, id: ConnectionId) {
        self.submit(HubEvent::Unregister(id));
    }

    pub fn broadcast(&self, room_id: RoomId, frame: ServerFrame) {
        self.submit(HubEvent::Broadcast { room_id, frame });
    }

    fn submit(&self, event: HubEvent) {
        if self.events.send(event).is_err() {
            tracing::warn!("hub coordination loop is gone, event dropped");
        }
    }
}
