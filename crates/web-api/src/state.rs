use std::sync::Arc;

use application::{ChatService, Clock, RoomResolver};

use crate::hub::HubHandle;

#[derive(Clone)]
pub struct AppState {
    pub chat_service: Arc<ChatService>,
    pub room_resolver: Arc<RoomResolver>,
    pub clock: Arc<dyn Clock>,
    pub hub: HubHandle,
}

impl AppState {
    pub fn new(
        chat_service: Arc<ChatService>,
        room_resolver: Arc<RoomResolver>,
        clock: Arc<dyn Clock>,
        hub: HubHandle,
    ) -> Self {
        Self {
            chat_service,
            room_resolver,
            clock,
            hub,
        }
    }
}
