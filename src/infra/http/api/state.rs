use std::sync::Arc;

use crate::application::publish::PublishService;
use crate::application::social::SocialService;
use crate::application::timeline::TimelineAssembler;
use crate::infra::db::PostgresRepositories;
use crate::realtime::LiveRegistry;

#[derive(Clone)]
pub struct ApiState {
    pub timeline: Arc<TimelineAssembler>,
    pub publish: Arc<PublishService>,
    pub social: Arc<SocialService>,
    pub live: LiveRegistry,
    pub db: Arc<PostgresRepositories>,
}
