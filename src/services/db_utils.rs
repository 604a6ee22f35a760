use actix::{Actor, Addr, SyncContext};
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::PgConnection;

use crate::config::Settings;
use crate::error::ServiceResult;
use crate::services::stripe::StripeClient;

pub type PgPool = Pool<ConnectionManager<PgConnection>>;
pub type PgPooled = PooledConnection<ConnectionManager<PgConnection>>;

pub struct PgActor(pub PgPool);

pub struct AppState {
    pub pg_db: Addr<PgActor>,
    pub redis_db: redis::Client,
    pub stripe: StripeClient,
    pub settings: Settings,
}

impl Actor for PgActor {
    type Context = SyncContext<Self>;
}

impl PgActor {
    pub fn connection(&self) -> ServiceResult<PgPooled> {
        Ok(self.0.get()?)
    }
}

pub fn get_db_pool(db_url: &str, pool_size: u32) -> ServiceResult<PgPool> {
    let manager = ConnectionManager::<PgConnection>::new(db_url);
    Ok(Pool::builder().max_size(pool_size).build(manager)?)
}
